//! SOCKS codec
//!
//! Format: `socks://[BASE64URL(user:pass)@]host:port#remarks`. Older
//! producers Base64 the whole body, which is accepted on decode.

use anyhow::{Context, Result, anyhow, bail};
use tracing::trace;

use crate::model::{ConfigType, ProfileItem, ProtocolSettings, SocksSettings};
use crate::parser::base64::{decode_base64, encode_base64_url};

use super::{ProtocolCodec, build_link, parse_host_port, percent_decode, remarks_or_endpoint};

// ============================================================================
// SOCKS Codec
// ============================================================================

/// Codec for SOCKS (socks://) descriptors
pub struct SocksCodec;

impl ProtocolCodec for SocksCodec {
    fn config_type(&self) -> ConfigType {
        ConfigType::Socks
    }

    fn scheme(&self) -> &str {
        "socks"
    }

    fn decode(&self, uri: &str) -> Result<ProfileItem> {
        let uri = uri.trim();
        trace!("Decoding SOCKS descriptor");

        let without_scheme = uri
            .strip_prefix("socks://")
            .ok_or_else(|| anyhow!("Invalid SOCKS URI: missing socks:// prefix"))?;

        let (main_part, fragment) = match without_scheme.rfind('#') {
            Some(pos) => (&without_scheme[..pos], Some(&without_scheme[pos + 1..])),
            None => (without_scheme, None),
        };
        let main_part = main_part.trim_end_matches('/');

        let (userinfo, hostport) = match main_part.rfind('@') {
            Some(at_pos) => (Some(&main_part[..at_pos]), main_part[at_pos + 1..].to_string()),
            None => match parse_host_port(main_part) {
                Ok(_) => (None, main_part.to_string()),
                Err(_) => {
                    trace!("Decoding as legacy Base64 format");
                    return self.decode_legacy(main_part, fragment);
                }
            },
        };

        let (server, server_port) = parse_host_port(&hostport)?;
        let settings = match userinfo {
            Some(userinfo) => decode_credentials(userinfo),
            None => SocksSettings::default(),
        };

        Ok(ProfileItem::new(
            remarks_or_endpoint(fragment, &server, server_port),
            server,
            server_port,
            ProtocolSettings::Socks(settings),
        ))
    }

    fn encode(&self, profile: &ProfileItem) -> Result<String> {
        let ProtocolSettings::Socks(socks) = &profile.settings else {
            bail!("SOCKS codec cannot encode {} profile", profile.config_type());
        };

        let userinfo = match &socks.username {
            Some(username) => encode_base64_url(&format!(
                "{}:{}",
                username,
                socks.password.as_deref().unwrap_or_default()
            )),
            None => String::new(),
        };

        Ok(build_link(
            &userinfo,
            &profile.server,
            profile.server_port,
            "",
            &profile.remarks,
        ))
    }
}

impl SocksCodec {
    /// Decodes legacy format: BASE64([user:pass@]host:port)
    fn decode_legacy(&self, main_part: &str, fragment: Option<&str>) -> Result<ProfileItem> {
        let decoded = decode_base64(main_part)
            .and_then(|b| String::from_utf8(b).context("Invalid UTF-8 in SOCKS URI"))
            .context("Failed to decode legacy SOCKS URI")?;

        let (settings, hostport) = match decoded.rfind('@') {
            Some(at_pos) => (
                split_credentials(&decoded[..at_pos]),
                &decoded[at_pos + 1..],
            ),
            None => (SocksSettings::default(), decoded.as_str()),
        };
        let (server, server_port) = parse_host_port(hostport.trim())?;

        Ok(ProfileItem::new(
            remarks_or_endpoint(fragment, &server, server_port),
            server,
            server_port,
            ProtocolSettings::Socks(settings),
        ))
    }
}

/// Userinfo is Base64(user:pass) or plain user:pass, either percent-encoded
fn decode_credentials(userinfo: &str) -> SocksSettings {
    let userinfo = percent_decode(userinfo);
    if let Ok(decoded) = decode_base64(&userinfo)
        && let Ok(decoded_str) = String::from_utf8(decoded)
        && decoded_str.contains(':')
    {
        return split_credentials(&decoded_str);
    }
    split_credentials(&userinfo)
}

fn split_credentials(userinfo: &str) -> SocksSettings {
    let (username, password) = match userinfo.split_once(':') {
        Some((user, pass)) => (user, pass),
        None => (userinfo, ""),
    };
    SocksSettings {
        username: Some(username.to_string()).filter(|u| !u.is_empty()),
        password: Some(password.to_string()).filter(|p| !p.is_empty()),
    }
}
