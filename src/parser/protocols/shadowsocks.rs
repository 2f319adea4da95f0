//! Shadowsocks codec
//!
//! Supports both SIP002 format and legacy format, as well as SIP003 plugins.

use anyhow::{Context, Result, anyhow, bail};
use tracing::trace;
use url::form_urlencoded::Serializer;

use crate::model::{ConfigType, ProfileItem, ProtocolSettings, ShadowsocksSettings};
use crate::parser::base64::{decode_base64, encode_base64_url};

use super::{ProtocolCodec, build_link, parse_host_port, percent_decode, remarks_or_endpoint};

// ============================================================================
// Shadowsocks Codec
// ============================================================================

/// Codec for Shadowsocks (ss://) descriptors
///
/// Accepted forms:
/// - SIP002: ss://BASE64URL(method:password)@host:port#remarks
/// - SIP002 with plain userinfo: ss://method:password@host:port#remarks
/// - SIP002 with SIP003 plugin: ss://userinfo@host:port/?plugin=name;opts#remarks
/// - Legacy: ss://BASE64(method:password@host:port)#remarks
///
/// Encoding always produces SIP002 with Base64url userinfo.
pub struct ShadowsocksCodec;

impl ProtocolCodec for ShadowsocksCodec {
    fn config_type(&self) -> ConfigType {
        ConfigType::Shadowsocks
    }

    fn scheme(&self) -> &str {
        "ss"
    }

    fn decode(&self, uri: &str) -> Result<ProfileItem> {
        let uri = uri.trim();
        trace!("Decoding Shadowsocks descriptor");

        let without_scheme = uri
            .strip_prefix("ss://")
            .ok_or_else(|| anyhow!("Invalid Shadowsocks URI: missing ss:// prefix"))?;

        let (main_part, fragment) = match without_scheme.rfind('#') {
            Some(pos) => (&without_scheme[..pos], Some(&without_scheme[pos + 1..])),
            None => (without_scheme, None),
        };

        if let Some(at_pos) = main_part.rfind('@') {
            trace!("Decoding as SIP002 format (found @ separator)");
            return self.decode_sip002(main_part, at_pos, fragment);
        }

        trace!("Decoding as legacy Base64 format");
        self.decode_legacy(main_part, fragment)
    }

    fn encode(&self, profile: &ProfileItem) -> Result<String> {
        let ProtocolSettings::Shadowsocks(ss) = &profile.settings else {
            bail!(
                "Shadowsocks codec cannot encode {} profile",
                profile.config_type()
            );
        };

        let userinfo = encode_base64_url(&format!("{}:{}", ss.method, ss.password));
        let query = match &ss.plugin {
            Some(plugin) => Serializer::new(String::new())
                .append_pair("plugin", plugin)
                .finish(),
            None => String::new(),
        };

        Ok(build_link(
            &userinfo,
            &profile.server,
            profile.server_port,
            &query,
            &profile.remarks,
        ))
    }
}

impl ShadowsocksCodec {
    /// Decodes `userinfo@host:port[/?plugin=...]`
    fn decode_sip002(
        &self,
        main_part: &str,
        at_pos: usize,
        fragment: Option<&str>,
    ) -> Result<ProfileItem> {
        let userinfo = &main_part[..at_pos];
        let hostport_and_query = &main_part[at_pos + 1..];

        let (hostport_raw, query_string) = match hostport_and_query.find('?') {
            Some(q_pos) => (
                &hostport_and_query[..q_pos],
                Some(&hostport_and_query[q_pos + 1..]),
            ),
            None => (hostport_and_query, None),
        };

        // Trailing slash may appear before the query string
        let hostport = hostport_raw.trim_end_matches('/');
        let (server, server_port) = parse_host_port(hostport)?;
        let (method, password) = self.decode_userinfo(userinfo)?;
        let plugin = plugin_from_query(query_string);

        Ok(ProfileItem::new(
            remarks_or_endpoint(fragment, &server, server_port),
            server,
            server_port,
            ProtocolSettings::Shadowsocks(ShadowsocksSettings {
                method,
                password,
                plugin,
            }),
        ))
    }

    /// Decodes legacy format: BASE64(method:password@host:port)
    fn decode_legacy(&self, main_part: &str, fragment: Option<&str>) -> Result<ProfileItem> {
        let decoded = decode_base64(main_part)
            .and_then(|b| String::from_utf8(b).context("Invalid UTF-8 in Shadowsocks URI"))
            .context("Failed to decode legacy Shadowsocks URI")?;

        let at_pos = decoded
            .rfind('@')
            .ok_or_else(|| anyhow!("Invalid legacy Shadowsocks format: missing @"))?;

        let (server, server_port) = parse_host_port(decoded[at_pos + 1..].trim())?;
        let (method, password) = split_method_password(&decoded[..at_pos])?;

        Ok(ProfileItem::new(
            remarks_or_endpoint(fragment, &server, server_port),
            server,
            server_port,
            ProtocolSettings::Shadowsocks(ShadowsocksSettings {
                method,
                password,
                plugin: None,
            }),
        ))
    }

    /// Decodes userinfo which can be Base64(method:password) or method:password
    ///
    /// Percent escapes are removed first; generators often escape the Base64
    /// padding as `%3D`.
    fn decode_userinfo(&self, userinfo: &str) -> Result<(String, String)> {
        let userinfo = percent_decode(userinfo);
        if let Ok(decoded) = decode_base64(&userinfo)
            && let Ok(decoded_str) = String::from_utf8(decoded)
            && decoded_str.contains(':')
        {
            return split_method_password(&decoded_str);
        }

        split_method_password(&userinfo)
    }
}

fn split_method_password(userinfo: &str) -> Result<(String, String)> {
    let (method, password) = userinfo
        .split_once(':')
        .ok_or_else(|| anyhow!("Invalid Shadowsocks userinfo: missing method:password separator"))?;
    if method.is_empty() {
        bail!("Invalid Shadowsocks userinfo: empty method");
    }
    Ok((method.to_string(), password.to_string()))
}

/// Reads the SIP003 `plugin` parameter (`name;opts`), kept as one string
fn plugin_from_query(query_string: Option<&str>) -> Option<String> {
    let query = query_string.filter(|q| !q.is_empty())?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "plugin")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ss_settings(profile: &ProfileItem) -> &ShadowsocksSettings {
        match &profile.settings {
            ProtocolSettings::Shadowsocks(ss) => ss,
            other => panic!("Expected Shadowsocks settings, got {other:?}"),
        }
    }

    #[test]
    fn test_shadowsocks_escaped_base64_padding() {
        // base64("aes-128-gcm:pw") with its padding percent-encoded
        let uri = "ss://YWVzLTEyOC1nY206cHc%3D@h.example.com:8388#n";
        let profile = ShadowsocksCodec.decode(uri).unwrap();

        assert_eq!(profile.server, "h.example.com");
        let ss = ss_settings(&profile);
        assert_eq!(ss.method, "aes-128-gcm");
        assert_eq!(ss.password, "pw");
    }

    #[test]
    fn test_shadowsocks_sip002_base64_userinfo() {
        let uri = "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ@example.com:8388#My%20Server";
        let profile = ShadowsocksCodec.decode(uri).unwrap();

        assert_eq!(profile.remarks, "My Server");
        assert_eq!(profile.server, "example.com");
        assert_eq!(profile.server_port, 8388);
        let ss = ss_settings(&profile);
        assert_eq!(ss.method, "aes-256-gcm");
        assert_eq!(ss.password, "password");
        assert!(ss.plugin.is_none());
    }

    #[test]
    fn test_shadowsocks_plain_userinfo() {
        let uri = "ss://chacha20-ietf-poly1305:secret@1.2.3.4:443";
        let profile = ShadowsocksCodec.decode(uri).unwrap();
        assert_eq!(profile.remarks, "1.2.3.4:443");
        let ss = ss_settings(&profile);
        assert_eq!(ss.method, "chacha20-ietf-poly1305");
        assert_eq!(ss.password, "secret");
    }

    #[test]
    fn test_shadowsocks_sip003_plugin() {
        let uri = "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ@example.com:8388/?plugin=obfs-local%3Bobfs%3Dhttp%3Bobfs-host%3Dexample.com#sip003";
        let profile = ShadowsocksCodec.decode(uri).unwrap();
        assert_eq!(
            ss_settings(&profile).plugin.as_deref(),
            Some("obfs-local;obfs=http;obfs-host=example.com")
        );
    }

    #[test]
    fn test_shadowsocks_legacy_format() {
        // base64("aes-128-gcm:test@192.168.1.1:8080")
        let uri = "ss://YWVzLTEyOC1nY206dGVzdEAxOTIuMTY4LjEuMTo4MDgw#legacy";
        let profile = ShadowsocksCodec.decode(uri).unwrap();
        assert_eq!(profile.remarks, "legacy");
        assert_eq!(profile.server, "192.168.1.1");
        assert_eq!(profile.server_port, 8080);
        assert_eq!(ss_settings(&profile).method, "aes-128-gcm");
        assert_eq!(ss_settings(&profile).password, "test");
    }

    #[test]
    fn test_shadowsocks_ipv6() {
        let uri = "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ@[2001:db8::1]:8388#v6";
        let profile = ShadowsocksCodec.decode(uri).unwrap();
        assert_eq!(profile.server, "2001:db8::1");
        assert_eq!(profile.server_port, 8388);
    }

    #[test]
    fn test_shadowsocks_invalid() {
        assert!(ShadowsocksCodec.decode("ss://").is_err());
        assert!(ShadowsocksCodec.decode("ss://invalid@").is_err());
        assert!(ShadowsocksCodec.decode("ss://YWVzOnB3@example.com").is_err());
        assert!(ShadowsocksCodec.decode("ss://nocolon@example.com:8388").is_err());
    }

    #[test]
    fn test_shadowsocks_encode_sip002() {
        let profile = ProfileItem::new(
            "node a",
            "example.com",
            8388,
            ProtocolSettings::Shadowsocks(ShadowsocksSettings {
                method: "aes-256-gcm".to_string(),
                password: "password".to_string(),
                plugin: None,
            }),
        );
        assert_eq!(
            ShadowsocksCodec.encode(&profile).unwrap(),
            "YWVzLTI1Ni1nY206cGFzc3dvcmQ@example.com:8388#node%20a"
        );
    }

    #[test]
    fn test_shadowsocks_roundtrip_with_plugin() {
        let profile = ProfileItem::new(
            "日本 #1",
            "2001:db8::2",
            443,
            ProtocolSettings::Shadowsocks(ShadowsocksSettings {
                method: "2022-blake3-aes-128-gcm".to_string(),
                password: "p@ss:w/rd?".to_string(),
                plugin: Some("v2ray-plugin;tls;host=cdn.example.com".to_string()),
            }),
        );
        let uri = format!("ss://{}", ShadowsocksCodec.encode(&profile).unwrap());
        assert_eq!(ShadowsocksCodec.decode(&uri).unwrap(), profile);
    }
}
