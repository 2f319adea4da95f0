//! WireGuard codec
//!
//! Format: `wireguard://secretKey@host:port?publickey=..&presharedkey=..&address=..&reserved=..&mtu=..#remarks`

use std::collections::HashMap;

use anyhow::{Result, anyhow, bail};
use tracing::trace;
use url::Url;
use url::form_urlencoded::Serializer;

use crate::model::util::{default_wireguard_address, default_wireguard_mtu};
use crate::model::{ConfigType, ProfileItem, ProtocolSettings, WireGuardSettings};

use super::{
    ProtocolCodec, build_link, param, percent_decode, query_params, remarks_or_endpoint,
    url_host_port,
};

// ============================================================================
// WireGuard Codec
// ============================================================================

/// Codec for WireGuard (wireguard://) descriptors
pub struct WireGuardCodec;

impl ProtocolCodec for WireGuardCodec {
    fn config_type(&self) -> ConfigType {
        ConfigType::WireGuard
    }

    fn scheme(&self) -> &str {
        "wireguard"
    }

    fn decode(&self, uri: &str) -> Result<ProfileItem> {
        trace!("Decoding WireGuard descriptor");
        let url =
            Url::parse(uri).map_err(|e| anyhow!("Failed to parse WireGuard URI: {}", e))?;

        let secret_key = percent_decode(url.username());
        if secret_key.is_empty() {
            bail!("WireGuard URI missing secret key");
        }

        let (server, server_port) = url_host_port(&url, "WireGuard")?;
        let params = query_params(&url);

        let mtu = match param(&params, "mtu") {
            Some(mtu) => mtu
                .parse()
                .map_err(|_| anyhow!("Invalid WireGuard MTU: {}", mtu))?,
            None => default_wireguard_mtu(),
        };

        Ok(ProfileItem::new(
            remarks_or_endpoint(url.fragment(), &server, server_port),
            server,
            server_port,
            ProtocolSettings::WireGuard(WireGuardSettings {
                secret_key,
                public_key: key_param(&params, "publickey").unwrap_or_default(),
                pre_shared_key: key_param(&params, "presharedkey"),
                local_address: param(&params, "address").unwrap_or_else(default_wireguard_address),
                reserved: param(&params, "reserved"),
                mtu,
            }),
        ))
    }

    fn encode(&self, profile: &ProfileItem) -> Result<String> {
        let ProtocolSettings::WireGuard(wg) = &profile.settings else {
            bail!(
                "WireGuard codec cannot encode {} profile",
                profile.config_type()
            );
        };

        let mut query = Serializer::new(String::new());
        query.append_pair("publickey", &wg.public_key);
        if let Some(psk) = &wg.pre_shared_key {
            query.append_pair("presharedkey", psk);
        }
        query.append_pair("address", &wg.local_address);
        if let Some(reserved) = &wg.reserved {
            query.append_pair("reserved", reserved);
        }
        query.append_pair("mtu", &wg.mtu.to_string());

        Ok(build_link(
            &urlencoding::encode(&wg.secret_key),
            &profile.server,
            profile.server_port,
            &query.finish(),
            &profile.remarks,
        ))
    }
}

/// Keys are Base64; an unescaped `+` arrives as a space after form decoding
fn key_param(params: &HashMap<String, String>, key: &str) -> Option<String> {
    param(params, key).map(|v| v.replace(' ', "+"))
}
