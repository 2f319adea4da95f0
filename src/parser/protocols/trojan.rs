//! Trojan codec
//!
//! Format: trojan://password@host:port?params#remarks

use anyhow::{Result, anyhow, bail};
use tracing::trace;
use url::Url;
use url::form_urlencoded::Serializer;

use crate::model::{ConfigType, ProfileItem, ProtocolSettings, TrojanSettings};

use super::{
    ProtocolCodec, append_stream_params, build_link, param, percent_decode, query_params,
    remarks_or_endpoint, stream_from_params, url_host_port,
};

// ============================================================================
// Trojan Codec
// ============================================================================

/// Codec for Trojan (trojan://) descriptors
///
/// TLS is assumed when `security` is absent, so plaintext profiles are
/// encoded with an explicit `security=none`.
pub struct TrojanCodec;

impl ProtocolCodec for TrojanCodec {
    fn config_type(&self) -> ConfigType {
        ConfigType::Trojan
    }

    fn scheme(&self) -> &str {
        "trojan"
    }

    fn decode(&self, uri: &str) -> Result<ProfileItem> {
        trace!("Decoding Trojan descriptor");
        let url = Url::parse(uri).map_err(|e| anyhow!("Failed to parse Trojan URI: {}", e))?;

        let password = percent_decode(url.username());
        if password.is_empty() {
            bail!("Trojan URI missing password");
        }

        let (server, server_port) = url_host_port(&url, "Trojan")?;
        let params = query_params(&url);

        Ok(ProfileItem::new(
            remarks_or_endpoint(url.fragment(), &server, server_port),
            server,
            server_port,
            ProtocolSettings::Trojan(TrojanSettings {
                password,
                flow: param(&params, "flow"),
                stream: stream_from_params(&params, Some("tls")),
            }),
        ))
    }

    fn encode(&self, profile: &ProfileItem) -> Result<String> {
        let ProtocolSettings::Trojan(trojan) = &profile.settings else {
            bail!("Trojan codec cannot encode {} profile", profile.config_type());
        };

        let mut query = Serializer::new(String::new());
        if let Some(flow) = &trojan.flow {
            query.append_pair("flow", flow);
        }
        append_stream_params(&mut query, &trojan.stream, true);

        Ok(build_link(
            &urlencoding::encode(&trojan.password),
            &profile.server,
            profile.server_port,
            &query.finish(),
            &profile.remarks,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StreamSettings;

    fn trojan_settings(profile: &ProfileItem) -> &TrojanSettings {
        match &profile.settings {
            ProtocolSettings::Trojan(t) => t,
            other => panic!("Expected Trojan settings, got {other:?}"),
        }
    }

    #[test]
    fn test_trojan_basic() {
        let uri = "trojan://password@example.com:443?sni=example.com#test-node";
        let profile = TrojanCodec.decode(uri).unwrap();

        assert_eq!(profile.remarks, "test-node");
        assert_eq!(profile.server, "example.com");
        assert_eq!(profile.server_port, 443);
        let trojan = trojan_settings(&profile);
        assert_eq!(trojan.password, "password");
        assert_eq!(trojan.stream.security.as_deref(), Some("tls"));
        assert_eq!(trojan.stream.sni.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_trojan_with_websocket() {
        let uri = "trojan://password@example.com:443?type=ws&path=/ws&host=ws.example.com#ws-node";
        let profile = TrojanCodec.decode(uri).unwrap();
        let stream = &trojan_settings(&profile).stream;
        assert_eq!(stream.network, "ws");
        assert_eq!(stream.path.as_deref(), Some("/ws"));
        assert_eq!(stream.host.as_deref(), Some("ws.example.com"));
    }

    #[test]
    fn test_trojan_no_tls() {
        let uri = "trojan://password@example.com:8080?security=none#no-tls-node";
        let profile = TrojanCodec.decode(uri).unwrap();
        assert!(trojan_settings(&profile).stream.security.is_none());
    }

    #[test]
    fn test_trojan_no_remarks() {
        let profile = TrojanCodec.decode("trojan://password@example.com:443").unwrap();
        assert_eq!(profile.remarks, "example.com:443");
    }

    #[test]
    fn test_trojan_url_encoded_password() {
        let uri = "trojan://pass%40word%21@example.com:443#encoded-node";
        let profile = TrojanCodec.decode(uri).unwrap();
        assert_eq!(trojan_settings(&profile).password, "pass@word!");
    }

    #[test]
    fn test_trojan_url_encoded_remarks() {
        let uri = "trojan://password@example.com:443#%F0%9F%87%BA%F0%9F%87%B8%20US%20Server";
        let profile = TrojanCodec.decode(uri).unwrap();
        assert!(profile.remarks.ends_with("US Server"));
    }

    #[test]
    fn test_trojan_ipv6_host() {
        let profile = TrojanCodec.decode("trojan://password@[::1]:443#v6").unwrap();
        assert_eq!(profile.server, "::1");
        assert_eq!(profile.server_port, 443);
    }

    #[test]
    fn test_trojan_invalid() {
        assert!(TrojanCodec.decode("trojan://@example.com:443").is_err());
        assert!(TrojanCodec.decode("trojan://password@:443").is_err());
        assert!(TrojanCodec.decode("trojan://password@example.com").is_err());
        assert!(TrojanCodec.decode("trojan://").is_err());
        assert!(TrojanCodec.decode("not-a-uri").is_err());
    }

    #[test]
    fn test_trojan_encode_plaintext_is_explicit() {
        let profile = ProfileItem::new(
            "plain",
            "example.com",
            80,
            ProtocolSettings::Trojan(TrojanSettings {
                password: "pw".to_string(),
                flow: None,
                stream: StreamSettings::default(),
            }),
        );
        let body = TrojanCodec.encode(&profile).unwrap();
        assert!(body.contains("security=none"));

        let decoded = TrojanCodec.decode(&format!("trojan://{}", body)).unwrap();
        assert_eq!(decoded, profile);
    }

    #[test]
    fn test_trojan_roundtrip() {
        let profile = ProfileItem::new(
            "🇯🇵 Tokyo",
            "jp.example.com",
            443,
            ProtocolSettings::Trojan(TrojanSettings {
                password: "p@ss word#1".to_string(),
                flow: Some("xtls-rprx-vision".to_string()),
                stream: StreamSettings {
                    network: "grpc".to_string(),
                    service_name: Some("trojan-grpc".to_string()),
                    security: Some("tls".to_string()),
                    sni: Some("jp.example.com".to_string()),
                    fingerprint: Some("firefox".to_string()),
                    allow_insecure: true,
                    ..Default::default()
                },
            }),
        );
        let uri = format!("trojan://{}", TrojanCodec.encode(&profile).unwrap());
        assert_eq!(TrojanCodec.decode(&uri).unwrap(), profile);
    }
}
