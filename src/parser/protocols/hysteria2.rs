//! Hysteria2 codec
//!
//! Format: hysteria2://auth@host:port?params#remarks (`hy2://` is an alias)

use anyhow::{Result, anyhow, bail};
use tracing::trace;
use url::Url;
use url::form_urlencoded::Serializer;

use crate::model::{ConfigType, Hysteria2Settings, ProfileItem, ProtocolSettings};

use super::{
    ProtocolCodec, build_link, param, percent_decode, query_params, remarks_or_endpoint,
    url_host_port,
};

const OBFS_SALAMANDER: &str = "salamander";

// ============================================================================
// Hysteria2 Codec
// ============================================================================

/// Codec for Hysteria2 (hysteria2:// or hy2://) descriptors
///
/// One instance per accepted scheme; both decode to [`ConfigType::Hysteria2`].
pub struct Hysteria2Codec {
    scheme: &'static str,
}

impl Hysteria2Codec {
    pub fn new(scheme: &'static str) -> Self {
        Self { scheme }
    }
}

impl ProtocolCodec for Hysteria2Codec {
    fn config_type(&self) -> ConfigType {
        ConfigType::Hysteria2
    }

    fn scheme(&self) -> &str {
        self.scheme
    }

    fn decode(&self, uri: &str) -> Result<ProfileItem> {
        trace!("Decoding Hysteria2 descriptor (scheme: {})", self.scheme);
        let url =
            Url::parse(uri).map_err(|e| anyhow!("Failed to parse Hysteria2 URI: {}", e))?;

        let password = percent_decode(url.username());
        let (server, server_port) = url_host_port(&url, "Hysteria2")?;
        let params = query_params(&url);

        let obfs_password = match param(&params, "obfs").as_deref() {
            None | Some("none") => None,
            Some(_) => param(&params, "obfs-password"),
        };

        Ok(ProfileItem::new(
            remarks_or_endpoint(url.fragment(), &server, server_port),
            server,
            server_port,
            ProtocolSettings::Hysteria2(Hysteria2Settings {
                password,
                sni: param(&params, "sni"),
                insecure: params
                    .get("insecure")
                    .is_some_and(|s| s == "1" || s == "true"),
                obfs_password,
                port_hopping: param(&params, "mport"),
                pin_sha256: param(&params, "pinSHA256"),
                alpn: param(&params, "alpn"),
            }),
        ))
    }

    fn encode(&self, profile: &ProfileItem) -> Result<String> {
        let ProtocolSettings::Hysteria2(hy2) = &profile.settings else {
            bail!(
                "Hysteria2 codec cannot encode {} profile",
                profile.config_type()
            );
        };

        let mut query = Serializer::new(String::new());
        if let Some(sni) = &hy2.sni {
            query.append_pair("sni", sni);
        }
        if hy2.insecure {
            query.append_pair("insecure", "1");
        }
        if let Some(obfs_password) = &hy2.obfs_password {
            query.append_pair("obfs", OBFS_SALAMANDER);
            query.append_pair("obfs-password", obfs_password);
        }
        if let Some(mport) = &hy2.port_hopping {
            query.append_pair("mport", mport);
        }
        if let Some(pin) = &hy2.pin_sha256 {
            query.append_pair("pinSHA256", pin);
        }
        if let Some(alpn) = &hy2.alpn {
            query.append_pair("alpn", alpn);
        }

        Ok(build_link(
            &urlencoding::encode(&hy2.password),
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

    fn hy2_settings(profile: &ProfileItem) -> &Hysteria2Settings {
        match &profile.settings {
            ProtocolSettings::Hysteria2(h) => h,
            other => panic!("Expected Hysteria2 settings, got {other:?}"),
        }
    }

    #[test]
    fn test_hysteria2_basic() {
        let codec = Hysteria2Codec::new("hysteria2");
        let uri = "hysteria2://password@example.com:443?sni=example.com#test-node";
        let profile = codec.decode(uri).unwrap();

        assert_eq!(profile.remarks, "test-node");
        assert_eq!(profile.server, "example.com");
        assert_eq!(profile.server_port, 443);
        let hy2 = hy2_settings(&profile);
        assert_eq!(hy2.password, "password");
        assert_eq!(hy2.sni.as_deref(), Some("example.com"));
        assert!(!hy2.insecure);
    }

    #[test]
    fn test_hy2_alias() {
        let codec = Hysteria2Codec::new("hy2");
        assert!(codec.can_decode("hy2://pw@example.com:443"));
        assert!(!codec.can_decode("hysteria2://pw@example.com:443"));
        let profile = codec.decode("hy2://pw@example.com:443#alias").unwrap();
        assert_eq!(profile.config_type(), ConfigType::Hysteria2);
    }

    #[test]
    fn test_hysteria2_with_obfs() {
        let codec = Hysteria2Codec::new("hysteria2");
        let uri = "hysteria2://pw@example.com:443?obfs=salamander&obfs-password=obfs-pw&insecure=1&mport=20000-30000#o";
        let profile = codec.decode(uri).unwrap();
        let hy2 = hy2_settings(&profile);
        assert_eq!(hy2.obfs_password.as_deref(), Some("obfs-pw"));
        assert!(hy2.insecure);
        assert_eq!(hy2.port_hopping.as_deref(), Some("20000-30000"));
    }

    #[test]
    fn test_hysteria2_obfs_none_ignores_password() {
        let codec = Hysteria2Codec::new("hysteria2");
        let uri = "hysteria2://pw@example.com:443?obfs=none&obfs-password=x";
        let profile = codec.decode(uri).unwrap();
        assert!(hy2_settings(&profile).obfs_password.is_none());
    }

    #[test]
    fn test_hysteria2_invalid() {
        let codec = Hysteria2Codec::new("hysteria2");
        assert!(codec.decode("hysteria2://pw@example.com").is_err());
        assert!(codec.decode("hysteria2://").is_err());
    }

    #[test]
    fn test_hysteria2_roundtrip() {
        let codec = Hysteria2Codec::new("hysteria2");
        let profile = ProfileItem::new(
            "美国 hy2",
            "us.example.com",
            8443,
            ProtocolSettings::Hysteria2(Hysteria2Settings {
                password: "auth:token@1".to_string(),
                sni: Some("bing.com".to_string()),
                insecure: true,
                obfs_password: Some("salty".to_string()),
                port_hopping: Some("40000-50000".to_string()),
                pin_sha256: Some("AB:CD:EF".to_string()),
                alpn: Some("h3".to_string()),
            }),
        );
        let uri = format!("hysteria2://{}", codec.encode(&profile).unwrap());
        assert_eq!(codec.decode(&uri).unwrap(), profile);
    }
}
