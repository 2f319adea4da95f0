use serde::{Deserialize, Serialize};

use super::config_type::ConfigType;
use super::util::{
    default_network, default_vless_encryption, default_vmess_security, default_wireguard_address,
    default_wireguard_mtu, is_false, is_zero_u32,
};

// ============================================================================
// Profile
// ============================================================================

/// One decoded proxy server
///
/// The store key is not part of the record: it is generated when the profile
/// is first persisted and never derived from content.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProfileItem {
    /// Display name, taken from the descriptor fragment
    #[serde(default)]
    pub remarks: String,

    /// Server host (domain or IP literal, IPv6 without brackets)
    #[serde(default)]
    pub server: String,

    /// Server port
    #[serde(default)]
    pub server_port: u16,

    /// Owning subscription id; empty for manually added profiles
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subscription_id: String,

    /// Protocol-specific parameters, tagged by protocol
    #[serde(flatten)]
    pub settings: ProtocolSettings,
}

impl ProfileItem {
    pub fn new(
        remarks: impl Into<String>,
        server: impl Into<String>,
        server_port: u16,
        settings: ProtocolSettings,
    ) -> Self {
        Self {
            remarks: remarks.into(),
            server: server.into(),
            server_port,
            subscription_id: String::new(),
            settings,
        }
    }

    /// Protocol tag derived from the settings variant
    pub fn config_type(&self) -> ConfigType {
        self.settings.config_type()
    }

    /// `host:port`, bracketing IPv6 literals
    pub fn endpoint(&self) -> String {
        if self.server.contains(':') {
            format!("[{}]:{}", self.server, self.server_port)
        } else {
            format!("{}:{}", self.server, self.server_port)
        }
    }
}

/// Per-protocol settings, one variant per [`ConfigType`]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProtocolSettings {
    #[serde(rename = "vmess")]
    VMess(VMessSettings),
    Custom(CustomSettings),
    Shadowsocks(ShadowsocksSettings),
    Socks(SocksSettings),
    #[serde(rename = "vless")]
    VLess(VLessSettings),
    Trojan(TrojanSettings),
    #[serde(rename = "wireguard")]
    WireGuard(WireGuardSettings),
    Hysteria2(Hysteria2Settings),
    Http(SocksSettings),
}

impl ProtocolSettings {
    pub fn config_type(&self) -> ConfigType {
        match self {
            ProtocolSettings::VMess(_) => ConfigType::VMess,
            ProtocolSettings::Custom(_) => ConfigType::Custom,
            ProtocolSettings::Shadowsocks(_) => ConfigType::Shadowsocks,
            ProtocolSettings::Socks(_) => ConfigType::Socks,
            ProtocolSettings::VLess(_) => ConfigType::VLess,
            ProtocolSettings::Trojan(_) => ConfigType::Trojan,
            ProtocolSettings::WireGuard(_) => ConfigType::WireGuard,
            ProtocolSettings::Hysteria2(_) => ConfigType::Hysteria2,
            ProtocolSettings::Http(_) => ConfigType::Http,
        }
    }
}

// ============================================================================
// Stream (transport + TLS) Settings
// ============================================================================

/// Transport and TLS parameters shared by VMess, VLESS and Trojan
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StreamSettings {
    /// Transport network: `tcp`, `ws`, `grpc`, `h2`, `httpupgrade`, `xhttp`, `kcp`, `quic`
    #[serde(default = "default_network")]
    pub network: String,

    /// Header obfuscation type (e.g. `http` for tcp, `none`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_type: Option<String>,

    /// Host header / authority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// HTTP path for ws/h2/httpupgrade/xhttp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// gRPC service name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    /// gRPC mode (`gun`/`multi`) or xhttp mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// `tls` or `reality`; `None` for plaintext
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,

    /// Comma separated ALPN list, kept verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpn: Option<String>,

    /// uTLS fingerprint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_insecure: bool,

    /// REALITY public key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,

    /// REALITY short id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,

    /// REALITY spider path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spider_x: Option<String>,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            network: default_network(),
            header_type: None,
            host: None,
            path: None,
            service_name: None,
            mode: None,
            security: None,
            sni: None,
            alpn: None,
            fingerprint: None,
            allow_insecure: false,
            public_key: None,
            short_id: None,
            spider_x: None,
        }
    }
}

// ============================================================================
// Protocol Settings
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VMessSettings {
    pub uuid: String,

    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub alter_id: u32,

    /// Cipher, `auto` by default
    #[serde(default = "default_vmess_security")]
    pub security: String,

    #[serde(default)]
    pub stream: StreamSettings,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VLessSettings {
    pub uuid: String,

    #[serde(default = "default_vless_encryption")]
    pub encryption: String,

    /// Flow control, e.g. `xtls-rprx-vision`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,

    #[serde(default)]
    pub stream: StreamSettings,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrojanSettings {
    pub password: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,

    #[serde(default)]
    pub stream: StreamSettings,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ShadowsocksSettings {
    pub method: String,
    pub password: String,

    /// SIP003 plugin, `name;opts` as it appears in the `plugin` parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
}

/// Credentials for SOCKS and HTTP proxies
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct SocksSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WireGuardSettings {
    /// Local private key
    pub secret_key: String,

    /// Peer public key
    #[serde(default)]
    pub public_key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_shared_key: Option<String>,

    /// Comma separated interface addresses
    #[serde(default = "default_wireguard_address")]
    pub local_address: String,

    /// Reserved bytes, comma separated (e.g. `1,2,3`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved: Option<String>,

    #[serde(default = "default_wireguard_mtu")]
    pub mtu: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Hysteria2Settings {
    #[serde(default)]
    pub password: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub insecure: bool,

    /// Salamander obfuscation password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs_password: Option<String>,

    /// Port hopping range, e.g. `20000-30000`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_hopping: Option<String>,

    /// Pinned certificate SHA-256
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_sha256: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpn: Option<String>,
}

/// A full structured configuration imported verbatim
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CustomSettings {
    /// Raw JSON text of the configuration
    pub config: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trojan_profile() -> ProfileItem {
        ProfileItem::new(
            "node",
            "example.com",
            443,
            ProtocolSettings::Trojan(TrojanSettings {
                password: "secret".to_string(),
                flow: None,
                stream: StreamSettings {
                    security: Some("tls".to_string()),
                    ..Default::default()
                },
            }),
        )
    }

    #[test]
    fn test_config_type_follows_settings() {
        assert_eq!(trojan_profile().config_type(), ConfigType::Trojan);
        let http = ProfileItem::new("h", "h", 80, ProtocolSettings::Http(SocksSettings::default()));
        assert_eq!(http.config_type(), ConfigType::Http);
    }

    #[test]
    fn test_endpoint_brackets_ipv6() {
        let mut p = trojan_profile();
        assert_eq!(p.endpoint(), "example.com:443");
        p.server = "2001:db8::1".to_string();
        assert_eq!(p.endpoint(), "[2001:db8::1]:443");
    }

    #[test]
    fn test_json_roundtrip_flattens_type_tag() {
        let p = trojan_profile();
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["type"], "trojan");
        assert_eq!(json["password"], "secret");
        assert!(json.get("subscription_id").is_none());

        let back: ProfileItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_stream_defaults_on_deserialize() {
        let json = r#"{"remarks":"r","server":"s","server_port":1,"type":"vless","uuid":"u"}"#;
        let p: ProfileItem = serde_json::from_str(json).unwrap();
        match p.settings {
            ProtocolSettings::VLess(v) => {
                assert_eq!(v.encryption, "none");
                assert_eq!(v.stream.network, "tcp");
            }
            other => panic!("Expected VLESS settings, got {other:?}"),
        }
    }
}
