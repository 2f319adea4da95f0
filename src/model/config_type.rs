use std::fmt;

use serde::{Deserialize, Serialize};

/// Legacy scheme accepted as an alias for Hysteria2 descriptors.
pub const HY2_SCHEME: &str = "hy2://";

/// Protocol tag of a stored profile
///
/// The set is closed: every profile carries exactly one of these and the
/// matching settings variant.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConfigType {
    #[serde(rename = "vmess")]
    VMess,
    Custom,
    Shadowsocks,
    Socks,
    #[serde(rename = "vless")]
    VLess,
    Trojan,
    #[serde(rename = "wireguard")]
    WireGuard,
    Hysteria2,
    Http,
}

impl ConfigType {
    /// Share-link scheme prefix, including `://`.
    ///
    /// `Custom` has no textual form and returns an empty prefix.
    pub fn protocol_scheme(&self) -> &'static str {
        match self {
            ConfigType::VMess => "vmess://",
            ConfigType::Custom => "",
            ConfigType::Shadowsocks => "ss://",
            ConfigType::Socks => "socks://",
            ConfigType::VLess => "vless://",
            ConfigType::Trojan => "trojan://",
            ConfigType::WireGuard => "wireguard://",
            ConfigType::Hysteria2 => "hysteria2://",
            ConfigType::Http => "http://",
        }
    }

    /// Whether profiles of this type can be exported as a descriptor URI.
    pub fn is_shareable(&self) -> bool {
        !matches!(self, ConfigType::Custom | ConfigType::Http)
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigType::VMess => write!(f, "VMess"),
            ConfigType::Custom => write!(f, "Custom"),
            ConfigType::Shadowsocks => write!(f, "Shadowsocks"),
            ConfigType::Socks => write!(f, "SOCKS"),
            ConfigType::VLess => write!(f, "VLESS"),
            ConfigType::Trojan => write!(f, "Trojan"),
            ConfigType::WireGuard => write!(f, "WireGuard"),
            ConfigType::Hysteria2 => write!(f, "Hysteria2"),
            ConfigType::Http => write!(f, "HTTP"),
        }
    }
}
