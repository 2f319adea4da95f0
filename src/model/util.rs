//! Serde helpers and protocol defaults shared by the model types.

use serde::{Deserialize, Deserializer};

// ============================================================================
// Skip Helpers
// ============================================================================

/// Returns `true` if the boolean value is `false`.
///
/// Used with `#[serde(skip_serializing_if = "is_false")]` to omit false values.
#[inline]
pub fn is_false(b: &bool) -> bool {
    !*b
}

/// Returns `true` if the u32 value is zero.
#[inline]
pub fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

/// Returns `true` if the i64 value is zero.
#[inline]
pub fn is_zero_i64(v: &i64) -> bool {
    *v == 0
}

// ============================================================================
// Protocol Defaults
// ============================================================================

/// Default transport network for stream-based protocols.
pub const DEFAULT_NETWORK: &str = "tcp";

/// Default VMess cipher.
pub const DEFAULT_VMESS_SECURITY: &str = "auto";

/// Default VLESS encryption (VLESS only supports `none`).
pub const DEFAULT_VLESS_ENCRYPTION: &str = "none";

/// Default local interface address for WireGuard peers.
pub const DEFAULT_WIREGUARD_ADDRESS: &str = "172.16.0.2/32";

/// Default WireGuard MTU.
pub const DEFAULT_WIREGUARD_MTU: u32 = 1420;

pub fn default_network() -> String {
    DEFAULT_NETWORK.to_string()
}

pub fn default_vmess_security() -> String {
    DEFAULT_VMESS_SECURITY.to_string()
}

pub fn default_vless_encryption() -> String {
    DEFAULT_VLESS_ENCRYPTION.to_string()
}

pub fn default_wireguard_address() -> String {
    DEFAULT_WIREGUARD_ADDRESS.to_string()
}

pub fn default_wireguard_mtu() -> u32 {
    DEFAULT_WIREGUARD_MTU
}

pub fn default_true() -> bool {
    true
}

// ============================================================================
// Lenient Number Deserializers
// ============================================================================

/// Deserializes a port that may be encoded as a JSON number or string.
pub fn port_from_str_or_number<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(u16),
        String(String),
    }

    match PortValue::deserialize(deserializer)? {
        PortValue::Number(n) => Ok(n),
        PortValue::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Deserializes an optional u32 that may be a number, a string, empty or null.
pub fn option_u32_from_str_or_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum U32Value {
        Number(u32),
        String(String),
    }

    match Option::<U32Value>::deserialize(deserializer)? {
        Some(U32Value::Number(n)) => Ok(Some(n)),
        Some(U32Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(U32Value::String(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}
