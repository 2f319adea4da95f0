//! Protocol codecs
//!
//! Each supported share-link scheme has a codec implementing
//! [`ProtocolCodec`], converting between one descriptor URI and one
//! [`ProfileItem`]. The [`CodecRegistry`] dispatches by literal scheme
//! prefix; the first codec whose prefix matches wins.

mod hysteria2;
mod shadowsocks;
mod socks;
mod trojan;
mod vless;
mod vmess;
mod wireguard;

pub use hysteria2::Hysteria2Codec;
pub use shadowsocks::ShadowsocksCodec;
pub use socks::SocksCodec;
pub use trojan::TrojanCodec;
pub use vless::VLessCodec;
pub use vmess::VMessCodec;
pub use wireguard::WireGuardCodec;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use tracing::debug;
use url::Url;
use url::form_urlencoded::Serializer;

use crate::model::{ConfigType, HY2_SCHEME, ProfileItem, StreamSettings};

// ============================================================================
// Protocol Codec Trait
// ============================================================================

/// Encoder/decoder for one share-link scheme
pub trait ProtocolCodec: Send + Sync {
    /// Protocol tag produced by [`ProtocolCodec::decode`]
    fn config_type(&self) -> ConfigType;

    /// Scheme this codec handles, without `://` (e.g. "ss", "vmess")
    fn scheme(&self) -> &str;

    /// Parses a full descriptor (`scheme://...`) into a profile
    fn decode(&self, uri: &str) -> Result<ProfileItem>;

    /// Produces the descriptor body that follows the scheme prefix
    fn encode(&self, profile: &ProfileItem) -> Result<String>;

    /// Checks if this codec can handle the given descriptor
    fn can_decode(&self, uri: &str) -> bool {
        uri.starts_with(&format!("{}://", self.scheme()))
    }
}

// ============================================================================
// Codec Registry
// ============================================================================

/// Ordered list of codecs, dispatched by scheme prefix
#[derive(Default, Clone)]
pub struct CodecRegistry {
    codecs: Vec<Arc<dyn ProtocolCodec>>,
}

impl CodecRegistry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        Self { codecs: Vec::new() }
    }

    /// Creates a registry with all built-in codecs registered
    pub fn with_builtin_codecs() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(VMessCodec));
        registry.register(Arc::new(ShadowsocksCodec));
        registry.register(Arc::new(SocksCodec));
        registry.register(Arc::new(TrojanCodec));
        registry.register(Arc::new(VLessCodec));
        registry.register(Arc::new(WireGuardCodec));
        registry.register(Arc::new(Hysteria2Codec::new(scheme_name(
            ConfigType::Hysteria2.protocol_scheme(),
        ))));
        registry.register(Arc::new(Hysteria2Codec::new(scheme_name(HY2_SCHEME))));
        registry
    }

    /// Appends a codec; earlier registrations take precedence on decode
    pub fn register(&mut self, codec: Arc<dyn ProtocolCodec>) {
        self.codecs.push(codec);
    }

    /// Finds the codec whose scheme prefixes `uri`
    pub fn find(&self, uri: &str) -> Option<&Arc<dyn ProtocolCodec>> {
        self.codecs.iter().find(|c| c.can_decode(uri))
    }

    /// Finds the primary codec for a protocol tag
    pub fn get(&self, config_type: ConfigType) -> Option<&Arc<dyn ProtocolCodec>> {
        self.codecs.iter().find(|c| c.config_type() == config_type)
    }

    /// Decodes a descriptor using the matching codec
    pub fn decode(&self, uri: &str) -> Result<ProfileItem> {
        let uri = uri.trim();
        let codec = self.find(uri).ok_or_else(|| match extract_scheme(uri) {
            Ok(scheme) => anyhow!("No codec registered for scheme: {}", scheme),
            Err(e) => e,
        })?;
        debug!("Decoding {} descriptor", codec.scheme());

        let result = codec.decode(uri);
        match &result {
            Ok(profile) => {
                debug!(
                    "Decoded {} descriptor -> '{}' ({})",
                    codec.scheme(),
                    profile.remarks,
                    profile.endpoint()
                );
            }
            Err(e) => {
                debug!("Failed to decode {} descriptor: {}", codec.scheme(), e);
            }
        }
        result
    }

    /// Encodes the descriptor body for a profile
    ///
    /// Profiles without a textual form (`Custom`, `Http`) encode to an
    /// empty string.
    pub fn encode(&self, profile: &ProfileItem) -> Result<String> {
        let config_type = profile.config_type();
        if !config_type.is_shareable() {
            return Ok(String::new());
        }
        let codec = self
            .get(config_type)
            .ok_or_else(|| anyhow!("No codec registered for protocol: {}", config_type))?;
        codec.encode(profile)
    }

    /// Full descriptor (`scheme + body`), empty for unshareable profiles
    pub fn to_uri(&self, profile: &ProfileItem) -> Result<String> {
        let config_type = profile.config_type();
        if !config_type.is_shareable() {
            return Ok(String::new());
        }
        let body = self.encode(profile)?;
        Ok(format!("{}{}", config_type.protocol_scheme(), body))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Scheme name without the `://` separator
fn scheme_name(prefix: &'static str) -> &'static str {
    prefix.trim_end_matches("://")
}

/// Parses host:port string, handling IPv6 addresses in brackets
pub fn parse_host_port(hostport: &str) -> Result<(String, u16)> {
    if hostport.starts_with('[') {
        let bracket_end = hostport
            .find(']')
            .ok_or_else(|| anyhow!("Invalid IPv6 address: missing closing bracket"))?;

        let host = hostport[1..bracket_end].to_string();
        let port_str = hostport
            .get(bracket_end + 2..)
            .ok_or_else(|| anyhow!("Missing port after IPv6 address"))?;

        let port: u16 = port_str
            .parse()
            .map_err(|_| anyhow!("Invalid port number: {}", port_str))?;
        return Ok((host, port));
    }

    let colon_pos = hostport
        .rfind(':')
        .ok_or_else(|| anyhow!("Invalid host:port format: missing colon"))?;

    let host = hostport[..colon_pos].to_string();
    if host.is_empty() {
        bail!("Invalid host:port format: missing host");
    }
    let port: u16 = hostport[colon_pos + 1..]
        .parse()
        .map_err(|_| anyhow!("Invalid port number"))?;

    Ok((host, port))
}

/// Extracts the scheme from a URI
pub fn extract_scheme(uri: &str) -> Result<&str> {
    if !uri.contains("://") {
        bail!("Invalid URI: missing scheme separator ://");
    }
    uri.split("://")
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("Invalid URI: missing scheme"))
}

/// Brackets IPv6 literals for use in an authority
pub fn format_host(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    }
}

/// Percent-decodes a URI component, keeping the raw text if it is malformed
pub fn percent_decode(s: &str) -> String {
    urlencoding::decode(s)
        .unwrap_or_else(|_| s.into())
        .into_owned()
}

/// Remarks from a fragment, falling back to `host:port`
pub fn remarks_or_endpoint(fragment: Option<&str>, server: &str, port: u16) -> String {
    match fragment.map(percent_decode) {
        Some(remarks) if !remarks.is_empty() => remarks,
        _ => format!("{}:{}", format_host(server), port),
    }
}

/// Host and port of a parsed URL; IPv6 brackets are removed
pub fn url_host_port(url: &Url, protocol: &str) -> Result<(String, u16)> {
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| anyhow!("{} URI missing host", protocol))?;
    let host = host.trim_start_matches('[').trim_end_matches(']').to_string();
    let port = url
        .port()
        .ok_or_else(|| anyhow!("{} URI missing port", protocol))?;
    Ok((host, port))
}

/// Query parameters of a URL as an owned map
pub fn query_params(url: &Url) -> HashMap<String, String> {
    url.query_pairs().into_owned().collect()
}

/// Non-empty query parameter
pub fn param(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params.get(key).filter(|v| !v.is_empty()).cloned()
}

/// Builds `userinfo@host:port[?query][#remarks]`
pub fn build_link(userinfo: &str, host: &str, port: u16, query: &str, remarks: &str) -> String {
    let mut link = if userinfo.is_empty() {
        format!("{}:{}", format_host(host), port)
    } else {
        format!("{}@{}:{}", userinfo, format_host(host), port)
    };
    if !query.is_empty() {
        link.push('?');
        link.push_str(query);
    }
    if !remarks.is_empty() {
        link.push('#');
        link.push_str(&urlencoding::encode(remarks));
    }
    link
}

/// Reads transport and TLS parameters from a share-link query
///
/// `default_security` applies when the `security` parameter is absent;
/// an explicit `security=none` always means plaintext.
pub fn stream_from_params(
    params: &HashMap<String, String>,
    default_security: Option<&str>,
) -> StreamSettings {
    let security = match params.get("security").map(|s| s.as_str()) {
        Some("none") => None,
        Some(s) if !s.is_empty() => Some(s.to_string()),
        _ => default_security.map(|s| s.to_string()),
    };

    StreamSettings {
        network: param(params, "type").unwrap_or_else(crate::model::util::default_network),
        header_type: param(params, "headerType"),
        host: param(params, "host"),
        path: param(params, "path"),
        service_name: param(params, "serviceName"),
        mode: param(params, "mode"),
        security,
        sni: param(params, "sni"),
        alpn: param(params, "alpn"),
        fingerprint: param(params, "fp"),
        allow_insecure: params
            .get("allowInsecure")
            .is_some_and(|v| v == "1" || v == "true"),
        public_key: param(params, "pbk"),
        short_id: param(params, "sid"),
        spider_x: param(params, "spx"),
    }
}

/// Writes transport and TLS parameters into a share-link query
///
/// With `explicit_none`, plaintext is written as `security=none` so that a
/// codec whose default is TLS decodes it back unchanged.
pub fn append_stream_params(
    query: &mut Serializer<'_, String>,
    stream: &StreamSettings,
    explicit_none: bool,
) {
    match stream.security.as_deref() {
        Some(security) => {
            query.append_pair("security", security);
        }
        None if explicit_none => {
            query.append_pair("security", "none");
        }
        None => {}
    }

    let optional = [
        ("sni", &stream.sni),
        ("alpn", &stream.alpn),
        ("fp", &stream.fingerprint),
        ("pbk", &stream.public_key),
        ("sid", &stream.short_id),
        ("spx", &stream.spider_x),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            query.append_pair(key, value);
        }
    }
    if stream.allow_insecure {
        query.append_pair("allowInsecure", "1");
    }

    query.append_pair("type", &stream.network);
    let transport = [
        ("headerType", &stream.header_type),
        ("host", &stream.host),
        ("path", &stream.path),
        ("serviceName", &stream.service_name),
        ("mode", &stream.mode),
    ];
    for (key, value) in transport {
        if let Some(value) = value {
            query.append_pair(key, value);
        }
    }
}
