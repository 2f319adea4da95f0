//! Descriptor parsing
//!
//! This module provides functionality for:
//! - Decoding Base64 content (standard, URL-safe, padded or not)
//! - Detecting the shape of pasted or fetched content
//! - Validating and normalising subscription URLs
//! - Encoding and decoding share links (vmess://, ss://, socks://, trojan://,
//!   vless://, wireguard://, hysteria2://)

pub mod base64;
pub mod detection;
pub mod links;
pub mod protocols;

pub use self::base64::{decode_base64, decode_base64_text, encode_base64, encode_base64_url};
pub use detection::{distinct_lines, first_line, is_json_object};
pub use links::{is_valid_subscription_url, is_valid_url, to_ascii_url, with_query_param};
pub use protocols::{CodecRegistry, ProtocolCodec};
