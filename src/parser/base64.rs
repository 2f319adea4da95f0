//! Base64 helpers
//!
//! Descriptor producers disagree on alphabet and padding, so decoding tries
//! standard, URL-safe and unpadded variants before giving up. Encoding always
//! uses one fixed variant per call site.

use anyhow::{Result, bail};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use tracing::trace;

// ============================================================================
// Decoding
// ============================================================================

/// Decodes Base64 content, trying multiple variants
///
/// Attempts, in order: standard, URL-safe, URL-safe without padding, then
/// standard and URL-safe with padding added. Whitespace is removed first.
pub fn decode_base64(content: &str) -> Result<Vec<u8>> {
    let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    trace!(
        "Attempting Base64 decode, cleaned length: {} bytes",
        cleaned.len()
    );

    if let Ok(decoded) = STANDARD.decode(&cleaned) {
        trace!("Decoded using standard Base64");
        return Ok(decoded);
    }

    if let Ok(decoded) = URL_SAFE.decode(&cleaned) {
        trace!("Decoded using URL-safe Base64");
        return Ok(decoded);
    }

    if let Ok(decoded) = URL_SAFE_NO_PAD.decode(&cleaned) {
        trace!("Decoded using URL-safe Base64 without padding");
        return Ok(decoded);
    }

    let padded = add_base64_padding(&cleaned);
    if let Ok(decoded) = STANDARD.decode(&padded) {
        trace!("Decoded using standard Base64 with added padding");
        return Ok(decoded);
    }
    if let Ok(decoded) = URL_SAFE.decode(&padded) {
        trace!("Decoded using URL-safe Base64 with added padding");
        return Ok(decoded);
    }

    bail!("Failed to decode Base64 content")
}

/// Decodes Base64 into UTF-8 text
///
/// Returns `None` for blank input, input that is not Base64, or bytes that
/// are not valid UTF-8. Never fails loudly: callers treat `None` as "this
/// interpretation does not apply".
pub fn decode_base64_text(content: &str) -> Option<String> {
    if content.trim().is_empty() {
        return None;
    }
    let bytes = decode_base64(content).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    if text.trim().is_empty() {
        return None;
    }
    Some(text)
}

/// Adds proper padding to Base64 string if missing
pub fn add_base64_padding(s: &str) -> String {
    let mut result = s.to_string();
    while !result.len().is_multiple_of(4) {
        result.push('=');
    }
    result
}

// ============================================================================
// Encoding
// ============================================================================

/// Standard alphabet with padding (used for whole-body encodings like VMess JSON)
pub fn encode_base64(content: &str) -> String {
    STANDARD.encode(content)
}

/// URL-safe alphabet without padding (used inside URI userinfo)
pub fn encode_base64_url(content: &str) -> String {
    URL_SAFE_NO_PAD.encode(content)
}
