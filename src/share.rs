//! Descriptor serialization for stored profiles

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::parser::CodecRegistry;
use crate::store::Store;

/// Share link for a stored profile
///
/// An empty string means "not shareable": the id is unknown, or the profile
/// is a custom or HTTP configuration without a textual form. Errors are
/// reserved for store failures and codec contract violations.
pub fn share_as_uri(store: &dyn Store, registry: &CodecRegistry, id: &str) -> Result<String> {
    let Some(profile) = store
        .get_config(id)
        .with_context(|| format!("Failed to load profile {}", id))?
    else {
        debug!("Profile {} not found, nothing to share", id);
        return Ok(String::new());
    };

    registry
        .to_uri(&profile)
        .with_context(|| format!("Failed to encode profile {}", id))
}

/// Newline separated share links for the given ids, skipping unshareable ones
pub fn share_all(store: &dyn Store, registry: &CodecRegistry, ids: &[String]) -> String {
    let mut uris = Vec::with_capacity(ids.len());
    for id in ids {
        match share_as_uri(store, registry, id) {
            Ok(uri) if !uri.is_empty() => uris.push(uri),
            Ok(_) => debug!("Profile {} is not shareable", id),
            Err(e) => warn!("Failed to share profile {}: {:#}", id, e),
        }
    }
    uris.join("\n")
}
