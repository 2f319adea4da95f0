//! Decoding-strategy resolution
//!
//! Producers disagree on whether to wrap a descriptor list in Base64, so a
//! blob is tried as a Base64 batch, then as a raw batch, then as a single
//! custom configuration. The first strategy that imports anything wins.

use serde_json::Value;
use tracing::{debug, info};

use crate::model::{CustomSettings, ProfileItem, ProtocolSettings};
use crate::parser::{decode_base64_text, first_line, is_json_object};

use super::Importer;
use super::entry::RemarksFilter;
use super::outcome::{DecodeStrategy, ResolveReport};
use super::selection::{SelectionSnapshot, take_snapshot};

const DEFAULT_CUSTOM_REMARKS: &str = "custom config";

impl Importer<'_> {
    /// Imports a blob whose outer encoding is unknown
    pub fn resolve(&self, text: &str, subscription_id: &str, append: bool) -> ResolveReport {
        // Captured once: the first strategy may already delete the selection
        let snapshot = if append {
            None
        } else {
            take_snapshot(self.store, subscription_id)
        };
        let snapshot = snapshot.as_ref();

        match decode_base64_text(text) {
            Some(decoded) => {
                let report =
                    self.import_batch_with_snapshot(&decoded, subscription_id, append, snapshot);
                if report.imported() > 0 {
                    return self.resolved(DecodeStrategy::Base64Batch, report.imported());
                }
            }
            None => debug!("Content is not Base64, skipping Base64 batch"),
        }

        let report = self.import_batch_with_snapshot(text, subscription_id, append, snapshot);
        if report.imported() > 0 {
            return self.resolved(DecodeStrategy::RawBatch, report.imported());
        }

        let imported = self.import_single_custom(text, subscription_id, snapshot);
        if imported > 0 {
            return self.resolved(DecodeStrategy::SingleCustom, imported);
        }

        debug!("No decoding strategy produced any profile");
        ResolveReport::none()
    }

    /// Imports the first line as one configuration
    ///
    /// A Base64 first line may decode to a descriptor, which goes through the
    /// regular entry import with the subscription's filter. A JSON object is
    /// stored verbatim as a custom profile; when the first line is not Base64
    /// the whole blob is tried (a pretty-printed document spans many lines).
    /// Raw descriptors are left to the batch strategies.
    pub fn import_single_custom(
        &self,
        text: &str,
        subscription_id: &str,
        snapshot: Option<&SelectionSnapshot>,
    ) -> usize {
        let Some(first) = first_line(text) else {
            return 0;
        };
        let decoded = decode_base64_text(first);

        if let Some(decoded) = &decoded
            && self.registry.find(decoded.trim()).is_some()
        {
            debug!("Single config is a Base64 descriptor");
            let filter = RemarksFilter::for_subscription(self, subscription_id);
            let outcome = self.import_entry(decoded.trim(), subscription_id, &filter, snapshot);
            return usize::from(outcome.is_imported());
        }

        let candidate = decoded.as_deref().unwrap_or(text).trim();
        if is_json_object(candidate) {
            debug!("Single config is a JSON object");
            let mut profile = custom_profile(candidate);
            profile.subscription_id = subscription_id.to_string();
            return usize::from(self.persist(&profile, snapshot).is_imported());
        }

        0
    }

    fn resolved(&self, strategy: DecodeStrategy, imported: usize) -> ResolveReport {
        info!("Imported {} profiles via {}", imported, strategy);
        ResolveReport { strategy, imported }
    }
}

/// Custom profile around a JSON configuration, named by its `remarks` key
fn custom_profile(json: &str) -> ProfileItem {
    let remarks = serde_json::from_str::<Value>(json)
        .ok()
        .and_then(|v| v.get("remarks").and_then(Value::as_str).map(str::to_string))
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_CUSTOM_REMARKS.to_string());

    ProfileItem::new(
        remarks,
        "",
        0,
        ProtocolSettings::Custom(CustomSettings {
            config: json.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConfigType, SubscriptionItem};
    use crate::parser::{CodecRegistry, encode_base64};
    use crate::store::{MemoryStore, Store};

    const SS_A: &str = "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ@a.example.com:8388#A";
    const TROJAN_B: &str = "trojan://pw@b.example.com:443#B";

    #[test]
    fn test_resolve_prefers_base64_batch() {
        let store = MemoryStore::new();
        let registry = CodecRegistry::with_builtin_codecs();
        let importer = Importer::new(&store, &registry);

        let blob = encode_base64(&format!("{SS_A}\n{TROJAN_B}"));
        let report = importer.resolve(&blob, "", true);
        assert_eq!(report.strategy, DecodeStrategy::Base64Batch);
        assert_eq!(report.imported, 2);
    }

    #[test]
    fn test_resolve_falls_back_to_raw() {
        let store = MemoryStore::new();
        let registry = CodecRegistry::with_builtin_codecs();
        let importer = Importer::new(&store, &registry);

        let report = importer.resolve(&format!("{SS_A}\n{TROJAN_B}"), "", true);
        assert_eq!(report.strategy, DecodeStrategy::RawBatch);
        assert_eq!(report.imported, 2);
    }

    #[test]
    fn test_resolve_custom_json() {
        let store = MemoryStore::new();
        let registry = CodecRegistry::with_builtin_codecs();
        let importer = Importer::new(&store, &registry);

        let json = "{\n  \"remarks\": \"my full config\",\n  \"outbounds\": []\n}";
        let report = importer.resolve(json, "", true);
        assert_eq!(report.strategy, DecodeStrategy::SingleCustom);
        assert_eq!(report.imported, 1);

        let (_, profile) = store.list_configs().unwrap().remove(0);
        assert_eq!(profile.config_type(), ConfigType::Custom);
        assert_eq!(profile.remarks, "my full config");
    }

    #[test]
    fn test_resolve_custom_base64_json_first_line() {
        let store = MemoryStore::new();
        let registry = CodecRegistry::with_builtin_codecs();
        let importer = Importer::new(&store, &registry);

        let blob = format!("{}\nsecond line", encode_base64(r#"{"outbounds":[]}"#));
        let report = importer.resolve(&blob, "sub", false);
        assert_eq!(report.strategy, DecodeStrategy::SingleCustom);

        let (_, profile) = store.list_configs().unwrap().remove(0);
        assert_eq!(profile.remarks, DEFAULT_CUSTOM_REMARKS);
        assert_eq!(profile.subscription_id, "sub");
    }

    #[test]
    fn test_single_custom_ignores_raw_descriptor() {
        let store = MemoryStore::new();
        let registry = CodecRegistry::with_builtin_codecs();
        let importer = Importer::new(&store, &registry);

        assert_eq!(importer.import_single_custom(TROJAN_B, "", None), 0);
        assert!(store.list_configs().unwrap().is_empty());
    }

    #[test]
    fn test_single_custom_base64_descriptor_respects_filter() {
        let store = MemoryStore::new();
        let registry = CodecRegistry::with_builtin_codecs();
        let importer = Importer::new(&store, &registry);
        let sub_id = store
            .put_subscription(
                None,
                &SubscriptionItem::new("p", "https://example.com/s").with_filter("^US"),
            )
            .unwrap();

        let blob = format!("{}\nsecond line", encode_base64(TROJAN_B));
        assert_eq!(importer.import_single_custom(&blob, &sub_id, None), 0);
        assert!(store.list_configs().unwrap().is_empty());

        let blob = format!("{}\nsecond line", encode_base64(TROJAN_B));
        assert_eq!(importer.import_single_custom(&blob, "", None), 1);
    }

    #[test]
    fn test_resolve_filtered_single_line_imports_nothing() {
        let store = MemoryStore::new();
        let registry = CodecRegistry::with_builtin_codecs();
        let importer = Importer::new(&store, &registry);
        let sub_id = store
            .put_subscription(
                None,
                &SubscriptionItem::new("p", "https://example.com/s").with_filter("^US"),
            )
            .unwrap();

        let report = importer.resolve("trojan://pw@de.example.com:443#DE-1", &sub_id, false);
        assert_eq!(report, ResolveReport::none());
        assert!(store.list_configs().unwrap().is_empty());
    }

    #[test]
    fn test_resolve_garbage_imports_nothing() {
        let store = MemoryStore::new();
        let registry = CodecRegistry::with_builtin_codecs();
        let importer = Importer::new(&store, &registry);

        let report = importer.resolve("hello world\nnot a descriptor", "", true);
        assert_eq!(report, ResolveReport::none());
        assert!(store.list_configs().unwrap().is_empty());
    }

    #[test]
    fn test_resolve_keeps_selection_across_strategies() {
        let store = MemoryStore::new();
        let registry = CodecRegistry::with_builtin_codecs();
        let importer = Importer::new(&store, &registry);

        importer.resolve(SS_A, "sub", false);
        let (old_id, _) = store.list_configs().unwrap().remove(0);
        store.set_selected_config_id(&old_id).unwrap();

        // Raw text: the Base64 strategy is skipped, raw batch reimports
        let report = importer.resolve(SS_A, "sub", false);
        assert_eq!(report.strategy, DecodeStrategy::RawBatch);

        let (new_id, _) = store.list_configs().unwrap().remove(0);
        assert_ne!(new_id, old_id);
        assert_eq!(store.get_selected_config_id().unwrap(), Some(new_id));
    }
}
