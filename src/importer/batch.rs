//! Multi-line batch import

use tracing::{debug, info, warn};

use crate::parser::distinct_lines;

use super::Importer;
use super::entry::RemarksFilter;
use super::outcome::BatchReport;
use super::selection::{SelectionSnapshot, take_snapshot};

impl Importer<'_> {
    /// Imports every distinct line of `text` for a subscription
    ///
    /// Without `append`, the subscription's existing profiles are removed
    /// first; the selected profile is captured beforehand so selection can
    /// follow an equivalent new profile.
    pub fn import_batch(&self, text: &str, subscription_id: &str, append: bool) -> BatchReport {
        let snapshot = if append {
            None
        } else {
            take_snapshot(self.store, subscription_id)
        };
        self.import_batch_with_snapshot(text, subscription_id, append, snapshot.as_ref())
    }

    /// Batch import using a selection snapshot taken by the caller
    pub fn import_batch_with_snapshot(
        &self,
        text: &str,
        subscription_id: &str,
        append: bool,
        snapshot: Option<&SelectionSnapshot>,
    ) -> BatchReport {
        let lines = distinct_lines(text);
        debug!(
            "Batch import of {} lines for subscription '{}' (append: {})",
            lines.len(),
            subscription_id,
            append
        );

        let mut report = BatchReport::default();
        let committed = self.store.batch(&mut || {
            if !append && !subscription_id.is_empty() {
                match self.store.delete_configs_for_subscription(subscription_id) {
                    Ok(removed) => debug!(
                        "Removed {} profiles of subscription {}",
                        removed, subscription_id
                    ),
                    Err(e) => warn!(
                        "Failed to clear subscription {}: {:#}",
                        subscription_id, e
                    ),
                }
            }

            let filter = RemarksFilter::for_subscription(self, subscription_id);

            // Reverse so that the earliest line ends up first in display order
            for line in lines.iter().rev() {
                report.record(self.import_entry(line, subscription_id, &filter, snapshot));
            }
        });

        if let Err(e) = committed {
            warn!(
                "Failed to persist batch for subscription '{}': {:#}",
                subscription_id, e
            );
            report.roll_back();
        }

        if !lines.is_empty() {
            info!("Batch import: {}", report);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProfileItem, SubscriptionItem};
    use crate::parser::CodecRegistry;
    use crate::store::{MemoryStore, Store};

    const SS_A: &str = "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ@a.example.com:8388#A";
    const SS_B: &str = "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ@b.example.com:8388#B";
    const TROJAN_C: &str = "trojan://pw@c.example.com:443#C";

    fn remarks(store: &MemoryStore) -> Vec<String> {
        store
            .list_configs()
            .unwrap()
            .into_iter()
            .map(|(_, p): (String, ProfileItem)| p.remarks)
            .collect()
    }

    #[test]
    fn test_batch_keeps_input_order_for_display() {
        let store = MemoryStore::new();
        let registry = CodecRegistry::with_builtin_codecs();
        let importer = Importer::new(&store, &registry);

        let text = format!("{SS_A}\n{SS_B}\n{TROJAN_C}");
        let report = importer.import_batch(&text, "", true);

        assert_eq!(report.imported(), 3);
        assert_eq!(remarks(&store), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_batch_bad_lines_do_not_abort() {
        let store = MemoryStore::new();
        let registry = CodecRegistry::with_builtin_codecs();
        let importer = Importer::new(&store, &registry);

        let text = format!("garbage\n{SS_A}\nvmess://!!!\n\n{TROJAN_C}\ntuic://x@y:1");
        let report = importer.import_batch(&text, "", true);

        assert_eq!(report.imported(), 2);
        assert_eq!(report.unsupported, 3);
    }

    #[test]
    fn test_batch_replace_keeps_other_subscriptions() {
        let store = MemoryStore::new();
        let registry = CodecRegistry::with_builtin_codecs();
        let importer = Importer::new(&store, &registry);

        importer.import_batch(SS_A, "sub-1", false);
        importer.import_batch(SS_B, "sub-2", false);
        importer.import_batch(TROJAN_C, "", false);

        let report = importer.import_batch(TROJAN_C, "sub-1", false);
        assert_eq!(report.imported(), 1);
        assert_eq!(remarks(&store), vec!["C", "C", "B"]);
    }

    #[test]
    fn test_batch_append_keeps_existing() {
        let store = MemoryStore::new();
        let registry = CodecRegistry::with_builtin_codecs();
        let importer = Importer::new(&store, &registry);

        importer.import_batch(SS_A, "sub", false);
        importer.import_batch(SS_B, "sub", true);
        assert_eq!(store.list_configs().unwrap().len(), 2);
    }

    #[test]
    fn test_batch_applies_subscription_filter() {
        let store = MemoryStore::new();
        let registry = CodecRegistry::with_builtin_codecs();
        let importer = Importer::new(&store, &registry);
        let sub_id = store
            .put_subscription(
                None,
                &SubscriptionItem::new("p", "https://example.com/s").with_filter("^[AC]$"),
            )
            .unwrap();

        let text = format!("{SS_A}\n{SS_B}\n{TROJAN_C}");
        let report = importer.import_batch(&text, &sub_id, false);
        assert_eq!(report.imported(), 2);
        assert_eq!(report.filtered, 1);
        assert_eq!(remarks(&store), vec!["A", "C"]);
    }

    #[test]
    fn test_batch_empty_text_still_clears_subscription() {
        let store = MemoryStore::new();
        let registry = CodecRegistry::with_builtin_codecs();
        let importer = Importer::new(&store, &registry);

        importer.import_batch(SS_A, "sub", false);
        let report = importer.import_batch("", "sub", false);
        assert_eq!(report.imported(), 0);
        assert!(store.list_configs().unwrap().is_empty());
    }
}
