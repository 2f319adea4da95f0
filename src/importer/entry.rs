//! Single descriptor import

use regex::Regex;
use tracing::{debug, trace, warn};

use crate::model::ProfileItem;

use super::Importer;
use super::outcome::EntryOutcome;
use super::selection::{SelectionSnapshot, should_transfer};

// ============================================================================
// Remarks Filter
// ============================================================================

/// Compiled subscription filter
#[derive(Debug, Clone, Default)]
pub enum RemarksFilter {
    /// No filter configured
    #[default]
    Off,
    /// Remarks must contain a match
    Pattern(Regex),
    /// The configured expression does not compile
    Invalid(String),
}

impl RemarksFilter {
    /// Compiles a filter expression; empty or missing means no filter
    pub fn compile(pattern: Option<&str>) -> Self {
        match pattern.filter(|p| !p.is_empty()) {
            None => RemarksFilter::Off,
            Some(pattern) => match Regex::new(pattern) {
                Ok(re) => RemarksFilter::Pattern(re),
                Err(e) => {
                    warn!("Invalid subscription filter '{}': {}", pattern, e);
                    RemarksFilter::Invalid(pattern.to_string())
                }
            },
        }
    }

    /// Filter configured on the given subscription
    pub fn for_subscription(importer: &Importer<'_>, subscription_id: &str) -> Self {
        if subscription_id.is_empty() {
            return RemarksFilter::Off;
        }
        match importer.store.get_subscription(subscription_id) {
            Ok(Some(sub)) => Self::compile(sub.active_filter()),
            Ok(None) => RemarksFilter::Off,
            Err(e) => {
                warn!(
                    "Failed to load subscription {} for filtering: {:#}",
                    subscription_id, e
                );
                RemarksFilter::Off
            }
        }
    }

    /// Rejection outcome for the given remarks, if any
    ///
    /// Empty remarks always pass.
    pub fn check(&self, remarks: &str) -> Option<EntryOutcome> {
        if remarks.is_empty() {
            return None;
        }
        match self {
            RemarksFilter::Off => None,
            RemarksFilter::Pattern(re) if re.is_match(remarks) => None,
            RemarksFilter::Pattern(_) => Some(EntryOutcome::Filtered),
            RemarksFilter::Invalid(_) => Some(EntryOutcome::InvalidFilter),
        }
    }
}

// ============================================================================
// Entry Import
// ============================================================================

impl Importer<'_> {
    /// Decodes, filters and persists one descriptor line
    ///
    /// Never fails: every problem maps to an [`EntryOutcome`].
    pub fn import_entry(
        &self,
        line: &str,
        subscription_id: &str,
        filter: &RemarksFilter,
        snapshot: Option<&SelectionSnapshot>,
    ) -> EntryOutcome {
        let line = line.trim();
        if line.is_empty() {
            return EntryOutcome::Empty;
        }

        let mut profile = match self.registry.decode(line) {
            Ok(profile) => profile,
            Err(e) => {
                debug!("Skipping descriptor: {:#}", e);
                return EntryOutcome::Unsupported;
            }
        };

        if let Some(rejected) = filter.check(&profile.remarks) {
            debug!("Skipping '{}': {}", profile.remarks, rejected);
            return rejected;
        }

        profile.subscription_id = subscription_id.to_string();
        self.persist(&profile, snapshot)
    }

    /// Stores a profile under a fresh id and applies selection continuity
    pub(super) fn persist(
        &self,
        profile: &ProfileItem,
        snapshot: Option<&SelectionSnapshot>,
    ) -> EntryOutcome {
        let id = match self.store.put_config(None, profile) {
            Ok(id) => id,
            Err(e) => {
                warn!("Failed to store '{}': {:#}", profile.remarks, e);
                return EntryOutcome::StorageFailure;
            }
        };
        trace!("Stored '{}' as {}", profile.remarks, id);

        if should_transfer(snapshot, profile) {
            match self.store.set_selected_config_id(&id) {
                Ok(()) => debug!("Selection moved to {} ({})", id, profile.endpoint()),
                Err(e) => warn!("Failed to move selection to {}: {:#}", id, e),
            }
        }

        EntryOutcome::Imported(id)
    }
}
