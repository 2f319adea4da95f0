//! Subscription synchronization
//!
//! Downloads each subscription body with the configured fetch strategies
//! and feeds it through the import pipeline as a full replace. Also picks
//! nested subscription URLs out of pasted text.

mod fetch;
mod http;

pub use fetch::{
    FetchStrategy, Fetcher, LOCAL_PROXY_HOST, default_strategies, fetch_with_strategies,
};
pub use http::HttpFetcher;

use std::collections::HashSet;
use std::fmt;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::importer::Importer;
use crate::model::SubscriptionItem;
use crate::parser::{
    CodecRegistry, distinct_lines, is_valid_subscription_url, is_valid_url, to_ascii_url,
    with_query_param,
};
use crate::store::{Store, SubscriptionLocks};

/// Remarks given to subscriptions discovered in pasted text
pub const NESTED_SUBSCRIPTION_REMARKS: &str = "import sub";

/// Query parameter carrying the device id
pub const DEVICE_ID_PARAM: &str = "deviceID";

// ============================================================================
// Outcomes
// ============================================================================

/// Result of synchronizing one subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Disabled, or remarks/url blank
    Skipped,
    /// URL is not an absolute http(s) URL
    InvalidUrl,
    /// Every fetch strategy failed or returned nothing
    NoContent,
    /// Body was imported; the count may be zero if nothing decoded
    Imported(usize),
    /// Unexpected failure, such as the subscription being unreadable
    Failed(String),
}

impl SyncOutcome {
    pub fn imported(&self) -> usize {
        match self {
            SyncOutcome::Imported(n) => *n,
            _ => 0,
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Skipped => write!(f, "skipped"),
            SyncOutcome::InvalidUrl => write!(f, "invalid URL"),
            SyncOutcome::NoContent => write!(f, "no content"),
            SyncOutcome::Imported(n) => write!(f, "{} imported", n),
            SyncOutcome::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Per-subscription results of a full sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// `(subscription id, remarks, outcome)` in store order
    pub results: Vec<(String, String, SyncOutcome)>,
}

impl SyncSummary {
    pub fn total_imported(&self) -> usize {
        self.results.iter().map(|(_, _, o)| o.imported()).sum()
    }

    pub fn outcome(&self, subscription_id: &str) -> Option<&SyncOutcome> {
        self.results
            .iter()
            .find(|(id, _, _)| id == subscription_id)
            .map(|(_, _, outcome)| outcome)
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} subscriptions, {} profiles imported",
            self.results.len(),
            self.total_imported()
        )
    }
}

// ============================================================================
// Synchronizer
// ============================================================================

/// Subscription synchronization over one store
pub struct Synchronizer<'a> {
    store: &'a dyn Store,
    registry: &'a CodecRegistry,
    fetcher: &'a dyn Fetcher,
    strategies: &'a [FetchStrategy],
    device_id: &'a str,
    locks: Option<&'a SubscriptionLocks>,
}

impl<'a> Synchronizer<'a> {
    pub fn new(
        store: &'a dyn Store,
        registry: &'a CodecRegistry,
        fetcher: &'a dyn Fetcher,
        strategies: &'a [FetchStrategy],
        device_id: &'a str,
    ) -> Self {
        Self {
            store,
            registry,
            fetcher,
            strategies,
            device_id,
            locks: None,
        }
    }

    /// Serializes each subscription replace through `locks`
    pub fn with_locks(mut self, locks: &'a SubscriptionLocks) -> Self {
        self.locks = Some(locks);
        self
    }

    /// Fetches and reimports one subscription
    ///
    /// Only store failures are returned as errors; everything else is a
    /// [`SyncOutcome`].
    pub fn sync_one(&self, subscription_id: &str) -> Result<SyncOutcome> {
        let Some(sub) = self
            .store
            .get_subscription(subscription_id)
            .with_context(|| format!("Failed to load subscription {}", subscription_id))?
        else {
            warn!("Subscription {} not found", subscription_id);
            return Ok(SyncOutcome::Skipped);
        };

        if subscription_id.is_empty() || !sub.is_syncable() {
            debug!("Skipping subscription '{}'", sub.remarks);
            return Ok(SyncOutcome::Skipped);
        }

        let url = match self.request_url(&sub.url) {
            Some(url) => url,
            None => {
                warn!("Subscription '{}' has an invalid URL: {}", sub.remarks, sub.url);
                return Ok(SyncOutcome::InvalidUrl);
            }
        };

        info!("Updating subscription '{}'", sub.remarks);
        let content = fetch_with_strategies(self.fetcher, &url, self.strategies);
        if content.is_empty() {
            warn!("Subscription '{}' returned no content", sub.remarks);
            return Ok(SyncOutcome::NoContent);
        }

        let importer = Importer::new(self.store, self.registry);
        let import = || importer.resolve(&content, subscription_id, false);
        let report = match self.locks {
            Some(locks) => locks.run(subscription_id, import),
            None => import(),
        };

        if report.imported > 0 {
            self.stamp_updated(subscription_id, sub)?;
        }
        info!(
            "Subscription {} updated: {} profiles via {}",
            subscription_id, report.imported, report.strategy
        );
        Ok(SyncOutcome::Imported(report.imported))
    }

    /// Synchronizes every stored subscription, isolating failures
    pub fn sync_all(&self) -> Result<SyncSummary> {
        let subscriptions = self
            .store
            .list_subscriptions()
            .context("Failed to list subscriptions")?;

        let mut summary = SyncSummary::default();
        for (id, sub) in subscriptions {
            let outcome = match self.sync_one(&id) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Failed to update subscription '{}': {:#}", sub.remarks, e);
                    SyncOutcome::Failed(format!("{:#}", e))
                }
            };
            summary.results.push((id, sub.remarks, outcome));
        }

        info!("Sync finished: {}", summary);
        Ok(summary)
    }

    /// Stores every distinct subscription URL found in `text`
    ///
    /// URLs already present in the store are skipped. Returns the number of
    /// subscriptions added.
    pub fn import_nested_subscriptions(&self, text: &str) -> usize {
        let mut known: HashSet<String> = match self.store.list_subscriptions() {
            Ok(subs) => subs.into_iter().map(|(_, sub)| sub.url).collect(),
            Err(e) => {
                warn!("Failed to list subscriptions: {:#}", e);
                return 0;
            }
        };

        let mut added = 0;
        for line in distinct_lines(text) {
            if !is_valid_subscription_url(line) || known.contains(line) {
                continue;
            }
            let sub = SubscriptionItem::new(NESTED_SUBSCRIPTION_REMARKS, line);
            match self.store.put_subscription(None, &sub) {
                Ok(id) => {
                    info!("Added subscription {} from {}", id, line);
                    known.insert(line.to_string());
                    added += 1;
                }
                Err(e) => warn!("Failed to add subscription {}: {:#}", line, e),
            }
        }
        added
    }

    /// ASCII URL with the device id appended, or `None` when invalid
    fn request_url(&self, url: &str) -> Option<String> {
        let ascii = to_ascii_url(url).ok()?;
        if !is_valid_url(&ascii) {
            return None;
        }
        if self.device_id.is_empty() {
            return Some(ascii);
        }
        with_query_param(&ascii, DEVICE_ID_PARAM, self.device_id).ok()
    }

    fn stamp_updated(&self, subscription_id: &str, mut sub: SubscriptionItem) -> Result<()> {
        sub.last_updated = Utc::now().timestamp_millis();
        self.store
            .put_subscription(Some(subscription_id), &sub)
            .with_context(|| format!("Failed to update subscription {}", subscription_id))?;
        Ok(())
    }
}
