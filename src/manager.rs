//! Profile manager
//!
//! Facade over the store, codec registry and fetcher. This is the entry
//! point used by the CLI and by embedders.

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::importer::{ImportOutcome, Importer, RemarksFilter};
use crate::model::{ProfileItem, SubscriptionItem};
use crate::parser::{CodecRegistry, decode_base64_text, is_valid_url, to_ascii_url};
use crate::settings::Settings;
use crate::share;
use crate::store::{JsonFileStore, Store, SubscriptionLocks};
use crate::sync::{FetchStrategy, Fetcher, HttpFetcher, SyncOutcome, SyncSummary, Synchronizer};

// ============================================================================
// Errors
// ============================================================================

/// Lookups that reference records the store does not have
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerError {
    UnknownConfig(String),
    UnknownSubscription(String),
}

impl fmt::Display for ManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerError::UnknownConfig(id) => write!(f, "Unknown config id: {}", id),
            ManagerError::UnknownSubscription(id) => write!(f, "Unknown subscription id: {}", id),
        }
    }
}

impl std::error::Error for ManagerError {}

// ============================================================================
// Profile Manager
// ============================================================================

/// Imports, synchronizes and shares stored proxy profiles
pub struct ProfileManager {
    store: Arc<dyn Store>,
    fetcher: Arc<dyn Fetcher>,
    registry: CodecRegistry,
    strategies: Vec<FetchStrategy>,
    device_id: Option<String>,
    locks: SubscriptionLocks,
}

impl ProfileManager {
    /// Manager with the built-in codecs and default fetch strategies
    pub fn new(store: Arc<dyn Store>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            store,
            fetcher,
            registry: CodecRegistry::with_builtin_codecs(),
            strategies: Settings::default().fetch_strategies(),
            device_id: None,
            locks: SubscriptionLocks::new(),
        }
    }

    /// Manager backed by the JSON store and HTTP fetcher described by `settings`
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let store_path = settings.store_path();
        debug!("Opening store at {}", store_path.display());
        let store = JsonFileStore::open(&store_path)?;
        let fetcher = HttpFetcher::new(settings.user_agent.clone());

        let mut manager = Self::new(Arc::new(store), Arc::new(fetcher))
            .with_strategies(settings.fetch_strategies());
        if let Some(device_id) = settings.device_id() {
            manager = manager.with_device_id(device_id);
        }
        Ok(manager)
    }

    pub fn with_registry(mut self, registry: CodecRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_strategies(mut self, strategies: Vec<FetchStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Overrides the device id persisted in the store
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    fn importer(&self) -> Importer<'_> {
        Importer::new(self.store.as_ref(), &self.registry)
    }

    /// Device id sent with subscription requests; empty if none is available
    fn device_id(&self) -> String {
        if let Some(device_id) = &self.device_id {
            return device_id.clone();
        }
        self.store.device_id().unwrap_or_else(|e| {
            warn!("Failed to load device id: {:#}", e);
            String::new()
        })
    }

    // ------------------------------------------------------------------------
    // Import
    // ------------------------------------------------------------------------

    /// Imports a newline separated descriptor list for a subscription
    ///
    /// Returns the number of profiles persisted.
    pub fn import_batch(&self, text: &str, subscription_id: &str, append: bool) -> usize {
        self.locks
            .run(subscription_id, || {
                self.importer().import_batch(text, subscription_id, append)
            })
            .imported()
    }

    /// Imports text pasted by the user
    ///
    /// Profiles are appended without a subscription. Subscription URLs found
    /// in the text (raw first, then Base64 decoded) are stored, and when any
    /// were added every subscription is synchronized.
    pub fn import_from_pasted_text(&self, text: &str) -> ImportOutcome {
        let configs = self
            .locks
            .run("", || self.importer().resolve(text, "", true))
            .imported;

        // Device id is only needed once something gets fetched
        let synchronizer = self.synchronizer("");
        let mut subscriptions = synchronizer.import_nested_subscriptions(text);
        if subscriptions == 0
            && let Some(decoded) = decode_base64_text(text)
        {
            subscriptions = synchronizer.import_nested_subscriptions(&decoded);
        }

        if subscriptions > 0 {
            let summary = self.sync_all_subscriptions();
            info!("Synchronized after import: {}", summary);
        }

        let outcome = ImportOutcome {
            configs,
            subscriptions,
        };
        info!("Pasted text import: {}", outcome);
        outcome
    }

    // ------------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------------

    fn synchronizer<'a>(&'a self, device_id: &'a str) -> Synchronizer<'a> {
        Synchronizer::new(
            self.store.as_ref(),
            &self.registry,
            self.fetcher.as_ref(),
            &self.strategies,
            device_id,
        )
        .with_locks(&self.locks)
    }

    /// Adds an enabled subscription and returns its id
    pub fn add_subscription(
        &self,
        remarks: &str,
        url: &str,
        filter: Option<&str>,
    ) -> Result<String> {
        if remarks.trim().is_empty() {
            bail!("Subscription remarks must not be empty");
        }
        let ascii = to_ascii_url(url.trim())?;
        if !is_valid_url(&ascii) {
            bail!("Subscription URL must be an absolute http(s) URL: {}", url);
        }
        if let RemarksFilter::Invalid(pattern) = RemarksFilter::compile(filter) {
            bail!("Subscription filter is not a valid regex: {}", pattern);
        }

        let mut sub = SubscriptionItem::new(remarks.trim(), url.trim());
        sub.filter = filter.filter(|f| !f.is_empty()).map(str::to_string);

        let id = self
            .store
            .put_subscription(None, &sub)
            .context("Failed to store subscription")?;
        info!("Added subscription '{}' as {}", sub.remarks, id);
        Ok(id)
    }

    /// Synchronizes one subscription, failing for unknown ids
    pub fn sync_subscription(&self, subscription_id: &str) -> Result<SyncOutcome> {
        if self.store.get_subscription(subscription_id)?.is_none() {
            return Err(ManagerError::UnknownSubscription(subscription_id.to_string()).into());
        }
        let device_id = self.device_id();
        self.synchronizer(&device_id).sync_one(subscription_id)
    }

    /// Synchronizes one subscription and returns the number of profiles imported
    pub fn sync_one_subscription(&self, subscription_id: &str) -> usize {
        let device_id = self.device_id();
        match self.synchronizer(&device_id).sync_one(subscription_id) {
            Ok(outcome) => outcome.imported(),
            Err(e) => {
                warn!("Failed to update subscription {}: {:#}", subscription_id, e);
                0
            }
        }
    }

    /// Synchronizes every stored subscription
    pub fn sync_all_subscriptions(&self) -> SyncSummary {
        let device_id = self.device_id();
        self.synchronizer(&device_id)
            .sync_all()
            .unwrap_or_else(|e| {
                warn!("Failed to synchronize subscriptions: {:#}", e);
                SyncSummary::default()
            })
    }

    pub fn list_subscriptions(&self) -> Result<Vec<(String, SubscriptionItem)>> {
        self.store.list_subscriptions()
    }

    // ------------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------------

    pub fn list_configs(&self) -> Result<Vec<(String, ProfileItem)>> {
        self.store.list_configs()
    }

    pub fn selected_config_id(&self) -> Result<Option<String>> {
        self.store.get_selected_config_id()
    }

    /// Marks a stored profile as selected
    pub fn select(&self, id: &str) -> Result<()> {
        if self.store.get_config(id)?.is_none() {
            return Err(ManagerError::UnknownConfig(id.to_string()).into());
        }
        self.store.set_selected_config_id(id)?;
        info!("Selected profile {}", id);
        Ok(())
    }

    /// Share link for a stored profile, empty when it is not shareable
    pub fn share_as_uri(&self, id: &str) -> Result<String> {
        share::share_as_uri(self.store.as_ref(), &self.registry, id)
    }

    /// Newline separated share links, skipping unshareable profiles
    pub fn share_all(&self, ids: &[String]) -> String {
        share::share_all(self.store.as_ref(), &self.registry, ids)
    }
}
