//! Per-subscription write serialization

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;

/// Serializes delete-then-insert replaces of the same subscription
///
/// Replacing a subscription's profiles spans many store records. Two
/// concurrent replaces of one subscription would interleave their deletes
/// and inserts, so callers run them through [`SubscriptionLocks::run`].
#[derive(Debug, Default)]
pub struct SubscriptionLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SubscriptionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock of `subscription_id`
    pub fn run<T>(&self, subscription_id: &str, f: impl FnOnce() -> T) -> T {
        let lock = {
            // The guarded values are unit, a poisoned lock holds nothing stale
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(subscription_id.to_string()).or_default())
        };
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        trace!("Holding replace lock for subscription '{}'", subscription_id);
        f()
    }
}
