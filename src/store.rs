//! Persistent profile storage
//!
//! The [`Store`] trait is the only way the importer, synchronizer and share
//! code touch persisted state. Two implementations ship with the crate:
//! [`MemoryStore`] for tests and embedding, [`JsonFileStore`] for the CLI.

mod json_file;
mod locks;
mod memory;

pub use json_file::JsonFileStore;
pub use locks::SubscriptionLocks;
pub use memory::MemoryStore;

use anyhow::Result;
use uuid::Uuid;

use crate::model::{ProfileItem, SubscriptionItem};

/// Key/value store for profiles, subscriptions and the current selection
///
/// Single-record operations are atomic. Nothing spans records, so a
/// delete-then-insert replace can be observed half done by other readers.
pub trait Store: Send + Sync {
    fn get_config(&self, id: &str) -> Result<Option<ProfileItem>>;

    /// Persists a profile and returns its id
    ///
    /// `None` allocates a fresh id and places the profile first in display
    /// order. An existing id is overwritten in place.
    fn put_config(&self, id: Option<&str>, item: &ProfileItem) -> Result<String>;

    /// Removes every profile owned by `subscription_id`, returning how many
    /// were removed. An empty id matches nothing.
    fn delete_configs_for_subscription(&self, subscription_id: &str) -> Result<usize>;

    /// All profiles in display order (most recently added first)
    fn list_configs(&self) -> Result<Vec<(String, ProfileItem)>>;

    fn get_subscription(&self, id: &str) -> Result<Option<SubscriptionItem>>;

    fn put_subscription(&self, id: Option<&str>, item: &SubscriptionItem) -> Result<String>;

    /// All subscriptions in the order they were added
    fn list_subscriptions(&self) -> Result<Vec<(String, SubscriptionItem)>>;

    fn get_selected_config_id(&self) -> Result<Option<String>>;

    fn set_selected_config_id(&self, id: &str) -> Result<()>;

    /// Stable per-installation identifier, generated on first use
    fn device_id(&self) -> Result<String>;

    /// Runs `f` as one unit of persistence
    ///
    /// Stores that persist every write may defer saving until `f` returns.
    /// If that final save fails, every change made inside `f` is rolled back
    /// and the error is returned. The default simply runs `f`.
    fn batch(&self, f: &mut dyn FnMut()) -> Result<()> {
        f();
        Ok(())
    }
}

/// Fresh opaque identifier for a stored record
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_is_unique_and_compact() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
