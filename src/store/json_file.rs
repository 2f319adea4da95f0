//! JSON file backed store
//!
//! The whole store is one pretty-printed JSON document. It is rewritten after
//! every mutation, or once at the end of a [`Store::batch`]. A mutation only
//! becomes visible once the file has been written.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use anyhow::{Context, Result};
use tracing::{debug, trace, warn};

use crate::model::{ProfileItem, SubscriptionItem};

use super::Store;
use super::memory::{StoreData, lock};

/// Store persisted to a single JSON file
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<StoreData>,
    /// Held by a running batch and by every write outside it
    writer: Mutex<()>,
    /// Thread running the current batch, whose writes are not saved yet
    batch_owner: Mutex<Option<ThreadId>>,
}

impl JsonFileStore {
    /// Opens the store at `path`, starting empty when the file does not exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read store file: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse store file: {}", path.display()))?
        } else {
            debug!("Store file {} not found, starting empty", path.display());
            StoreData::default()
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
            writer: Mutex::new(()),
            batch_owner: Mutex::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, data: &StoreData) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(data).context("Failed to serialize store")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write store file: {}", self.path.display()))?;
        trace!("Saved store to {}", self.path.display());
        Ok(())
    }

    // Both locks guard plain markers, so a poisoned lock is still usable

    fn batch_owner(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.batch_owner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn in_own_batch(&self) -> bool {
        *self.batch_owner() == Some(thread::current().id())
    }

    fn writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies a mutation and persists the result
    ///
    /// The mutation runs on a copy that replaces the live data only after it
    /// was saved, so a failed write leaves the store unchanged. Inside a batch
    /// the live data is changed directly and saved when the batch ends.
    fn mutate<T>(&self, f: impl FnOnce(&mut StoreData) -> T) -> Result<T> {
        if self.in_own_batch() {
            return Ok(f(&mut *lock(&self.data)?));
        }

        let _writer = self.writer();
        let mut data = lock(&self.data)?;
        let mut next = data.clone();
        let result = f(&mut next);
        self.save(&next)?;
        *data = next;
        Ok(result)
    }
}

/// Marks the current thread as batch owner until dropped
struct BatchOwner<'a> {
    store: &'a JsonFileStore,
}

impl<'a> BatchOwner<'a> {
    fn claim(store: &'a JsonFileStore) -> Self {
        *store.batch_owner() = Some(thread::current().id());
        Self { store }
    }
}

impl Drop for BatchOwner<'_> {
    fn drop(&mut self) {
        *self.store.batch_owner() = None;
    }
}

impl Store for JsonFileStore {
    fn get_config(&self, id: &str) -> Result<Option<ProfileItem>> {
        Ok(lock(&self.data)?.servers.get(id).cloned())
    }

    fn put_config(&self, id: Option<&str>, item: &ProfileItem) -> Result<String> {
        self.mutate(|data| data.put_config(id, item))
    }

    fn delete_configs_for_subscription(&self, subscription_id: &str) -> Result<usize> {
        if subscription_id.is_empty() {
            return Ok(0);
        }
        self.mutate(|data| data.delete_configs_for_subscription(subscription_id))
    }

    fn list_configs(&self) -> Result<Vec<(String, ProfileItem)>> {
        Ok(lock(&self.data)?.list_configs())
    }

    fn get_subscription(&self, id: &str) -> Result<Option<SubscriptionItem>> {
        Ok(lock(&self.data)?.subscriptions.get(id).cloned())
    }

    fn put_subscription(&self, id: Option<&str>, item: &SubscriptionItem) -> Result<String> {
        self.mutate(|data| data.put_subscription(id, item))
    }

    fn list_subscriptions(&self) -> Result<Vec<(String, SubscriptionItem)>> {
        Ok(lock(&self.data)?.list_subscriptions())
    }

    fn get_selected_config_id(&self) -> Result<Option<String>> {
        Ok(lock(&self.data)?.selected.clone())
    }

    fn set_selected_config_id(&self, id: &str) -> Result<()> {
        self.mutate(|data| data.selected = Some(id.to_string()))
    }

    fn device_id(&self) -> Result<String> {
        {
            let data = lock(&self.data)?;
            if let Some(id) = &data.device_id {
                return Ok(id.clone());
            }
        }
        self.mutate(|data| data.device_id())
    }

    fn batch(&self, f: &mut dyn FnMut()) -> Result<()> {
        if self.in_own_batch() {
            f();
            return Ok(());
        }

        let _writer = self.writer();
        let backup = lock(&self.data)?.clone();
        {
            let _owner = BatchOwner::claim(self);
            f();
        }

        let mut data = lock(&self.data)?;
        if let Err(e) = self.save(&data) {
            warn!("Rolling back batch: {:#}", e);
            *data = backup;
            return Err(e);
        }
        Ok(())
    }
}
