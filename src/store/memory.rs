//! In-memory store

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::model::{ProfileItem, SubscriptionItem};

use super::{Store, new_id};

// ============================================================================
// Store Data
// ============================================================================

/// Everything a store holds; also the on-disk layout of [`super::JsonFileStore`]
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub(super) struct StoreData {
    /// Profile ids in display order
    #[serde(default)]
    pub server_list: Vec<String>,

    #[serde(default)]
    pub servers: HashMap<String, ProfileItem>,

    /// Subscription ids in insertion order
    #[serde(default)]
    pub subscription_list: Vec<String>,

    #[serde(default)]
    pub subscriptions: HashMap<String, SubscriptionItem>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

impl StoreData {
    pub fn put_config(&mut self, id: Option<&str>, item: &ProfileItem) -> String {
        let id = match id {
            Some(id) if self.servers.contains_key(id) => id.to_string(),
            Some(id) => {
                self.server_list.insert(0, id.to_string());
                id.to_string()
            }
            None => {
                let id = new_id();
                self.server_list.insert(0, id.clone());
                id
            }
        };
        self.servers.insert(id.clone(), item.clone());
        id
    }

    pub fn delete_configs_for_subscription(&mut self, subscription_id: &str) -> usize {
        if subscription_id.is_empty() {
            return 0;
        }
        let before = self.servers.len();
        self.servers
            .retain(|_, item| item.subscription_id != subscription_id);
        let servers = &self.servers;
        self.server_list.retain(|id| servers.contains_key(id));
        before - self.servers.len()
    }

    pub fn list_configs(&self) -> Vec<(String, ProfileItem)> {
        self.server_list
            .iter()
            .filter_map(|id| self.servers.get(id).map(|item| (id.clone(), item.clone())))
            .collect()
    }

    pub fn put_subscription(&mut self, id: Option<&str>, item: &SubscriptionItem) -> String {
        let id = match id {
            Some(id) => id.to_string(),
            None => new_id(),
        };
        if !self.subscriptions.contains_key(&id) {
            self.subscription_list.push(id.clone());
        }
        self.subscriptions.insert(id.clone(), item.clone());
        id
    }

    pub fn list_subscriptions(&self) -> Vec<(String, SubscriptionItem)> {
        self.subscription_list
            .iter()
            .filter_map(|id| {
                self.subscriptions
                    .get(id)
                    .map(|item| (id.clone(), item.clone()))
            })
            .collect()
    }

    pub fn device_id(&mut self) -> String {
        self.device_id.get_or_insert_with(new_id).clone()
    }
}

pub(super) fn lock(data: &Mutex<StoreData>) -> Result<MutexGuard<'_, StoreData>> {
    data.lock().map_err(|_| anyhow!("Store lock poisoned"))
}

// ============================================================================
// Memory Store
// ============================================================================

/// Store that keeps everything in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get_config(&self, id: &str) -> Result<Option<ProfileItem>> {
        Ok(lock(&self.data)?.servers.get(id).cloned())
    }

    fn put_config(&self, id: Option<&str>, item: &ProfileItem) -> Result<String> {
        Ok(lock(&self.data)?.put_config(id, item))
    }

    fn delete_configs_for_subscription(&self, subscription_id: &str) -> Result<usize> {
        Ok(lock(&self.data)?.delete_configs_for_subscription(subscription_id))
    }

    fn list_configs(&self) -> Result<Vec<(String, ProfileItem)>> {
        Ok(lock(&self.data)?.list_configs())
    }

    fn get_subscription(&self, id: &str) -> Result<Option<SubscriptionItem>> {
        Ok(lock(&self.data)?.subscriptions.get(id).cloned())
    }

    fn put_subscription(&self, id: Option<&str>, item: &SubscriptionItem) -> Result<String> {
        Ok(lock(&self.data)?.put_subscription(id, item))
    }

    fn list_subscriptions(&self) -> Result<Vec<(String, SubscriptionItem)>> {
        Ok(lock(&self.data)?.list_subscriptions())
    }

    fn get_selected_config_id(&self) -> Result<Option<String>> {
        Ok(lock(&self.data)?.selected.clone())
    }

    fn set_selected_config_id(&self, id: &str) -> Result<()> {
        lock(&self.data)?.selected = Some(id.to_string());
        Ok(())
    }

    fn device_id(&self) -> Result<String> {
        Ok(lock(&self.data)?.device_id())
    }
}
