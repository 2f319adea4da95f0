//! Selection continuity across subscription reimports
//!
//! Before a subscription's profiles are replaced, the selected profile is
//! captured if it belongs to that subscription. Every freshly imported
//! profile is then checked against the capture with [`should_transfer`].

use tracing::{debug, warn};

use crate::model::ProfileItem;
use crate::store::Store;

/// Endpoint of the selected profile, taken before a replace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSnapshot {
    pub subscription_id: String,
    pub server: String,
    pub server_port: u16,
}

impl SelectionSnapshot {
    pub fn of(profile: &ProfileItem) -> Self {
        Self {
            subscription_id: profile.subscription_id.clone(),
            server: profile.server.clone(),
            server_port: profile.server_port,
        }
    }
}

/// Captures the selection if it belongs to `subscription_id`
///
/// Manual profiles (empty subscription id) never produce a snapshot. Store
/// errors are logged and treated as "nothing selected".
pub fn take_snapshot(store: &dyn Store, subscription_id: &str) -> Option<SelectionSnapshot> {
    if subscription_id.is_empty() {
        return None;
    }

    let selected = match store.get_selected_config_id() {
        Ok(Some(id)) => id,
        Ok(None) => return None,
        Err(e) => {
            warn!("Failed to read selected profile: {:#}", e);
            return None;
        }
    };

    let profile = match store.get_config(&selected) {
        Ok(Some(profile)) => profile,
        Ok(None) => return None,
        Err(e) => {
            warn!("Failed to load selected profile {}: {:#}", selected, e);
            return None;
        }
    };

    if profile.subscription_id != subscription_id {
        return None;
    }

    debug!(
        "Captured selection {} ({}) before replacing subscription {}",
        selected,
        profile.endpoint(),
        subscription_id
    );
    Some(SelectionSnapshot::of(&profile))
}

/// Whether the selection should move to a freshly imported profile
pub fn should_transfer(snapshot: Option<&SelectionSnapshot>, imported: &ProfileItem) -> bool {
    snapshot.is_some_and(|snap| {
        snap.subscription_id == imported.subscription_id
            && snap.server == imported.server
            && snap.server_port == imported.server_port
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProtocolSettings, SocksSettings};
    use crate::store::MemoryStore;

    fn profile(server: &str, port: u16, subscription_id: &str) -> ProfileItem {
        let mut item = ProfileItem::new(
            "p",
            server,
            port,
            ProtocolSettings::Socks(SocksSettings::default()),
        );
        item.subscription_id = subscription_id.to_string();
        item
    }

    #[test]
    fn test_should_transfer_same_endpoint() {
        let snap = SelectionSnapshot::of(&profile("h", 443, "s"));
        assert!(should_transfer(Some(&snap), &profile("h", 443, "s")));
        assert!(!should_transfer(Some(&snap), &profile("h", 8443, "s")));
        assert!(!should_transfer(Some(&snap), &profile("other", 443, "s")));
        assert!(!should_transfer(Some(&snap), &profile("h", 443, "t")));
        assert!(!should_transfer(None, &profile("h", 443, "s")));
    }

    #[test]
    fn test_take_snapshot_only_for_owning_subscription() {
        let store = MemoryStore::new();
        let id = store.put_config(None, &profile("h", 443, "s")).unwrap();
        store.set_selected_config_id(&id).unwrap();

        let snap = take_snapshot(&store, "s").unwrap();
        assert_eq!(snap.server, "h");
        assert_eq!(snap.server_port, 443);

        assert!(take_snapshot(&store, "other").is_none());
        assert!(take_snapshot(&store, "").is_none());
    }

    #[test]
    fn test_take_snapshot_dangling_selection() {
        let store = MemoryStore::new();
        store.set_selected_config_id("gone").unwrap();
        assert!(take_snapshot(&store, "s").is_none());
    }
}
