//! Canonical data model
//!
//! Profiles (one decoded proxy descriptor each), subscriptions and the
//! protocol tag that ties a profile to its share-link scheme.

pub mod config_type;
pub mod profile;
pub mod subscription;
pub mod util;

pub use config_type::{ConfigType, HY2_SCHEME};
pub use profile::{
    CustomSettings, Hysteria2Settings, ProfileItem, ProtocolSettings, ShadowsocksSettings,
    SocksSettings, StreamSettings, TrojanSettings, VLessSettings, VMessSettings, WireGuardSettings,
};
pub use subscription::SubscriptionItem;
