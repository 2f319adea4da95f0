use serde::{Deserialize, Serialize};

use super::util::{default_true, is_zero_i64};

/// Remote endpoint serving a list of descriptors
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SubscriptionItem {
    /// Display name
    #[serde(default)]
    pub remarks: String,

    /// URL to fetch the subscription from
    #[serde(default)]
    pub url: String,

    /// Disabled subscriptions are skipped by synchronization
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Regular expression searched in each candidate's remarks.
    /// Profiles whose remarks do not match are not imported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Epoch milliseconds of the last successful update, 0 if never
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub last_updated: i64,
}

impl SubscriptionItem {
    pub fn new(remarks: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            remarks: remarks.into(),
            url: url.into(),
            enabled: true,
            filter: None,
            last_updated: 0,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Non-empty filter expression, if any
    pub fn active_filter(&self) -> Option<&str> {
        self.filter.as_deref().filter(|f| !f.is_empty())
    }

    /// Whether the subscription takes part in synchronization
    pub fn is_syncable(&self) -> bool {
        self.enabled && !self.remarks.trim().is_empty() && !self.url.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_enabled() {
        let sub = SubscriptionItem::new("provider", "https://example.com/sub");
        assert!(sub.enabled);
        assert!(sub.is_syncable());
        assert!(sub.active_filter().is_none());
    }

    #[test]
    fn test_blank_fields_not_syncable() {
        assert!(!SubscriptionItem::new(" ", "https://example.com/sub").is_syncable());
        assert!(!SubscriptionItem::new("provider", "").is_syncable());

        let mut disabled = SubscriptionItem::new("provider", "https://example.com/sub");
        disabled.enabled = false;
        assert!(!disabled.is_syncable());
    }

    #[test]
    fn test_empty_filter_is_inactive() {
        let sub = SubscriptionItem::new("p", "u").with_filter("");
        assert!(sub.active_filter().is_none());
        let sub = SubscriptionItem::new("p", "u").with_filter("^US");
        assert_eq!(sub.active_filter(), Some("^US"));
    }

    #[test]
    fn test_deserialize_defaults() {
        let sub: SubscriptionItem =
            serde_json::from_str(r#"{"remarks":"p","url":"https://x"}"#).unwrap();
        assert!(sub.enabled);
        assert_eq!(sub.last_updated, 0);
        assert!(sub.filter.is_none());
    }
}
