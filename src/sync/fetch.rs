//! Fetch strategies
//!
//! A subscription body is fetched by trying an ordered list of strategies.
//! Every failure is logged and treated as empty content, so the next
//! strategy gets its turn.

use std::time::Duration;

use anyhow::Result;
use tracing::{debug, warn};

/// Proxied attempts go through a local HTTP proxy on this address
pub const LOCAL_PROXY_HOST: &str = "127.0.0.1";

/// Network primitive used to download subscription bodies
pub trait Fetcher: Send + Sync {
    /// Downloads `url` as text
    ///
    /// `timeout` of `None` keeps the client's default. `proxy_port` routes
    /// the request through the local HTTP proxy; `None` connects directly.
    fn fetch(&self, url: &str, timeout: Option<Duration>, proxy_port: Option<u16>)
    -> Result<String>;
}

/// One way of fetching a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchStrategy {
    pub label: &'static str,
    pub timeout: Option<Duration>,
    pub proxy_port: Option<u16>,
}

impl FetchStrategy {
    /// Through the local proxy with a bounded timeout
    pub fn proxied(port: u16, timeout: Duration) -> Self {
        Self {
            label: "proxied",
            timeout: Some(timeout),
            proxy_port: Some(port),
        }
    }

    /// Direct connection with the client's default timeout
    pub fn direct() -> Self {
        Self {
            label: "direct",
            timeout: None,
            proxy_port: None,
        }
    }
}

/// Proxied first, then direct
pub fn default_strategies(http_port: u16, proxied_timeout: Duration) -> Vec<FetchStrategy> {
    vec![
        FetchStrategy::proxied(http_port, proxied_timeout),
        FetchStrategy::direct(),
    ]
}

/// Returns the first non-empty body, or an empty string when all fail
pub fn fetch_with_strategies(
    fetcher: &dyn Fetcher,
    url: &str,
    strategies: &[FetchStrategy],
) -> String {
    for strategy in strategies {
        debug!("Fetching {} ({})", url, strategy.label);
        match fetcher.fetch(url, strategy.timeout, strategy.proxy_port) {
            Ok(body) if !body.trim().is_empty() => return body,
            Ok(_) => debug!("Empty response from {} ({})", url, strategy.label),
            Err(e) => warn!("Fetch {} failed ({}): {:#}", url, strategy.label, e),
        }
    }
    String::new()
}
