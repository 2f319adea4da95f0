//! Runtime settings
//!
//! Settings are read from an optional TOML file; every field has a default
//! so an empty file (or no file at all) is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sync::{FetchStrategy, default_strategies};

/// File name of the JSON store inside `data_dir`
pub const STORE_FILE_NAME: &str = "store.json";

// ============================================================================
// Settings Types
// ============================================================================

/// Settings parsed from TOML
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Settings {
    /// Directory holding the store, default "~/.proxylink"
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Local HTTP proxy port used for the first fetch attempt, default 10809
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Timeout of the proxied fetch attempt in seconds, default 30
    #[serde(default = "default_proxied_timeout_secs")]
    pub proxied_timeout_secs: u64,

    /// Device id sent to subscription servers; generated and persisted if unset
    #[serde(default)]
    pub device_id: Option<String>,

    /// User-Agent for subscription requests, default "proxylink/<version>"
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            http_port: default_http_port(),
            proxied_timeout_secs: default_proxied_timeout_secs(),
            device_id: None,
            user_agent: None,
        }
    }
}

// ============================================================================
// Settings Implementation
// ============================================================================

impl Settings {
    /// Parse settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(content).context("Failed to parse settings TOML")?;

        if settings.http_port == 0 {
            bail!("http_port must be greater than 0");
        }
        if settings.proxied_timeout_secs == 0 {
            bail!("proxied_timeout_secs must be greater than 0");
        }

        Ok(settings)
    }

    /// Load settings from file path
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        Self::from_toml(&content)
    }

    /// Load settings from an optional path, falling back to defaults
    pub async fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => {
                let expanded = expand_tilde(path);
                Self::from_file(Path::new(&expanded)).await
            }
            None => {
                debug!("No settings file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Data directory with `~` expanded
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(expand_tilde(&self.data_dir))
    }

    /// Location of the JSON store
    pub fn store_path(&self) -> PathBuf {
        self.data_dir().join(STORE_FILE_NAME)
    }

    /// Fetch strategies for subscription updates
    pub fn fetch_strategies(&self) -> Vec<FetchStrategy> {
        default_strategies(
            self.http_port,
            Duration::from_secs(self.proxied_timeout_secs),
        )
    }

    /// Configured device id, ignoring blank values
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

fn default_data_dir() -> String {
    "~/.proxylink".to_string()
}

fn default_http_port() -> u16 {
    10809
}

fn default_proxied_timeout_secs() -> u64 {
    30
}

// ============================================================================
// Path Utilities
// ============================================================================

/// Expand ~ to home directory in path
pub fn expand_tilde(path: &str) -> String {
    if (path.starts_with("~/") || path == "~")
        && let Some(home) = dirs_home()
    {
        return path.replacen("~", &home, 1);
    }
    path.to_string()
}

/// Get home directory path
pub fn dirs_home() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok()
    }
}
