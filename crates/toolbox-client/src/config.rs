//! File and environment configuration for building a client.
//!
//! ```toml
//! url = "http://127.0.0.1:5000/mcp"
//! api_key = "..."
//! timeout_secs = 30
//! ```
//!
//! Environment variables override file values:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `TOOLBOX_URL` | `url` |
//! | `TOOLBOX_API_KEY` | `api_key` |
//! | `TOOLBOX_TIMEOUT_SECS` | `timeout_secs` |

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::ClientBuilder;
use crate::error::{Result, ToolboxError};

pub const URL_ENV: &str = "TOOLBOX_URL";
pub const API_KEY_ENV: &str = "TOOLBOX_API_KEY";
pub const TIMEOUT_ENV: &str = "TOOLBOX_TIMEOUT_SECS";

/// Client settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolboxConfig {
    /// Server base URL.
    pub url: Option<String>,
    /// Static API key.
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Custom user agent.
    pub user_agent: Option<String>,
}

impl ToolboxConfig {
    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ToolboxError::ReadConfig {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Settings from the environment alone.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override fields with `TOOLBOX_*` environment variables that are set.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Override fields from `lookup`, which maps variable names to values.
    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(url) = get(URL_ENV) {
            self.url = Some(url);
        }
        if let Some(key) = get(API_KEY_ENV) {
            self.api_key = Some(key);
        }
        if let Some(secs) = get(TIMEOUT_ENV) {
            let secs = secs.trim().parse().map_err(|_| {
                ToolboxError::config(format!(
                    "{TIMEOUT_ENV} must be a whole number of seconds, got '{secs}'"
                ))
            })?;
            self.timeout_secs = Some(secs);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// A client builder carrying these settings.
    pub fn into_builder(self) -> ClientBuilder {
        let mut builder = ClientBuilder::default();
        if let Some(timeout) = self.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(url) = self.url {
            builder = builder.base_url(url);
        }
        if let Some(key) = self.api_key {
            builder = builder.api_key(key);
        }
        if let Some(ua) = self.user_agent {
            builder = builder.user_agent(ua);
        }
        builder
    }
}
