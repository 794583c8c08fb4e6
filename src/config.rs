//! Config loading.
//!
//! Every field has a default so an empty (or absent) config file is valid.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{EntityId, ListKey};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: Box<toml::de::Error>,
    },
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub stream: StreamConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// How long a fetched list stays fresh before a read triggers a
    /// background revalidation.
    pub stale_window_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            stale_window_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Timeline list the connection's `update` events land in.
    pub timeline: ListKey,
    /// The session's own account, for ignoring echoes of our own writes.
    pub current_user: Option<EntityId>,
    /// Delay before a streamed follow-relationship patch is applied.
    pub relationship_delay_ms: u64,
    /// Most notifications held back awaiting a dequeue trigger.
    pub notification_queue_cap: usize,
    /// Page size used when re-chunking re-sorted query entries.
    pub page_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            timeline: ListKey::parse("home").expect("default timeline key is valid"),
            current_user: None,
            relationship_delay_ms: 300,
            notification_queue_cap: 40,
            page_size: 20,
        }
    }
}

impl Config {
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: "<inline>".into(),
            source: Box::new(e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// `load`, falling back to defaults when the file is absent or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("config load failed, using defaults: {e}");
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.stream.page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "stream.page_size",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}
