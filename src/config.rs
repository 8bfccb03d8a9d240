//! Configuration loading and saving
//!
//! Stored as JSON in ~/.config/cidrtree/config.json by default.

use crate::trie::{InsertPolicy, PrefixTrie};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings shared by every trie the CLI builds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// How insertions treat covered networks
    #[serde(default)]
    pub policy: InsertPolicy,

    /// Fullness at which `summarize` promotes a leaf
    #[serde(default = "default_threshold")]
    pub aggregate_threshold: f64,
}

fn default_threshold() -> f64 {
    1.0
}

impl Default for Config {
    fn default() -> Self {
        Config {
            policy: InsertPolicy::default(),
            aggregate_threshold: default_threshold(),
        }
    }
}

impl Config {
    /// Default config location (~/.config/cidrtree/config.json)
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not find config directory".into()))?;
        Ok(config_dir.join("cidrtree").join("config.json"))
    }

    /// Load from the default location, falling back to defaults if absent
    pub fn load() -> Result<Self> {
        let path = match Self::default_path() {
            Ok(path) => path,
            Err(_) => return Ok(Config::default()),
        };
        if !path.exists() {
            return Ok(Config::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Config = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        let threshold = config.aggregate_threshold;
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(Error::InvalidThreshold(threshold));
        }
        Ok(config)
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// An empty trie using the configured policy
    pub fn trie(&self) -> PrefixTrie {
        PrefixTrie::with_policy(self.policy)
    }
}
