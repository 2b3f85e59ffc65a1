use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Project-local configuration.
///
/// One recognized option: where the cache lives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Cache directory path, relative to the project root.
    pub cache: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: ".relic/cache".to_string(),
        }
    }
}

impl Config {
    /// Load the config from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {path:?} (is this a relic project?)"))?;
        toml::from_str(&raw).with_context(|| format!("parsing config {path:?}"))
    }

    /// Write the config as TOML.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let encoded = toml::to_string_pretty(self).context("serializing config")?;
        fs::write(path, encoded).with_context(|| format!("writing config {path:?}"))
    }
}
