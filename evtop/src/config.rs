//! Runtime configuration loaded from a TOML file.
//!
//! Everything is optional and the file itself may be absent, so the binary
//! works out of the box. Config-defined presets shadow built-ins with the
//! same name.
//!
//! ```toml
//! default_network = "base"
//! sample_interval = 25000
//!
//! [presets.stables]
//! signatures = [
//!     "Transfer(address,address,uint256)",
//!     "Mint(address,uint256)",
//! ]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Network scanned when neither the CLI nor the config names one.
pub const DEFAULT_NETWORK: &str = "eth";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Network scanned when `--network` is not given.
    #[serde(default)]
    pub default_network: Option<String>,

    /// Records between decoded samples.
    #[serde(default)]
    pub sample_interval: Option<u64>,

    /// Custom signature sets, keyed by preset name.
    #[serde(default)]
    pub presets: BTreeMap<String, PresetConfig>,
}

/// One config-defined signature set.
#[derive(Debug, Clone, Deserialize)]
pub struct PresetConfig {
    /// Event signatures in display order.
    pub signatures: Vec<String>,
}

impl Config {
    /// Load configuration from `path`, or the defaults when the file does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Signatures of a config-defined preset.
    #[must_use]
    pub fn preset(&self, name: &str) -> Option<&[String]> {
        self.presets.get(name).map(|p| p.signatures.as_slice())
    }

    /// Names of config-defined presets, sorted.
    #[must_use]
    pub fn preset_names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }

    /// Effective sampling interval.
    #[must_use]
    pub fn sample_interval(&self) -> u64 {
        self.sample_interval
            .unwrap_or(evtop_core::stats::DEFAULT_SAMPLE_INTERVAL)
    }

    /// Effective network name, given the CLI flag if any.
    #[must_use]
    pub fn network<'a>(&'a self, flag: Option<&'a str>) -> &'a str {
        flag.or(self.default_network.as_deref())
            .unwrap_or(DEFAULT_NETWORK)
    }
}
