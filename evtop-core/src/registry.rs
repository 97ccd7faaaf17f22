//! Network-name resolution with cached chain discovery.
//!
//! A registry holds one name -> endpoint snapshot at a time, seeded from
//! the built-in defaults. [`NetworkRegistry::refresh`] prefers, in order:
//! the in-memory snapshot (once populated for this process), a persisted
//! cache holding strictly more entries than the defaults, and finally a
//! live fetch of the chain directory. Discovery failure degrades to the
//! cache or the defaults with a warning; it never takes the registry down.
//!
//! [`NetworkRegistry::resolve`] additionally falls back to the built-in
//! default table, so the stock network names keep working no matter what
//! the directory served last.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::client::REQUEST_TIMEOUT;
use crate::error::Error;
use crate::networks;

/// Where the current snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Compile-time default table.
    Defaults,
    /// Cache file persisted by an earlier discovery.
    Cache,
    /// Live directory discovery in this process.
    Discovered,
}

impl fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Defaults => "built-in defaults",
            Self::Cache => "cached discovery",
            Self::Discovered => "live discovery",
        };
        write!(f, "{label}")
    }
}

/// One record of the chain directory response. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct DirectoryRecord {
    name: String,
    #[serde(default)]
    ecosystem: Option<String>,
}

/// Name -> endpoint registry backed by defaults, a JSON cache file, and
/// live directory discovery.
#[derive(Debug)]
pub struct NetworkRegistry {
    networks: BTreeMap<String, String>,
    source: SnapshotSource,
    /// Set after the first `refresh` settles a snapshot for this process.
    populated: bool,
    cache_path: PathBuf,
    directory_url: String,
}

impl NetworkRegistry {
    /// Registry persisting its cache at `cache_path`, seeded with the
    /// built-in defaults.
    #[must_use]
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            networks: defaults_map(),
            source: SnapshotSource::Defaults,
            populated: false,
            cache_path: cache_path.into(),
            directory_url: networks::DIRECTORY_URL.to_owned(),
        }
    }

    /// Override the chain-directory URL. Used for self-hosted directories
    /// and by tests.
    #[must_use]
    pub fn with_directory_url(mut self, url: impl Into<String>) -> Self {
        self.directory_url = url.into();
        self
    }

    /// Current snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> &BTreeMap<String, String> {
        &self.networks
    }

    /// Where the current snapshot came from.
    #[must_use]
    pub const fn source(&self) -> SnapshotSource {
        self.source
    }

    /// Resolve a network name to its endpoint URL.
    ///
    /// Built-in default names resolve no matter what discovery produced;
    /// anything else must be in the current snapshot. Lookups are
    /// case-sensitive, matching the directory's names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownNetwork`] with the accepted names when the
    /// name matches neither the snapshot nor the defaults.
    pub fn resolve(&self, name: &str) -> Result<&str, Error> {
        self.networks
            .get(name)
            .map(String::as_str)
            .or_else(|| networks::default_endpoint(name))
            .ok_or_else(|| Error::UnknownNetwork {
                name: name.to_owned(),
                known: self.known_names(),
            })
    }

    /// Names that [`Self::resolve`] accepts, sorted.
    #[must_use]
    pub fn known_names(&self) -> Vec<String> {
        let mut names: BTreeSet<&str> = self.networks.keys().map(String::as_str).collect();
        names.extend(networks::DEFAULTS.iter().map(|(n, _)| *n));
        names.into_iter().map(str::to_owned).collect()
    }

    /// Settle a snapshot, discovering from the directory when needed.
    ///
    /// Without `force`, an already-populated registry returns its snapshot
    /// untouched, and a cache with strictly more entries than the default
    /// table is adopted without any network traffic. `force` goes straight
    /// to discovery. A non-empty discovery result replaces the snapshot
    /// wholesale and overwrites the cache; failure or an empty result
    /// falls back to the cache (or the defaults) with a warning.
    pub async fn refresh(&mut self, force: bool) -> &BTreeMap<String, String> {
        if !force {
            if self.populated {
                return &self.networks;
            }
            let cached = self.load_cache();
            if cached.len() > networks::DEFAULTS.len() {
                tracing::debug!(networks = cached.len(), "using cached chain list");
                self.adopt(cached, SnapshotSource::Cache);
                return &self.networks;
            }
        }
        match self.discover().await {
            Ok(fresh) if !fresh.is_empty() => {
                tracing::info!(networks = fresh.len(), "chain discovery succeeded");
                self.save_cache(&fresh);
                self.adopt(fresh, SnapshotSource::Discovered);
            }
            Ok(_) => {
                tracing::warn!("chain directory served no usable networks, keeping previous set");
                self.fall_back();
            }
            Err(error) => {
                tracing::warn!(error = %error, "chain discovery failed, keeping previous set");
                self.fall_back();
            }
        }
        &self.networks
    }

    /// Fetch the chain directory and keep the records for our ecosystem.
    async fn discover(&self) -> Result<BTreeMap<String, String>, Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(Error::Discovery)?;
        let records: Vec<DirectoryRecord> = http
            .get(&self.directory_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(Error::Discovery)?
            .json()
            .await
            .map_err(Error::Discovery)?;
        Ok(records
            .into_iter()
            .filter(|record| record.ecosystem.as_deref() == Some(networks::ECOSYSTEM))
            .map(|record| {
                let url = networks::endpoint_url(&record.name);
                (record.name, url)
            })
            .collect())
    }

    fn adopt(&mut self, networks: BTreeMap<String, String>, source: SnapshotSource) {
        self.networks = networks;
        self.source = source;
        self.populated = true;
    }

    /// Discovery came up empty. Keep what we have, or load the best
    /// offline source if nothing was settled yet.
    fn fall_back(&mut self) {
        if self.populated {
            return;
        }
        let cached = self.load_cache();
        if cached.is_empty() {
            self.adopt(defaults_map(), SnapshotSource::Defaults);
        } else {
            self.adopt(cached, SnapshotSource::Cache);
        }
    }

    /// Read the cache file. Missing, unreadable, or corrupt caches are all
    /// treated as empty.
    fn load_cache(&self) -> BTreeMap<String, String> {
        if !self.cache_path.exists() {
            return BTreeMap::new();
        }
        let data = match std::fs::read_to_string(&self.cache_path) {
            Ok(data) => data,
            Err(error) => {
                tracing::warn!(
                    path = %self.cache_path.display(),
                    error = %error,
                    "unreadable network cache, ignoring"
                );
                return BTreeMap::new();
            }
        };
        match serde_json::from_str(&data) {
            Ok(map) => map,
            Err(error) => {
                tracing::warn!(
                    path = %self.cache_path.display(),
                    error = %error,
                    "corrupt network cache, ignoring"
                );
                BTreeMap::new()
            }
        }
    }

    /// Persist a discovered set. Failure is logged, never fatal.
    fn save_cache(&self, map: &BTreeMap<String, String>) {
        if let Err(error) = write_cache(&self.cache_path, map) {
            tracing::warn!(
                path = %self.cache_path.display(),
                error = %error,
                "failed to persist network cache"
            );
        }
    }
}

/// Write the cache atomically: temp file in the same directory, then rename.
fn write_cache(path: &Path, map: &BTreeMap<String, String>) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(map).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)
}

fn defaults_map() -> BTreeMap<String, String> {
    networks::DEFAULTS
        .iter()
        .map(|(name, url)| ((*name).to_owned(), (*url).to_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A local port with nothing listening on it.
    fn dead_directory_url() -> String {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("addr").port()
        };
        format!("http://127.0.0.1:{port}/active_chains")
    }

    fn cache_with(names: &[&str]) -> BTreeMap<String, String> {
        names
            .iter()
            .map(|name| ((*name).to_owned(), networks::endpoint_url(name)))
            .collect()
    }

    #[test]
    fn defaults_resolve_without_any_refresh() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = NetworkRegistry::new(dir.path().join("networks.json"));
        assert_eq!(
            registry.resolve("eth").expect("default name"),
            "https://eth.hypersync.xyz"
        );
        assert_eq!(registry.source(), SnapshotSource::Defaults);
    }

    #[test]
    fn unknown_name_reports_known_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = NetworkRegistry::new(dir.path().join("networks.json"));
        let err = registry.resolve("made-up").expect_err("unknown name");
        assert!(matches!(err, Error::UnknownNetwork { .. }));
        let msg = err.to_string();
        assert!(msg.contains("made-up"), "message: {msg}");
        assert!(msg.contains("eth"), "message: {msg}");
    }

    #[test]
    fn cache_write_and_read_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("networks.json");
        let map = cache_with(&["eth", "megaeth"]);
        write_cache(&path, &map).expect("write");

        let registry = NetworkRegistry::new(&path);
        assert_eq!(registry.load_cache(), map);
        assert!(
            !path.with_extension("json.tmp").exists(),
            "temp file must be renamed away"
        );
    }

    #[test]
    fn corrupt_cache_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("networks.json");
        std::fs::write(&path, "{ not json").expect("write corrupt");

        let registry = NetworkRegistry::new(&path);
        assert!(registry.load_cache().is_empty());
    }

    #[tokio::test]
    async fn larger_cache_is_adopted_without_discovery() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("networks.json");
        let mut names: Vec<&str> = networks::DEFAULTS.iter().map(|(n, _)| *n).collect();
        names.push("extra-chain");
        write_cache(&path, &cache_with(&names)).expect("write cache");

        // Directory is unreachable; the cache alone must satisfy this.
        let mut registry =
            NetworkRegistry::new(&path).with_directory_url(dead_directory_url());
        registry.refresh(false).await;
        assert_eq!(registry.source(), SnapshotSource::Cache);
        assert!(registry.resolve("extra-chain").is_ok());
    }

    #[tokio::test]
    async fn failed_discovery_degrades_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut registry = NetworkRegistry::new(dir.path().join("networks.json"))
            .with_directory_url(dead_directory_url());

        registry.refresh(false).await;
        assert_eq!(registry.source(), SnapshotSource::Defaults);
        assert!(registry.resolve("eth").is_ok());
    }

    #[tokio::test]
    async fn populated_snapshot_is_preferred_over_a_newer_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("networks.json");
        let mut registry =
            NetworkRegistry::new(&path).with_directory_url(dead_directory_url());

        // First refresh settles on the defaults (no cache, dead directory).
        registry.refresh(false).await;
        assert_eq!(registry.source(), SnapshotSource::Defaults);

        // A cache written afterwards must not displace the settled snapshot.
        let mut names: Vec<&str> = networks::DEFAULTS.iter().map(|(n, _)| *n).collect();
        names.push("late-chain");
        write_cache(&path, &cache_with(&names)).expect("write cache");

        registry.refresh(false).await;
        assert_eq!(registry.source(), SnapshotSource::Defaults);
        assert!(matches!(
            registry.resolve("late-chain"),
            Err(Error::UnknownNetwork { .. })
        ));
    }

    #[tokio::test]
    async fn forced_refresh_failure_falls_back_to_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("networks.json");
        write_cache(&path, &cache_with(&["onlychain"])).expect("write cache");

        let mut registry =
            NetworkRegistry::new(&path).with_directory_url(dead_directory_url());
        registry.refresh(true).await;

        assert_eq!(registry.source(), SnapshotSource::Cache);
        assert!(registry.resolve("onlychain").is_ok());
        // Defaults still resolve through the built-in table.
        assert!(registry.resolve("eth").is_ok());
    }
}
