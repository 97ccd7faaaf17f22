//! Built-in network endpoints and chain-directory constants.
//!
//! The defaults keep the scanner usable with no directory access at all;
//! discovery (see [`crate::registry`]) widens the set to every chain the
//! directory currently serves.

/// Chain directory queried during live discovery.
pub const DIRECTORY_URL: &str = "https://chains.hyperquery.xyz/active_chains";

/// Ecosystem tag of the directory records this scanner understands.
pub const ECOSYSTEM: &str = "evm";

/// Built-in name -> endpoint defaults, always available as a fallback.
pub const DEFAULTS: &[(&str, &str)] = &[
    ("arbitrum", "https://arbitrum.hypersync.xyz"),
    ("avalanche", "https://avalanche.hypersync.xyz"),
    ("base", "https://base.hypersync.xyz"),
    ("bsc", "https://bsc.hypersync.xyz"),
    ("eth", "https://eth.hypersync.xyz"),
    ("gnosis", "https://gnosis.hypersync.xyz"),
    ("optimism", "https://optimism.hypersync.xyz"),
    ("polygon", "https://polygon.hypersync.xyz"),
    ("scroll", "https://scroll.hypersync.xyz"),
];

/// Endpoint URL for a directory network name. The template is fixed; the
/// directory only hands out names.
#[must_use]
pub fn endpoint_url(name: &str) -> String {
    format!("https://{name}.hypersync.xyz")
}

/// Endpoint from the built-in default table, if `name` is in it.
#[must_use]
pub fn default_endpoint(name: &str) -> Option<&'static str> {
    DEFAULTS.iter().find(|(n, _)| *n == name).map(|(_, url)| *url)
}
