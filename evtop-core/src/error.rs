//! Error types for the scanner core.
//!
//! Only failures that cross an API boundary get a variant. The recoverable
//! anomalies from the streaming protocol (a batch without its cursor, a
//! sample that fails to decode) are handled and logged at their call sites
//! and never surface here.

use thiserror::Error;

/// How many known names an error message lists before truncating.
const LISTED_NAMES: usize = 12;

/// Errors surfaced by the scanner core.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested network is in neither the registry snapshot nor the
    /// built-in defaults. Recoverable: pick one of the listed names.
    #[error("unknown network {name:?} (known: {})", known_list(.known))]
    UnknownNetwork {
        /// The rejected name.
        name: String,
        /// Names that would have resolved.
        known: Vec<String>,
    },

    /// The requested signature-set name is not registered. Recoverable:
    /// pick one of the listed names.
    #[error("unknown preset {name:?} (available: {})", known_list(.known))]
    UnknownPreset {
        /// The rejected name.
        name: String,
        /// Registered preset names.
        known: Vec<String>,
    },

    /// The chain directory could not be fetched or parsed. The registry
    /// recovers by falling back to its cache or the built-in defaults;
    /// callers only ever see this as a logged warning.
    #[error("chain directory discovery failed")]
    Discovery(#[source] reqwest::Error),

    /// The streaming session cannot continue. Fatal to the current scan;
    /// the caller may start a new scan from scratch.
    #[error("streaming session failed")]
    Stream(#[from] reqwest::Error),
}

/// Comma-separated name list, truncated past [`LISTED_NAMES`] entries.
fn known_list(names: &[String]) -> String {
    let listed = names
        .iter()
        .take(LISTED_NAMES)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if names.len() > LISTED_NAMES {
        format!("{listed}, and {} more", names.len() - LISTED_NAMES)
    } else {
        listed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_network_lists_names() {
        let err = Error::UnknownNetwork {
            name: "nonexistent-network".to_owned(),
            known: vec!["eth".to_owned(), "base".to_owned()],
        };
        let msg = err.to_string();
        assert!(msg.contains("nonexistent-network"), "message: {msg}");
        assert!(msg.contains("eth, base"), "message: {msg}");
    }

    #[test]
    fn long_name_lists_truncate() {
        let known: Vec<String> = (0..30).map(|i| format!("net{i}")).collect();
        let err = Error::UnknownPreset {
            name: "x".to_owned(),
            known,
        };
        let msg = err.to_string();
        assert!(msg.contains("and 18 more"), "message: {msg}");
        assert!(!msg.contains("net20"), "message: {msg}");
    }
}
