//! Streaming EVM event-log scanner core.
//!
//! Streams event logs from hypersync-style endpoints, classifies each
//! record by its keccak-256 signature identifier, and keeps running
//! per-signature counts with throughput. Network names resolve through a
//! registry backed by built-in defaults, a persisted cache, and live
//! chain-directory discovery.

pub mod client;
pub mod error;
pub mod networks;
pub mod presets;
pub mod registry;
pub mod scanner;
pub mod signatures;
pub mod stats;

pub use client::{Client, HttpSession, Session, SessionItem};
pub use error::Error;
pub use registry::NetworkRegistry;
pub use scanner::{ScanSnapshot, ScanState, Scanner};
pub use signatures::SignatureIndex;
pub use stats::{Sample, ScanStats};
