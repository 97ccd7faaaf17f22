//! Live per-signature EVM event-log counter.
//!
//! Streams logs from hypersync-style endpoints via `evtop-core`, keeps
//! running counts per configured event signature, and renders progress and
//! summary tables.

pub mod config;
pub mod report;
