//! Rendering of scan progress and summaries.
//!
//! Progress goes through `tracing` so it interleaves cleanly with the rest
//! of the logs; the final tables go to stdout because they are the
//! command's actual output.

use evtop_core::{
    presets, registry::NetworkRegistry, scanner::ScanSnapshot, stats::Sample,
};

use crate::config::Config;

/// Batches between progress lines.
const PROGRESS_INTERVAL: u64 = 25;

/// Emits progress while a scan runs.
#[derive(Debug, Default)]
pub struct Reporter {
    batches: u64,
    last_sample: Option<Sample>,
}

impl Reporter {
    /// Fresh reporter with no batches seen.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Note one completed batch: logs a progress line every
    /// [`PROGRESS_INTERVAL`] batches and every newly decoded sample.
    pub fn tick(&mut self, snapshot: &ScanSnapshot) {
        if let Some(sample) = &snapshot.last_sample
            && self.last_sample.as_ref() != Some(sample)
        {
            tracing::info!(event = %sample.name, topic0 = %sample.topic0, "sample");
            self.last_sample = Some(sample.clone());
        }
        self.batches += 1;
        if self.batches.is_multiple_of(PROGRESS_INTERVAL) {
            tracing::info!(
                progress = format!("{:.1}%", snapshot.progress * 100.0),
                block = snapshot.cursor,
                height = snapshot.height,
                events = snapshot.total,
                rate = format!("{:.0}/s", snapshot.events_per_sec),
                "scanning"
            );
        }
    }
}

/// Print the final per-signature count table.
#[allow(clippy::print_stdout)]
pub fn print_summary(snapshot: &ScanSnapshot) {
    println!();
    println!("{:<32} {:>14}", "Event", "Count");
    println!("{}", "-".repeat(47));
    for (name, count) in &snapshot.counts {
        println!("{name:<32} {count:>14}");
    }
    println!("{}", "-".repeat(47));
    println!("{:<32} {:>14}", "Total", snapshot.total);
    println!();
    println!(
        "Scanned to block {} of {} in {:.1}s ({:.0} events/s)",
        snapshot.cursor, snapshot.height, snapshot.elapsed_secs, snapshot.events_per_sec
    );
}

/// Print the registry's network table.
#[allow(clippy::print_stdout)]
pub fn print_networks(registry: &NetworkRegistry) {
    println!("{:<20} Endpoint", "Network");
    println!("{}", "-".repeat(64));
    for (name, url) in registry.snapshot() {
        println!("{name:<20} {url}");
    }
    println!();
    println!(
        "{} networks ({})",
        registry.snapshot().len(),
        registry.source()
    );
}

/// Print built-in and config-defined presets.
#[allow(clippy::print_stdout)]
pub fn print_presets(config: &Config) {
    println!("{:<14} {:<8} Description", "Preset", "Events");
    println!("{}", "-".repeat(70));
    for preset in presets::ALL {
        let shadowed = config.preset(preset.name).is_some();
        println!(
            "{:<14} {:<8} {}{}",
            preset.name,
            preset.signatures.len(),
            preset.description,
            if shadowed { " (shadowed by config)" } else { "" }
        );
    }
    for (name, custom) in &config.presets {
        if presets::by_name(name).is_none() {
            println!(
                "{:<14} {:<8} defined in config",
                name,
                custom.signatures.len()
            );
        }
    }
}
