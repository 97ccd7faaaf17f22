//! Running per-signature counters, throughput, and best-effort sampling.

use std::collections::HashMap;
use std::time::Instant;

use alloy::primitives::B256;

use crate::client::LogRecord;
use crate::signatures::SignatureIndex;

/// Counter name for records matching no configured signature.
pub const UNKNOWN: &str = "Unknown";

/// Default number of records between decoded samples.
pub const DEFAULT_SAMPLE_INTERVAL: u64 = 10_000;

/// Elapsed-time floor so rates stay finite right after start.
const MIN_ELAPSED_SECS: f64 = 1e-3;

/// Live counters for one scan.
///
/// Counters are keyed by display name, so two signatures sharing a name
/// (say, ERC-20 and ERC-721 `Transfer`) share one counter. All slots exist
/// from construction, with the `Unknown` slot last; the hot path only
/// increments.
#[derive(Debug)]
pub struct ScanStats {
    counts: Vec<(String, u64)>,
    slots: HashMap<B256, usize>,
    unknown_slot: usize,
    total: u64,
    started: Instant,
}

impl ScanStats {
    /// Zeroed counters for `index`'s display names plus `Unknown`.
    #[must_use]
    pub fn new(index: &SignatureIndex) -> Self {
        let mut counts: Vec<(String, u64)> = Vec::new();
        let mut slots = HashMap::new();
        for (topic, name) in index.topics().iter().zip(index.names()) {
            let slot = match counts.iter().position(|(n, _)| n == name) {
                Some(slot) => slot,
                None => {
                    counts.push((name.clone(), 0));
                    counts.len() - 1
                }
            };
            slots.insert(*topic, slot);
        }
        let unknown_slot = counts.len();
        counts.push((UNKNOWN.to_owned(), 0));
        Self {
            counts,
            slots,
            unknown_slot,
            total: 0,
            started: Instant::now(),
        }
    }

    /// Count one record: the total always, plus the matching name's slot
    /// or `Unknown` when the identifier is absent, malformed, or not in
    /// the configured set.
    pub fn record(&mut self, record: &LogRecord) {
        self.total += 1;
        let slot = record
            .topic0()
            .and_then(|topic| self.slots.get(&topic).copied())
            .unwrap_or(self.unknown_slot);
        if let Some((_, count)) = self.counts.get_mut(slot) {
            *count += 1;
        }
    }

    /// Count every record of a batch.
    pub fn absorb(&mut self, records: &[LogRecord]) {
        for record in records {
            self.record(record);
        }
    }

    /// Records counted so far, including unclassified ones.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Count of records that matched no configured signature.
    #[must_use]
    pub fn unknown(&self) -> u64 {
        self.counts.get(self.unknown_slot).map_or(0, |(_, n)| *n)
    }

    /// Counter for a display name, if the name has a slot.
    #[must_use]
    pub fn count_of(&self, name: &str) -> Option<u64> {
        self.counts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, count)| *count)
    }

    /// `(display name, count)` pairs in display order, `Unknown` last.
    #[must_use]
    pub fn counts(&self) -> &[(String, u64)] {
        &self.counts
    }

    /// Wall-clock seconds since construction.
    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Records per second over the whole scan, recomputed at each call.
    #[must_use]
    pub fn events_per_sec(&self) -> f64 {
        self.total as f64 / self.elapsed_secs().max(MIN_ELAPSED_SECS)
    }
}

/// One decoded record surfaced for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Display name the identifier resolved to, or [`UNKNOWN`].
    pub name: String,
    /// The identifier as received, raw.
    pub topic0: String,
}

/// Rate-limited record decoder, fed alongside the counters.
///
/// Sampling is strictly best-effort and kept apart from the counting path:
/// a record that fails to decode costs one warning and that sample, and
/// nothing else.
#[derive(Debug, Clone, Copy)]
pub struct Sampler {
    interval: u64,
    next_at: u64,
}

impl Sampler {
    /// Sampler decoding roughly one record per `interval` counted. An
    /// interval of zero is treated as one.
    #[must_use]
    pub const fn new(interval: u64) -> Self {
        let interval = if interval == 0 { 1 } else { interval };
        Self {
            interval,
            next_at: interval,
        }
    }

    /// Offer a batch. Decodes the first record if the running `total` has
    /// crossed the next sampling point.
    pub fn offer(
        &mut self,
        total: u64,
        records: &[LogRecord],
        index: &SignatureIndex,
    ) -> Option<Sample> {
        if total < self.next_at || records.is_empty() {
            return None;
        }
        self.next_at = total.saturating_add(self.interval);
        match decode(records.first()?, index) {
            Ok(sample) => Some(sample),
            Err(reason) => {
                tracing::warn!(reason, "sample decode failed, skipping this sample");
                None
            }
        }
    }
}

fn decode(record: &LogRecord, index: &SignatureIndex) -> Result<Sample, &'static str> {
    let raw = record
        .topics
        .first()
        .and_then(|topic| topic.as_deref())
        .ok_or("record carries no topic0")?;
    let topic: B256 = raw.parse().map_err(|_| "topic0 is not 32-byte hex")?;
    Ok(Sample {
        name: index.name_of(&topic).unwrap_or(UNKNOWN).to_owned(),
        topic0: raw.to_owned(),
    })
}
