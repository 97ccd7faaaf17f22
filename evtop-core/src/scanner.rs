//! Streaming scan state machine.
//!
//! A [`Scanner`] drives one [`Session`] a single request at a time: the
//! height once, then batches until the end-of-stream sentinel. Counts flow
//! into [`ScanStats`]; the presentation layer reads [`ScanSnapshot`]s
//! between steps and never mutates scanner state. With one in-flight
//! request and counters instead of record buffers, memory stays flat no
//! matter how far back the scan reaches.

use std::fmt;

use crate::client::{Session, SessionItem};
use crate::error::Error;
use crate::signatures::SignatureIndex;
use crate::stats::{DEFAULT_SAMPLE_INTERVAL, Sample, Sampler, ScanStats};

/// Lifecycle of one scan.
///
/// `Complete` and `Failed` are terminal; a scanner is single-use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Constructed, not yet started.
    Idle,
    /// Fetching the fixed chain height.
    Initializing,
    /// Receiving batches.
    Streaming,
    /// Reached the end-of-stream sentinel.
    Complete,
    /// A transport failure ended the scan.
    Failed,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Streaming => "streaming",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

/// Read-only view of scan progress for the presentation layer.
#[derive(Debug, Clone)]
pub struct ScanSnapshot {
    /// Completed fraction in `[0, 1]`.
    pub progress: f64,
    /// `(display name, count)` pairs in display order, `Unknown` last.
    pub counts: Vec<(String, u64)>,
    /// All records counted, including unclassified ones.
    pub total: u64,
    /// Wall-clock seconds since the scanner was constructed.
    pub elapsed_secs: f64,
    /// Records per second, recomputed at snapshot time.
    pub events_per_sec: f64,
    /// Highest cursor reached so far.
    pub cursor: u64,
    /// Chain height fixed at scan start; zero before then.
    pub height: u64,
    /// Current machine state.
    pub state: ScanState,
    /// Most recent decoded sample, if any.
    pub last_sample: Option<Sample>,
}

/// The streaming scanner.
#[derive(Debug)]
pub struct Scanner<S> {
    session: S,
    index: SignatureIndex,
    stats: ScanStats,
    sampler: Sampler,
    state: ScanState,
    cursor: u64,
    height: u64,
    progress: f64,
    last_sample: Option<Sample>,
}

impl<S: Session> Scanner<S> {
    /// Scanner over `session`, counting `index`'s signatures. Starts idle.
    #[must_use]
    pub fn new(session: S, index: SignatureIndex) -> Self {
        Self::with_sample_interval(session, index, DEFAULT_SAMPLE_INTERVAL)
    }

    /// Like [`Scanner::new`] with a custom sampling interval.
    #[must_use]
    pub fn with_sample_interval(session: S, index: SignatureIndex, sample_interval: u64) -> Self {
        Self {
            stats: ScanStats::new(&index),
            sampler: Sampler::new(sample_interval),
            state: ScanState::Idle,
            cursor: 0,
            height: 0,
            progress: 0.0,
            last_sample: None,
            index,
            session,
        }
    }

    /// Fetch the chain height, fixed for the life of this scan, and begin
    /// streaming.
    ///
    /// # Errors
    ///
    /// Propagates the session's failure; the scanner is then `Failed` and
    /// cannot be restarted.
    pub async fn start(&mut self) -> Result<(), Error> {
        self.state = ScanState::Initializing;
        match self.session.height().await {
            Ok(height) => {
                self.height = height;
                self.state = ScanState::Streaming;
                tracing::debug!(height, signatures = self.index.len(), "scan started");
                Ok(())
            }
            Err(error) => {
                self.state = ScanState::Failed;
                Err(error)
            }
        }
    }

    /// Receive and process one batch.
    ///
    /// Returns `Ok(true)` while the stream is open, `Ok(false)` once the
    /// scan has completed (or when the scanner is not streaming). A batch
    /// without its cursor is discarded whole, with a warning, and advances
    /// nothing.
    ///
    /// # Errors
    ///
    /// Propagates the session's failure; the scanner is then `Failed`.
    pub async fn step(&mut self) -> Result<bool, Error> {
        if self.state != ScanState::Streaming {
            return Ok(false);
        }
        let item = match self.session.recv().await {
            Ok(item) => item,
            Err(error) => {
                self.state = ScanState::Failed;
                return Err(error);
            }
        };
        match item {
            SessionItem::EndOfStream => {
                // The sentinel means caught-up even if the final cursor
                // stopped short of the height captured at start.
                self.progress = 1.0;
                self.state = ScanState::Complete;
                tracing::debug!(total = self.stats.total(), "scan complete");
                Ok(false)
            }
            SessionItem::Batch(batch) => {
                let Some(next_block) = batch.next_block else {
                    tracing::warn!(
                        records = batch.data.logs.len(),
                        "batch carried no cursor, discarding"
                    );
                    return Ok(true);
                };
                self.stats.absorb(&batch.data.logs);
                if let Some(sample) =
                    self.sampler
                        .offer(self.stats.total(), &batch.data.logs, &self.index)
                {
                    self.last_sample = Some(sample);
                }
                self.cursor = self.cursor.max(next_block);
                self.progress = ratio(self.cursor, self.height);
                tracing::trace!(
                    cursor = self.cursor,
                    total = self.stats.total(),
                    "batch absorbed"
                );
                Ok(true)
            }
        }
    }

    /// Current machine state.
    #[must_use]
    pub const fn state(&self) -> ScanState {
        self.state
    }

    /// Chain height fixed at start; zero before `start`.
    #[must_use]
    pub const fn height(&self) -> u64 {
        self.height
    }

    /// Highest cursor reached so far.
    #[must_use]
    pub const fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Snapshot for the presentation layer.
    #[must_use]
    pub fn snapshot(&self) -> ScanSnapshot {
        ScanSnapshot {
            progress: self.progress,
            counts: self.stats.counts().to_vec(),
            total: self.stats.total(),
            elapsed_secs: self.stats.elapsed_secs(),
            events_per_sec: self.stats.events_per_sec(),
            cursor: self.cursor,
            height: self.height,
            state: self.state,
            last_sample: self.last_sample.clone(),
        }
    }
}

/// Completed fraction: `min(cursor / height, 1)`, zero while the height is
/// unknown or zero.
fn ratio(cursor: u64, height: u64) -> f64 {
    if height == 0 {
        0.0
    } else {
        (cursor as f64 / height as f64).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::client::{BatchData, LogBatch, LogRecord};
    use crate::signatures::topic0;

    const TRANSFER: &str = "Transfer(address,address,uint256)";

    struct FakeSession {
        height: u64,
        items: VecDeque<Result<SessionItem, Error>>,
    }

    impl FakeSession {
        fn new(height: u64, items: Vec<Result<SessionItem, Error>>) -> Self {
            Self {
                height,
                items: items.into(),
            }
        }
    }

    #[async_trait::async_trait]
    impl Session for FakeSession {
        async fn height(&mut self) -> Result<u64, Error> {
            Ok(self.height)
        }

        async fn recv(&mut self) -> Result<SessionItem, Error> {
            self.items
                .pop_front()
                .unwrap_or(Ok(SessionItem::EndOfStream))
        }
    }

    fn record() -> LogRecord {
        LogRecord {
            topics: vec![Some(topic0(TRANSFER).to_string())],
        }
    }

    fn batch(next_block: Option<u64>, logs: Vec<LogRecord>) -> Result<SessionItem, Error> {
        Ok(SessionItem::Batch(LogBatch {
            next_block,
            data: BatchData { logs },
        }))
    }

    fn scanner(session: FakeSession) -> Scanner<FakeSession> {
        Scanner::new(session, SignatureIndex::new([TRANSFER]))
    }

    /// A real transport error, produced from a connection nothing answers.
    async fn stream_error() -> Error {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("addr").port()
        };
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .expect("client");
        let failure = client
            .get(format!("http://127.0.0.1:{port}/"))
            .send()
            .await
            .expect_err("nothing listens there");
        Error::Stream(failure)
    }

    #[tokio::test]
    async fn step_before_start_is_a_no_op() {
        let mut scan = scanner(FakeSession::new(10, vec![]));
        assert!(!scan.step().await.expect("idle step"));
        assert_eq!(scan.state(), ScanState::Idle);
    }

    #[tokio::test]
    async fn empty_chain_completes_immediately() {
        let mut scan = scanner(FakeSession::new(0, vec![]));
        let before = scan.snapshot();
        assert!(
            (before.progress - 0.0).abs() < f64::EPSILON,
            "progress is zero while the height is unknown"
        );

        scan.start().await.expect("start");
        assert!(!scan.step().await.expect("sentinel step"));

        let after = scan.snapshot();
        assert_eq!(after.state, ScanState::Complete);
        assert!((after.progress - 1.0).abs() < f64::EPSILON);
        assert_eq!(after.total, 0);
        assert!(after.counts.iter().all(|(_, count)| *count == 0));
    }

    #[tokio::test]
    async fn two_matching_records_count_two() {
        let mut scan = scanner(FakeSession::new(100, vec![batch(
            Some(100),
            vec![record(), record()],
        )]));
        scan.start().await.expect("start");
        while scan.step().await.expect("step") {}

        let snapshot = scan.snapshot();
        assert_eq!(snapshot.state, ScanState::Complete);
        assert_eq!(snapshot.total, 2);
        assert_eq!(snapshot.counts.first(), Some(&("Transfer".to_owned(), 2)));
        assert_eq!(snapshot.counts.last(), Some(&("Unknown".to_owned(), 0)));
    }

    #[tokio::test]
    async fn progress_is_monotone_and_clamped() {
        let mut scan = scanner(FakeSession::new(100, vec![
            batch(Some(50), vec![]),
            // Cursor regression from the service; progress must hold.
            batch(Some(25), vec![]),
            // Cursor past the fixed height; progress clamps at one.
            batch(Some(200), vec![]),
        ]));
        scan.start().await.expect("start");

        let mut seen = vec![scan.snapshot().progress];
        while scan.step().await.expect("step") {
            seen.push(scan.snapshot().progress);
        }
        seen.push(scan.snapshot().progress);

        assert!(
            seen.iter().zip(seen.iter().skip(1)).all(|(a, b)| a <= b),
            "progress must never decrease: {seen:?}"
        );
        assert!(seen.iter().all(|p| (0.0..=1.0).contains(p)), "{seen:?}");
        assert!((scan.snapshot().progress - 1.0).abs() < f64::EPSILON);
        assert_eq!(scan.cursor(), 200);
    }

    #[tokio::test]
    async fn cursorless_batch_is_discarded_whole() {
        let mut scan = scanner(FakeSession::new(100, vec![
            batch(None, vec![record(), record(), record()]),
            batch(Some(100), vec![record()]),
        ]));
        scan.start().await.expect("start");

        assert!(scan.step().await.expect("anomalous step"), "stream stays open");
        assert_eq!(scan.snapshot().total, 0, "discarded records are not counted");
        assert_eq!(scan.cursor(), 0);

        while scan.step().await.expect("step") {}
        assert_eq!(scan.snapshot().total, 1);
    }

    #[tokio::test]
    async fn sentinel_forces_full_progress() {
        let mut scan = scanner(FakeSession::new(1_000, vec![batch(Some(10), vec![])]));
        scan.start().await.expect("start");
        while scan.step().await.expect("step") {}

        let snapshot = scan.snapshot();
        assert_eq!(snapshot.cursor, 10, "cursor keeps its last value");
        assert!(
            (snapshot.progress - 1.0).abs() < f64::EPSILON,
            "sentinel means caught-up regardless of cursor"
        );
    }

    #[tokio::test]
    async fn unconfigured_records_count_as_unknown() {
        let stray = LogRecord {
            topics: vec![Some(topic0("Stray(uint8)").to_string())],
        };
        let bare = LogRecord::default();
        let mut scan = scanner(FakeSession::new(10, vec![batch(
            Some(10),
            vec![stray, bare, record()],
        )]));
        scan.start().await.expect("start");
        while scan.step().await.expect("step") {}

        let snapshot = scan.snapshot();
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.counts.first(), Some(&("Transfer".to_owned(), 1)));
        assert_eq!(snapshot.counts.last(), Some(&("Unknown".to_owned(), 2)));
    }

    #[tokio::test]
    async fn transport_failure_is_terminal() {
        let failure = stream_error().await;
        let mut scan = scanner(FakeSession::new(100, vec![
            Err(failure),
            batch(Some(50), vec![record()]),
        ]));
        scan.start().await.expect("start");

        assert!(scan.step().await.is_err(), "failure propagates");
        assert_eq!(scan.state(), ScanState::Failed);

        // Terminal: later steps are inert even though the fake still holds
        // a perfectly good batch.
        assert!(!scan.step().await.expect("terminal step"));
        assert_eq!(scan.snapshot().total, 0);
    }
}
