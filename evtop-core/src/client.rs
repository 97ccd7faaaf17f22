//! Streaming query client for hypersync-style endpoints.
//!
//! The remote API is a cursor-paginated HTTP/JSON protocol. `GET /height`
//! reports the chain height the service has indexed; `POST /query` returns
//! one batch of matching log records plus a `next_block` cursor naming the
//! first block the batch does not cover. A response body of JSON `null` is
//! the end-of-stream sentinel.
//!
//! A session fixes its height once, at the first [`Session::height`] call,
//! and also ends when its cursor reaches that height. One scan is therefore
//! a point-in-time pass: blocks appended while it runs are not chased.

use std::time::Duration;

use alloy::primitives::B256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::signatures::SignatureIndex;

/// Per-request timeout for height, batch, and directory calls.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Response field projection. Restricting the projection to `topic0` keeps
/// batch payloads small; classification needs nothing else.
#[derive(Debug, Clone, Serialize)]
pub struct FieldSelection {
    /// Fields to materialize on each log record.
    pub log: Vec<String>,
}

/// One topic filter. Outer positions match topic0..topic3 in order; the
/// identifiers within a position disjoin.
#[derive(Debug, Clone, Serialize)]
pub struct LogSelection {
    /// Position 0 carries the event identifiers to match.
    pub topics: Vec<Vec<B256>>,
}

/// A paginated log query.
#[derive(Debug, Clone, Serialize)]
pub struct Query {
    /// First block (inclusive) this request should cover.
    pub from_block: u64,
    /// Log selections; multiple selections disjoin.
    pub logs: Vec<LogSelection>,
    /// Response field projection.
    pub field_selection: FieldSelection,
}

impl Query {
    /// Query matching `index`'s identifiers in topic position 0, starting
    /// at `from_block`.
    #[must_use]
    pub fn for_signatures(index: &SignatureIndex, from_block: u64) -> Self {
        Self {
            from_block,
            logs: vec![LogSelection {
                topics: vec![index.topics().to_vec()],
            }],
            field_selection: FieldSelection {
                log: vec!["topic0".to_owned()],
            },
        }
    }
}

/// One log record, as projected by the field selection.
///
/// Topics stay raw optional hex text. A record with a missing or malformed
/// identifier is unclassifiable, not a protocol error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogRecord {
    /// `topic0..topic3`; unset positions may be `null` or absent entirely.
    #[serde(default)]
    pub topics: Vec<Option<String>>,
}

impl LogRecord {
    /// The record's event identifier, if present and well formed.
    #[must_use]
    pub fn topic0(&self) -> Option<B256> {
        self.topics.first()?.as_deref()?.parse().ok()
    }
}

/// Payload section of a batch response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchData {
    /// Matching log records for the covered range.
    #[serde(default)]
    pub logs: Vec<LogRecord>,
}

/// One batch of streamed response data.
#[derive(Debug, Clone, Deserialize)]
pub struct LogBatch {
    /// First block not covered by this batch. `None` is a protocol anomaly;
    /// the scanner discards such batches without advancing.
    #[serde(default, alias = "nextBlock")]
    pub next_block: Option<u64>,
    /// Record payload.
    #[serde(default)]
    pub data: BatchData,
}

/// What one session receive produced.
#[derive(Debug, Clone)]
pub enum SessionItem {
    /// Another batch of records.
    Batch(LogBatch),
    /// The stream has caught up to the session's height.
    EndOfStream,
}

/// A streaming log session against one endpoint.
///
/// Callers fetch [`Session::height`] once before the first receive; the
/// value is fixed for the life of the session and bounds the stream.
#[async_trait]
pub trait Session: Send {
    /// Chain height as currently seen by the service.
    ///
    /// # Errors
    ///
    /// Returns the transport failure that prevented the height call.
    async fn height(&mut self) -> Result<u64, Error>;

    /// Receive the next batch, or the end-of-stream sentinel.
    ///
    /// # Errors
    ///
    /// Returns the transport failure that ended the stream.
    async fn recv(&mut self) -> Result<SessionItem, Error>;
}

/// HTTP client for one hypersync-style endpoint.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Client for `base_url` with the standard request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stream`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { http, base_url })
    }

    /// Open a streaming session filtered to `index`'s identifiers, starting
    /// from block zero.
    #[must_use]
    pub fn session(&self, index: &SignatureIndex) -> HttpSession {
        HttpSession {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            query: Query::for_signatures(index, 0),
            end_block: None,
        }
    }
}

/// Reqwest-backed [`Session`].
#[derive(Debug)]
pub struct HttpSession {
    http: reqwest::Client,
    base_url: String,
    query: Query,
    /// Height captured by the first [`Session::height`] call.
    end_block: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct HeightResponse {
    height: u64,
}

#[async_trait]
impl Session for HttpSession {
    async fn height(&mut self) -> Result<u64, Error> {
        let url = format!("{}/height", self.base_url);
        let resp: HeightResponse = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        self.end_block = Some(resp.height);
        Ok(resp.height)
    }

    async fn recv(&mut self) -> Result<SessionItem, Error> {
        if self
            .end_block
            .is_some_and(|end| self.query.from_block >= end)
        {
            return Ok(SessionItem::EndOfStream);
        }
        let url = format!("{}/query", self.base_url);
        tracing::trace!(from_block = self.query.from_block, "requesting batch");
        let batch: Option<LogBatch> = self
            .http
            .post(&url)
            .json(&self.query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let Some(batch) = batch else {
            return Ok(SessionItem::EndOfStream);
        };
        // Only a batch that carries its cursor advances the session.
        if let Some(next) = batch.next_block {
            self.query.from_block = self.query.from_block.max(next);
        }
        Ok(SessionItem::Batch(batch))
    }
}
