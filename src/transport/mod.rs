//! Stream transport contracts
//!
//! Stages only ever see a stream through [`InboundChannel`] and
//! [`OutboundChannel`]. Keys are opaque partition keys that are passed through
//! untouched; payloads are base64 transport text produced by
//! [`crate::codec::encode_payload`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::TransportResult;

pub mod memory;

pub use memory::MemoryStream;

/// One keyed entry on a stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEntry {
    /// Partition/ordering key
    pub key: String,
    /// Encoded record
    pub payload: Vec<u8>,
}

impl StreamEntry {
    pub fn new(key: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            payload: payload.into(),
        }
    }
}

/// Token identifying a received batch so that it can be acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReceipt {
    pub first_sequence: u64,
    pub count: usize,
}

/// A batch handed to a consumer; it stays on the stream until acknowledged
#[derive(Debug, Clone)]
pub struct ReceivedBatch {
    pub entries: Vec<StreamEntry>,
    pub receipt: BatchReceipt,
}

/// Per-entry outcome of a batch put
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PutEntryResult {
    Accepted { sequence_number: u64 },
    Rejected { error_code: String, message: String },
}

/// Response to a batch put, one result per submitted entry, in order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutBatchResponse {
    pub results: Vec<PutEntryResult>,
}

impl PutBatchResponse {
    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r, PutEntryResult::Rejected { .. }))
            .count()
    }
}

/// Source of batches for a stage
#[async_trait]
pub trait InboundChannel: Send + Sync {
    /// Name of the stream, used in logs and errors
    fn stream_name(&self) -> &str;

    /// Receive up to `max_entries` of the oldest unacknowledged entries.
    ///
    /// Returns `Ok(None)` when nothing is pending. Entries are not consumed
    /// until [`InboundChannel::acknowledge`] is called with the receipt; an
    /// unacknowledged batch is delivered again on the next call.
    async fn receive_batch(&self, max_entries: usize) -> TransportResult<Option<ReceivedBatch>>;

    /// Mark a received batch as consumed.
    async fn acknowledge(&self, receipt: &BatchReceipt) -> TransportResult<()>;
}

/// Destination for the batches a stage emits
#[async_trait]
pub trait OutboundChannel: Send + Sync {
    /// Name of the stream, used in logs and errors
    fn stream_name(&self) -> &str;

    /// Deliver a batch in a single call.
    ///
    /// `Err` means the stream could not be reached and nothing was delivered.
    /// Otherwise the response carries one accept/reject result per entry.
    async fn put_batch(&self, entries: Vec<StreamEntry>) -> TransportResult<PutBatchResponse>;
}

/// Entry as received by a stage
pub type InboundEntry = StreamEntry;

/// Entry as emitted by a stage
pub type OutboundEntry = StreamEntry;
