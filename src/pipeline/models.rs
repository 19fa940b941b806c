//! Batch execution records
//!
//! Every stage invocation produces a [`BatchReport`] describing what happened
//! to each entry of the batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a single entry did not make it through a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The payload could not be decoded into a record
    Malformed,
    /// The digest computation aborted
    Digest,
    /// The record could not be re-encoded
    Encode,
    /// The outbound stream refused the entry
    Rejected,
    /// A record reached the sink without a digest
    MissingDigest,
    /// The store refused the item
    StoreRejected,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Malformed => "malformed",
            FailureKind::Digest => "digest",
            FailureKind::Encode => "encode",
            FailureKind::Rejected => "rejected",
            FailureKind::MissingDigest => "missing_digest",
            FailureKind::StoreRejected => "store_rejected",
        }
    }

    /// Failures that happen while turning the payload into a record
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, FailureKind::Malformed)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry that went through the stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySuccess {
    /// Position of the entry in the input batch
    pub index: usize,
    pub key: String,
    /// Sequence number assigned downstream, when the stage emits to a stream
    pub sequence_number: Option<u64>,
}

/// An entry that did not go through the stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFailure {
    /// Position of the entry in the input batch
    pub index: usize,
    pub key: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of one stage invocation over one batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub stage: String,
    pub batch_size: usize,
    pub succeeded: Vec<EntrySuccess>,
    pub failures: Vec<EntryFailure>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn new(stage: &str, batch_size: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            stage: stage.to_string(),
            batch_size,
            succeeded: Vec::new(),
            failures: Vec::new(),
            started_at,
            duration_ms: 0,
        }
    }

    pub fn record_success(&mut self, index: usize, key: &str, sequence_number: Option<u64>) {
        self.succeeded.push(EntrySuccess {
            index,
            key: key.to_string(),
            sequence_number,
        });
    }

    pub fn record_failure(
        &mut self,
        index: usize,
        key: &str,
        kind: FailureKind,
        message: impl Into<String>,
    ) {
        self.failures.push(EntryFailure {
            index,
            key: key.to_string(),
            kind,
            message: message.into(),
        });
    }

    /// Stamp the duration and order both lists by input position
    pub fn finish(mut self) -> Self {
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        self.duration_ms = elapsed.num_milliseconds().max(0) as u64;
        self.succeeded.sort_by_key(|s| s.index);
        self.failures.sort_by_key(|f| f.index);
        self
    }

    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn count_of(&self, kind: FailureKind) -> usize {
        self.failures.iter().filter(|f| f.kind == kind).count()
    }

    pub fn decode_failure_count(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.kind.is_decode_failure())
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
