//! In-memory append-only stream
//!
//! Implements both channel directions so that stages can be chained in a
//! single process. Fault injection hooks allow tests to reject entries or make
//! the stream unreachable.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::{
    BatchReceipt, InboundChannel, OutboundChannel, PutBatchResponse, PutEntryResult,
    ReceivedBatch, StreamEntry,
};
use crate::errors::{TransportError, TransportResult};

type RejectionRule = Box<dyn Fn(&StreamEntry) -> Option<String> + Send + Sync>;

/// Error code reported for entries refused by the rejection rule
pub const REJECTED_ERROR_CODE: &str = "ProvisionedThroughputExceededException";

struct StreamRecord {
    sequence_number: u64,
    entry: StreamEntry,
}

#[derive(Default)]
struct StreamState {
    records: VecDeque<StreamRecord>,
    next_sequence: u64,
}

/// An in-process stream with at-least-once delivery semantics
pub struct MemoryStream {
    name: String,
    state: Mutex<StreamState>,
    available: AtomicBool,
    pending_outages: AtomicUsize,
    rejection: Option<RejectionRule>,
}

impl MemoryStream {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(StreamState::default()),
            available: AtomicBool::new(true),
            pending_outages: AtomicUsize::new(0),
            rejection: None,
        }
    }

    /// Refuse entries for which `rule` returns a message.
    pub fn with_rejection<F>(mut self, rule: F) -> Self
    where
        F: Fn(&StreamEntry) -> Option<String> + Send + Sync + 'static,
    {
        self.rejection = Some(Box::new(rule));
        self
    }

    /// Make every subsequent call succeed or fail with `Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Fail the next `calls` channel calls with `Unavailable`, then recover.
    pub fn inject_outages(&self, calls: usize) {
        self.pending_outages.store(calls, Ordering::SeqCst);
    }

    /// Number of unacknowledged entries
    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Copy of every unacknowledged entry, oldest first
    pub async fn snapshot(&self) -> Vec<StreamEntry> {
        self.state
            .lock()
            .await
            .records
            .iter()
            .map(|r| r.entry.clone())
            .collect()
    }

    fn check_available(&self) -> TransportResult<()> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(TransportError::unavailable(&self.name, "stream is offline"));
        }
        let outage = self
            .pending_outages
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if outage.is_ok() {
            return Err(TransportError::unavailable(
                &self.name,
                "transient outage injected",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl InboundChannel for MemoryStream {
    fn stream_name(&self) -> &str {
        &self.name
    }

    async fn receive_batch(&self, max_entries: usize) -> TransportResult<Option<ReceivedBatch>> {
        self.check_available()?;
        let state = self.state.lock().await;
        let Some(first) = state.records.front() else {
            return Ok(None);
        };

        let entries: Vec<StreamEntry> = state
            .records
            .iter()
            .take(max_entries.max(1))
            .map(|r| r.entry.clone())
            .collect();
        let receipt = BatchReceipt {
            first_sequence: first.sequence_number,
            count: entries.len(),
        };
        debug!(
            "Stream '{}' delivering {} entries from sequence {}",
            self.name, receipt.count, receipt.first_sequence
        );
        Ok(Some(ReceivedBatch { entries, receipt }))
    }

    async fn acknowledge(&self, receipt: &BatchReceipt) -> TransportResult<()> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let expected = state.records.front().map(|r| r.sequence_number);
        if expected != Some(receipt.first_sequence) || state.records.len() < receipt.count {
            return Err(TransportError::StaleReceipt {
                stream: self.name.clone(),
                expected,
                received: receipt.first_sequence,
            });
        }
        state.records.drain(..receipt.count);
        trace!(
            "Stream '{}' acknowledged {} entries from sequence {}",
            self.name, receipt.count, receipt.first_sequence
        );
        Ok(())
    }
}

#[async_trait]
impl OutboundChannel for MemoryStream {
    fn stream_name(&self) -> &str {
        &self.name
    }

    async fn put_batch(&self, entries: Vec<StreamEntry>) -> TransportResult<PutBatchResponse> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let mut results = Vec::with_capacity(entries.len());

        for entry in entries {
            if let Some(message) = self.rejection.as_ref().and_then(|rule| rule(&entry)) {
                results.push(PutEntryResult::Rejected {
                    error_code: REJECTED_ERROR_CODE.to_string(),
                    message,
                });
                continue;
            }
            let sequence_number = state.next_sequence;
            state.next_sequence += 1;
            state.records.push_back(StreamRecord {
                sequence_number,
                entry,
            });
            results.push(PutEntryResult::Accepted { sequence_number });
        }

        let response = PutBatchResponse { results };
        debug!(
            "Stream '{}' accepted {} of {} entries",
            self.name,
            response.results.len() - response.failed_count(),
            response.results.len()
        );
        Ok(response)
    }
}
