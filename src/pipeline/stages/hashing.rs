//! Hashing stage
//!
//! Decodes each entry of a batch, fixes its digest, re-encodes it and emits the
//! whole batch downstream in a single call. Entries are independent: a bad
//! entry is reported and skipped, the rest of the batch carries on.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, trace, warn};

use super::join_error_message;
use crate::codec;
use crate::hashing::{HashEngine, Sha3Engine};
use crate::pipeline::error::PipelineResult;
use crate::pipeline::models::{BatchReport, FailureKind};
use crate::pipeline::stage_names;
use crate::pipeline::traits::BatchStage;
use crate::transport::{InboundEntry, OutboundChannel, OutboundEntry, PutEntryResult};

/// Result of preparing one entry for emission
type Prepared = Result<Vec<u8>, (FailureKind, String)>;

pub struct HashingStage {
    outbound: Arc<dyn OutboundChannel>,
    engine: Arc<dyn HashEngine>,
    max_concurrency: usize,
}

impl HashingStage {
    /// Create a stage emitting to `outbound` with the default SHA3-512 engine
    pub fn new(outbound: Arc<dyn OutboundChannel>, max_concurrency: usize) -> Self {
        Self::with_engine(outbound, Arc::new(Sha3Engine), max_concurrency)
    }

    pub fn with_engine(
        outbound: Arc<dyn OutboundChannel>,
        engine: Arc<dyn HashEngine>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            outbound,
            engine,
            max_concurrency: max_concurrency.max(1),
        }
    }

    async fn prepare_entry(engine: Arc<dyn HashEngine>, payload: Vec<u8>) -> Prepared {
        let datum = codec::decode_payload(&payload)
            .map_err(|e| (FailureKind::Malformed, e.to_string()))?;

        // The digest is CPU-bound; keep it off the async workers
        let datum = tokio::task::spawn_blocking(move || {
            let mut datum = datum;
            datum.digest_or_compute(engine.as_ref());
            datum
        })
        .await
        .map_err(|e| (FailureKind::Digest, join_error_message(e)))?;

        codec::encode_payload(&datum).map_err(|e| (FailureKind::Encode, e.to_string()))
    }
}

#[async_trait]
impl BatchStage for HashingStage {
    async fn process_batch(&self, entries: Vec<InboundEntry>) -> PipelineResult<BatchReport> {
        let started_at = Utc::now();
        let batch_size = entries.len();
        let mut report = BatchReport::new(self.stage_id(), batch_size, started_at);

        info!(
            "Hashing stage STARTED: {} entries, concurrency {}",
            batch_size, self.max_concurrency
        );

        let prepared: Vec<(usize, String, Prepared)> = stream::iter(entries.into_iter().enumerate())
            .map(|(index, entry)| {
                let engine = Arc::clone(&self.engine);
                async move {
                    let outcome = Self::prepare_entry(engine, entry.payload).await;
                    (index, entry.key, outcome)
                }
            })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut pending = Vec::with_capacity(batch_size);
        let mut outbound = Vec::with_capacity(batch_size);
        for (index, key, outcome) in prepared {
            match outcome {
                Ok(payload) => {
                    trace!("Entry {} (key '{}') ready for emission", index, key);
                    outbound.push(OutboundEntry::new(key.clone(), payload));
                    pending.push((index, key));
                }
                Err((kind, message)) => {
                    warn!("Entry {} (key '{}') failed ({}): {}", index, key, kind, message);
                    report.record_failure(index, &key, kind, message);
                }
            }
        }

        if outbound.is_empty() {
            debug!("No entries to emit, skipping put to '{}'", self.outbound.stream_name());
        } else {
            debug!(
                "Emitting {} entries to '{}'",
                outbound.len(),
                self.outbound.stream_name()
            );
            let response = self.outbound.put_batch(outbound).await?;
            let mut results = response.results.into_iter();

            for (index, key) in pending {
                match results.next() {
                    Some(PutEntryResult::Accepted { sequence_number }) => {
                        report.record_success(index, &key, Some(sequence_number));
                    }
                    Some(PutEntryResult::Rejected {
                        error_code,
                        message,
                    }) => {
                        warn!(
                            "Entry {} (key '{}') rejected by '{}': {} {}",
                            index,
                            key,
                            self.outbound.stream_name(),
                            error_code,
                            message
                        );
                        report.record_failure(
                            index,
                            &key,
                            FailureKind::Rejected,
                            format!("{error_code}: {message}"),
                        );
                    }
                    None => {
                        warn!(
                            "Entry {} (key '{}') got no result from '{}'",
                            index,
                            key,
                            self.outbound.stream_name()
                        );
                        report.record_failure(
                            index,
                            &key,
                            FailureKind::Rejected,
                            "no result returned for entry",
                        );
                    }
                }
            }

            let unmatched = results.count();
            if unmatched > 0 {
                warn!(
                    "'{}' returned {} results beyond the entries sent, ignoring them",
                    self.outbound.stream_name(),
                    unmatched
                );
            }
        }

        let report = report.finish();
        info!(
            "Hashing stage completed: {}/{} entries emitted, {} failed in {}ms",
            report.success_count(),
            batch_size,
            report.failure_count(),
            report.duration_ms
        );
        Ok(report)
    }

    fn stage_id(&self) -> &'static str {
        stage_names::HASHING
    }

    fn stage_name(&self) -> &'static str {
        "Hashing"
    }
}
