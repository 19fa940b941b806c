//! Sink stage
//!
//! Terminal stage: decodes each entry and persists the record under its id.
//! The sink only observes records; one that arrives without a digest is
//! reported rather than completed here.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::codec;
use crate::errors::StoreError;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::models::{BatchReport, FailureKind};
use crate::pipeline::stage_names;
use crate::pipeline::traits::BatchStage;
use crate::store::{RecordStore, StoredItem};
use crate::transport::InboundEntry;

pub struct SinkStage {
    store: Arc<dyn RecordStore>,
    max_concurrency: usize,
}

impl SinkStage {
    pub fn new(store: Arc<dyn RecordStore>, max_concurrency: usize) -> Self {
        Self {
            store,
            max_concurrency: max_concurrency.max(1),
        }
    }
}

#[async_trait]
impl BatchStage for SinkStage {
    async fn process_batch(&self, entries: Vec<InboundEntry>) -> PipelineResult<BatchReport> {
        let started_at = Utc::now();
        let batch_size = entries.len();
        let mut report = BatchReport::new(self.stage_id(), batch_size, started_at);

        info!(
            "Sink stage STARTED: {} entries into '{}'",
            batch_size,
            self.store.table_name()
        );

        let mut writes = Vec::with_capacity(batch_size);
        for (index, entry) in entries.into_iter().enumerate() {
            let datum = match codec::decode_payload(&entry.payload) {
                Ok(datum) => datum,
                Err(e) => {
                    warn!("Entry {} (key '{}') could not be decoded: {}", index, entry.key, e);
                    report.record_failure(index, &entry.key, FailureKind::Malformed, e.to_string());
                    continue;
                }
            };
            match StoredItem::from_datum(&datum) {
                Some(item) => writes.push((index, entry.key, item)),
                None => {
                    warn!(
                        "Entry {} (key '{}') has no digest, not persisting record '{}'",
                        index,
                        entry.key,
                        datum.id()
                    );
                    report.record_failure(
                        index,
                        &entry.key,
                        FailureKind::MissingDigest,
                        format!("record '{}' arrived without a digest", datum.id()),
                    );
                }
            }
        }

        debug!("Writing {} items to '{}'", writes.len(), self.store.table_name());
        let outcomes: Vec<_> = stream::iter(writes)
            .map(|(index, key, item)| {
                let store = Arc::clone(&self.store);
                async move { (index, key, store.put_item(item).await) }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let mut unavailable = None;
        for (index, key, outcome) in outcomes {
            match outcome {
                Ok(()) => report.record_success(index, &key, None),
                Err(StoreError::Rejected { id, message }) => {
                    warn!("Store rejected item '{}' (entry {}): {}", id, index, message);
                    report.record_failure(index, &key, FailureKind::StoreRejected, message);
                }
                Err(e @ StoreError::Unavailable { .. }) => {
                    unavailable.get_or_insert(e);
                }
            }
        }
        if let Some(error) = unavailable {
            warn!(
                "Sink stage abandoning batch of {} entries: {}",
                batch_size, error
            );
            return Err(PipelineError::from(error));
        }

        let report = report.finish();
        info!(
            "Sink stage completed: {}/{} records persisted, {} failed in {}ms",
            report.success_count(),
            batch_size,
            report.failure_count(),
            report.duration_ms
        );
        Ok(report)
    }

    fn stage_id(&self) -> &'static str {
        stage_names::SINK
    }

    fn stage_name(&self) -> &'static str {
        "Sink"
    }
}
