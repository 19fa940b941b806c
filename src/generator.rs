//! Document generator
//!
//! Produces random records with no digest and publishes them to a stream,
//! each keyed by its record id.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::codec;
use crate::config::GeneratorConfig;
use crate::models::Datum;
use crate::pipeline::PipelineResult;
use crate::transport::{OutboundChannel, OutboundEntry, PutEntryResult};

/// Outcome of a publish run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub requested: usize,
    pub batches: usize,
    /// Ids of the records the stream accepted, in publish order
    pub accepted_ids: Vec<String>,
    pub rejected: usize,
}

impl PublishReport {
    pub fn accepted(&self) -> usize {
        self.accepted_ids.len()
    }
}

pub struct DocumentGenerator {
    outbound: Arc<dyn OutboundChannel>,
    config: GeneratorConfig,
}

impl DocumentGenerator {
    pub fn new(outbound: Arc<dyn OutboundChannel>, config: GeneratorConfig) -> Self {
        Self { outbound, config }
    }

    /// Generate `count` random records and publish them
    pub async fn publish(&self, count: usize) -> PipelineResult<PublishReport> {
        let records = (0..count)
            .map(|_| Datum::random(self.config.document_chars, self.config.iterations))
            .collect();
        self.publish_records(records).await
    }

    /// Publish the given records in batches of `generator.batch_size`
    ///
    /// Rejected entries are counted and not retried.
    pub async fn publish_records(&self, records: Vec<Datum>) -> PipelineResult<PublishReport> {
        let mut report = PublishReport {
            requested: records.len(),
            ..PublishReport::default()
        };
        info!(
            "Publishing {} records to '{}'",
            report.requested,
            self.outbound.stream_name()
        );

        for chunk in records.chunks(self.config.batch_size.max(1)) {
            let entries = chunk
                .iter()
                .map(|datum| Ok(OutboundEntry::new(datum.id(), codec::encode_payload(datum)?)))
                .collect::<PipelineResult<Vec<_>>>()?;

            let response = self.outbound.put_batch(entries).await?;
            report.batches += 1;

            let mut results = response.results.into_iter();
            for datum in chunk {
                match results.next() {
                    Some(PutEntryResult::Accepted { .. }) => {
                        report.accepted_ids.push(datum.id().to_string());
                    }
                    Some(PutEntryResult::Rejected {
                        error_code,
                        message,
                    }) => {
                        warn!(
                            "Record '{}' rejected by '{}': {} {}",
                            datum.id(),
                            self.outbound.stream_name(),
                            error_code,
                            message
                        );
                        report.rejected += 1;
                    }
                    None => {
                        warn!(
                            "Record '{}' got no result from '{}', counting it as rejected",
                            datum.id(),
                            self.outbound.stream_name()
                        );
                        report.rejected += 1;
                    }
                }
            }
            let unmatched = results.count();
            if unmatched > 0 {
                warn!(
                    "'{}' returned {} results beyond the {} records sent",
                    self.outbound.stream_name(),
                    unmatched,
                    chunk.len()
                );
            }
            debug!("Published batch {} of {} records", report.batches, chunk.len());
        }

        info!(
            "Published {}/{} records in {} batches ({} rejected)",
            report.accepted(),
            report.requested,
            report.batches,
            report.rejected
        );
        Ok(report)
    }
}
