//! Pipeline Traits
//!
//! The seam between a stage and the runtime that feeds it batches.

use async_trait::async_trait;

use crate::pipeline::error::PipelineResult;
use crate::pipeline::models::BatchReport;
use crate::transport::InboundEntry;

/// A stage that consumes one ordered batch per invocation
#[async_trait]
pub trait BatchStage: Send + Sync {
    /// Process the batch.
    ///
    /// Entry-local failures are reported in the returned [`BatchReport`].
    /// An `Err` means the batch as a whole was abandoned and should be
    /// redelivered.
    async fn process_batch(&self, entries: Vec<InboundEntry>) -> PipelineResult<BatchReport>;

    /// Get the unique identifier for this stage
    fn stage_id(&self) -> &'static str;

    /// Get the human-readable name for this stage
    fn stage_name(&self) -> &'static str;
}
