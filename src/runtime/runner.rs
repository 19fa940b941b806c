//! Batch redelivery loop
//!
//! Pulls a batch, hands it to the stage and acknowledges it once the stage
//! returns a report. A batch whose processing fails with an unreachable
//! collaborator stays unacknowledged and is attempted again after a backoff.
//! Delivery is at-least-once: a batch processed but not acknowledged is
//! processed again.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::pipeline::{BatchReport, BatchStage, FailureKind, PipelineResult};
use crate::transport::InboundChannel;
use crate::utils::{RetryConfig, with_retry};

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Maximum entries requested per receive
    pub batch_size: usize,
    pub retry: RetryConfig,
}

/// Totals over every batch a runner processed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub stage: String,
    pub batches: usize,
    pub entries: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures_by_kind: BTreeMap<FailureKind, usize>,
    pub duration_ms: u64,
}

impl RunSummary {
    fn new(stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            ..Self::default()
        }
    }

    fn absorb(&mut self, report: &BatchReport) {
        self.batches += 1;
        self.entries += report.batch_size;
        self.succeeded += report.success_count();
        self.failed += report.failure_count();
        for failure in &report.failures {
            *self.failures_by_kind.entry(failure.kind).or_default() += 1;
        }
    }

    pub fn failures_of(&self, kind: FailureKind) -> usize {
        self.failures_by_kind.get(&kind).copied().unwrap_or(0)
    }
}

pub struct StageRunner {
    name: String,
    inbound: Arc<dyn InboundChannel>,
    stage: Arc<dyn BatchStage>,
    config: RunnerConfig,
}

impl StageRunner {
    pub fn new(
        name: impl Into<String>,
        inbound: Arc<dyn InboundChannel>,
        stage: Arc<dyn BatchStage>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            name: name.into(),
            inbound,
            stage,
            config,
        }
    }

    /// Receive, process and acknowledge a single batch
    ///
    /// Returns `Ok(None)` when the inbound stream has nothing pending.
    pub async fn process_next_batch(&self) -> PipelineResult<Option<BatchReport>> {
        let Some(batch) = self.inbound.receive_batch(self.config.batch_size).await? else {
            return Ok(None);
        };
        debug!(
            "Runner '{}' received {} entries from '{}'",
            self.name,
            batch.entries.len(),
            self.inbound.stream_name()
        );

        let report = self.stage.process_batch(batch.entries).await?;
        self.inbound.acknowledge(&batch.receipt).await?;
        Ok(Some(report))
    }

    /// Process batches until the inbound stream is empty
    ///
    /// Fails with the last error once a batch exhausts its retries; that batch
    /// remains on the stream.
    pub async fn run_until_drained(&self) -> PipelineResult<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::new(self.stage.stage_id());
        let operation_name = format!("{} batch", self.name);

        info!(
            "Runner '{}' STARTED: {} stage reading '{}'",
            self.name,
            self.stage.stage_name(),
            self.inbound.stream_name()
        );

        while let Some(report) = with_retry(
            &self.config.retry,
            || self.process_next_batch(),
            &operation_name,
        )
        .await?
        {
            summary.absorb(&report);
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "Runner '{}' completed: {} batches, {}/{} entries succeeded, {} failed in {}ms",
            self.name,
            summary.batches,
            summary.succeeded,
            summary.entries,
            summary.failed,
            summary.duration_ms
        );
        Ok(summary)
    }
}
