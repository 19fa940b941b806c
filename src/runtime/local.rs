//! Single-process wiring of the whole pipeline
//!
//! ```text
//! DocumentGenerator -> stream A -> HashingStage -> stream B -> SinkStage -> store
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::runner::{RunSummary, RunnerConfig, StageRunner};
use crate::config::Config;
use crate::generator::{DocumentGenerator, PublishReport};
use crate::hashing::{HashEngine, Sha3Engine};
use crate::pipeline::{HashingStage, PipelineResult, SinkStage};
use crate::store::InMemoryStore;
use crate::transport::MemoryStream;

/// Outcome of one end-to-end run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub published: PublishReport,
    pub hashing: RunSummary,
    pub sink: RunSummary,
}

pub struct LocalPipeline {
    config: Config,
    engine: Arc<dyn HashEngine>,
    inbound: Arc<MemoryStream>,
    outbound: Arc<MemoryStream>,
    store: Arc<InMemoryStore>,
}

impl LocalPipeline {
    pub fn new(config: Config) -> Self {
        Self::with_parts(
            config.clone(),
            Arc::new(MemoryStream::new(&config.transport.inbound_stream)),
            Arc::new(MemoryStream::new(&config.transport.outbound_stream)),
            Arc::new(InMemoryStore::new(&config.store.table)),
        )
    }

    /// Wire the pipeline around existing streams and store
    pub fn with_parts(
        config: Config,
        inbound: Arc<MemoryStream>,
        outbound: Arc<MemoryStream>,
        store: Arc<InMemoryStore>,
    ) -> Self {
        Self {
            config,
            engine: Arc::new(Sha3Engine),
            inbound,
            outbound,
            store,
        }
    }

    pub fn with_engine(mut self, engine: Arc<dyn HashEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn inbound(&self) -> &Arc<MemoryStream> {
        &self.inbound
    }

    pub fn outbound(&self) -> &Arc<MemoryStream> {
        &self.outbound
    }

    pub fn store(&self) -> &Arc<InMemoryStore> {
        &self.store
    }

    pub fn generator(&self) -> DocumentGenerator {
        DocumentGenerator::new(self.inbound.clone(), self.config.generator.clone())
    }

    pub fn hashing_runner(&self) -> StageRunner {
        let stage = HashingStage::with_engine(
            self.outbound.clone(),
            self.engine.clone(),
            self.config.pipeline.max_concurrency,
        );
        StageRunner::new(
            "hashing",
            self.inbound.clone(),
            Arc::new(stage),
            self.runner_config(),
        )
    }

    pub fn sink_runner(&self) -> StageRunner {
        let stage = SinkStage::new(self.store.clone(), self.config.pipeline.max_concurrency);
        StageRunner::new(
            "sink",
            self.outbound.clone(),
            Arc::new(stage),
            self.runner_config(),
        )
    }

    /// Publish `count` records, then drain both stages in order
    pub async fn run(&self, count: usize) -> PipelineResult<PipelineRun> {
        info!(
            "Local pipeline STARTED: {} records, {} iterations each",
            count, self.config.generator.iterations
        );

        let published = self.generator().publish(count).await?;
        let hashing = self.hashing_runner().run_until_drained().await?;
        let sink = self.sink_runner().run_until_drained().await?;

        info!(
            "Local pipeline completed: {} published, {} hashed, {} persisted",
            published.accepted(),
            hashing.succeeded,
            sink.succeeded
        );
        Ok(PipelineRun {
            published,
            hashing,
            sink,
        })
    }

    fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            batch_size: self.config.pipeline.batch_size,
            retry: self.config.retry.clone(),
        }
    }
}
