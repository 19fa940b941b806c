//! Runtime that drives stages from their inbound streams

pub mod local;
pub mod runner;

pub use local::{LocalPipeline, PipelineRun};
pub use runner::{RunSummary, RunnerConfig, StageRunner};
