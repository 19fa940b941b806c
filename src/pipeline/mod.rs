//! Pipeline stages and the contracts they share
//!
//! ```text
//! generator -> stream A -> HashingStage -> stream B -> SinkStage -> store
//! ```

pub mod error;
pub mod models;
pub mod stages;
pub mod traits;

pub use error::{PipelineError, PipelineResult};
pub use models::{BatchReport, EntryFailure, EntrySuccess, FailureKind};
pub use stages::{HashingStage, SinkStage};
pub use traits::BatchStage;

/// Stage identifiers used in logs and reports
pub mod stage_names {
    pub const HASHING: &str = "hashing";
    pub const SINK: &str = "sink";
}
