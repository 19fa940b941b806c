//! Utility modules shared by the runtime and the CLI

pub mod jitter;
pub mod retry;

pub use retry::{RetryConfig, with_retry};
