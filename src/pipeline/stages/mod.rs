//! Stage implementations

pub mod hashing;
pub mod sink;

pub use hashing::HashingStage;
pub use sink::SinkStage;

use tokio::task::JoinError;

/// Human-readable cause of a blocking task that did not complete
pub(crate) fn join_error_message(error: JoinError) -> String {
    if !error.is_panic() {
        return format!("task cancelled: {error}");
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
