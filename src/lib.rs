//! Stream pipeline that fixes an iterated SHA3-512 digest on document records
//!
//! Records travel as base64-framed JSON through append-only streams. The
//! hashing stage computes each record's digest exactly once; the sink stage
//! persists the finished record keyed by its id.

pub mod codec;
pub mod config;
pub mod errors;
pub mod generator;
pub mod hashing;
pub mod models;
pub mod pipeline;
pub mod runtime;
pub mod store;
pub mod transport;
pub mod utils;

pub use errors::{AppError, AppResult};
pub use models::Datum;
