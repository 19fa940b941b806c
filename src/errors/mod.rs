//! Centralized error handling for the datum pipeline
//!
//! Errors are split by layer so that each collaborator contract can report
//! failures precisely, while the binary works with a single top-level type.
//!
//! # Error Categories
//!
//! - **Record Errors**: decode-time structural failures of a single entry
//! - **Transport Errors**: stream collaborator failures
//! - **Store Errors**: persistent store collaborator failures
//! - **App Errors**: configuration, I/O and anything surfacing in `main`
//!
//! Pipeline stage errors live in [`crate::pipeline::error`] since they are the
//! contract between a stage and the runtime that drives it.

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Record Results
pub type RecordResult<T> = Result<T, RecordError>;

/// Convenience type alias for Transport Results
pub type TransportResult<T> = Result<T, TransportError>;

/// Convenience type alias for Store Results
pub type StoreResult<T> = Result<T, StoreError>;
