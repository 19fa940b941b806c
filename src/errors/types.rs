//! Error type definitions for the datum pipeline
//!
//! This module defines the error types shared across layers. All of them use
//! `thiserror` for the trait implementations and error chaining.

use thiserror::Error;

use crate::pipeline::PipelineError;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration could not be loaded or extracted
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Configuration loaded but failed validation
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Pipeline stage or runtime errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Record encoding/decoding errors
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// I/O errors (stdin/stdout in the CLI)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML rendering errors
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),
}

/// Record codec errors
///
/// Every decode failure of a single entry is one of these. The stage records
/// it against the entry and carries on with the rest of the batch.
#[derive(Error, Debug)]
pub enum RecordError {
    /// Required fields missing or of the wrong shape, or the text is not JSON
    #[error("Malformed record: {message}")]
    Malformed { message: String },

    /// The payload is not valid base64 transport text
    #[error("Invalid transport encoding: {0}")]
    InvalidTransportEncoding(#[from] base64::DecodeError),

    /// The record could not be serialized
    #[error("Record serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),
}

/// Stream collaborator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The stream cannot be reached for this call
    #[error("Stream '{stream}' unavailable: {message}")]
    Unavailable { stream: String, message: String },

    /// An acknowledgement did not match the oldest unacknowledged batch
    #[error("Stale receipt for stream '{stream}': expected sequence {expected:?}, got {received}")]
    StaleReceipt {
        stream: String,
        expected: Option<u64>,
        received: u64,
    },
}

/// Persistent store collaborator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store cannot be reached for this call
    #[error("Store table '{table}' unavailable: {message}")]
    Unavailable { table: String, message: String },

    /// The store refused a single item
    #[error("Store rejected item '{id}': {message}")]
    Rejected { id: String, message: String },
}

impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<figment::Error> for AppError {
    fn from(error: figment::Error) -> Self {
        Self::Config(Box::new(error))
    }
}

impl RecordError {
    /// Create a malformed record error from any displayable cause
    pub fn malformed<S: std::fmt::Display>(cause: S) -> Self {
        Self::Malformed {
            message: cause.to_string(),
        }
    }
}

impl TransportError {
    /// Create an unavailable error for the named stream
    pub fn unavailable<S: Into<String>, M: Into<String>>(stream: S, message: M) -> Self {
        Self::Unavailable {
            stream: stream.into(),
            message: message.into(),
        }
    }
}

impl StoreError {
    /// Create an unavailable error for the named table
    pub fn unavailable<S: Into<String>, M: Into<String>>(table: S, message: M) -> Self {
        Self::Unavailable {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a rejection error for a single item
    pub fn rejected<S: Into<String>, M: Into<String>>(id: S, message: M) -> Self {
        Self::Rejected {
            id: id.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_collaborator() {
        let err = TransportError::unavailable("datum-b", "connection refused");
        assert_eq!(
            err.to_string(),
            "Stream 'datum-b' unavailable: connection refused"
        );

        let err = StoreError::rejected("abc", "conditional check failed");
        assert_eq!(
            err.to_string(),
            "Store rejected item 'abc': conditional check failed"
        );
    }

    #[test]
    fn test_record_error_from_base64() {
        use base64::Engine;
        let decode_err = base64::engine::general_purpose::STANDARD
            .decode("***")
            .unwrap_err();
        let err: RecordError = decode_err.into();
        assert!(matches!(err, RecordError::InvalidTransportEncoding(_)));
        assert!(err.to_string().starts_with("Invalid transport encoding"));
    }
}
