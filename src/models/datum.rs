//! The document record carried through the pipeline.
//!
//! A [`Datum`] is created upstream with its digest unset, has the digest fixed
//! exactly once by the hashing stage, and is then persisted unchanged by the
//! sink. Every field except the digest is immutable after construction.

use std::fmt;

use rand::{Rng, distr::Alphanumeric};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hashing::{HashEngine, Sha3Engine};

/// An arbitrary document travelling through the pipeline.
///
/// The serialized field names (`uuid`, `doc`, `hashes`, `hash`) are the wire
/// format shared by every stage and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datum {
    /// Unique identifier, used as the partition key downstream.
    #[serde(rename = "uuid")]
    id: String,

    /// The document payload.
    #[serde(rename = "doc")]
    document: String,

    /// Number of times the digest is applied.
    #[serde(rename = "hashes")]
    iterations: u32,

    /// The iterated digest; `None` until the hashing stage computes it.
    #[serde(rename = "hash", default)]
    digest: Option<String>,
}

impl Datum {
    /// Create a record with the digest unset.
    pub fn new(id: impl Into<String>, document: impl Into<String>, iterations: u32) -> Self {
        Self {
            id: id.into(),
            document: document.into(),
            iterations,
            digest: None,
        }
    }

    /// Create a record whose digest is already known.
    pub fn with_digest(
        id: impl Into<String>,
        document: impl Into<String>,
        iterations: u32,
        digest: impl Into<String>,
    ) -> Self {
        Self {
            digest: Some(digest.into()),
            ..Self::new(id, document, iterations)
        }
    }

    /// Generate a record with a fresh v4 UUID and `chars` random alphanumeric
    /// characters as its document.
    pub fn random(chars: usize, iterations: u32) -> Self {
        let document: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(chars)
            .map(char::from)
            .collect();
        Self::new(Uuid::new_v4().to_string(), document, iterations)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// The digest, if it has been computed.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    pub fn has_digest(&self) -> bool {
        self.digest.is_some()
    }

    /// Return the digest, computing it with `engine` only if it is unset.
    ///
    /// Once set the digest is never recomputed for this instance.
    pub fn digest_or_compute(&mut self, engine: &dyn HashEngine) -> &str {
        self.digest
            .get_or_insert_with(|| engine.compute_digest(&self.document, self.iterations))
            .as_str()
    }

    /// [`Self::digest_or_compute`] with the standard SHA3-512 engine.
    pub fn compute_digest(&mut self) -> &str {
        self.digest_or_compute(&Sha3Engine)
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.digest {
            Some(digest) => write!(f, "hash: {digest}"),
            None => write!(f, "doc: {}", self.document),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Engine that counts invocations and returns a fixed marker
    struct CountingEngine {
        calls: AtomicUsize,
    }

    impl HashEngine for CountingEngine {
        fn compute_digest(&self, document: &str, iterations: u32) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            format!("{document}:{iterations}")
        }
    }

    #[test]
    fn test_digest_is_computed_once() {
        let engine = CountingEngine {
            calls: AtomicUsize::new(0),
        };
        let mut datum = Datum::new("id-1", "abc", 3);

        let first = datum.digest_or_compute(&engine).to_string();
        let second = datum.digest_or_compute(&engine).to_string();

        assert_eq!(first, "abc:3");
        assert_eq!(first, second);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_existing_digest_is_never_replaced() {
        let engine = CountingEngine {
            calls: AtomicUsize::new(0),
        };
        let mut datum = Datum::with_digest("id-1", "abc", 3, "FIXED");

        assert_eq!(datum.digest_or_compute(&engine), "FIXED");
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_document_accessor_returns_document() {
        let datum = Datum::new("the-id", "the-document", 7);
        assert_eq!(datum.id(), "the-id");
        assert_eq!(datum.document(), "the-document");
        assert_eq!(datum.iterations(), 7);
        assert!(!datum.has_digest());
    }

    #[test]
    fn test_random_datum_shape() {
        let datum = Datum::random(32, 10);
        assert_eq!(datum.document().len(), 32);
        assert!(datum.document().chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(Uuid::parse_str(datum.id()).is_ok());
        assert_eq!(datum.iterations(), 10);
        assert_eq!(datum.digest(), None);

        let other = Datum::random(32, 10);
        assert_ne!(datum.id(), other.id());
    }

    #[test]
    fn test_display_switches_on_digest() {
        let mut datum = Datum::new("id", "hello", 0);
        assert_eq!(datum.to_string(), "doc: hello");
        datum.compute_digest();
        assert_eq!(datum.to_string(), "hash: hello");
    }
}
