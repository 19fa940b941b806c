//! Iterated SHA3-512 digest engine
//!
//! The digest of a document is computed by repeatedly hashing its UTF-8 bytes
//! with SHA3-512 and replacing the state with the upper-case hex encoding of
//! the result. The iteration count is exactly the number of applications, so
//! an iteration count of zero leaves the document unchanged.
//!
//! Engines are pure: no I/O, no logging, no randomness. Stages can therefore
//! recompute a digest on redelivery and always obtain the same value.

use sha3::{Digest, Sha3_512};

/// Computes the iterated digest of a document
pub trait HashEngine: Send + Sync {
    /// Apply the digest `iterations` times to `document`.
    fn compute_digest(&self, document: &str, iterations: u32) -> String;
}

/// The standard engine: SHA3-512 with upper-case hex chaining
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha3Engine;

impl HashEngine for Sha3Engine {
    fn compute_digest(&self, document: &str, iterations: u32) -> String {
        (0..iterations).fold(document.to_owned(), |state, _| {
            hex::encode_upper(Sha3_512::digest(state.as_bytes()))
        })
    }
}
