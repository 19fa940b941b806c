//! Persistent store contract
//!
//! The sink writes one item per record, keyed by the record id. Writes are
//! last-write-wins, so redelivered batches are harmless.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::StoreResult;
use crate::models::Datum;

pub mod memory;

pub use memory::InMemoryStore;

/// The shape of a persisted record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredItem {
    pub id: String,
    pub document: String,
    pub iterations: u32,
    pub digest: String,
}

impl StoredItem {
    /// Build the item for a record, or `None` when its digest is not fixed yet
    pub fn from_datum(datum: &Datum) -> Option<Self> {
        let digest = datum.digest()?;
        Some(Self {
            id: datum.id().to_string(),
            document: datum.document().to_string(),
            iterations: datum.iterations(),
            digest: digest.to_string(),
        })
    }
}

/// Keyed single-item writes
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Name of the table, used in logs and errors
    fn table_name(&self) -> &str;

    /// Write `item` under `item.id`, replacing any previous value.
    async fn put_item(&self, item: StoredItem) -> StoreResult<()>;
}
