//! In-memory record store

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

use super::{RecordStore, StoredItem};
use crate::errors::{StoreError, StoreResult};

/// A keyed store held in process memory
pub struct InMemoryStore {
    table: String,
    items: RwLock<HashMap<String, StoredItem>>,
    rejected_ids: HashSet<String>,
    available: AtomicBool,
}

impl InMemoryStore {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            items: RwLock::new(HashMap::new()),
            rejected_ids: HashSet::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Refuse writes for the given ids
    pub fn with_rejected_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rejected_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub async fn get(&self, id: &str) -> Option<StoredItem> {
        self.items.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    fn table_name(&self) -> &str {
        &self.table
    }

    async fn put_item(&self, item: StoredItem) -> StoreResult<()> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable(&self.table, "table is offline"));
        }
        if self.rejected_ids.contains(&item.id) {
            return Err(StoreError::rejected(&item.id, "write refused"));
        }
        trace!("Table '{}' storing item '{}'", self.table, item.id);
        self.items.write().await.insert(item.id.clone(), item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, digest: &str) -> StoredItem {
        StoredItem {
            id: id.to_string(),
            document: "doc".to_string(),
            iterations: 1,
            digest: digest.to_string(),
        }
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = InMemoryStore::new("datum");
        store.put_item(item("a", "ONE")).await.unwrap();
        store.put_item(item("a", "TWO")).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("a").await.unwrap().digest, "TWO");
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let store = InMemoryStore::new("datum").with_rejected_ids(["bad"]);

        assert!(matches!(
            store.put_item(item("bad", "X")).await,
            Err(StoreError::Rejected { .. })
        ));

        store.set_available(false);
        assert!(matches!(
            store.put_item(item("good", "X")).await,
            Err(StoreError::Unavailable { .. })
        ));
        assert!(store.is_empty().await);
    }
}
