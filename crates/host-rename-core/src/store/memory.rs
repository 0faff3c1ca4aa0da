// # Memory Host Store
//
// In-memory implementation of HostStore.
//
// ## Purpose
//
// Provides the same table semantics as `FileHostStore` without touching
// disk. Useful for tests and for embedding the reconciler in a process
// that already owns persistence.
//
// ## Crash Behavior
//
// - All records are lost when the process exits
// - A fresh store has no baseline, so the first update of any host is
//   reported as inventory drift rather than a rename

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::event::HostRecord;
use crate::traits::HostStore;

/// In-memory host store
///
/// Clones share the same table.
///
/// # Example
///
/// ```rust
/// use host_rename_core::{HostStore, MemoryHostStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryHostStore::new();
///     store.upsert(42, "web01.example.com").await?;
///
///     let record = store.get(42).await?;
///     assert_eq!(record.map(|r| r.name), Some("web01.example.com".to_string()));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryHostStore {
    inner: Arc<RwLock<BTreeMap<i64, String>>>,
}

impl MemoryHostStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `records`
    pub fn with_records(records: impl IntoIterator<Item = HostRecord>) -> Self {
        let table = records.into_iter().map(|r| (r.id, r.name)).collect();
        Self {
            inner: Arc::new(RwLock::new(table)),
        }
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl HostStore for MemoryHostStore {
    async fn get(&self, id: i64) -> Result<Option<HostRecord>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(&id).map(|name| HostRecord::new(id, name.clone())))
    }

    async fn upsert(&self, id: i64, name: &str) -> Result<(), Error> {
        crate::event::validate_name(name)
            .map_err(|e| Error::storage(format!("Rejected upsert of host {}: {}", id, e)))?;
        self.inner.write().await.insert(id, name.to_string());
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), Error> {
        self.inner.write().await.remove(&id);
        Ok(())
    }

    async fn insert_all(&self, records: &[HostRecord]) -> Result<(), Error> {
        for record in records {
            record
                .validate()
                .map_err(|e| Error::storage(format!("Rejected host {}: {}", record.id, e)))?;
        }
        let mut guard = self.inner.write().await;
        for record in records {
            guard.insert(record.id, record.name.clone());
        }
        Ok(())
    }

    async fn len(&self) -> Result<usize, Error> {
        Ok(self.inner.read().await.len())
    }

    async fn list(&self) -> Result<Vec<HostRecord>, Error> {
        let guard = self.inner.read().await;
        Ok(guard
            .iter()
            .map(|(id, name)| HostRecord::new(*id, name.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryHostStore::new();
        assert!(store.is_empty().await);

        store.upsert(1, "a.example.com").await.unwrap();
        store.upsert(1, "b.example.com").await.unwrap();
        assert_eq!(store.len().await.unwrap(), 1);
        assert_eq!(
            store.get(1).await.unwrap(),
            Some(HostRecord::new(1, "b.example.com"))
        );

        store.delete(1).await.unwrap();
        store.delete(1).await.unwrap();
        assert!(store.get(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_rejects_what_file_store_rejects() {
        let store = MemoryHostStore::new();

        let err = store.upsert(1, "").await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));

        let err = store
            .insert_all(&[HostRecord::new(2, "b.example.com"), HostRecord::new(0, "zero")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_store_clones_share_table() {
        let store = MemoryHostStore::with_records([HostRecord::new(3, "c.example.com")]);
        let other = store.clone();

        other.upsert(2, "b.example.com").await.unwrap();

        let ids: Vec<i64> = store.list().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }
}
