// # Host Store Trait
//
// Defines the interface for the local identity mirror.
//
// ## Purpose
//
// The store is the only memory the hook has between invocations. It holds
// the last known name for every host id, which is the baseline an update
// event is compared against.
//
// ## Implementations
//
// - File-based: `FileHostStore` (JSON table, atomic rename on every commit)
// - In-memory: `MemoryHostStore` (tests, embedding)
//
// ## Usage
//
// ```rust,ignore
// use host_rename_core::HostStore;
//
// let previous = store.get(42).await?;
// store.upsert(42, "web01.example.com").await?;
// ```

use async_trait::async_trait;

use crate::event::HostRecord;

/// Trait for host store implementations
///
/// # Atomicity
///
/// Every mutating method is one commit: after a crash the table holds
/// either the state before or the state after the call, never a mix.
///
/// # Ownership
///
/// A store is opened once per invocation and owned by it. Cross-process
/// exclusion is the caller's job (see `StoreLock`).
#[async_trait]
pub trait HostStore: Send + Sync {
    /// Look up a host by id
    ///
    /// # Returns
    ///
    /// - `Ok(Some(HostRecord))`: The stored record
    /// - `Ok(None)`: No record for this id
    /// - `Err(Error)`: Storage error
    async fn get(&self, id: i64) -> Result<Option<HostRecord>, crate::Error>;

    /// Insert or replace the name stored for `id`
    async fn upsert(&self, id: i64, name: &str) -> Result<(), crate::Error>;

    /// Remove the record for `id`
    ///
    /// Deleting an id that is not present succeeds.
    async fn delete(&self, id: i64) -> Result<(), crate::Error>;

    /// Insert a batch of records in a single commit
    ///
    /// Used by the importer to populate a freshly created store. Later
    /// records replace earlier ones with the same id.
    async fn insert_all(&self, records: &[HostRecord]) -> Result<(), crate::Error>;

    /// Number of records in the store
    async fn len(&self) -> Result<usize, crate::Error>;

    /// All records, ordered by id
    async fn list(&self) -> Result<Vec<HostRecord>, crate::Error>;
}
