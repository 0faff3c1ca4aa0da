// # Inventory Source Trait
//
// Defines the interface to the system of record for host identities.
//
// ## Purpose
//
// The inventory is only read when the local store has to be built from
// scratch. Sources are single-shot: one call fetches one page. Walking the
// pages and checking completeness is owned by `InventoryImporter`.
//
// ## Implementations
//
// - Foreman: `host-rename-foreman` crate

use async_trait::async_trait;

use crate::event::HostRecord;

/// One page of inventory results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryPage {
    /// Records on this page
    pub records: Vec<HostRecord>,

    /// Total number of records across all pages, if the source reports it
    pub total: Option<u64>,
}

impl InventoryPage {
    /// Create a page with a known total
    pub fn new(records: Vec<HostRecord>, total: u64) -> Self {
        Self {
            records,
            total: Some(total),
        }
    }
}

/// Trait for inventory sources
///
/// Implementations must not retry, cache, or touch the store.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Fetch one page of host records
    ///
    /// # Parameters
    ///
    /// - `page`: 1-based page number
    /// - `per_page`: Requested page size
    ///
    /// # Returns
    ///
    /// - `Ok(InventoryPage)`: The records on that page
    /// - `Err(Error)`: Transport or decoding failure
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<InventoryPage, crate::Error>;

    /// Name of the source, for logs
    fn source_name(&self) -> &'static str;
}
