//! Bulk import of the inventory into a new store
//!
//! The importer runs once, when the store file does not exist yet. It walks
//! the inventory page by page until it has every record the source says
//! exists, then writes them into the store in one commit. Any failure is
//! returned to the caller, which discards the half-built store.
//!
//! ## Completeness
//!
//! - With a reported total, pages are requested until that many records
//!   arrived. Short pages are fine (servers cap `per_page`); an empty page
//!   before the total is reached is an incomplete import.
//! - Without a total, the first short page ends the import.
//! - A total that changes between pages aborts the import.

use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::event::HostRecord;
use crate::traits::{HostStore, InventorySource};

/// Loads the full inventory into a store
pub struct InventoryImporter<'a> {
    source: &'a dyn InventorySource,
    page_size: u32,
    timeout: Duration,
}

impl<'a> InventoryImporter<'a> {
    /// Create a new importer
    ///
    /// # Parameters
    ///
    /// - `source`: Where the records come from
    /// - `page_size`: Records requested per page (at least 1)
    /// - `timeout`: Upper bound for fetching every page
    pub fn new(source: &'a dyn InventorySource, page_size: u32, timeout: Duration) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            timeout,
        }
    }

    /// Name of the underlying source
    pub fn source_name(&self) -> &'static str {
        self.source.source_name()
    }

    /// Fetch every record and insert it into `store`
    ///
    /// # Returns
    ///
    /// - `Ok(usize)`: Number of distinct hosts written
    /// - `Err(Error::Import | Error::ImportTimeout)`: The fetch failed or was incomplete
    /// - `Err(Error::Storage)`: The records could not be written
    pub async fn import_all(&self, store: &dyn HostStore) -> Result<usize> {
        let records = tokio::time::timeout(self.timeout, self.fetch_all())
            .await
            .map_err(|_| Error::ImportTimeout(self.timeout))??;

        store.insert_all(&records).await?;
        Ok(records.len())
    }

    /// Walk all pages and collect the records, keyed by id
    pub async fn fetch_all(&self) -> Result<Vec<HostRecord>> {
        let mut hosts: BTreeMap<i64, String> = BTreeMap::new();
        let mut expected_total: Option<u64> = None;
        let mut fetched: u64 = 0;
        let mut page: u32 = 1;

        loop {
            let result = self
                .source
                .fetch_page(page, self.page_size)
                .await
                .map_err(|e| match e {
                    Error::Import(_) | Error::ImportTimeout(_) => e,
                    other => Error::import(format!(
                        "{} page {} failed: {}",
                        self.source.source_name(),
                        page,
                        other
                    )),
                })?;

            if let Some(total) = result.total {
                match expected_total {
                    None => expected_total = Some(total),
                    Some(previous) if previous != total => {
                        return Err(Error::import(format!(
                            "inventory changed during import: total went from {} to {}",
                            previous, total
                        )));
                    }
                    Some(_) => {}
                }
            }

            let count = result.records.len();
            debug!(
                "Fetched page {} from {}: {} records",
                page,
                self.source.source_name(),
                count
            );

            for record in result.records {
                record
                    .validate()
                    .map_err(|e| Error::import(format!("host {}: {}", record.id, e)))?;
                if let Some(previous) = hosts.insert(record.id, record.name) {
                    warn!(
                        "Inventory lists host id {} more than once (dropping name {})",
                        record.id, previous
                    );
                }
            }
            fetched += count as u64;

            match expected_total {
                Some(total) if fetched >= total => {
                    if fetched > total {
                        warn!("Inventory returned {} records, more than its total of {}", fetched, total);
                    }
                    break;
                }
                Some(total) if count == 0 => {
                    return Err(Error::import(format!(
                        "incomplete inventory: received {} of {} records",
                        fetched, total
                    )));
                }
                Some(_) => {}
                None if count < self.page_size as usize => break,
                None => {}
            }

            page = page.checked_add(1).ok_or_else(|| {
                Error::import("inventory did not terminate within the page limit")
            })?;
        }

        Ok(hosts
            .into_iter()
            .map(|(id, name)| HostRecord::new(id, name))
            .collect())
    }
}
