//! Core traits for the host rename hook
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`HostStore`]: Persistent id -> name table
//! - [`InventorySource`]: Paginated bulk reads from the system of record
//! - [`RenameNotifier`]: External action run when a rename is detected

pub mod host_store;
pub mod inventory;
pub mod notifier;

pub use host_store::HostStore;
pub use inventory::{InventoryPage, InventorySource};
pub use notifier::{NotifyOutcome, RenameNotifier};
