// # host-rename-core
//
// Core library for the Foreman host rename hook.
//
// ## Architecture Overview
//
// The library keeps a local mirror of host identities (id -> FQDN) and
// decides, one lifecycle event at a time, whether a known host was renamed:
// - **HostStore**: Trait for the persistent id -> name table
// - **InventorySource**: Trait for paginated bulk reads from the inventory
// - **RenameNotifier**: Trait for the external rename action
// - **Reconciler**: Applies create/update/destroy and detects renames
// - **RenameEngine**: Per-invocation flow (lock, open-or-import, reconcile, notify)
//
// ## Design Principles
//
// 1. **One event per invocation**: No memory across events beyond the store
// 2. **All-or-nothing bootstrap**: A failed import never leaves a store behind
// 3. **Best-effort notification**: A failing rename action is a warning, not an error
// 4. **No ambient state**: Configuration is passed explicitly to every component

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod importer;
pub mod notifier;
pub mod reconciler;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use config::{HookConfig, InventoryConfig};
pub use engine::{HookOutcome, RenameEngine};
pub use error::{Error, ErrorKind, Result};
pub use event::{HookAction, HostRecord, LifecycleEvent};
pub use importer::InventoryImporter;
pub use notifier::CommandNotifier;
pub use reconciler::{ReconciliationResult, Reconciler};
pub use store::{FileHostStore, MemoryHostStore, StoreLock};
pub use traits::{HostStore, InventoryPage, InventorySource, NotifyOutcome, RenameNotifier};
