//! Per-invocation rename engine
//!
//! The RenameEngine is responsible for:
//! - Holding the store lock for the whole invocation
//! - Opening the store, or building it from the inventory on first use
//! - Applying exactly one lifecycle event
//! - Running the rename action when the event renamed a known host
//!
//! ## Event Flow
//!
//! ```text
//!  LifecycleEvent
//!        │
//!        ▼
//!  ┌────────────┐   absent   ┌───────────────────┐
//!  │ StoreLock  │──────────▶│ InventoryImporter │
//!  │ + open     │◀──────────│ (all-or-nothing)  │
//!  └────────────┘            └───────────────────┘
//!        │
//!        ▼
//!  ┌────────────┐  rename   ┌────────────────┐
//!  │ Reconciler │─────────▶│ RenameNotifier │
//!  └────────────┘           └────────────────┘
//! ```
//!
//! ## Failure Semantics
//!
//! - Store and import failures abort before the notifier runs
//! - The store mutation is not rolled back when notification fails
//! - A rename action that exits non-zero is a warning; `run` still succeeds

use std::path::{Path, PathBuf};
use tracing::{Instrument, error, info, info_span};

use crate::config::{HookConfig, LimitsConfig};
use crate::error::{Error, Result};
use crate::event::LifecycleEvent;
use crate::importer::InventoryImporter;
use crate::notifier::CommandNotifier;
use crate::reconciler::{ReconciliationResult, Reconciler};
use crate::store::{FileHostStore, StoreLock};
use crate::traits::{InventorySource, NotifyOutcome, RenameNotifier};

/// What one invocation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutcome {
    /// Result of applying the event to the store
    pub reconciliation: ReconciliationResult,
    /// Result of the rename action, if one was run
    pub notification: Option<NotifyOutcome>,
}

/// Runs one lifecycle event end to end
pub struct RenameEngine {
    /// Location of the identity table
    database_path: PathBuf,

    /// Source used only when the table has to be built
    inventory: Box<dyn InventorySource>,

    /// Action run on rename
    notifier: Box<dyn RenameNotifier>,

    /// Timeouts and paging
    limits: LimitsConfig,
}

impl RenameEngine {
    /// Create an engine from explicit components
    pub fn new(
        database_path: impl Into<PathBuf>,
        inventory: Box<dyn InventorySource>,
        notifier: Box<dyn RenameNotifier>,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            database_path: database_path.into(),
            inventory,
            notifier,
            limits,
        }
    }

    /// Create an engine that runs the configured rename command
    pub fn from_config(config: &HookConfig, inventory: Box<dyn InventorySource>) -> Result<Self> {
        config.validate()?;

        let notifier = CommandNotifier::new(
            config.rename_hook_command.clone(),
            config.limits.notify_timeout(),
        )?;

        Ok(Self::new(
            config.database_path.clone(),
            inventory,
            Box::new(notifier),
            config.limits.clone(),
        ))
    }

    /// Location of the identity table
    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    /// Parse the hook arguments and run the event
    ///
    /// An unknown action is rejected before the store is locked or opened.
    pub async fn run_hook(&self, action: &str, payload: &str) -> Result<HookOutcome> {
        let event = LifecycleEvent::from_hook(action, payload).inspect_err(|e| {
            error!(action = %action, "Rejected hook event: {}", e);
        })?;
        self.run(&event).await
    }

    /// Apply one event and notify on rename
    pub async fn run(&self, event: &LifecycleEvent) -> Result<HookOutcome> {
        let span = info_span!(
            "hook",
            action = %event.action,
            host_id = event.host_id(),
            name = %event.new_name()
        );

        async move {
            let result = self.run_locked(event).await;
            if let Err(e) = &result {
                error!("Hook failed: {}", e);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_locked(&self, event: &LifecycleEvent) -> Result<HookOutcome> {
        let _lock = StoreLock::acquire(&self.database_path, self.limits.lock_timeout()).await?;

        let importer = InventoryImporter::new(
            self.inventory.as_ref(),
            self.limits.page_size,
            self.limits.import_timeout(),
        );
        let store = FileHostStore::open_or_import(&self.database_path, &importer).await?;

        let reconciliation = Reconciler::new(&store).apply(event).await?;

        let notification = if reconciliation.rename_detected {
            Some(self.notify(&reconciliation).await?)
        } else {
            None
        };

        Ok(HookOutcome {
            reconciliation,
            notification,
        })
    }

    async fn notify(&self, reconciliation: &ReconciliationResult) -> Result<NotifyOutcome> {
        let (old_name, new_name) = reconciliation.rename().ok_or_else(|| {
            Error::invariant(format!(
                "rename detected for {} without a previous name",
                reconciliation.new_name
            ))
        })?;

        let outcome = self.notifier.notify(old_name, new_name).await?;
        if outcome.is_success() {
            info!("Rename hook completed for {} -> {}", old_name, new_name);
        }
        Ok(outcome)
    }
}
