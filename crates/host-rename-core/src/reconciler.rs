//! Event reconciliation and rename detection
//!
//! | action  | store mutation     | rename detected                           |
//! |---------|--------------------|-------------------------------------------|
//! | create  | upsert(id, name)   | never                                     |
//! | update  | upsert(id, name)   | a prior record exists and its name differs |
//! | destroy | delete(id)         | never                                     |
//!
//! An update for an unknown id is inventory drift: it is logged, stored so
//! the next update has a baseline, and not treated as a rename. Names are
//! compared byte for byte.

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::event::{self, HookAction, HostRecord, LifecycleEvent};
use crate::traits::HostStore;

/// Outcome of applying one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationResult {
    /// The store mutation was committed
    pub applied: bool,
    /// The event renamed a known host
    pub rename_detected: bool,
    /// Name stored before the event, if there was one
    pub old_name: Option<String>,
    /// Name carried by the event
    pub new_name: String,
}

impl ReconciliationResult {
    /// The `(old, new)` pair when a rename was detected
    pub fn rename(&self) -> Option<(&str, &str)> {
        if !self.rename_detected {
            return None;
        }
        self.old_name
            .as_deref()
            .map(|old| (old, self.new_name.as_str()))
    }
}

/// Applies lifecycle events to a host store
pub struct Reconciler<'a> {
    store: &'a dyn HostStore,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler over `store`
    pub fn new(store: &'a dyn HostStore) -> Self {
        Self { store }
    }

    /// Apply an event whose action is still a raw string
    ///
    /// An unknown action fails with `UnsupportedAction` before the store is
    /// touched.
    pub async fn apply_raw(&self, action: &str, host: HostRecord) -> Result<ReconciliationResult> {
        let action = action.parse::<HookAction>()?;
        self.apply(&LifecycleEvent { action, host }).await
    }

    /// Apply one event to the store
    pub async fn apply(&self, event: &LifecycleEvent) -> Result<ReconciliationResult> {
        let id = event.host_id();
        let name = event.new_name();

        match event.action {
            HookAction::Create => {
                event::validate_id(id)?;
                event::validate_name(name)?;
                self.store.upsert(id, name).await?;
                info!("Recorded new host {} ({})", id, name);
                Ok(ReconciliationResult {
                    applied: true,
                    rename_detected: false,
                    old_name: None,
                    new_name: name.to_string(),
                })
            }
            HookAction::Update => {
                event::validate_id(id)?;
                event::validate_name(name)?;
                let old_name = self.store.get(id).await?.map(|record| record.name);

                let rename_detected = match old_name.as_deref() {
                    Some(old) => old != name,
                    None => {
                        warn!(
                            "Received an update for host {} ({}) which is not in the store",
                            id, name
                        );
                        false
                    }
                };
                debug!(
                    "Checking for a rename: id={} old={:?} new={} rename={}",
                    id, old_name, name, rename_detected
                );

                self.store.upsert(id, name).await?;
                if rename_detected {
                    info!(
                        "Host {} renamed from {} to {}",
                        id,
                        old_name.as_deref().unwrap_or_default(),
                        name
                    );
                }

                Ok(ReconciliationResult {
                    applied: true,
                    rename_detected,
                    old_name,
                    new_name: name.to_string(),
                })
            }
            HookAction::Destroy => {
                let old_name = self.store.get(id).await?.map(|record| record.name);
                self.store.delete(id).await?;
                match &old_name {
                    Some(old) => info!("Removed host {} ({})", id, old),
                    None => debug!("Destroy for host {} which is not in the store", id),
                }
                Ok(ReconciliationResult {
                    applied: true,
                    rename_detected: false,
                    old_name,
                    new_name: name.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::store::MemoryHostStore;

    #[tokio::test]
    async fn test_update_same_name_is_not_a_rename() {
        let store = MemoryHostStore::with_records([HostRecord::new(1, "a.example.com")]);
        let reconciler = Reconciler::new(&store);

        let result = reconciler
            .apply(&LifecycleEvent::new(HookAction::Update, 1, "a.example.com"))
            .await
            .unwrap();

        assert!(result.applied);
        assert!(!result.rename_detected);
        assert_eq!(result.rename(), None);
    }

    #[tokio::test]
    async fn test_comparison_is_exact() {
        let store = MemoryHostStore::with_records([HostRecord::new(1, "a.example.com")]);
        let reconciler = Reconciler::new(&store);

        let result = reconciler
            .apply(&LifecycleEvent::new(HookAction::Update, 1, "A.example.com"))
            .await
            .unwrap();

        assert_eq!(result.rename(), Some(("a.example.com", "A.example.com")));
    }

    #[tokio::test]
    async fn test_create_with_empty_name_does_not_mutate() {
        let store = MemoryHostStore::new();
        let reconciler = Reconciler::new(&store);

        let err = reconciler
            .apply(&LifecycleEvent::new(HookAction::Create, 1, ""))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidEvent(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_destroy_reports_previous_name() {
        let store = MemoryHostStore::with_records([HostRecord::new(5, "e.example.com")]);
        let reconciler = Reconciler::new(&store);

        let result = reconciler
            .apply(&LifecycleEvent::new(HookAction::Destroy, 5, ""))
            .await
            .unwrap();

        assert_eq!(result.old_name.as_deref(), Some("e.example.com"));
        assert!(!result.rename_detected);
        assert!(store.is_empty().await);
    }
}
