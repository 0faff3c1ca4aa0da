// # Rename Notifier Trait
//
// Defines the interface for the action run when a host was renamed.

use async_trait::async_trait;

/// Result of a rename notification that could be launched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// The action exited successfully
    Succeeded,

    /// The action ran but reported failure
    ///
    /// `code` is `None` when the process was terminated by a signal.
    Failed { code: Option<i32> },
}

impl NotifyOutcome {
    /// Whether the action succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, NotifyOutcome::Succeeded)
    }
}

/// Trait for rename notifiers
///
/// Implementations receive the two names as separate values and must pass
/// them on without re-parsing (no shell, no string interpolation).
#[async_trait]
pub trait RenameNotifier: Send + Sync {
    /// Announce that a host changed name
    ///
    /// # Parameters
    ///
    /// - `old_name`: Name previously stored for the host
    /// - `new_name`: Name carried by the update event
    ///
    /// # Returns
    ///
    /// - `Ok(NotifyOutcome)`: The action ran (successfully or not)
    /// - `Err(Error::InvariantViolation)`: A name was empty
    /// - `Err(Error::Notify | Error::NotifyTimeout)`: The action could not run to completion
    async fn notify(&self, old_name: &str, new_name: &str) -> Result<NotifyOutcome, crate::Error>;
}
