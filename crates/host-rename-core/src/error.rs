//! Error types for the host rename hook
//!
//! Every failure the core can report is a variant of [`Error`]. Callers that
//! need to branch on the category (storage vs. import vs. notification)
//! should match on [`Error::kind`] instead of individual variants.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for host rename operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the host rename hook
#[derive(Error, Debug)]
pub enum Error {
    /// The store could not be created, read, written or parsed
    #[error("Storage error: {0}")]
    Storage(String),

    /// An existing store file is readable or writable by group/other
    #[error("Storage error: insecure permissions on {} (mode {mode:o})", path.display())]
    InsecureStore {
        /// Path of the offending store file
        path: PathBuf,
        /// Permission bits found on disk
        mode: u32,
    },

    /// Another invocation held the store lock for too long
    #[error("Storage error: timed out after {0:?} waiting for the store lock")]
    LockTimeout(Duration),

    /// The bulk inventory fetch failed or returned an incomplete result
    #[error("Import error: {0}")]
    Import(String),

    /// The bulk inventory fetch did not finish in time
    #[error("Import error: timed out after {0:?}")]
    ImportTimeout(Duration),

    /// The event carried an action other than create, update or destroy
    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    /// A rename was detected with malformed names (internal bug)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// The rename action could not be launched
    #[error("Notify error: {0}")]
    Notify(String),

    /// The rename action did not exit in time and was killed
    #[error("Notify error: rename action timed out after {0:?}")]
    NotifyTimeout(Duration),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The event payload is well-formed JSON but semantically invalid
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Coarse error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Storage,
    Import,
    UnsupportedAction,
    InvariantViolation,
    Notify,
    Config,
    InvalidEvent,
    Other,
}

impl Error {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an import error
    pub fn import(msg: impl Into<String>) -> Self {
        Self::Import(msg.into())
    }

    /// Create an unsupported action error
    pub fn unsupported_action(action: impl Into<String>) -> Self {
        Self::UnsupportedAction(action.into())
    }

    /// Create an invariant violation
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Create a notify error
    pub fn notify(msg: impl Into<String>) -> Self {
        Self::Notify(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid event error
    pub fn invalid_event(msg: impl Into<String>) -> Self {
        Self::InvalidEvent(msg.into())
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Storage(_) | Self::InsecureStore { .. } | Self::LockTimeout(_) => {
                ErrorKind::Storage
            }
            Self::Import(_) | Self::ImportTimeout(_) => ErrorKind::Import,
            Self::UnsupportedAction(_) => ErrorKind::UnsupportedAction,
            Self::InvariantViolation(_) => ErrorKind::InvariantViolation,
            Self::Notify(_) | Self::NotifyTimeout(_) => ErrorKind::Notify,
            Self::Config(_) => ErrorKind::Config,
            Self::InvalidEvent(_) | Self::Json(_) => ErrorKind::InvalidEvent,
            Self::Other(_) => ErrorKind::Other,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
