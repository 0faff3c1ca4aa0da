//! Configuration types for the host rename hook
//!
//! [`HookConfig`] is built once per invocation (from the environment or a
//! JSON settings file) and passed explicitly to every component.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::notifier::check_command;

/// Default location of the identity table
pub const DEFAULT_DATABASE_PATH: &str = "/var/lib/foreman-host-rename/hosts.json";

/// Main hook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookConfig {
    /// Path of the identity table
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Executable run as `<command> <old_name> <new_name>` on rename
    pub rename_hook_command: PathBuf,

    /// Where the initial host list comes from
    pub inventory: InventoryConfig,

    /// Timeouts and paging
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Logging
    #[serde(default)]
    pub log: LogConfig,
}

impl HookConfig {
    /// Create a configuration with default limits and logging
    pub fn new(
        database_path: impl Into<PathBuf>,
        rename_hook_command: impl Into<PathBuf>,
        inventory: InventoryConfig,
    ) -> Self {
        Self {
            database_path: database_path.into(),
            rename_hook_command: rename_hook_command.into(),
            inventory,
            limits: LimitsConfig::default(),
            log: LogConfig::default(),
        }
    }

    /// Load a JSON settings file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            crate::Error::config(format!("Errors in the configuration file {}: {}", path.display(), e))
        })
    }

    /// Validate the configuration
    ///
    /// Besides value checks this confirms that the rename command exists
    /// and is executable, so a broken hook fails before any event is applied.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.database_path.as_os_str().is_empty() {
            return Err(crate::Error::config("database_path cannot be empty"));
        }

        check_command(&self.rename_hook_command)?;
        check_executable(&self.rename_hook_command)?;

        self.inventory.validate()?;
        self.limits.validate()?;
        self.log.validate()?;

        Ok(())
    }
}

fn check_executable(path: &Path) -> Result<(), crate::Error> {
    let metadata = std::fs::metadata(path).map_err(|_| {
        crate::Error::config(format!("{} does not exist", path.display()))
    })?;

    if !metadata.is_file() {
        return Err(crate::Error::config(format!(
            "{} is not a regular file",
            path.display()
        )));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(crate::Error::config(format!(
                "{} is not executable",
                path.display()
            )));
        }
    }

    Ok(())
}

/// Inventory source configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InventoryConfig {
    /// Foreman API v2
    Foreman {
        /// Base URL, e.g. `https://foreman.example.com`
        url: String,
        /// API user
        user: String,
        /// API password
        password: String,
    },
}

impl InventoryConfig {
    /// Validate the inventory configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            InventoryConfig::Foreman {
                url,
                user,
                password,
            } => {
                if url.is_empty() {
                    return Err(crate::Error::config("Foreman URL cannot be empty"));
                }
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "Foreman URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                if url.starts_with("http://") {
                    tracing::warn!(
                        "Foreman URL uses HTTP (not HTTPS); credentials are sent in clear text"
                    );
                }
                if user.is_empty() {
                    return Err(crate::Error::config("Foreman user cannot be empty"));
                }
                if password.is_empty() {
                    return Err(crate::Error::config("Foreman password cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the source type name
    pub fn type_name(&self) -> &str {
        match self {
            InventoryConfig::Foreman { .. } => "foreman",
        }
    }
}

// Custom Debug implementation that hides the password
impl fmt::Debug for InventoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryConfig::Foreman { url, user, .. } => f
                .debug_struct("Foreman")
                .field("url", url)
                .field("user", user)
                .field("password", &"<REDACTED>")
                .finish(),
        }
    }
}

/// Timeouts and paging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// How long to wait for another invocation to release the store
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,

    /// Upper bound for the initial inventory import
    #[serde(default = "default_import_timeout_secs")]
    pub import_timeout_secs: u64,

    /// Upper bound for the rename action
    #[serde(default = "default_notify_timeout_secs")]
    pub notify_timeout_secs: u64,

    /// Records requested per inventory page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl LimitsConfig {
    /// Validate numeric ranges
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(1..=600).contains(&self.lock_timeout_secs) {
            return Err(crate::Error::config(format!(
                "lock_timeout_secs must be between 1 and 600. Got: {}",
                self.lock_timeout_secs
            )));
        }
        if !(1..=3600).contains(&self.import_timeout_secs) {
            return Err(crate::Error::config(format!(
                "import_timeout_secs must be between 1 and 3600. Got: {}",
                self.import_timeout_secs
            )));
        }
        if !(1..=3600).contains(&self.notify_timeout_secs) {
            return Err(crate::Error::config(format!(
                "notify_timeout_secs must be between 1 and 3600. Got: {}",
                self.notify_timeout_secs
            )));
        }
        if !(1..=100_000).contains(&self.page_size) {
            return Err(crate::Error::config(format!(
                "page_size must be between 1 and 100000. Got: {}",
                self.page_size
            )));
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn import_timeout(&self) -> Duration {
        Duration::from_secs(self.import_timeout_secs)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            lock_timeout_secs: default_lock_timeout_secs(),
            import_timeout_secs: default_import_timeout_secs(),
            notify_timeout_secs: default_notify_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// One of trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Append log lines to this file instead of stderr
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl LogConfig {
    /// Validate the log level
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(crate::Error::config(format!(
                "Unsupported log level '{}'. Valid levels: trace, debug, info, warn, error",
                self.level
            ))),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            path: None,
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_PATH)
}

fn default_lock_timeout_secs() -> u64 {
    10
}

fn default_import_timeout_secs() -> u64 {
    300
}

fn default_notify_timeout_secs() -> u64 {
    60
}

fn default_page_size() -> u32 {
    1000
}

fn default_log_level() -> String {
    "warn".to_string()
}
