//! Builds the hook configuration from the process environment
//!
//! The first settings file found is the whole configuration:
//! 1. The file named by `HOST_RENAME_CONFIG`
//! 2. [`DEFAULT_CONFIG_FILE`], when it exists
//!
//! Foreman runs hooks with its own environment, so an installed hook
//! normally relies on the second. Without either file every value comes
//! from a `HOST_RENAME_*` variable, with the library defaults for anything
//! unset.

use anyhow::{Context, Result};
use host_rename_core::config::{DEFAULT_DATABASE_PATH, LimitsConfig, LogConfig};
use host_rename_core::{HookConfig, InventoryConfig};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Names a JSON settings file that replaces the variables below
pub const CONFIG_FILE_VAR: &str = "HOST_RENAME_CONFIG";

/// Settings file read when `HOST_RENAME_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "/etc/foreman-host-rename/settings.json";

/// Load the configuration from the real environment
pub fn from_env() -> Result<HookConfig> {
    load(|key| std::env::var(key).ok(), Path::new(DEFAULT_CONFIG_FILE))
}

/// Load the configuration through `lookup`, falling back to `default_file`
pub fn load(lookup: impl Fn(&str) -> Option<String>, default_file: &Path) -> Result<HookConfig> {
    if let Some(path) = lookup(CONFIG_FILE_VAR).filter(|p| !p.is_empty()) {
        return Ok(HookConfig::from_file(&path)?);
    }

    if default_file.is_file() {
        return Ok(HookConfig::from_file(default_file)?);
    }

    let required = |key: &str| -> Result<String> {
        lookup(key)
            .filter(|v| !v.is_empty())
            .with_context(|| {
                format!(
                    "{} is required. Set it via: export {}=... or write the settings file {}",
                    key,
                    key,
                    default_file.display()
                )
            })
    };

    let inventory = InventoryConfig::Foreman {
        url: required("HOST_RENAME_FOREMAN_URL")?,
        user: required("HOST_RENAME_FOREMAN_USER")?,
        password: required("HOST_RENAME_FOREMAN_PASSWORD")?,
    };

    let database_path = lookup("HOST_RENAME_DATABASE_PATH")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));

    let mut config = HookConfig::new(
        database_path,
        required("HOST_RENAME_COMMAND")?,
        inventory,
    );

    let defaults = LimitsConfig::default();
    config.limits = LimitsConfig {
        lock_timeout_secs: parse_or(
            &lookup,
            "HOST_RENAME_LOCK_TIMEOUT_SECS",
            defaults.lock_timeout_secs,
        )?,
        import_timeout_secs: parse_or(
            &lookup,
            "HOST_RENAME_IMPORT_TIMEOUT_SECS",
            defaults.import_timeout_secs,
        )?,
        notify_timeout_secs: parse_or(
            &lookup,
            "HOST_RENAME_NOTIFY_TIMEOUT_SECS",
            defaults.notify_timeout_secs,
        )?,
        page_size: parse_or(&lookup, "HOST_RENAME_PAGE_SIZE", defaults.page_size)?,
    };

    let mut log = LogConfig::default();
    if let Some(level) = lookup("HOST_RENAME_LOG_LEVEL").filter(|v| !v.is_empty()) {
        log.level = level;
    }
    log.path = lookup("HOST_RENAME_LOG_PATH")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    config.log = log;

    Ok(config)
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number. Got: {}", key, raw)),
        None => Ok(default),
    }
}
