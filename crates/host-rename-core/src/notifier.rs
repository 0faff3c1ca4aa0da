//! Command-based rename notifier
//!
//! Runs the configured executable as `<command> <old_name> <new_name>`.
//! The names are passed as separate argv entries, so shell metacharacters
//! in a host name are never interpreted.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::traits::{NotifyOutcome, RenameNotifier};

/// Values that show the command was never filled in
const PLACEHOLDER_MARKERS: &[&str] = &["/path/to/", "changeme", "replace_me", "your_"];

/// Runs an external program when a host is renamed
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: PathBuf,
    timeout: Duration,
}

impl CommandNotifier {
    /// Create a notifier for `program`
    ///
    /// Rejects empty and placeholder commands. Whether the file exists and
    /// is executable is checked when the configuration is validated.
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let program = program.into();
        check_command(&program)?;
        Ok(Self { program, timeout })
    }

    /// Program that is run
    pub fn program(&self) -> &Path {
        &self.program
    }
}

/// Reject commands that cannot be meant seriously
pub fn check_command(program: &Path) -> Result<()> {
    let text = program.to_string_lossy();
    if text.trim().is_empty() {
        return Err(Error::config("rename hook command cannot be empty"));
    }

    let lower = text.to_lowercase();
    if PLACEHOLDER_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return Err(Error::config(format!(
            "rename hook command appears to be a placeholder: {}",
            text
        )));
    }
    Ok(())
}

#[async_trait]
impl RenameNotifier for CommandNotifier {
    async fn notify(&self, old_name: &str, new_name: &str) -> Result<NotifyOutcome> {
        if old_name.is_empty() || new_name.is_empty() {
            return Err(Error::invariant(format!(
                "rename detected with an empty name (old={:?}, new={:?})",
                old_name, new_name
            )));
        }

        debug!(
            "Running the rename hook action: {} {} {}",
            self.program.display(),
            old_name,
            new_name
        );

        let child = Command::new(&self.program)
            .arg(old_name)
            .arg(new_name)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::notify(format!("failed to launch {}: {}", self.program.display(), e))
            })?;

        // Dropping the pending future on timeout kills the child.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| {
                Error::notify(format!("failed to wait for {}: {}", self.program.display(), e))
            })?,
            Err(_) => return Err(Error::NotifyTimeout(self.timeout)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            debug!("Rename hook stdout: {}", stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            debug!("Rename hook stderr: {}", stderr.trim_end());
        }

        if output.status.success() {
            Ok(NotifyOutcome::Succeeded)
        } else {
            let code = output.status.code();
            warn!(
                "The rename hook returned a non-zero status ({}) for {} -> {}",
                code.map(|c| c.to_string())
                    .unwrap_or_else(|| "killed by signal".to_string()),
                old_name,
                new_name
            );
            Ok(NotifyOutcome::Failed { code })
        }
    }
}
