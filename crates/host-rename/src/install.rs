//! Installation of the hook shims into Foreman's hook tree
//!
//! Foreman runs every executable under `HOOKDIR/<event>/` for the matching
//! host event. The shim only re-executes this binary with the same arguments.

use anyhow::{Result, bail};
use host_rename_core::HookAction;
use std::path::{Path, PathBuf};

/// Default hook tree of a packaged Foreman install
pub const DEFAULT_HOOK_DIR: &str = "/usr/share/foreman/config/hooks/host/managed";

/// File name of the shim in each event directory
pub const SHIM_NAME: &str = "99_host_rename";

/// What `install` did
#[derive(Debug, Default)]
pub struct InstallReport {
    /// Shims written by this run
    pub written: Vec<PathBuf>,
    /// Shims that were already present and left untouched
    pub skipped: Vec<PathBuf>,
}

/// Write a shim for `program` into every event directory under `hookdir`
///
/// Every event directory must exist; nothing is written otherwise.
pub fn install(hookdir: &Path, program: &Path) -> Result<InstallReport> {
    if !hookdir.is_dir() {
        bail!("hook directory not found: {}", hookdir.display());
    }

    let event_dirs: Vec<PathBuf> = HookAction::ALL
        .iter()
        .map(|action| hookdir.join(action.as_str()))
        .collect();
    if let Some(missing) = event_dirs.iter().find(|dir| !dir.is_dir()) {
        bail!("path not found: {}", missing.display());
    }

    let script = shim_script(program);
    let mut report = InstallReport::default();
    for dir in event_dirs {
        let shim = dir.join(SHIM_NAME);
        if shim.exists() {
            tracing::debug!("Keeping existing shim {}", shim.display());
            report.skipped.push(shim);
            continue;
        }

        std::fs::write(&shim, &script)?;
        make_executable(&shim)?;
        tracing::info!("Installed {}", shim.display());
        report.written.push(shim);
    }

    Ok(report)
}

/// Create the directory that holds the settings file
///
/// The settings carry the Foreman password, so a new directory gets no
/// permissions for others (group access lets the `foreman` group read it).
/// Returns `false` when it already existed.
pub fn create_config_dir(dir: &Path) -> Result<bool> {
    if dir.is_dir() {
        return Ok(false);
    }

    std::fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o750))?;
    }
    tracing::info!("Created {}", dir.display());
    Ok(true)
}

/// Remove the shims written by [`install`]
///
/// Returns the shims that were removed; absent shims are not an error.
pub fn uninstall(hookdir: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for action in HookAction::ALL {
        let shim = hookdir.join(action.as_str()).join(SHIM_NAME);
        match std::fs::remove_file(&shim) {
            Ok(()) => {
                tracing::info!("Removed {}", shim.display());
                removed.push(shim);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => bail!("failed to remove {}: {}", shim.display(), e),
        }
    }
    Ok(removed)
}

fn shim_script(program: &Path) -> String {
    let quoted = program.to_string_lossy().replace('\'', r"'\''");
    format!("#!/bin/sh\nexec '{}' \"$@\"\n", quoted)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
