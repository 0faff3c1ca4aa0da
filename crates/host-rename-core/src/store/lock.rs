// # Store Lock
//
// Advisory single-writer lock around the file-backed store.
//
// Foreman normally runs hooks for one host serially, but nothing stops two
// hosts being saved at once. Each invocation takes an exclusive `flock(2)`
// on `<store>.lock` before opening the store and releases it when the
// guard is dropped, on success and on every error path.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::Error;

/// How often a contended lock is retried
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exclusive lock on a store location, released on drop
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Lock file path for a store
    pub fn lock_path(store_path: &Path) -> PathBuf {
        let mut name = store_path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Acquire the lock for `store_path`, waiting up to `timeout`
    ///
    /// # Returns
    ///
    /// - `Ok(StoreLock)`: The lock is held until the guard is dropped
    /// - `Err(Error::LockTimeout)`: Another holder kept it past `timeout`
    /// - `Err(Error::Storage)`: The lock file could not be opened or locked
    pub async fn acquire(store_path: &Path, timeout: Duration) -> Result<Self, Error> {
        let path = Self::lock_path(store_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    Error::storage(format!(
                        "Failed to create store directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let file = open_lock_file(&path)?;
        let deadline = Instant::now() + timeout;

        loop {
            match try_lock_exclusive(&file) {
                Ok(true) => {
                    tracing::debug!("Acquired store lock {}", path.display());
                    return Ok(Self { file, path });
                }
                Ok(false) => {}
                Err(e) => {
                    return Err(Error::storage(format!(
                        "Failed to lock {}: {}",
                        path.display(),
                        e
                    )));
                }
            }

            if Instant::now() >= deadline {
                tracing::warn!(
                    "Store lock {} still held after {:?}",
                    path.display(),
                    timeout
                );
                return Err(Error::LockTimeout(timeout));
            }

            tokio::time::sleep(LOCK_POLL_INTERVAL).await;
        }
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        unlock(&self.file);
        tracing::trace!("Released store lock {}", self.path.display());
    }
}

fn open_lock_file(path: &Path) -> Result<File, Error> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path).map_err(|e| {
        Error::storage(format!("Failed to open lock file {}: {}", path.display(), e))
    })
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> std::io::Result<bool> {
    use std::os::unix::io::AsRawFd;

    // SAFETY: the descriptor is owned by `file` and stays open for the call.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(true);
    }

    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        Ok(false)
    } else {
        Err(err)
    }
}

#[cfg(unix)]
fn unlock(file: &File) {
    use std::os::unix::io::AsRawFd;

    // SAFETY: as above; closing the descriptor would release it as well.
    unsafe {
        libc::flock(file.as_raw_fd(), libc::LOCK_UN);
    }
}

#[cfg(not(unix))]
fn try_lock_exclusive(_file: &File) -> std::io::Result<bool> {
    Ok(true)
}

#[cfg(not(unix))]
fn unlock(_file: &File) {}
