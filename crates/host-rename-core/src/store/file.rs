// # File Host Store
//
// File-based implementation of HostStore.
//
// ## Purpose
//
// Persists the identity table between hook invocations. The table is small
// (one row per managed host) and is loaded into an ordered map on open, so
// lookups never scan.
//
// ## Crash Safety
//
// - Atomic commits: every mutation writes `<path>.tmp`, fsyncs it, then renames
// - Atomic bootstrap: the first import is built at `<path>.import` and only
//   renamed onto `<path>` once complete
// - Corruption is fatal: an unreadable table is a storage error, never an
//   empty table (an empty baseline would hide renames)
//
// ## Permissions
//
// The table is created with mode 0600. An existing table that grants any
// group or other permission bits is refused.
//
// ## File Format
//
// ```json
// {
//   "schema": 1,
//   "created_at": "2026-01-09T12:00:00Z",
//   "hosts": [
//     { "id": 42, "name": "web01.example.com" }
//   ]
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::event::HostRecord;
use crate::importer::InventoryImporter;
use crate::traits::HostStore;

/// Table layout version
const STORE_SCHEMA: u32 = 1;

/// Permission bits for newly created tables
#[cfg(unix)]
const STORE_FILE_MODE: u32 = 0o600;

/// File-backed host store
///
/// # Example
///
/// ```rust,no_run
/// use host_rename_core::{FileHostStore, HostStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileHostStore::open("/var/lib/foreman-host-rename/hosts.json").await?;
///     store.upsert(42, "web01.example.com").await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileHostStore {
    path: PathBuf,
    created_at: DateTime<Utc>,
    hosts: RwLock<BTreeMap<i64, String>>,
}

/// Serializable table format
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StoreFileFormat {
    schema: u32,
    created_at: DateTime<Utc>,
    hosts: Vec<HostRecord>,
}

impl FileHostStore {
    /// Open an existing table
    ///
    /// Fails if the file is missing, has group/other permission bits,
    /// does not parse as a current-schema table, or holds a row that could
    /// never have been written (duplicate id, empty name).
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        let metadata = fs::metadata(&path).await.map_err(|e| {
            Error::storage(format!("Failed to stat store {}: {}", path.display(), e))
        })?;

        if !metadata.is_file() {
            return Err(Error::storage(format!(
                "Store {} is not a regular file",
                path.display()
            )));
        }

        check_permissions(&path, &metadata)?;

        let content = fs::read(&path).await.map_err(|e| {
            Error::storage(format!("Failed to read store {}: {}", path.display(), e))
        })?;

        let table: StoreFileFormat = serde_json::from_slice(&content).map_err(|e| {
            Error::storage(format!(
                "Store {} is corrupted: {}. Delete it to force a reimport.",
                path.display(),
                e
            ))
        })?;

        if table.schema != STORE_SCHEMA {
            return Err(Error::storage(format!(
                "Store {} has unsupported schema {} (expected {})",
                path.display(),
                table.schema,
                STORE_SCHEMA
            )));
        }

        let mut hosts = BTreeMap::new();
        for record in table.hosts {
            record.validate().map_err(|e| {
                Error::storage(format!(
                    "Store {} is corrupted: host {}: {}",
                    path.display(),
                    record.id,
                    e
                ))
            })?;
            if hosts.insert(record.id, record.name).is_some() {
                return Err(Error::storage(format!(
                    "Store {} is corrupted: duplicate host id {}",
                    path.display(),
                    record.id
                )));
            }
        }

        tracing::debug!("Opened store {}: {} hosts", path.display(), hosts.len());

        Ok(Self {
            path,
            created_at: table.created_at,
            hosts: RwLock::new(hosts),
        })
    }

    /// Create an empty table at `path`
    ///
    /// Parent directories are created if needed. Fails if something
    /// already exists at `path`.
    pub async fn create<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::storage(format!(
                        "Failed to create store directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        if exists(&path).await? {
            return Err(Error::storage(format!(
                "Refusing to create store {}: file already exists",
                path.display()
            )));
        }

        let store = Self {
            path,
            created_at: Utc::now(),
            hosts: RwLock::new(BTreeMap::new()),
        };
        store.write_table(&BTreeMap::new()).await?;

        tracing::info!("Created store {}", store.path.display());
        Ok(store)
    }

    /// Open the table at `path`, building it from the inventory if absent
    ///
    /// The import runs only when the file does not exist. The table is
    /// built at `<path>.import` and renamed onto `path` once every record
    /// is committed, so an interrupted import never leaves a table at `path`.
    pub async fn open_or_import<P: AsRef<Path>>(
        path: P,
        importer: &InventoryImporter<'_>,
    ) -> Result<Self, Error> {
        let path = path.as_ref();
        if exists(path).await? {
            return Self::open(path).await;
        }

        tracing::info!(
            "Store {} not found, importing hosts from {}",
            path.display(),
            importer.source_name()
        );

        // Left behind by an import that was killed
        let staging = suffixed(path, "import");
        remove_if_present(&staging).await?;

        let mut store = Self::create(&staging).await?;
        let count = match importer.import_all(&store).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("Import failed, discarding {}: {}", staging.display(), e);
                if let Err(discard_err) = store.discard().await {
                    tracing::error!("Failed to discard partial store: {}", discard_err);
                }
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&staging, path).await {
            let _ = store.discard().await;
            return Err(Error::storage(format!(
                "Failed to move imported store into {}: {}",
                path.display(),
                e
            )));
        }
        store.path = path.to_path_buf();

        tracing::info!("Imported {} hosts into {}", count, path.display());
        Ok(store)
    }

    /// Remove the table from disk
    ///
    /// Used to roll back a failed bootstrap. A missing file is not an error.
    pub async fn discard(self) -> Result<(), Error> {
        let _ = fs::remove_file(self.temp_path()).await;
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage(format!(
                "Failed to remove store {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Location of the table
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the table was first created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Write the table atomically
    async fn write_table(&self, hosts: &BTreeMap<i64, String>) -> Result<(), Error> {
        let table = StoreFileFormat {
            schema: STORE_SCHEMA,
            created_at: self.created_at,
            hosts: hosts
                .iter()
                .map(|(id, name)| HostRecord::new(*id, name.clone()))
                .collect(),
        };

        let json = serde_json::to_vec_pretty(&table)
            .map_err(|e| Error::storage(format!("Failed to serialize store: {}", e)))?;

        let temp_path = self.temp_path();
        if let Err(e) = write_private(&temp_path, &json).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::storage(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Store written: {} ({} hosts)", self.path.display(), hosts.len());
        Ok(())
    }

    /// Apply `change` to a copy of the table and commit it
    ///
    /// The in-memory table is only replaced once the file is on disk.
    async fn commit<F>(&self, change: F) -> Result<(), Error>
    where
        F: FnOnce(&mut BTreeMap<i64, String>) + Send,
    {
        let mut guard = self.hosts.write().await;
        let mut next = guard.clone();
        change(&mut next);
        self.write_table(&next).await?;
        *guard = next;
        Ok(())
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        suffixed(&self.path, "tmp")
    }
}

#[async_trait]
impl HostStore for FileHostStore {
    async fn get(&self, id: i64) -> Result<Option<HostRecord>, Error> {
        let guard = self.hosts.read().await;
        Ok(guard.get(&id).map(|name| HostRecord::new(id, name.clone())))
    }

    async fn upsert(&self, id: i64, name: &str) -> Result<(), Error> {
        crate::event::validate_name(name)
            .map_err(|e| Error::storage(format!("Rejected upsert of host {}: {}", id, e)))?;
        let name = name.to_string();
        self.commit(move |hosts| {
            hosts.insert(id, name);
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<(), Error> {
        if !self.hosts.read().await.contains_key(&id) {
            return Ok(());
        }
        self.commit(move |hosts| {
            hosts.remove(&id);
        })
        .await
    }

    async fn insert_all(&self, records: &[HostRecord]) -> Result<(), Error> {
        for record in records {
            record
                .validate()
                .map_err(|e| Error::storage(format!("Rejected host {}: {}", record.id, e)))?;
        }
        self.commit(|hosts| {
            for record in records {
                hosts.insert(record.id, record.name.clone());
            }
        })
        .await
    }

    async fn len(&self) -> Result<usize, Error> {
        Ok(self.hosts.read().await.len())
    }

    async fn list(&self) -> Result<Vec<HostRecord>, Error> {
        let guard = self.hosts.read().await;
        Ok(guard
            .iter()
            .map(|(id, name)| HostRecord::new(*id, name.clone()))
            .collect())
    }
}

/// `<path>.<suffix>`, keeping the full file name
fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

async fn remove_if_present(path: &Path) -> Result<(), Error> {
    match fs::remove_file(path).await {
        Ok(()) => {
            tracing::warn!("Removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::storage(format!(
            "Failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}

async fn exists(path: &Path) -> Result<bool, Error> {
    fs::try_exists(path)
        .await
        .map_err(|e| Error::storage(format!("Failed to check {}: {}", path.display(), e)))
}

/// Write `data` to a fresh owner-only file and fsync it
async fn write_private(path: &Path, data: &[u8]) -> Result<(), Error> {
    // The mode only applies on creation, so never reuse a stale temp file.
    let _ = fs::remove_file(path).await;

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(STORE_FILE_MODE);

    let mut file = options.open(path).await.map_err(|e| {
        Error::storage(format!("Failed to create {}: {}", path.display(), e))
    })?;

    file.write_all(data).await.map_err(|e| {
        Error::storage(format!("Failed to write {}: {}", path.display(), e))
    })?;

    file.sync_all().await.map_err(|e| {
        Error::storage(format!("Failed to sync {}: {}", path.display(), e))
    })?;

    Ok(())
}

#[cfg(unix)]
fn check_permissions(path: &Path, metadata: &std::fs::Metadata) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode() & 0o777;
    if mode & 0o077 != 0 {
        return Err(Error::InsecureStore {
            path: path.to_path_buf(),
            mode,
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path, _metadata: &std::fs::Metadata) -> Result<(), Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_store_basic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts.json");

        let store = FileHostStore::create(&path).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 0);

        store.upsert(7, "seven.example.com").await.unwrap();
        assert_eq!(
            store.get(7).await.unwrap(),
            Some(HostRecord::new(7, "seven.example.com"))
        );
        assert!(path.exists());

        // Reopen and verify persistence
        let reopened = FileHostStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get(7).await.unwrap(),
            Some(HostRecord::new(7, "seven.example.com"))
        );
        assert_eq!(reopened.created_at(), store.created_at());
    }

    #[tokio::test]
    async fn test_create_refuses_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts.json");

        FileHostStore::create(&path).await.unwrap();
        let err = FileHostStore::create(&path).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[tokio::test]
    async fn test_create_makes_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("db").join("hosts.json");

        FileHostStore::create(&path).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_corrupted_store_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts.json");

        let store = FileHostStore::create(&path).await.unwrap();
        store.upsert(1, "a.example.com").await.unwrap();
        fs::write(&path, b"corrupted json data").await.unwrap();

        let err = FileHostStore::open(&path).await.unwrap_err();
        assert!(err.to_string().contains("corrupted"));
    }

    #[tokio::test]
    async fn test_duplicate_ids_on_disk_are_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts.json");

        FileHostStore::create(&path).await.unwrap();
        let doc = r#"{"schema":1,"created_at":"2026-01-01T00:00:00Z","hosts":[
            {"id":1,"name":"a.example.com"},{"id":1,"name":"b.example.com"}]}"#;
        fs::write(&path, doc).await.unwrap();

        let err = FileHostStore::open(&path).await.unwrap_err();
        assert!(err.to_string().contains("duplicate host id 1"));
    }

    #[tokio::test]
    async fn test_unknown_schema_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts.json");

        FileHostStore::create(&path).await.unwrap();
        fs::write(&path, r#"{"schema":99,"created_at":"2026-01-01T00:00:00Z","hosts":[]}"#)
            .await
            .unwrap();

        let err = FileHostStore::open(&path).await.unwrap_err();
        assert!(err.to_string().contains("unsupported schema 99"));
    }

    #[tokio::test]
    async fn test_insert_all_single_commit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts.json");

        let store = FileHostStore::create(&path).await.unwrap();
        store
            .insert_all(&[
                HostRecord::new(2, "b.example.com"),
                HostRecord::new(1, "a.example.com"),
                HostRecord::new(2, "b2.example.com"),
            ])
            .await
            .unwrap();

        let reopened = FileHostStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.list().await.unwrap(),
            vec![
                HostRecord::new(1, "a.example.com"),
                HostRecord::new(2, "b2.example.com"),
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_batch_leaves_table_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts.json");

        let store = FileHostStore::create(&path).await.unwrap();
        store.upsert(1, "a.example.com").await.unwrap();

        let err = store
            .insert_all(&[HostRecord::new(2, "b.example.com"), HostRecord::new(3, "")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(store.len().await.unwrap(), 1);

        let reopened = FileHostStore::open(&path).await.unwrap();
        assert_eq!(reopened.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_nameless_row_is_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts.json");

        FileHostStore::create(&path).await.unwrap();
        let doc = r#"{"schema":1,"created_at":"2026-01-01T00:00:00Z","hosts":[
            {"id":1,"name":"a.example.com"},{"id":2}]}"#;
        fs::write(&path, doc).await.unwrap();

        let err = FileHostStore::open(&path).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(err.to_string().contains("host 2"));
    }

    #[tokio::test]
    async fn test_temp_file_keeps_full_name() {
        let dir = tempdir().unwrap();

        let json = FileHostStore::create(dir.path().join("hosts.json")).await.unwrap();
        let db = FileHostStore::create(dir.path().join("hosts.db")).await.unwrap();
        assert_eq!(json.temp_path(), dir.path().join("hosts.json.tmp"));
        assert_ne!(json.temp_path(), db.temp_path());

        // A store named *.tmp must not collide with its own temp file
        let tmp = FileHostStore::create(dir.path().join("hosts.tmp")).await.unwrap();
        tmp.upsert(1, "a.example.com").await.unwrap();
        tmp.upsert(2, "b.example.com").await.unwrap();
        let reopened = FileHostStore::open(dir.path().join("hosts.tmp")).await.unwrap();
        assert_eq!(reopened.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_discard_removes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts.json");

        let store = FileHostStore::create(&path).await.unwrap();
        store.discard().await.unwrap();
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_created_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts.json");

        let store = FileHostStore::create(&path).await.unwrap();
        store.upsert(1, "a.example.com").await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
