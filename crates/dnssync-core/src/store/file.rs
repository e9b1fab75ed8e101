// # File Record Store
//
// File-based implementation of RecordStore for local and offline runs.
//
// ## Purpose
//
// Lets the worker reconcile a JSON file of change requests instead of a
// database table. Whatever enqueues changes appends to the file; the
// worker flips `processed` in place.
//
// ## Crash Recovery
//
// - Atomic writes: write to `.tmp`, then rename over the file
// - Backup: the previous version is kept as `.backup`
// - Recovery: a corrupted file is restored from the backup
//
// Restoring an older backup can only turn processed requests back into
// pending ones, which the next pass re-applies.
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "requests": [
//     { "id": 1, "perform": "create", "type": "A", "name": "www",
//       "content": "192.0.2.1", "ttl": 3600, "proxied": false, "processed": false }
//   ]
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::Error;
use crate::record::RequestId;
use crate::traits::record_store::{ChangeRequest, RecordStore};

/// Request file format version
const REQUEST_FILE_VERSION: &str = "1.0";

/// File-based record store with crash recovery
///
/// The file is re-read on every fetch and every mark so requests appended
/// by other writers are picked up and never overwritten.
#[derive(Debug)]
pub struct FileRecordStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

/// Serializable request file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct RequestFileFormat {
    version: String,
    requests: Vec<ChangeRequest>,
}

impl FileRecordStore {
    /// Open a request file
    ///
    /// A missing file is an empty queue. Parent directories are created.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create request directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        // Fail at open on a corrupted file without a usable backup
        Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Load requests, falling back to the backup if the file is corrupted
    async fn load_with_recovery(path: &Path) -> Result<Vec<ChangeRequest>, Error> {
        match Self::load(path).await {
            Ok(requests) => {
                tracing::debug!("Loaded {} request(s) from {}", requests.len(), path.display());
                Ok(requests)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Request file {} appears corrupted: {}. Attempting recovery from backup.",
                    path.display(),
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    return Err(Error::store(format!(
                        "Request file {} is corrupted and has no backup: {}",
                        path.display(),
                        e
                    )));
                }

                let requests = Self::load(&backup_path).await.map_err(|backup_err| {
                    Error::store(format!(
                        "Request file {} and its backup are both unreadable: {}",
                        path.display(),
                        backup_err
                    ))
                })?;

                fs::copy(&backup_path, path).await.map_err(|copy_err| {
                    Error::store(format!(
                        "Failed to restore {} from backup: {}",
                        path.display(),
                        copy_err
                    ))
                })?;

                tracing::info!("Recovered {} request(s) from backup", requests.len());
                Ok(requests)
            }
            Err(e) => Err(e),
        }
    }

    /// Load requests from a file; JSON problems surface as `Error::Json`
    async fn load(path: &Path) -> Result<Vec<ChangeRequest>, Error> {
        if !path.exists() {
            tracing::debug!("Request file does not exist: {}", path.display());
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::store(format!(
                "Failed to read request file {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: RequestFileFormat = serde_json::from_str(&content)?;

        if file.version != REQUEST_FILE_VERSION {
            tracing::warn!(
                "Request file version mismatch: expected {}, got {}. Attempting to load anyway.",
                REQUEST_FILE_VERSION,
                file.version
            );
        }

        Ok(file.requests)
    }

    /// Write requests to the file atomically
    async fn write(&self, requests: &[ChangeRequest]) -> Result<(), Error> {
        let file = RequestFileFormat {
            version: REQUEST_FILE_VERSION.to_string(),
            requests: requests.to_vec(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let temp_path = self.temp_path();
        {
            let mut handle = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            handle.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!(
                    "Failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            handle.flush().await.map_err(|e| {
                Error::store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Request file written: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn fetch_pending(&self) -> Result<Vec<ChangeRequest>, Error> {
        let _guard = self.write_lock.lock().await;
        let requests = Self::load_with_recovery(&self.path).await?;
        Ok(requests.into_iter().filter(|r| !r.processed).collect())
    }

    async fn mark_processed(&self, id: &RequestId) -> Result<(), Error> {
        let _guard = self.write_lock.lock().await;

        // Rows appended since the fetch must survive the rewrite
        let mut requests = Self::load_with_recovery(&self.path).await?;

        let request = requests
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| Error::store(format!("No change request with id {}", id)))?;

        if request.processed {
            return Ok(());
        }
        request.processed = true;

        // Immediate write for durability
        self.write(&requests).await
    }

    fn store_name(&self) -> &'static str {
        "file"
    }
}
