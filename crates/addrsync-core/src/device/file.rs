// # File Device
//
// File-backed implementation of AddressBookDevice.
//
// ## Purpose
//
// Keeps the committed address-book in a JSON file so that consecutive
// runs see the state left by the previous one. Used for offline
// reconciliation and for staging a configuration before it is pushed to a
// real device.
//
// ## Commit
//
// - Atomic writes: new state written to a temporary file, then renamed
// - Backup: the previous file is kept as `.backup`
// - Recovery: a corrupted file falls back to the backup on load
//
// The configuration lock is process-local.
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "committed_at": "2025-01-09T12:00:00Z",
//   "address_book": {
//     "addresses": { "cdn-7htx1h1srat6n": "1.2.3.4/32" },
//     "address_sets": {
//       "cdn": { "description": "IP addresses from ...", "members": ["cdn-7htx1h1srat6n"] }
//     }
//   }
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::AddressBook;
use crate::Error;
use crate::aggregate::DeviceAddress;
use crate::config::DeviceConfig;
use crate::plan::Command;
use crate::traits::device::{AddressBookDevice, ConfigSession, DeviceFactory};

/// Address-book file format version
const BOOK_FILE_VERSION: &str = "1.0";

/// Serializable address-book file
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct BookFileFormat {
    version: String,
    #[serde(default)]
    committed_at: Option<chrono::DateTime<chrono::Utc>>,
    address_book: AddressBook,
}

/// File-backed address-book device
///
/// # Example
///
/// ```rust,no_run
/// use addrsync_core::device::FileDevice;
/// use addrsync_core::traits::AddressBookDevice;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let device = FileDevice::new("/var/lib/addrsync/address-book.json");
///
///     let session = device.begin().await?;
///     for entry in session.snapshot().await? {
///         println!("{} {}", entry.name, entry.address);
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileDevice {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileDevice {
    /// Create a device backed by the given file
    ///
    /// The file does not need to exist; a missing file is an empty
    /// address-book.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Path of the address-book file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the committed address-book, recovering from the backup if the
    /// main file is corrupted
    pub async fn load(&self) -> Result<AddressBook, Error> {
        match Self::load_file(&self.path).await {
            Ok(book) => Ok(book),
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Address-book file {} appears corrupted: {}. Attempting recovery from backup.",
                    self.path.display(),
                    e
                );

                let backup_path = Self::backup_path(&self.path);
                if !backup_path.exists() {
                    return Err(Error::device(format!(
                        "Address-book file {} is corrupted and no backup exists",
                        self.path.display()
                    )));
                }

                let book = Self::load_file(&backup_path).await?;
                tracing::info!(
                    "Recovered address-book from backup: {} addresses",
                    book.addresses.len()
                );
                Ok(book)
            }
            Err(e) => Err(e),
        }
    }

    async fn load_file(path: &Path) -> Result<AddressBook, Error> {
        if !path.exists() {
            tracing::debug!("Address-book file does not exist: {}", path.display());
            return Ok(AddressBook::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::device(format!(
                "Failed to read address-book file {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: BookFileFormat = serde_json::from_str(&content)?;

        if file.version != BOOK_FILE_VERSION {
            tracing::warn!(
                "Address-book file version mismatch: expected {}, got {}. Attempting to load anyway.",
                BOOK_FILE_VERSION,
                file.version
            );
        }

        Ok(file.address_book)
    }

    /// Write the address-book atomically
    async fn write_book(path: &Path, book: &AddressBook) -> Result<(), Error> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::device(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let file = BookFileFormat {
            version: BOOK_FILE_VERSION.to_string(),
            committed_at: Some(chrono::Utc::now()),
            address_book: book.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let temp_path = Self::temp_path(path);
        {
            let mut out = fs::File::create(&temp_path).await.map_err(|e| {
                Error::device(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            out.write_all(json.as_bytes()).await?;
            out.flush().await?;
        }

        if path.exists() {
            let backup_path = Self::backup_path(path);
            if let Err(e) = fs::copy(path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, path).await.map_err(|e| {
            Error::device(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::trace!("Address-book written to {}", path.display());
        Ok(())
    }

    fn temp_path(path: &Path) -> PathBuf {
        let mut temp = path.to_path_buf();
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
impl AddressBookDevice for FileDevice {
    async fn begin(&self) -> Result<Box<dyn ConfigSession>, Error> {
        let guard = self
            .lock
            .clone()
            .try_lock_owned()
            .map_err(|_| Error::device("configuration database is locked by another session"))?;

        let committed = self.load().await?;
        Ok(Box::new(FileSession {
            _guard: guard,
            path: self.path.clone(),
            candidate: committed.clone(),
            committed,
        }))
    }

    fn device_name(&self) -> &'static str {
        "file"
    }
}

/// Session on a [`FileDevice`]
struct FileSession {
    _guard: OwnedMutexGuard<()>,
    path: PathBuf,
    committed: AddressBook,
    candidate: AddressBook,
}

#[async_trait]
impl ConfigSession for FileSession {
    async fn snapshot(&self) -> Result<Vec<DeviceAddress>, Error> {
        Ok(self.committed.snapshot())
    }

    async fn apply(&mut self, commands: &[Command]) -> Result<(), Error> {
        self.candidate.apply(commands)
    }

    async fn has_pending_changes(&self) -> Result<bool, Error> {
        Ok(self.candidate != self.committed)
    }

    async fn commit(&mut self) -> Result<(), Error> {
        self.candidate.check()?;
        FileDevice::write_book(&self.path, &self.candidate).await?;
        self.committed = self.candidate.clone();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), Error> {
        self.candidate = self.committed.clone();
        Ok(())
    }
}

/// Factory for creating file devices
pub struct FileDeviceFactory;

impl DeviceFactory for FileDeviceFactory {
    fn create(&self, config: &DeviceConfig) -> Result<Box<dyn AddressBookDevice>, Error> {
        match config {
            DeviceConfig::File { path } => Ok(Box::new(FileDevice::new(path))),
            _ => Err(Error::config("Invalid config for file device")),
        }
    }
}
