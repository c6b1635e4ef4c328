// # Memory Device
//
// In-memory implementation of AddressBookDevice.
//
// ## Purpose
//
// Holds the committed address-book in process memory. Useful for tests,
// dry runs and embedding, where no real device is involved.
//
// ## Locking
//
// The committed address-book sits behind an async mutex. A session owns the
// lock guard for its lifetime, so a second `begin()` fails until the first
// session is dropped.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::AddressBook;
use crate::Error;
use crate::aggregate::DeviceAddress;
use crate::config::DeviceConfig;
use crate::plan::Command;
use crate::traits::device::{AddressBookDevice, ConfigSession, DeviceFactory};

/// In-memory address-book device
///
/// Clones share the same committed address-book.
///
/// # Example
///
/// ```rust,no_run
/// use addrsync_core::device::{AddressBook, MemoryDevice};
/// use addrsync_core::traits::AddressBookDevice;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let device = MemoryDevice::with_book(
///         AddressBook::new().with_address("cdn-a", "1.1.1.1/32"),
///     );
///
///     let session = device.begin().await?;
///     assert_eq!(session.snapshot().await?.len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDevice {
    committed: Arc<Mutex<AddressBook>>,
}

impl MemoryDevice {
    /// Create a device with an empty address-book
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a device seeded with an address-book
    pub fn with_book(book: AddressBook) -> Self {
        Self {
            committed: Arc::new(Mutex::new(book)),
        }
    }

    /// Copy of the committed address-book
    ///
    /// Waits while a session is open.
    pub async fn book(&self) -> AddressBook {
        self.committed.lock().await.clone()
    }

    /// Whether a session currently holds the lock
    pub fn is_locked(&self) -> bool {
        self.committed.try_lock().is_err()
    }
}

#[async_trait]
impl AddressBookDevice for MemoryDevice {
    async fn begin(&self) -> Result<Box<dyn ConfigSession>, Error> {
        let guard = self
            .committed
            .clone()
            .try_lock_owned()
            .map_err(|_| Error::device("configuration database is locked by another session"))?;

        let candidate = guard.clone();
        Ok(Box::new(MemorySession { guard, candidate }))
    }

    fn device_name(&self) -> &'static str {
        "memory"
    }
}

/// Session on a [`MemoryDevice`]
struct MemorySession {
    guard: OwnedMutexGuard<AddressBook>,
    candidate: AddressBook,
}

#[async_trait]
impl ConfigSession for MemorySession {
    async fn snapshot(&self) -> Result<Vec<DeviceAddress>, Error> {
        Ok(self.guard.snapshot())
    }

    async fn apply(&mut self, commands: &[Command]) -> Result<(), Error> {
        self.candidate.apply(commands)
    }

    async fn has_pending_changes(&self) -> Result<bool, Error> {
        Ok(self.candidate != *self.guard)
    }

    async fn commit(&mut self) -> Result<(), Error> {
        self.candidate.check()?;
        *self.guard = self.candidate.clone();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), Error> {
        self.candidate = self.guard.clone();
        Ok(())
    }
}

/// Factory for creating memory devices
pub struct MemoryDeviceFactory;

impl DeviceFactory for MemoryDeviceFactory {
    fn create(&self, config: &DeviceConfig) -> Result<Box<dyn AddressBookDevice>, Error> {
        match config {
            DeviceConfig::Memory => Ok(Box::new(MemoryDevice::new())),
            _ => Err(Error::config("Invalid config for memory device")),
        }
    }
}
