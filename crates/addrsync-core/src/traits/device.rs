// # Address-Book Device Trait
//
// Defines the transactional session protocol against the device that
// holds the address-book:
//
// ```text
// begin() ──► session ──► snapshot()
//                    └──► apply(commands) ──► has_pending_changes()
//                                        ├──► commit()
//                                        └──► rollback()
// ```
//
// A session holds the configuration lock for its whole lifetime and
// releases it when dropped. The engine guarantees `rollback()` on every
// failure path after `begin()`.

use crate::aggregate::DeviceAddress;
use crate::plan::Command;
use async_trait::async_trait;

/// Device holding the address-book
#[async_trait]
pub trait AddressBookDevice: Send + Sync {
    /// Open a configuration session and take the configuration lock
    ///
    /// # Returns
    ///
    /// - `Ok(session)`: Exclusive session
    /// - `Err(Error)`: Unreachable device or lock held by someone else
    async fn begin(&self) -> Result<Box<dyn ConfigSession>, crate::Error>;

    /// Get the device name (for logging/debugging)
    fn device_name(&self) -> &'static str;
}

/// An open, locked configuration session
#[async_trait]
pub trait ConfigSession: Send + Sync {
    /// Address objects in the global address-book, as committed
    async fn snapshot(&self) -> Result<Vec<DeviceAddress>, crate::Error>;

    /// Load commands into the candidate configuration
    ///
    /// A failure leaves the candidate in an unspecified state; the caller
    /// must roll back.
    async fn apply(&mut self, commands: &[Command]) -> Result<(), crate::Error>;

    /// Whether the candidate differs from the committed configuration
    async fn has_pending_changes(&self) -> Result<bool, crate::Error>;

    /// Commit the candidate configuration
    async fn commit(&mut self) -> Result<(), crate::Error>;

    /// Discard uncommitted changes
    async fn rollback(&mut self) -> Result<(), crate::Error>;
}

/// Helper trait for constructing devices from configuration
pub trait DeviceFactory: Send + Sync {
    /// Create a device instance from configuration
    fn create(
        &self,
        config: &crate::config::DeviceConfig,
    ) -> Result<Box<dyn AddressBookDevice>, crate::Error>;
}
