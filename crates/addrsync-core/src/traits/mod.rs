//! Collaborator traits
//!
//! This module defines the abstract interfaces of the I/O collaborators.
//!
//! - [`AddressSource`]: Fetch desired addresses
//! - [`AddressBookDevice`]: Open transactional sessions on the device
//! - [`ConfigSession`]: Snapshot, apply, commit, roll back

pub mod address_source;
pub mod device;

pub use address_source::{AddressSource, AddressSourceFactory};
pub use device::{AddressBookDevice, ConfigSession, DeviceFactory};
