//! Plugin-based source and device registry
//!
//! The registry allows address sources and devices to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use addrsync_core::registry::SyncRegistry;
//! use addrsync_core::config::SourceConfig;
//!
//! // Registry with the built-in static source and memory/file devices
//! let registry = SyncRegistry::with_builtins();
//!
//! // Plugin crates add their own factories
//! addrsync_source_http::register(&registry);
//!
//! let source = registry.create_source(&SourceConfig::parse("https://example.net/ips.txt")?)?;
//! ```
//!
//! ## Registration
//!
//! Implementations should register themselves during initialization:
//!
//! ```rust,ignore
//! // In addrsync-source-dns crate
//! pub fn register(registry: &SyncRegistry) {
//!     registry.register_source("dns", Box::new(DnsSourceFactory));
//! }
//! ```

use crate::config::{DeviceConfig, SourceConfig};
use crate::device::{FileDeviceFactory, MemoryDeviceFactory};
use crate::error::{Error, Result};
use crate::sources::StaticSourceFactory;
use crate::traits::{AddressBookDevice, AddressSource};
use crate::traits::{AddressSourceFactory, DeviceFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Registry for plugin-based source and device creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct SyncRegistry {
    /// Registered address source factories
    sources: RwLock<HashMap<String, Box<dyn AddressSourceFactory>>>,

    /// Registered device factories
    devices: RwLock<HashMap<String, Box<dyn DeviceFactory>>>,
}

fn poisoned<T>(_: PoisonError<T>) -> Error {
    Error::Other("registry lock poisoned".to_string())
}

impl SyncRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in factories registered:
    /// `static` sources, `memory` and `file` devices
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_source("static", Box::new(StaticSourceFactory));
        registry.register_device("memory", Box::new(MemoryDeviceFactory));
        registry.register_device("file", Box::new(FileDeviceFactory));
        registry
    }

    /// Register an address source factory
    ///
    /// # Parameters
    ///
    /// - `name`: Source type name (e.g., "http", "dns")
    /// - `factory`: Factory object for creating source instances
    ///
    /// Registering a name twice replaces the earlier factory.
    pub fn register_source(&self, name: impl Into<String>, factory: Box<dyn AddressSourceFactory>) {
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        sources.insert(name.into(), factory);
    }

    /// Register a device factory
    pub fn register_device(&self, name: impl Into<String>, factory: Box<dyn DeviceFactory>) {
        let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        devices.insert(name.into(), factory);
    }

    /// Create an address source from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn AddressSource>)`: Created source instance
    /// - `Err(Error)`: If the source type is not registered or creation fails
    pub fn create_source(&self, config: &SourceConfig) -> Result<Box<dyn AddressSource>> {
        let source_type = config.type_name();
        let sources = self.sources.read().map_err(poisoned)?;

        let factory = sources
            .get(source_type)
            .ok_or_else(|| Error::config(format!("Unknown source type: {}", source_type)))?;

        factory.create(config)
    }

    /// Create every configured source, failing on the first error
    pub fn create_sources(&self, configs: &[SourceConfig]) -> Result<Vec<Box<dyn AddressSource>>> {
        configs.iter().map(|c| self.create_source(c)).collect()
    }

    /// Create a device from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn AddressBookDevice>)`: Created device instance
    /// - `Err(Error)`: If the device type is not registered or creation fails
    pub fn create_device(&self, config: &DeviceConfig) -> Result<Box<dyn AddressBookDevice>> {
        let device_type = config.type_name();
        let devices = self.devices.read().map_err(poisoned)?;

        let factory = devices
            .get(device_type)
            .ok_or_else(|| Error::config(format!("Unknown device type: {}", device_type)))?;

        factory.create(config)
    }

    /// List all registered source types
    pub fn list_sources(&self) -> Vec<String> {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = sources.keys().cloned().collect();
        names.sort();
        names
    }

    /// List all registered device types
    pub fn list_devices(&self) -> Vec<String> {
        let devices = self.devices.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = devices.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a source type is registered
    pub fn has_source(&self, name: &str) -> bool {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.contains_key(name)
    }

    /// Check if a device type is registered
    pub fn has_device(&self, name: &str) -> bool {
        let devices = self.devices.read().unwrap_or_else(PoisonError::into_inner);
        devices.contains_key(name)
    }
}
