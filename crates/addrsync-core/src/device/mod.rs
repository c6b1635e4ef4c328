// # Address-Book Devices
//
// Implementations of the AddressBookDevice trait that keep the address-book
// locally. Both interpret planned commands against the `AddressBook` model
// below and run the same consistency check on commit.

pub mod file;
pub mod memory;

pub use file::{FileDevice, FileDeviceFactory};
pub use memory::{MemoryDevice, MemoryDeviceFactory};

use crate::aggregate::DeviceAddress;
use crate::error::{Error, Result};
use crate::plan::Command;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named collection of address objects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSetEntry {
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
    /// Member object names, in insertion order
    #[serde(default)]
    pub members: Vec<String>,
}

/// Global address-book: address objects and address-sets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBook {
    /// Object name → address
    #[serde(default)]
    pub addresses: BTreeMap<String, String>,
    /// Set name → set
    #[serde(default)]
    pub address_sets: BTreeMap<String, AddressSetEntry>,
}

impl AddressBook {
    /// Create an empty address-book
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an address object (builder style, for seeding)
    pub fn with_address(mut self, name: impl Into<String>, address: impl Into<String>) -> Self {
        self.addresses.insert(name.into(), address.into());
        self
    }

    /// Address objects as a snapshot, in name order
    pub fn snapshot(&self) -> Vec<DeviceAddress> {
        self.addresses
            .iter()
            .map(|(name, address)| DeviceAddress::new(name.clone(), address.clone()))
            .collect()
    }

    /// Look up an address-set
    pub fn address_set(&self, name: &str) -> Option<&AddressSetEntry> {
        self.address_sets.get(name)
    }

    /// Interpret commands in order
    ///
    /// Every command except `edit` and `top` must be issued inside the
    /// address-book edit context. Deleting something that does not exist is
    /// a no-op.
    pub fn apply(&mut self, commands: &[Command]) -> Result<()> {
        let mut in_context = false;

        for command in commands {
            match command {
                Command::EnterAddressBook => in_context = true,
                Command::Top => in_context = false,
                other if !in_context => {
                    return Err(Error::device(format!(
                        "command outside address-book context: {}",
                        other
                    )));
                }
                Command::SetAddress { name, address } => {
                    self.addresses.insert(name.clone(), address.clone());
                }
                Command::DeleteAddress { name } => {
                    if self.addresses.remove(name).is_none() {
                        tracing::debug!("delete of unknown address {} ignored", name);
                    }
                }
                Command::DeleteAddressSet { set } => {
                    self.address_sets.remove(set);
                }
                Command::DescribeAddressSet { set, description } => {
                    self.address_sets.entry(set.clone()).or_default().description =
                        Some(description.clone());
                }
                Command::AddSetMember { set, name } => {
                    let entry = self.address_sets.entry(set.clone()).or_default();
                    if !entry.members.contains(name) {
                        entry.members.push(name.clone());
                    }
                }
            }
        }

        Ok(())
    }

    /// Commit-time consistency check: every set member must exist
    pub fn check(&self) -> Result<()> {
        for (set, entry) in &self.address_sets {
            for member in &entry.members {
                if !self.addresses.contains_key(member) {
                    return Err(Error::device(format!(
                        "address-set {} references unknown address {}",
                        set, member
                    )));
                }
            }
        }
        Ok(())
    }
}
