// # Source Aggregation
//
// Merges the raw lists returned by address sources into one desired set,
// and turns a device snapshot into the current set. Both are keyed by
// normalized address and kept in ascending order, which is the shape the
// differ expects.

use crate::address::{AddressFamily, NormalizedAddress, normalize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One address as delivered by a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Raw address value (host or CIDR)
    pub address: String,

    /// Stable identifier supplied by the source (feed record id, hostname)
    #[serde(default)]
    pub external_id: Option<String>,

    /// Inactive records are dropped during aggregation
    #[serde(default = "default_active")]
    pub active: bool,

    /// Address family, when the source states it
    #[serde(default)]
    pub family: Option<AddressFamily>,
}

fn default_active() -> bool {
    true
}

impl SourceRecord {
    /// Create an active record without identifier
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            external_id: None,
            active: true,
            family: None,
        }
    }

    /// Attach a stable external identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    /// Set the activity flag
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Set the address family explicitly
    pub fn with_family(mut self, family: AddressFamily) -> Self {
        self.family = Some(family);
        self
    }
}

/// Source metadata kept for each desired address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredEntry {
    /// Raw value as delivered by the source
    pub raw: String,
    /// Stable external identifier, if any
    pub external_id: Option<String>,
    /// Address family
    pub family: AddressFamily,
}

/// Desired state: normalized address → source metadata, ascending
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredSet {
    entries: BTreeMap<NormalizedAddress, DesiredEntry>,
}

impl DesiredSet {
    /// Create an empty desired set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one record. Inactive records are ignored; a later record for an
    /// address already present replaces the earlier metadata.
    pub fn insert(&mut self, record: SourceRecord) {
        if !record.active {
            return;
        }

        let address = normalize(&record.address);
        let family = record.family.unwrap_or_else(|| address.family());
        self.entries.insert(
            address,
            DesiredEntry {
                raw: record.address,
                external_id: record.external_id,
                family,
            },
        );
    }

    /// Look up an address
    pub fn get(&self, address: &NormalizedAddress) -> Option<&DesiredEntry> {
        self.entries.get(address)
    }

    /// Whether the address is desired
    pub fn contains(&self, address: &NormalizedAddress) -> bool {
        self.entries.contains_key(address)
    }

    /// Ascending, deduplicated addresses
    pub fn addresses(&self) -> Vec<NormalizedAddress> {
        self.entries.keys().cloned().collect()
    }

    /// Iterate entries in ascending address order
    pub fn iter(&self) -> impl Iterator<Item = (&NormalizedAddress, &DesiredEntry)> {
        self.entries.iter()
    }

    /// Number of desired addresses
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no address is desired
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<SourceRecord> for DesiredSet {
    fn from_iter<I: IntoIterator<Item = SourceRecord>>(iter: I) -> Self {
        let mut set = DesiredSet::new();
        for record in iter {
            set.insert(record);
        }
        set
    }
}

/// Merge the results of all sources into one desired set
///
/// The outcome is a final-state map keyed by normalized address, so the
/// order in which sources are passed only matters when two sources disagree
/// on the metadata of the same address (last one wins).
pub fn aggregate<I>(sources: I) -> DesiredSet
where
    I: IntoIterator<Item = Vec<SourceRecord>>,
{
    sources.into_iter().flatten().collect()
}

/// One address object as read from the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAddress {
    /// On-device object name
    pub name: String,
    /// Address value as configured on the device
    pub address: String,
}

impl DeviceAddress {
    /// Create a snapshot entry
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Current state: normalized address → on-device object name, ascending
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentSet {
    entries: BTreeMap<NormalizedAddress, String>,
    shadowed: Vec<String>,
}

impl CurrentSet {
    /// Build from a device snapshot, keeping only objects named
    /// `<namespace>-...`
    ///
    /// When two objects in the namespace carry the same address the later
    /// one wins and the earlier name is recorded as shadowed.
    pub fn from_snapshot(snapshot: &[DeviceAddress], namespace: &str) -> Self {
        let prefix = format!("{}-", namespace);
        let mut set = CurrentSet::default();

        for entry in snapshot.iter().filter(|e| e.name.starts_with(&prefix)) {
            if let Some(previous) = set
                .entries
                .insert(normalize(&entry.address), entry.name.clone())
            {
                set.shadowed.push(previous);
            }
        }

        set
    }

    /// On-device name of an address
    pub fn name_of(&self, address: &NormalizedAddress) -> Option<&str> {
        self.entries.get(address).map(String::as_str)
    }

    /// Whether the address exists on the device
    pub fn contains(&self, address: &NormalizedAddress) -> bool {
        self.entries.contains_key(address)
    }

    /// Ascending, deduplicated addresses
    pub fn addresses(&self) -> Vec<NormalizedAddress> {
        self.entries.keys().cloned().collect()
    }

    /// Names of objects hidden by a later object with the same address
    pub fn shadowed(&self) -> &[String] {
        &self.shadowed
    }

    /// Number of managed addresses on the device
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the device holds no managed address
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
