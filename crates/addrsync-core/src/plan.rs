//! Reconciliation planning
//!
//! Turns a diff plus the full desired set into the ordered command list that
//! makes the device match the desired state:
//!
//! ```text
//! edit security address-book global
//! delete address "<name>"                          (removals)
//! set address "<name>" <cidr>                      (additions)
//! delete address-set "<set>"
//! set address-set "<set>" description "<text>"
//! set address-set "<set>" address "<name>"         (every desired member)
//! top
//! ```
//!
//! Address objects are diffed incrementally; the address-set is rebuilt
//! wholesale on every run. Planning is a pure function of its inputs.

use crate::address::NormalizedAddress;
use crate::aggregate::{CurrentSet, DesiredSet, DeviceAddress, SourceRecord, aggregate};
use crate::config::ReconcileConfig;
use crate::diff::{Change, diff_sorted};
use crate::error::{Error, Result};
use crate::naming::NameGenerator;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One configuration command for the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    /// `edit security address-book global`
    EnterAddressBook,
    /// `set address "<name>" <cidr>`
    SetAddress { name: String, address: String },
    /// `delete address "<name>"`
    DeleteAddress { name: String },
    /// `delete address-set "<set>"`
    DeleteAddressSet { set: String },
    /// `set address-set "<set>" description "<text>"`
    DescribeAddressSet { set: String, description: String },
    /// `set address-set "<set>" address "<name>"`
    AddSetMember { set: String, name: String },
    /// `top`
    Top,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::EnterAddressBook => f.write_str("edit security address-book global"),
            Command::SetAddress { name, address } => {
                write!(f, "set address \"{}\" {}", name, address)
            }
            Command::DeleteAddress { name } => write!(f, "delete address \"{}\"", name),
            Command::DeleteAddressSet { set } => write!(f, "delete address-set \"{}\"", set),
            Command::DescribeAddressSet { set, description } => {
                write!(f, "set address-set \"{}\" description \"{}\"", set, description)
            }
            Command::AddSetMember { set, name } => {
                write!(f, "set address-set \"{}\" address \"{}\"", set, name)
            }
            Command::Top => f.write_str("top"),
        }
    }
}

/// Planned command list plus counts for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Ordered commands
    pub commands: Vec<Command>,
    /// Address objects to create
    pub additions: usize,
    /// Address objects to delete
    pub removals: usize,
    /// Members of the rebuilt address-set
    pub members: usize,
}

impl Plan {
    /// Whether the plan touches any address object
    pub fn changes_objects(&self) -> bool {
        self.additions > 0 || self.removals > 0
    }

    /// Commands rendered as device text, one per element
    pub fn render(&self) -> Vec<String> {
        self.commands.iter().map(ToString::to_string).collect()
    }
}

/// Build the command list from a diff
///
/// `diff` must come from [`diff_sorted`] over the keys of `current` and
/// `desired`. An entry found in both or neither map is a contract
/// violation and no partial plan is returned.
pub fn plan(
    diff: &[NormalizedAddress],
    current: &CurrentSet,
    desired: &DesiredSet,
    config: &ReconcileConfig,
) -> Result<Plan> {
    let generator = NameGenerator::new(&config.namespace, config.naming);
    let generated = generator.assign(desired);

    let mut removals = Vec::new();
    let mut additions = Vec::new();
    for address in diff {
        match Change::classify(address, current, desired)? {
            Change::Remove => removals.push(address),
            Change::Add => additions.push(address),
        }
    }

    // Objects kept on the device keep their on-device name.
    let retained: BTreeSet<&str> = desired
        .iter()
        .filter_map(|(address, _)| current.name_of(address))
        .collect();

    let mut member_names = Vec::with_capacity(desired.len());
    let mut added_names: BTreeMap<&NormalizedAddress, String> = BTreeMap::new();
    for (address, _) in desired.iter() {
        let name = match current.name_of(address) {
            Some(existing) => existing.to_string(),
            None => {
                let name = generated
                    .get(address)
                    .cloned()
                    .ok_or_else(|| Error::contract(format!("no name generated for {}", address)))?;
                let name = if retained.contains(name.as_str()) {
                    generator.content_name(address)
                } else {
                    name
                };
                added_names.insert(address, name.clone());
                name
            }
        };
        member_names.push(name);
    }

    let mut commands = Vec::with_capacity(4 + removals.len() + additions.len() + member_names.len());
    commands.push(Command::EnterAddressBook);

    for address in &removals {
        let name = current
            .name_of(address)
            .ok_or_else(|| Error::contract(format!("no device name for {}", address)))?;
        commands.push(Command::DeleteAddress {
            name: name.to_string(),
        });
    }

    for address in &additions {
        let name = added_names
            .get(*address)
            .cloned()
            .ok_or_else(|| Error::contract(format!("no name resolved for {}", address)))?;
        commands.push(Command::SetAddress {
            name,
            address: address.to_string(),
        });
    }

    commands.push(Command::DeleteAddressSet {
        set: config.address_set.clone(),
    });
    commands.push(Command::DescribeAddressSet {
        set: config.address_set.clone(),
        description: config.description.clone(),
    });
    for name in &member_names {
        commands.push(Command::AddSetMember {
            set: config.address_set.clone(),
            name: name.clone(),
        });
    }
    commands.push(Command::Top);

    Ok(Plan {
        commands,
        additions: additions.len(),
        removals: removals.len(),
        members: member_names.len(),
    })
}

/// Whole pure transformation: device snapshot + source results → plan
pub fn build_plan(
    snapshot: &[DeviceAddress],
    sources: Vec<Vec<SourceRecord>>,
    config: &ReconcileConfig,
) -> Result<Plan> {
    let current = CurrentSet::from_snapshot(snapshot, &config.namespace);
    let desired = aggregate(sources);
    let diff = diff_sorted(&current.addresses(), &desired.addresses());
    plan(&diff, &current, &desired, config)
}
