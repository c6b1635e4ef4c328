// # addrsync-core
//
// Core library for reconciling a firewall address-book with remote
// address lists.
//
// ## Architecture Overview
//
// A run turns the addresses published by one or more sources into the
// minimal, ordered command sequence that brings one address-set on the
// device in line with them:
//
// - **address**: Normalization of raw addresses to CIDR form
// - **aggregate**: Merge source results into the desired set; read the
//   current set from a device snapshot
// - **diff**: Sorted symmetric difference of current and desired
// - **naming**: Deterministic address object names
// - **plan**: Ordered device commands
// - **engine**: Fetch, plan, apply, commit or roll back
// - **registry**: Plugin-based construction of sources and devices
//
// ## Design Principles
//
// 1. **Pure core**: Normalizer, differ, name generator and planner do no I/O
// 2. **Fail-fast**: A failed source aborts the run before the device is touched
// 3. **Transactional**: Commands land in a locked candidate configuration
//    that is committed or rolled back as a whole
// 4. **Library-First**: Everything the daemon does is available as a library

pub mod address;
pub mod aggregate;
pub mod config;
pub mod device;
pub mod diff;
pub mod engine;
pub mod error;
pub mod naming;
pub mod plan;
pub mod registry;
pub mod sources;
pub mod traits;

// Re-export core types for convenience
pub use address::{AddressFamily, NormalizedAddress, normalize};
pub use aggregate::{CurrentSet, DesiredSet, DeviceAddress, SourceRecord, aggregate};
pub use config::{DeviceConfig, EngineConfig, ReconcileConfig, SourceConfig, SyncConfig};
pub use device::{AddressBook, FileDevice, MemoryDevice};
pub use diff::diff_sorted;
pub use engine::{Outcome, ReconcileEvent, ReconcileReport, Reconciler};
pub use error::{Error, Result};
pub use naming::{NameGenerator, NamingStrategy};
pub use plan::{Command, Plan, build_plan};
pub use registry::SyncRegistry;
pub use sources::StaticSource;
pub use traits::{AddressBookDevice, AddressSource, ConfigSession};
