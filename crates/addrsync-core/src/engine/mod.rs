//! Reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Fetching every configured address source
//! - Opening a locked configuration session on the device
//! - Planning the change from the device snapshot and the source results
//! - Applying the plan and committing it, or rolling it back
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐
//! │ AddressSource │──┐
//! ├───────────────┤  │ records
//! │ AddressSource │──┤
//! └───────────────┘  ▼
//!            ┌──────────────┐  snapshot   ┌───────────────────┐
//!            │  Reconciler  │◄────────────│ AddressBookDevice │
//!            │              │────────────►│  (ConfigSession)  │
//!            └──────────────┘  commands   └───────────────────┘
//!                    │
//!                    ▼
//!            ┌──────────────┐
//!            │    Events    │
//!            └──────────────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Fetch all sources concurrently; the first failure aborts the run
//!    before the device is touched
//! 2. Begin a session (takes the configuration lock)
//! 3. Discard stale uncommitted changes left by someone else
//! 4. Snapshot, plan, apply
//! 5. Commit, or roll back for a dry run
//!
//! Any failure after step 2 rolls the session back before the error is
//! returned. The lock is released when the session is dropped.

use crate::aggregate::{CurrentSet, SourceRecord, aggregate};
use crate::config::{ReconcileConfig, SyncConfig};
use crate::diff::diff_sorted;
use crate::error::{Error, Result};
use crate::plan::{Command, plan};
use crate::traits::{AddressBookDevice, AddressSource, ConfigSession};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// Run started
    Started {
        address_set: String,
        sources: usize,
    },

    /// A source returned its records
    SourceFetched { source: String, records: usize },

    /// Plan computed
    Planned {
        additions: usize,
        removals: usize,
        members: usize,
    },

    /// The device already matched the sources
    Unchanged { address_set: String },

    /// Changes committed
    Committed {
        address_set: String,
        additions: usize,
        removals: usize,
    },

    /// Plan applied and rolled back on request
    DryRun { address_set: String, commands: usize },

    /// Session rolled back after a failure
    RolledBack { reason: String },

    /// Run failed
    Failed { error: String },
}

/// How a successful run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Changes were committed
    Committed,
    /// Nothing to change
    Unchanged,
    /// Changes were applied then rolled back
    DryRun,
}

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Address objects created
    pub additions: usize,
    /// Address objects deleted
    pub removals: usize,
    /// Members of the rebuilt address-set
    pub members: usize,
    /// Commands sent to the device
    pub commands: Vec<Command>,
    /// How the run ended
    pub outcome: Outcome,
}

/// Address-book reconciler
///
/// One [`run_once()`](Reconciler::run_once) call is one complete
/// reconciliation. The reconciler keeps no state between runs; everything
/// it needs is read back from the device.
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Call [`Reconciler::run_once()`] as often as needed
/// 3. Drain the event receiver for monitoring
pub struct Reconciler {
    /// Desired-state sources, fetched on every run
    sources: Vec<Arc<dyn AddressSource>>,

    /// Device holding the address-book
    device: Box<dyn AddressBookDevice>,

    /// Namespace, address-set and naming settings
    config: ReconcileConfig,

    /// Roll back instead of committing
    dry_run: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ReconcileEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `sources`: Address sources; at least one is required
    /// - `device`: Device implementation
    /// - `config`: Configuration; its `sources` and `device` sections are
    ///   not consulted here, they are for building the collaborators
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver)
    pub fn new(
        sources: Vec<Box<dyn AddressSource>>,
        device: Box<dyn AddressBookDevice>,
        config: SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<ReconcileEvent>)> {
        config.reconcile.validate()?;
        config.engine.validate()?;

        if sources.is_empty() {
            return Err(Error::config("No address sources configured"));
        }

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let reconciler = Self {
            sources: sources.into_iter().map(Arc::from).collect(),
            device,
            config: config.reconcile,
            dry_run: config.engine.dry_run,
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Reconcile settings in use
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Run one reconciliation
    ///
    /// # Returns
    ///
    /// - `Ok(ReconcileReport)`: Committed, unchanged or dry run
    /// - `Err(Error)`: Source, device or contract failure; nothing was
    ///   committed
    pub async fn run_once(&self) -> Result<ReconcileReport> {
        info!(
            "Reconciling address-set {} from {} source(s) on {} device",
            self.config.address_set,
            self.sources.len(),
            self.device.device_name()
        );
        self.emit_event(ReconcileEvent::Started {
            address_set: self.config.address_set.clone(),
            sources: self.sources.len(),
        });

        let fetched = match self.fetch_all().await {
            Ok(fetched) => fetched,
            Err(e) => {
                error!("Source fetch failed, device left untouched: {}", e);
                self.emit_event(ReconcileEvent::Failed {
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        let mut session = match self.device.begin().await {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to open configuration session: {}", e);
                self.emit_event(ReconcileEvent::Failed {
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        match self.reconcile(session.as_mut(), fetched).await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!("Reconciliation failed: {}", e);
                match session.rollback().await {
                    Ok(()) => {
                        info!("Candidate configuration rolled back");
                        self.emit_event(ReconcileEvent::RolledBack {
                            reason: e.to_string(),
                        });
                    }
                    Err(rollback_err) => {
                        error!("Rollback failed: {}", rollback_err);
                    }
                }
                self.emit_event(ReconcileEvent::Failed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Fetch every source concurrently
    ///
    /// Results keep configuration order. The first error aborts the
    /// remaining fetches.
    async fn fetch_all(&self) -> Result<Vec<Vec<SourceRecord>>> {
        let mut tasks = JoinSet::new();
        for (index, source) in self.sources.iter().enumerate() {
            let source = Arc::clone(source);
            tasks.spawn(async move {
                let result = source.fetch().await;
                (index, result)
            });
        }

        let mut results: Vec<Option<Vec<SourceRecord>>> = vec![None; self.sources.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined
                .map_err(|e| Error::source(format!("source task failed: {}", e)))?;
            let name = self.sources[index].source_name();

            let records = result.map_err(|e| match e {
                Error::SourceFetch { .. } => e,
                other => Error::source_fetch(name, other.to_string()),
            })?;

            debug!("Source {} returned {} records", name, records.len());
            self.emit_event(ReconcileEvent::SourceFetched {
                source: name.to_string(),
                records: records.len(),
            });
            results[index] = Some(records);
        }

        Ok(results.into_iter().flatten().collect())
    }

    /// Plan and apply inside an open session
    async fn reconcile(
        &self,
        session: &mut dyn ConfigSession,
        fetched: Vec<Vec<SourceRecord>>,
    ) -> Result<ReconcileReport> {
        if session.has_pending_changes().await? {
            warn!("Discarding uncommitted changes left in the candidate configuration");
            session.rollback().await?;
        }

        let snapshot = session.snapshot().await?;
        let current = CurrentSet::from_snapshot(&snapshot, &self.config.namespace);
        for name in current.shadowed() {
            warn!(
                "Address object {} duplicates the address of another managed object",
                name
            );
        }

        let desired = aggregate(fetched);
        let diff = diff_sorted(&current.addresses(), &desired.addresses());
        let plan = plan(&diff, &current, &desired, &self.config)?;

        info!(
            "Plan for {}: {} to add, {} to remove, {} members",
            self.config.address_set, plan.additions, plan.removals, plan.members
        );
        self.emit_event(ReconcileEvent::Planned {
            additions: plan.additions,
            removals: plan.removals,
            members: plan.members,
        });
        for command in &plan.commands {
            debug!("{}", command);
        }

        session.apply(&plan.commands).await?;

        let outcome = if !session.has_pending_changes().await? {
            info!("Address-set {} is up to date", self.config.address_set);
            self.emit_event(ReconcileEvent::Unchanged {
                address_set: self.config.address_set.clone(),
            });
            Outcome::Unchanged
        } else if self.dry_run {
            session.rollback().await?;
            info!(
                "Dry run: {} commands applied and rolled back",
                plan.commands.len()
            );
            self.emit_event(ReconcileEvent::DryRun {
                address_set: self.config.address_set.clone(),
                commands: plan.commands.len(),
            });
            Outcome::DryRun
        } else {
            session.commit().await?;
            info!(
                "Committed address-set {}: {} added, {} removed",
                self.config.address_set, plan.additions, plan.removals
            );
            self.emit_event(ReconcileEvent::Committed {
                address_set: self.config.address_set.clone(),
                additions: plan.additions,
                removals: plan.removals,
            });
            Outcome::Committed
        };

        Ok(ReconcileReport {
            additions: plan.additions,
            removals: plan.removals,
            members: plan.members,
            commands: plan.commands,
            outcome,
        })
    }

    /// Emit an event, dropping it with a warning when the channel is full
    fn emit_event(&self, event: ReconcileEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!(
                "Event channel full, dropping event. Consider increasing event_channel_capacity."
            );
        }
    }
}
