//! Test doubles and common utilities for reconciliation contract tests
//!
//! This module provides minimal test doubles that verify behavioural
//! contracts without reaching any real endpoint or device.

#![allow(dead_code)]

use addrsync_core::aggregate::{DeviceAddress, SourceRecord};
use addrsync_core::config::{ReconcileConfig, SyncConfig};
use addrsync_core::device::MemoryDevice;
use addrsync_core::error::{Error, Result};
use addrsync_core::plan::Command;
use addrsync_core::traits::{AddressBookDevice, AddressSource, ConfigSession};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A source whose records can be replaced between runs
pub struct ControlledSource {
    name: String,
    records: Arc<Mutex<Vec<SourceRecord>>>,
    fetch_count: Arc<AtomicUsize>,
}

impl ControlledSource {
    pub fn new(name: &str, addresses: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            records: Arc::new(Mutex::new(
                addresses.iter().map(|a| SourceRecord::new(*a)).collect(),
            )),
            fetch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the published addresses
    pub fn set_addresses(&self, addresses: &[&str]) {
        *self.records.lock().unwrap() = addresses.iter().map(|a| SourceRecord::new(*a)).collect();
    }

    /// Replace the published records
    pub fn set_records(&self, records: Vec<SourceRecord>) {
        *self.records.lock().unwrap() = records;
    }

    /// Get the number of times fetch() was called
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Create a new ControlledSource that shares state with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            name: other.name.clone(),
            records: Arc::clone(&other.records),
            fetch_count: Arc::clone(&other.fetch_count),
        }
    }
}

#[async_trait::async_trait]
impl AddressSource for ControlledSource {
    async fn fetch(&self) -> Result<Vec<SourceRecord>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().unwrap().clone())
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

/// A source that always fails
pub struct FailingSource {
    name: String,
}

impl FailingSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl AddressSource for FailingSource {
    async fn fetch(&self) -> Result<Vec<SourceRecord>> {
        Err(Error::http("HTTP 503 Service Unavailable"))
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

/// Call counters shared between a [`CountingDevice`] and its sessions
#[derive(Default)]
pub struct DeviceCounters {
    pub begins: AtomicUsize,
    pub applies: AtomicUsize,
    pub commits: AtomicUsize,
    pub rollbacks: AtomicUsize,
    pub fail_apply: AtomicBool,
    pub fail_commit: AtomicBool,
    pub applied: Mutex<Vec<Command>>,
    pub stale: Mutex<Vec<Command>>,
}

impl DeviceCounters {
    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    pub fn applies(&self) -> usize {
        self.applies.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    /// Every command applied so far, across sessions
    pub fn applied(&self) -> Vec<Command> {
        self.applied.lock().unwrap().clone()
    }
}

/// A MemoryDevice wrapper that counts session calls and can inject
/// failures
#[derive(Clone)]
pub struct CountingDevice {
    inner: MemoryDevice,
    counters: Arc<DeviceCounters>,
}

impl CountingDevice {
    pub fn new(inner: MemoryDevice) -> Self {
        Self {
            inner,
            counters: Arc::new(DeviceCounters::default()),
        }
    }

    pub fn counters(&self) -> Arc<DeviceCounters> {
        Arc::clone(&self.counters)
    }

    pub fn fail_commit(&self, fail: bool) {
        self.counters.fail_commit.store(fail, Ordering::SeqCst);
    }

    pub fn fail_apply(&self, fail: bool) {
        self.counters.fail_apply.store(fail, Ordering::SeqCst);
    }

    /// Commands left uncommitted in the candidate of the next session
    pub fn leave_stale(&self, commands: Vec<Command>) {
        *self.counters.stale.lock().unwrap() = commands;
    }
}

#[async_trait::async_trait]
impl AddressBookDevice for CountingDevice {
    async fn begin(&self) -> Result<Box<dyn ConfigSession>> {
        self.counters.begins.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.begin().await?;
        let stale = std::mem::take(&mut *self.counters.stale.lock().unwrap());
        if !stale.is_empty() {
            inner.apply(&stale).await?;
        }
        Ok(Box::new(CountingSession {
            inner,
            counters: Arc::clone(&self.counters),
        }))
    }

    fn device_name(&self) -> &'static str {
        "counting"
    }
}

struct CountingSession {
    inner: Box<dyn ConfigSession>,
    counters: Arc<DeviceCounters>,
}

#[async_trait::async_trait]
impl ConfigSession for CountingSession {
    async fn snapshot(&self) -> Result<Vec<DeviceAddress>> {
        self.inner.snapshot().await
    }

    async fn apply(&mut self, commands: &[Command]) -> Result<()> {
        self.counters.applies.fetch_add(1, Ordering::SeqCst);
        self.counters
            .applied
            .lock()
            .unwrap()
            .extend(commands.iter().cloned());

        if self.counters.fail_apply.load(Ordering::SeqCst) {
            // Half the commands land before the failure.
            let half = commands.len() / 2;
            self.inner.apply(&commands[..half]).await?;
            return Err(Error::device("syntax error"));
        }
        self.inner.apply(commands).await
    }

    async fn has_pending_changes(&self) -> Result<bool> {
        self.inner.has_pending_changes().await
    }

    async fn commit(&mut self) -> Result<()> {
        self.counters.commits.fetch_add(1, Ordering::SeqCst);
        if self.counters.fail_commit.load(Ordering::SeqCst) {
            return Err(Error::device("commit check failed"));
        }
        self.inner.commit().await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.inner.rollback().await
    }
}

/// Helper to create a minimal SyncConfig for testing
pub fn minimal_config(address_set: &str) -> SyncConfig {
    SyncConfig::new(
        ReconcileConfig::new(address_set).with_description("IP addresses from test"),
    )
}

/// Address objects of a device as (name, address) pairs
pub async fn device_objects(device: &MemoryDevice) -> Vec<(String, String)> {
    device.book().await.addresses.into_iter().collect()
}
