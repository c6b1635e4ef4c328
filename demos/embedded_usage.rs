//! Minimal embedding example for addrsync-core
//!
//! This example demonstrates using addrsync-core as a library in a custom
//! application: the application supplies its own address source, keeps
//! the address-book in memory and decides when to reconcile.

use addrsync_core::device::{AddressBook, MemoryDevice};
use addrsync_core::traits::AddressSource;
use addrsync_core::{ReconcileConfig, Reconciler, Result, SourceRecord, StaticSource, SyncConfig};
use std::sync::{Arc, Mutex};

/// Address source backed by application state
struct InventorySource {
    nodes: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait::async_trait]
impl AddressSource for InventorySource {
    async fn fetch(&self) -> Result<Vec<SourceRecord>> {
        let nodes = self
            .nodes
            .lock()
            .map_err(|_| addrsync_core::Error::source("inventory lock poisoned"))?;
        Ok(nodes
            .iter()
            .map(|(id, address)| SourceRecord::new(address.clone()).with_id(id.clone()))
            .collect())
    }

    fn source_name(&self) -> &str {
        "inventory"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Embedded addrsync-core Example ===\n");

    let nodes = Arc::new(Mutex::new(vec![
        ("edge-1".to_string(), "203.0.113.10".to_string()),
        ("edge-2".to_string(), "2001:db8::10".to_string()),
    ]));

    // An address-book that already holds one object of ours and one that
    // belongs to somebody else
    let device = MemoryDevice::with_book(
        AddressBook::new()
            .with_address("edge-retired-v4", "198.51.100.7/32")
            .with_address("mgmt", "192.0.2.1/32"),
    );

    let reconcile = ReconcileConfig::new("edge-nodes")
        .with_namespace("edge")
        .with_description("Edge nodes from inventory")
        .with_naming("identity".parse()?);

    println!("1. Creating reconciler...");
    let (reconciler, mut event_rx) = Reconciler::new(
        vec![
            Box::new(InventorySource {
                nodes: Arc::clone(&nodes),
            }),
            Box::new(StaticSource::new(["192.0.2.250"])),
        ],
        Box::new(device.clone()),
        SyncConfig::new(reconcile),
    )?;

    let event_listener = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            println!("[Event] {:?}", event);
        }
    });

    println!("2. First run");
    let report = reconciler.run_once().await?;
    for command in &report.commands {
        println!("   {}", command);
    }

    println!("\n3. Inventory changes: edge-2 moves, edge-3 appears");
    if let Ok(mut nodes) = nodes.lock() {
        nodes[1].1 = "2001:db8::20".to_string();
        nodes.push(("edge-3".to_string(), "203.0.113.30".to_string()));
    }
    let report = reconciler.run_once().await?;
    println!(
        "   {:?}: {} added, {} removed",
        report.outcome, report.additions, report.removals
    );

    println!("\n4. Nothing changed since the last run");
    let report = reconciler.run_once().await?;
    println!("   {:?}", report.outcome);

    drop(reconciler);
    let _ = event_listener.await;

    println!("\n5. Final address-book");
    let book = device.book().await;
    for (name, address) in &book.addresses {
        println!("   {:<24} {}", name, address);
    }

    println!("\n=== Embedding Successful ===");
    println!("Key Points:");
    println!("- Reconciliation is driven entirely by the application");
    println!("- Objects outside the namespace are left alone");
    println!("- Re-running with unchanged sources commits nothing");

    Ok(())
}
