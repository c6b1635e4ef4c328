//! Contract Test: Fail-Fast Sources
//!
//! This test verifies that a failing source aborts the whole run before the
//! device is touched.
//!
//! Constraints verified:
//! - A failed fetch never leads to a partial plan being applied
//! - The device is not even locked when a source fails
//! - The error names the failing source
//!
//! If this test fails, an outage of one feed could empty the address-set.

mod common;

use addrsync_core::device::{AddressBook, MemoryDevice};
use addrsync_core::error::Error;
use addrsync_core::traits::AddressBookDevice;
use addrsync_core::{ReconcileEvent, Reconciler};
use common::*;

#[tokio::test]
async fn failing_source_leaves_device_untouched() {
    let seeded = AddressBook::new().with_address("cdn-a", "1.1.1.1/32");
    let memory = MemoryDevice::with_book(seeded.clone());
    let device = CountingDevice::new(memory.clone());
    let counters = device.counters();

    let (reconciler, _events) = Reconciler::new(
        vec![
            Box::new(ControlledSource::new("good", &["2.2.2.2"])),
            Box::new(FailingSource::new("https://feed.example.net/ips")),
        ],
        Box::new(device),
        minimal_config("cdn"),
    )
    .unwrap();

    let err = reconciler.run_once().await.unwrap_err();

    match &err {
        Error::SourceFetch { source_name, .. } => {
            assert_eq!(source_name, "https://feed.example.net/ips");
        }
        other => panic!("expected source fetch error, got {:?}", other),
    }
    assert!(err.is_source_failure());

    assert_eq!(counters.begins(), 0, "device must not be opened");
    assert_eq!(counters.applies(), 0);
    assert_eq!(memory.book().await, seeded);
    assert!(!memory.is_locked());
}

#[tokio::test]
async fn failure_is_reported_as_event() {
    let (reconciler, mut events) = Reconciler::new(
        vec![Box::new(FailingSource::new("broken"))],
        Box::new(MemoryDevice::new()),
        minimal_config("cdn"),
    )
    .unwrap();

    assert!(reconciler.run_once().await.is_err());

    let mut failed = None;
    while let Ok(event) = events.try_recv() {
        assert!(
            !matches!(event, ReconcileEvent::Planned { .. }),
            "nothing may be planned after a failed fetch"
        );
        if let ReconcileEvent::Failed { error } = event {
            failed = Some(error);
        }
    }
    let failed = failed.expect("a Failed event is emitted");
    assert!(failed.contains("broken"));
}

#[tokio::test]
async fn locked_device_fails_without_applying() {
    let memory = MemoryDevice::new();
    let device = CountingDevice::new(memory.clone());
    let counters = device.counters();

    let (reconciler, _events) = Reconciler::new(
        vec![Box::new(ControlledSource::new("good", &["2.2.2.2"]))],
        Box::new(device),
        minimal_config("cdn"),
    )
    .unwrap();

    let other_session = memory.begin().await.unwrap();
    let err = reconciler.run_once().await.unwrap_err();
    assert!(matches!(err, Error::Device(_)));
    assert_eq!(counters.applies(), 0);
    drop(other_session);

    tokio_test::assert_ok!(reconciler.run_once().await);
    assert_eq!(memory.book().await.addresses.len(), 1);
}
