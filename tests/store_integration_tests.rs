//! Integration tests for the configuration store
//!
//! These tests verify that:
//! - Subscribers see every snapshot once, in mutation order
//! - Concurrent writers never lose an update
//! - Square symbologies stay square under any sequence of edits
//! - Switching to a rectangular symbology resets the millimetre size

use barcode_studio::models::DimensionField;
use barcode_studio::state::{ConfigChange, ConfigurationStore};
use barcode_studio::validation::RuleTable;
use proptest::prelude::*;
use std::thread;
use tokio::time::{Duration, timeout};

#[tokio::test]
async fn test_subscribers_see_updates_in_order() {
    let store = ConfigurationStore::new();
    let mut first = store.subscribe();
    let mut second = store.subscribe();

    for payload in ["A", "AB", "ABC"] {
        store.set_payload(payload);
    }

    for subscription in [&mut first, &mut second] {
        let mut seen = Vec::new();
        for _ in 0..3 {
            let update = timeout(Duration::from_millis(100), subscription.recv())
                .await
                .expect("Timeout waiting for update")
                .expect("Channel closed");
            seen.push((update.revision, update.snapshot.payload.clone()));
        }
        assert_eq!(
            seen,
            vec![
                (1, "A".to_string()),
                (2, "AB".to_string()),
                (3, "ABC".to_string())
            ]
        );
    }
}

#[tokio::test]
async fn test_dropped_subscription_is_pruned() {
    let store = ConfigurationStore::new();
    let kept = store.subscribe();
    drop(store.subscribe());
    assert_eq!(store.subscriber_count(), 2);

    store.set_payload("PRUNE");
    assert_eq!(store.subscriber_count(), 1);

    assert!(store.unsubscribe(kept.id()));
    assert!(!store.unsubscribe(kept.id()));
}

#[test]
fn test_concurrent_writers_lose_nothing() {
    let store = ConfigurationStore::new();
    let mut subscription = store.subscribe();

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    store.set_payload(format!("w{worker}-{i}"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.revision(), 100);
    let mut last = 0;
    while let Some(update) = subscription.try_recv() {
        assert_eq!(update.revision, last + 1);
        last = update.revision;
    }
    assert_eq!(last, 100);
}

#[tokio::test]
async fn test_symbology_change_is_reported_with_reset() {
    let store = ConfigurationStore::new();
    store.set_symbology("QRCode");
    let mut subscription = store.subscribe();

    store.set_symbology("EAN13");

    let update = timeout(Duration::from_millis(100), subscription.recv())
        .await
        .expect("Timeout waiting for update")
        .expect("Channel closed");
    assert!(update.changes.contains(&ConfigChange::SymbologyChanged {
        from: "QRCode".to_string(),
        to: "EAN13".to_string(),
    }));
    assert_eq!(update.snapshot.dimensions.width_mm, 50.0);
    assert_eq!(update.snapshot.dimensions.height_mm, 25.0);
}

fn square_symbology() -> impl Strategy<Value = &'static str> {
    let names: Vec<&'static str> = RuleTable::global()
        .iter()
        .filter(|rule| rule.is_square())
        .map(|rule| rule.symbology)
        .collect();
    prop::sample::select(names)
}

fn rectangular_symbology() -> impl Strategy<Value = &'static str> {
    let names: Vec<&'static str> = RuleTable::global()
        .iter()
        .filter(|rule| !rule.is_square())
        .map(|rule| rule.symbology)
        .collect();
    prop::sample::select(names)
}

fn any_symbology() -> impl Strategy<Value = &'static str> {
    let names: Vec<&'static str> = RuleTable::global().symbologies().collect();
    prop::sample::select(names)
}

proptest! {
    #[test]
    fn square_symbologies_stay_square(
        symbology in square_symbology(),
        edits in prop::collection::vec((0usize..4, 1.0f64..500.0), 1..20),
    ) {
        let store = ConfigurationStore::new();
        store.set_symbology(symbology);
        prop_assert!(store.current().dimensions.is_square());

        for (field, value) in edits {
            store.set_dimension(DimensionField::all()[field], value);
            prop_assert!(store.current().dimensions.is_square());
        }
    }

    #[test]
    fn switching_to_rectangular_resets_size(
        from in any_symbology(),
        to in rectangular_symbology(),
        width in 1.0f64..500.0,
    ) {
        prop_assume!(from != to);
        let store = ConfigurationStore::new();
        store.set_symbology(from);
        store.set_dimension(DimensionField::WidthMm, width);

        store.set_symbology(to);
        let dimensions = store.current().dimensions;
        prop_assert_eq!(dimensions.width_mm, 50.0);
        prop_assert_eq!(dimensions.height_mm, 25.0);
    }
}
