//! Tests for the in-memory record store and fixtures

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use serde_json::json;
use shop_query_core::{RecordStore, StoreError, UserRecord};
use shop_query_testing::{FixtureError, InMemoryRecordStore, LISA, LISA_PASSWORD};
use std::sync::Arc;
use std::time::{Duration, Instant};

const FIXTURE: &str = r#"{
    "users": [
        { "_id": "homer", "password": "donuts", "job": "safety inspector" },
        { "_id": "marge", "password": "blue" }
    ],
    "orders": [
        { "username": "homer", "product": "donut", "amount": 0.99 },
        { "username": "marge", "product": "hair spray", "amount": 4.5 },
        { "username": "homer", "product": "duff beer", "amount": 2.0 }
    ]
}"#;

#[test]
fn fixture_string_loads_users_and_orders() {
    let store = InMemoryRecordStore::from_json_str(FIXTURE).unwrap();

    assert_eq!(
        store.find_user("homer").unwrap(),
        Some(UserRecord::new("homer", "donuts"))
    );
    let products: Vec<_> = store
        .find_orders("homer")
        .unwrap()
        .into_iter()
        .map(|order| order.payload["product"].clone())
        .collect();
    assert_eq!(products, vec![json!("donut"), json!("duff beer")]);
    assert_eq!(store.find_user(LISA).unwrap(), None);
}

#[test]
fn fixture_file_loads() {
    let path = std::env::temp_dir().join(format!("shop-query-fixture-{}.json", std::process::id()));
    std::fs::write(&path, FIXTURE).expect("write fixture");

    let store = InMemoryRecordStore::from_json_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(store.find_orders("marge").unwrap().len(), 1);
}

#[test]
fn missing_fixture_file_is_an_io_error() {
    let result = InMemoryRecordStore::from_json_file("/definitely/not/here.json");
    assert!(matches!(result, Err(FixtureError::Io(_))));
}

#[test]
fn invalid_fixture_is_a_parse_error() {
    let result = InMemoryRecordStore::from_json_str("[1, 2, 3]");
    assert!(matches!(result, Err(FixtureError::Parse(_))));
}

#[test]
fn non_string_owner_never_matches() {
    let store = InMemoryRecordStore::new();
    store.insert_order(json!({ "username": 42, "product": "mystery" }));
    store.insert_order(json!({ "username": "ned", "product": "bible" }));

    // Non-string owners never match an exact username lookup.
    assert_eq!(store.find_orders("ned").unwrap().len(), 1);
    assert_eq!(store.find_orders("42").unwrap().len(), 0);
}

#[test]
fn aliased_user_document_is_returned_as_stored() {
    let store = InMemoryRecordStore::new();
    store.insert_user_under("lisa", json!({ "_id": "lisa.simpson", "password": "password" }));

    let user = store.find_user("lisa").unwrap().unwrap();
    assert_eq!(user.name, "lisa.simpson");
}

#[test]
fn latency_delays_reads() {
    let store = InMemoryRecordStore::seeded().with_latency(Duration::from_millis(20));
    let start = Instant::now();
    store.find_user(LISA).unwrap();
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[test]
fn concurrent_reads_are_all_counted() {
    let store = Arc::new(InMemoryRecordStore::seeded());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                let user = store.find_user(LISA).unwrap().unwrap();
                assert_eq!(user.password, LISA_PASSWORD);
                store.find_orders(LISA).unwrap().len()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 2);
    }
    assert_eq!(store.user_lookups(), 8);
    assert_eq!(store.order_lookups(), 8);
}

#[test]
fn outage_surfaces_as_unavailable() {
    let store = InMemoryRecordStore::seeded();
    store.set_available(false);
    assert_eq!(
        store.find_user(LISA),
        Err(StoreError::Unavailable("connection refused".to_string()))
    );
}
