//! Property tests: a run returns exactly the authenticated user's orders.

#![allow(clippy::unwrap_used)] // Tests can unwrap

use proptest::prelude::*;
use serde_json::json;
use shop_query_core::{Credentials, Pipeline, QueryError, UserRecord};
use shop_query_runtime::{FutureBackend, PublisherBackend, WorkerPool};
use shop_query_testing::properties::{credentials, order_documents, password, username};
use shop_query_testing::{CollectingSink, InMemoryRecordStore};
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

fn store_with(user: &UserRecord, orders: Vec<serde_json::Value>) -> Arc<InMemoryRecordStore> {
    let store = InMemoryRecordStore::new();
    store.insert_user(user);
    store.insert_order(json!({ "username": "Other", "product": "not yours" }));
    for order in orders {
        store.insert_order(order);
    }
    Arc::new(store)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn authenticated_run_returns_only_own_orders(
        (name, secret, orders) in (username(), password())
            .prop_flat_map(|(name, secret)| {
                let documents = order_documents(name.clone(), 5);
                (Just(name), Just(secret), documents)
            })
    ) {
        let expected = orders.len();
        let store = store_with(&UserRecord::new(name.clone(), secret.clone()), orders);
        let rt = runtime();

        let report = rt.block_on(async {
            let pool = WorkerPool::new(2).unwrap();
            let pipeline = Pipeline::new(FutureBackend::new(Arc::clone(&store) as _, pool));
            pipeline.execute(Credentials::new(name.clone(), secret), &CollectingSink::new()).await
        });

        prop_assert!(report.succeeded());
        prop_assert_eq!(report.item_count, Some(expected));
        prop_assert_eq!(store.order_lookups(), 1);
    }

    #[test]
    fn failed_authentication_never_reads_orders(attempt in credentials()) {
        let store = store_with(&UserRecord::new("Stored", "secret"), Vec::new());
        let rt = runtime();

        let report = rt.block_on(async {
            let pool = WorkerPool::new(2).unwrap();
            let pipeline = Pipeline::new(PublisherBackend::new(Arc::clone(&store) as _, pool));
            pipeline.execute(attempt.clone(), &CollectingSink::new()).await
        });

        prop_assert_eq!(
            report.failure,
            Some(QueryError::NotFound { username: attempt.username })
        );
        prop_assert_eq!(store.order_lookups(), 0);
    }
}
