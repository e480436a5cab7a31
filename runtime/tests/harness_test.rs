//! Serial invocation, run admission and shutdown of the harness.

#![allow(clippy::unwrap_used)] // Tests can unwrap

use futures::future::join_all;
use shop_query_core::{Credentials, Pipeline, QueryError, RunPhase};
use shop_query_runtime::{
    FutureBackend, Harness, Invocation, ObservableBackend, PublisherBackend, RuntimeConfig,
    RuntimeError, WorkerPool,
};
use shop_query_testing::{BART, BART_PASSWORD, CollectingSink, InMemoryRecordStore, LISA, LISA_PASSWORD};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_test::{assert_err, assert_ok};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init()
        .ok();
}

fn quick_config() -> RuntimeConfig {
    RuntimeConfig::default()
        .with_pool_size(2)
        .with_run_delay(Duration::ZERO)
        .with_shutdown_timeout(Duration::from_secs(2))
}

fn future_harness(
    store: &Arc<InMemoryRecordStore>,
    sink: &Arc<CollectingSink>,
    config: RuntimeConfig,
) -> Harness<FutureBackend, CollectingSink> {
    let pool = WorkerPool::new(config.pool_size).unwrap();
    let backend = FutureBackend::new(Arc::clone(store) as _, pool.clone());
    Harness::new(Pipeline::new(backend), pool, Arc::clone(sink), config)
}

fn standard_sequence() -> Vec<Invocation> {
    vec![
        Invocation::new(Credentials::new(LISA, LISA_PASSWORD)),
        Invocation::new(Credentials::new(LISA, "bad_password")),
        Invocation::last(Credentials::new("LISA", LISA_PASSWORD)),
    ]
}

fn assert_standard_outcomes(sink: &CollectingSink) {
    let outcomes = sink.outcomes();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].as_ref().unwrap().items.len(), 2);
    assert_eq!(
        outcomes[1],
        Err(QueryError::BadCredential {
            username: LISA.to_string()
        })
    );
    assert_eq!(
        outcomes[2],
        Err(QueryError::NotFound {
            username: "LISA".to_string()
        })
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sequence_runs_in_order_then_shuts_down() {
    init_tracing();
    let store = Arc::new(InMemoryRecordStore::seeded());
    let sink = Arc::new(CollectingSink::new());
    let harness = future_harness(&store, &sink, quick_config());

    let reports = harness.run_sequence(standard_sequence()).await.unwrap();

    let phases: Vec<_> = reports.iter().map(|r| r.phase).collect();
    assert_eq!(
        phases,
        vec![RunPhase::Displayed, RunPhase::Failed, RunPhase::Failed]
    );
    assert_standard_outcomes(&sink);
    assert!(harness.pool().is_shut_down());
    assert_eq!(harness.pool().in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_after_final_is_rejected() {
    let store = Arc::new(InMemoryRecordStore::seeded());
    let sink = Arc::new(CollectingSink::new());
    let harness = future_harness(&store, &sink, quick_config());

    assert_ok!(harness.run_sequence(standard_sequence()).await);
    let rejected = assert_err!(harness.run_one(Credentials::new(BART, BART_PASSWORD)).await);

    assert_eq!(rejected, RuntimeError::ShutdownInProgress);
    assert_eq!(sink.len(), 3);
    assert_eq!(store.user_lookups(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invocations_listed_after_final_produce_no_report() {
    let store = Arc::new(InMemoryRecordStore::seeded());
    let sink = Arc::new(CollectingSink::new());
    let harness = future_harness(&store, &sink, quick_config());

    let reports = harness
        .run_sequence(vec![
            Invocation::last(Credentials::new(LISA, LISA_PASSWORD)),
            Invocation::new(Credentials::new(BART, BART_PASSWORD)),
        ])
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].subject, LISA);
    assert_eq!(sink.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_runs_do_not_stop_the_sequence() {
    let store = Arc::new(InMemoryRecordStore::seeded());
    store.set_available(false);
    let sink = Arc::new(CollectingSink::new());
    let harness = future_harness(&store, &sink, quick_config());

    let reports = harness
        .run_sequence(vec![
            Invocation::new(Credentials::new(LISA, LISA_PASSWORD)),
            Invocation::last(Credentials::new(BART, BART_PASSWORD)),
        ])
        .await
        .unwrap();

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.phase == RunPhase::Failed));
    assert_eq!(sink.failures().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn delay_separates_consecutive_runs() {
    let store = Arc::new(InMemoryRecordStore::seeded());
    let sink = Arc::new(CollectingSink::new());
    let config = quick_config().with_run_delay(Duration::from_millis(40));
    let harness = future_harness(&store, &sink, config);

    let start = Instant::now();
    assert_ok!(harness.run_sequence(standard_sequence()).await);

    assert!(start.elapsed() >= Duration::from_millis(80));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_single_runs_are_all_admitted() {
    let store = Arc::new(InMemoryRecordStore::seeded().with_latency(Duration::from_millis(5)));
    let sink = Arc::new(CollectingSink::new());
    let harness = future_harness(&store, &sink, quick_config().with_pool_size(4));

    let runs = (0..8).map(|_| harness.run_one(Credentials::new(LISA, LISA_PASSWORD)));
    let reports = join_all(runs).await;

    assert!(reports.iter().all(|r| r.as_ref().unwrap().succeeded()));
    assert_eq!(harness.pool().in_flight(), 0);
    assert_eq!(sink.successes().len(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reactive_back_ends_follow_the_same_sequence() {
    let store = Arc::new(InMemoryRecordStore::seeded());

    let observable_sink = Arc::new(CollectingSink::new());
    let pool = WorkerPool::new(2).unwrap();
    let observable = Harness::new(
        Pipeline::new(ObservableBackend::new(Arc::clone(&store) as _, pool.clone())),
        pool,
        Arc::clone(&observable_sink),
        quick_config(),
    );
    assert_ok!(observable.run_sequence(standard_sequence()).await);
    assert_standard_outcomes(&observable_sink);

    let publisher_sink = Arc::new(CollectingSink::new());
    let pool = WorkerPool::new(2).unwrap();
    let publisher = Harness::new(
        Pipeline::new(PublisherBackend::new(Arc::clone(&store) as _, pool.clone())),
        pool,
        Arc::clone(&publisher_sink),
        quick_config(),
    );
    assert_ok!(publisher.run_sequence(standard_sequence()).await);
    assert_standard_outcomes(&publisher_sink);
}
