//! Run-count-aware shutdown of the worker pool.

#![allow(clippy::unwrap_used)] // Tests can unwrap

use shop_query_core::{Credentials, Pipeline, QueryError};
use shop_query_runtime::{FutureBackend, RuntimeError, WorkerPool};
use shop_query_testing::{CollectingSink, InMemoryRecordStore, LISA, LISA_PASSWORD};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn shutdown_waits_for_in_flight_runs() {
    let pool = WorkerPool::new(2).unwrap();
    let ticket = pool.begin_run().unwrap();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(ticket);
    });

    let start = Instant::now();
    pool.shutdown(Duration::from_secs(2)).await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(40));
    assert_eq!(pool.in_flight(), 0);
}

#[tokio::test]
async fn shutdown_times_out_with_pending_runs() {
    let pool = WorkerPool::new(2).unwrap();
    let _first = pool.begin_run().unwrap();
    let _second = pool.begin_run().unwrap();

    let result = pool.shutdown(Duration::from_millis(20)).await;

    assert_eq!(result, Err(RuntimeError::ShutdownTimeout(2)));
    assert!(pool.is_shut_down());
    assert_eq!(pool.begin_run().unwrap_err(), RuntimeError::ShutdownInProgress);
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let pool = WorkerPool::new(1).unwrap();
    pool.shutdown(Duration::from_millis(10)).await.unwrap();
    pool.shutdown(Duration::from_millis(10)).await.unwrap();
    assert!(pool.is_shut_down());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_in_progress_completes_during_shutdown() {
    let store = Arc::new(InMemoryRecordStore::seeded().with_latency(Duration::from_millis(30)));
    let pool = WorkerPool::new(2).unwrap();
    let pipeline = Pipeline::new(FutureBackend::new(Arc::clone(&store) as _, pool.clone()));
    let sink = Arc::new(CollectingSink::new());

    let ticket = pool.begin_run().unwrap();
    let run = {
        let sink = Arc::clone(&sink);
        tokio::spawn(async move {
            let report = pipeline
                .execute(Credentials::new(LISA, LISA_PASSWORD), sink.as_ref())
                .await;
            drop(ticket);
            report
        })
    };

    pool.shutdown(Duration::from_secs(2)).await.unwrap();

    let report = run.await.unwrap();
    assert!(report.succeeded());
    assert_eq!(sink.successes().len(), 1);
}

#[tokio::test]
async fn reads_after_shutdown_fail_as_unavailable() {
    let store = Arc::new(InMemoryRecordStore::seeded());
    let pool = WorkerPool::new(1).unwrap();
    let pipeline = Pipeline::new(FutureBackend::new(Arc::clone(&store) as _, pool.clone()));
    pool.shutdown(Duration::from_millis(10)).await.unwrap();

    let sink = CollectingSink::new();
    let report = pipeline
        .execute(Credentials::new(LISA, LISA_PASSWORD), &sink)
        .await;

    assert_eq!(
        report.failure,
        Some(QueryError::StoreUnavailable("worker pool is shut down".to_string()))
    );
    assert_eq!(store.user_lookups(), 0);
}
