//! Shop Statistics - eCommerce statistics per user
//!
//! Runs three login attempts one after another and prints each user's
//! orders, or the reason the attempt failed:
//!
//! 1. `lisa` / `password`: succeeds with two orders
//! 2. `lisa` / `bad_password`: bad password
//! 3. `LISA` / `password`: unknown user (names are case-sensitive)
//!
//! After the third run the worker pool is shut down.
//!
//! # Running the Example
//!
//! ```bash
//! cargo run -p shop-statistics
//! cargo run -p shop-statistics --features observable
//! cargo run -p shop-statistics --features publisher
//! ```
//!
//! Configuration is read from the environment (or a `.env` file). See
//! `.env.example` for the recognised variables. Set `SHOP_QUERY_FIXTURES` to
//! a JSON file to replace the built-in users and orders.

use anyhow::Context;
use shop_query_core::{ConsoleSink, Credentials, Pipeline, RecordStore};
use shop_query_runtime::{Harness, Invocation, MetricsRecorder, RuntimeConfig, WorkerPool};
use shop_query_testing::InMemoryRecordStore;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[cfg(feature = "publisher")]
type SelectedBackend = shop_query_runtime::PublisherBackend;
#[cfg(feature = "publisher")]
const BACKEND_NAME: &str = "publisher";

#[cfg(all(feature = "observable", not(feature = "publisher")))]
type SelectedBackend = shop_query_runtime::ObservableBackend;
#[cfg(all(feature = "observable", not(feature = "publisher")))]
const BACKEND_NAME: &str = "observable";

#[cfg(not(any(feature = "observable", feature = "publisher")))]
type SelectedBackend = shop_query_runtime::FutureBackend;
#[cfg(not(any(feature = "observable", feature = "publisher")))]
const BACKEND_NAME: &str = "future";

const FIXTURES_VAR: &str = "SHOP_QUERY_FIXTURES";

fn load_store() -> anyhow::Result<Arc<dyn RecordStore>> {
    match std::env::var(FIXTURES_VAR) {
        Ok(path) => {
            let store = InMemoryRecordStore::from_json_file(&path)
                .with_context(|| format!("loading fixtures from {path}"))?;
            tracing::info!(path = %path, "Loaded fixtures");
            Ok(Arc::new(store))
        },
        Err(_) => Ok(Arc::new(InMemoryRecordStore::seeded())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "shop_statistics=info,shop_query_runtime=info,shop_query_core=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let recorder = MetricsRecorder::install()?;
    let config = RuntimeConfig::from_env();
    tracing::info!(
        backend = BACKEND_NAME,
        pool_size = config.pool_size,
        run_delay = ?config.run_delay,
        "Starting shop statistics"
    );

    let store = load_store()?;
    let pool = WorkerPool::new(config.pool_size)?;
    let backend = SelectedBackend::new(store, pool.clone());
    let harness = Harness::new(Pipeline::new(backend), pool, Arc::new(ConsoleSink), config);

    let reports = harness
        .run_sequence(vec![
            Invocation::new(Credentials::new("lisa", "password")),
            Invocation::new(Credentials::new("lisa", "bad_password")),
            Invocation::last(Credentials::new("LISA", "password")),
        ])
        .await?;

    let succeeded = reports.iter().filter(|report| report.succeeded()).count();
    tracing::info!(
        runs = reports.len(),
        succeeded,
        failed = reports.len() - succeeded,
        "Sequence finished"
    );

    if let Some(snapshot) = recorder.render() {
        tracing::debug!("Metrics snapshot:\n{snapshot}");
    }
    Ok(())
}
