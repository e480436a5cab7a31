//! Prometheus metrics for pipeline runs and the worker pool.
//!
//! Metrics are recorded through the `metrics` facade wherever runs are
//! started, finished or rejected. [`MetricsRecorder::install`] wires the
//! facade to a Prometheus recorder so the current values can be rendered.
//!
//! # Example
//!
//! ```rust,no_run
//! use shop_query_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let recorder = MetricsRecorder::install()?;
//! // ... run the pipeline ...
//! if let Some(snapshot) = recorder.render() {
//!     println!("{snapshot}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Handle on the installed Prometheus recorder.
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// If another recorder is already installed (e.g. in tests), a warning is
    /// logged and the returned recorder renders nothing.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the exporter cannot be built or installed.
    pub fn install() -> Result<Self, MetricsError> {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                register_metrics();
                tracing::debug!("Prometheus metrics recorder installed");
                Ok(Self {
                    handle: Some(handle),
                })
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(Self { handle: None })
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this recorder did not install the global one.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

impl std::fmt::Debug for MetricsRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRecorder")
            .field("installed", &self.handle.is_some())
            .finish()
    }
}

fn register_metrics() {
    describe_counter!(
        "pipeline_runs_started_total",
        "Total number of pipeline runs admitted by the harness"
    );
    describe_counter!(
        "pipeline_runs_succeeded_total",
        "Total number of runs whose result was displayed"
    );
    describe_counter!(
        "pipeline_runs_failed_total",
        "Total number of runs that ended with a failure"
    );
    describe_counter!(
        "pipeline_runs_rejected_total",
        "Total number of runs rejected after shutdown"
    );
    describe_counter!(
        "worker_pool_jobs_total",
        "Total number of store reads submitted to the worker pool"
    );
    describe_counter!(
        "worker_pool_shutdowns_initiated_total",
        "Total number of worker pool shutdowns started"
    );
    describe_counter!(
        "worker_pool_shutdowns_timeout_total",
        "Total number of shutdowns that gave up with runs still in flight"
    );
    describe_counter!(
        "worker_pool_shutdowns_completed_total",
        "Total number of shutdowns that drained every run"
    );
    describe_histogram!(
        "pipeline_run_duration_seconds",
        "Time from admission to the sink receiving the outcome"
    );
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test]
    async fn install_then_render() {
        let recorder = MetricsRecorder::install().unwrap();
        metrics::counter!("pipeline_runs_started_total").increment(1);
        let pool = crate::WorkerPool::new(1).unwrap();
        pool.shutdown(std::time::Duration::from_millis(10)).await.unwrap();

        // Another test binary thread may have installed the recorder first.
        if let Some(rendered) = recorder.render() {
            assert!(rendered.contains("pipeline_runs_started_total"));
            assert!(rendered.contains("worker_pool_shutdowns_initiated_total"));
            assert!(rendered.contains("worker_pool_shutdowns_completed_total"));
            assert!(!rendered.contains("worker_pool.shutdown"));
        }
    }
}
