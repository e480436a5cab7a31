//! Invocation harness.
//!
//! Feeds credential pairs to a [`Pipeline`], one at a time. Each run is fully
//! observed before the next one starts. Once the run flagged as final has
//! been observed, the worker pool is shut down and any later invocation is
//! rejected.

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::pool::WorkerPool;
use shop_query_core::{Backend, Credentials, Pipeline, ResultSink, RunReport};
use std::sync::Arc;
use std::time::Instant;

/// One requested run.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Credentials to run the pipeline with.
    pub credentials: Credentials,
    /// Shut the pool down once this run has been observed.
    pub is_final: bool,
}

impl Invocation {
    /// A run that leaves the pool open.
    #[must_use]
    pub const fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            is_final: false,
        }
    }

    /// A run after which the pool is shut down.
    #[must_use]
    pub const fn last(credentials: Credentials) -> Self {
        Self {
            credentials,
            is_final: true,
        }
    }
}

/// Drives pipeline runs against a sink, owning the pool's shutdown.
pub struct Harness<B, K: ?Sized> {
    pipeline: Pipeline<B>,
    pool: WorkerPool,
    sink: Arc<K>,
    config: RuntimeConfig,
}

impl<B, K> Harness<B, K>
where
    B: Backend,
    K: ResultSink + ?Sized,
{
    /// Create a harness.
    ///
    /// `pool` must be the pool the pipeline's back-end dispatches onto.
    #[must_use]
    pub fn new(pipeline: Pipeline<B>, pool: WorkerPool, sink: Arc<K>, config: RuntimeConfig) -> Self {
        Self {
            pipeline,
            pool,
            sink,
            config,
        }
    }

    /// The pool whose lifetime this harness manages.
    #[must_use]
    pub const fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Execute one run and wait for its outcome.
    ///
    /// Runs may be awaited concurrently; each is counted as in flight until
    /// its outcome has reached the sink.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ShutdownInProgress`] if the pool no longer
    /// accepts runs. The pipeline is not started in that case.
    pub async fn run_one(&self, credentials: Credentials) -> Result<RunReport, RuntimeError> {
        let ticket = match self.pool.begin_run() {
            Ok(ticket) => ticket,
            Err(e) => {
                tracing::warn!(username = %credentials.username, error = %e, "Rejecting run");
                metrics::counter!("pipeline_runs_rejected_total").increment(1);
                return Err(e);
            },
        };

        metrics::counter!("pipeline_runs_started_total").increment(1);
        let start = Instant::now();
        let report = self.pipeline.execute(credentials, self.sink.as_ref()).await;
        drop(ticket);

        metrics::histogram!("pipeline_run_duration_seconds").record(start.elapsed().as_secs_f64());
        if report.succeeded() {
            metrics::counter!("pipeline_runs_succeeded_total").increment(1);
        } else {
            metrics::counter!("pipeline_runs_failed_total").increment(1);
        }
        Ok(report)
    }

    /// Execute `invocations` in order, pausing `run_delay` between runs.
    ///
    /// Failed runs are reported through the sink and do not stop the
    /// sequence. After the final invocation the pool is shut down; any
    /// invocation listed after it is rejected and produces no report.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ShutdownTimeout`] if runs are still in flight
    /// when the shutdown timeout elapses.
    pub async fn run_sequence(
        &self,
        invocations: Vec<Invocation>,
    ) -> Result<Vec<RunReport>, RuntimeError> {
        let mut reports = Vec::with_capacity(invocations.len());
        for (index, invocation) in invocations.into_iter().enumerate() {
            if index > 0 && !self.pool.is_shut_down() && !self.config.run_delay.is_zero() {
                tokio::time::sleep(self.config.run_delay).await;
            }

            match self.run_one(invocation.credentials).await {
                Ok(report) => reports.push(report),
                Err(RuntimeError::ShutdownInProgress) => continue,
                Err(e) => return Err(e),
            }

            if invocation.is_final {
                self.pool.shutdown(self.config.shutdown_timeout).await?;
            }
        }
        Ok(reports)
    }
}

impl<B, K: ?Sized> std::fmt::Debug for Harness<B, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("pool", &self.pool)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
