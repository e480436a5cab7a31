//! The two-stage query orchestrator.
//!
//! ```text
//! fetch_one(username) ─map→ authenticate ─map→ name
//!     ─flat_map→ fetch_many(name) ─map→ PipelineResult(name, orders)
//! ```
//!
//! Everything is expressed through [`Backend`], so the same chain runs on
//! futures, observables or publishers. Stage two is built inside the
//! `flat_map` continuation: when authentication fails it is never created and
//! the order lookup never reaches the store.
//!
//! The orchestrator holds no per-run state. Concurrent runs share only the
//! back-end (and through it the store and worker pool).

use crate::auth::authenticate;
use crate::backend::Backend;
use crate::environment::{Clock, SystemClock};
use crate::model::{Credentials, PipelineResult};
use crate::run::{RunPhase, RunReport, RunTracker};
use crate::sink::ResultSink;
use std::sync::Arc;

/// Query orchestrator bound to one back-end.
#[derive(Clone)]
pub struct Pipeline<B> {
    backend: B,
    clock: Arc<dyn Clock>,
}

impl<B: Backend> Pipeline<B> {
    /// Create an orchestrator using the system clock for run reports.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self::with_clock(backend, Arc::new(SystemClock))
    }

    /// Create an orchestrator with an injected clock.
    #[must_use]
    pub fn with_clock(backend: B, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// Stage one: look the user up and check the credentials.
    ///
    /// Yields the authenticated user's name.
    pub fn log_in(&self, credentials: Credentials) -> B::Async<String> {
        let found = self.backend.fetch_one(&credentials.username);
        let user = self
            .backend
            .map(found, move |record| authenticate(record, &credentials));
        self.backend.map(user, |user| Ok(user.name))
    }

    /// Stage two: fetch the orders of an authenticated user and combine them.
    pub fn process_orders_of(&self, username: String) -> B::Async<PipelineResult> {
        let orders = self.backend.fetch_many(&username);
        self.backend
            .map(orders, move |items| Ok(PipelineResult::new(username, items)))
    }

    /// Build the full chain for one run, advancing `run` as stages execute.
    pub fn query(&self, credentials: Credentials, run: &RunTracker) -> B::Async<PipelineResult> {
        run.advance(RunPhase::Authenticating);
        let username = self.log_in(credentials);

        let pipeline = self.clone();
        let run = run.clone();
        self.backend.flat_map(username, move |username| {
            run.advance(RunPhase::Fetching);
            let combined = pipeline.process_orders_of(username);
            pipeline.backend.map(combined, move |result| {
                run.advance(RunPhase::Combined);
                Ok(result)
            })
        })
    }

    /// Drive one run to its terminal outcome and hand it to `sink`.
    ///
    /// Suspends until the outcome has been observed, so the caller cannot
    /// move past a run that is still unresolved. Failures are reported through
    /// the sink and the returned report; they never abort the caller.
    #[tracing::instrument(skip_all, name = "pipeline_run", fields(username = %credentials.username))]
    pub async fn execute<K>(&self, credentials: Credentials, sink: &K) -> RunReport
    where
        K: ResultSink + ?Sized,
    {
        let run = RunTracker::new();
        let subject = credentials.username.clone();
        let started_at = self.clock.now();
        tracing::info!("Calculating eCommerce statistics");

        let outcome = self
            .backend
            .complete(self.query(credentials, &run))
            .wait()
            .await;

        let (item_count, failure) = match outcome {
            Ok(result) => {
                let count = result.items.len();
                sink.on_success(result);
                run.advance(RunPhase::Displayed);
                tracing::info!(orders = count, "Run displayed");
                (Some(count), None)
            },
            Err(error) => {
                sink.on_failure(error.clone());
                run.advance(RunPhase::Failed);
                tracing::info!(error = %error, "Run failed");
                (None, Some(error))
            },
        };

        RunReport {
            subject,
            phase: run.phase(),
            item_count,
            failure,
            started_at,
            finished_at: self.clock.now(),
        }
    }
}
