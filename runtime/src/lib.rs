//! # Shop Query Runtime
//!
//! Concurrency back-ends and execution harness for the shop query pipeline.
//!
//! The orchestrator in `shop_query_core` is written against the `Backend`
//! trait. This crate provides the pieces that make it run:
//!
//! ## Core Components
//!
//! - **Worker pool** ([`WorkerPool`]): bounded dispatch of blocking store
//!   reads, with run-count-aware shutdown
//! - **Future back-end** ([`FutureBackend`]): eager boxed futures
//! - **Observable back-end** ([`ObservableBackend`]): hot push-based streams
//! - **Publisher back-end** ([`PublisherBackend`]): cold deferred streams
//! - **Harness** ([`Harness`]): serial invocation with delay and shutdown
//!   after the final run
//!
//! ## Example
//!
//! ```ignore
//! use shop_query_core::{ConsoleSink, Credentials, Pipeline};
//! use shop_query_runtime::{FutureBackend, Harness, Invocation, RuntimeConfig, WorkerPool};
//!
//! let config = RuntimeConfig::from_env();
//! let pool = WorkerPool::new(config.pool_size)?;
//! let backend = FutureBackend::new(store, pool.clone());
//! let harness = Harness::new(Pipeline::new(backend), pool, Arc::new(ConsoleSink), config);
//!
//! harness
//!     .run_sequence(vec![
//!         Invocation::new(Credentials::new("lisa", "password")),
//!         Invocation::last(Credentials::new("LISA", "password")),
//!     ])
//!     .await?;
//! ```

/// Runtime configuration loaded from defaults or the environment
pub mod config;

/// Eager future back-end
pub mod future_backend;

/// Serial invocation harness
pub mod harness;

/// Prometheus metrics for observability
pub mod metrics;

/// Hot observable back-end
pub mod observable;

/// Bounded worker pool
pub mod pool;

/// Cold publisher back-end
pub mod publisher;

mod single;

/// Error types for the runtime
pub mod error {
    use thiserror::Error;

    /// Errors raised by the worker pool and the harness.
    ///
    /// Pipeline failures are not runtime errors: they travel as
    /// `QueryError` to the sink and the run report.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum RuntimeError {
        /// The pool is shutting down and not accepting new runs
        ///
        /// Returned by `begin_run()` once `shutdown()` has been called.
        #[error("Worker pool is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for runs to complete
        ///
        /// Some runs were still in flight when the timeout elapsed.
        #[error("Shutdown timed out with {0} runs still in flight")]
        ShutdownTimeout(usize),

        /// No tokio runtime was available to host the pool
        #[error("No tokio runtime available: {0}")]
        NoRuntime(String),

        /// The pool was configured with zero workers
        #[error("Worker pool size must be at least 1")]
        InvalidPoolSize,
    }
}

pub use config::RuntimeConfig;
pub use error::RuntimeError;
pub use future_backend::{FutureBackend, Task};
pub use harness::{Harness, Invocation};
pub use metrics::{MetricsError, MetricsRecorder};
pub use observable::{Observable, ObservableBackend, Observer};
pub use pool::{RunTicket, WorkerPool};
pub use publisher::{Publisher, PublisherBackend, Subscriber};
