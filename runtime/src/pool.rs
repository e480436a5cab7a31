//! Explicitly owned worker pool with run-count-aware shutdown.
//!
//! Blocking store reads are dispatched onto tokio's blocking threads, gated by
//! a semaphore holding `size` permits, so at most `size` reads run at once.
//!
//! # Shutdown
//!
//! The pool counts in-flight runs. [`WorkerPool::begin_run`] hands out a
//! [`RunTicket`] that releases its slot on drop. [`WorkerPool::shutdown`]:
//!
//! 1. closes admission (later `begin_run` calls are rejected)
//! 2. waits until every ticket has been dropped (with timeout)
//! 3. closes the semaphore so no further read is dispatched
//!
//! # Example
//!
//! ```ignore
//! let pool = WorkerPool::new(4)?;
//! let ticket = pool.begin_run()?;
//! let user = pool.submit(move || store.find_user("lisa")).await?;
//! drop(ticket);
//! pool.shutdown(Duration::from_secs(30)).await?;
//! ```

use crate::error::RuntimeError;
use futures::FutureExt;
use futures::future::BoxFuture;
use shop_query_core::{Outcome, QueryError, StoreError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, watch};

#[derive(Debug, Clone, Copy, Default)]
struct RunCount {
    in_flight: usize,
    closed: bool,
}

struct PoolInner {
    handle: Handle,
    permits: Arc<Semaphore>,
    size: usize,
    runs: watch::Sender<RunCount>,
}

/// Bounded pool running blocking store reads.
///
/// Cheap to clone; clones share the same permits and run accounting.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    /// Create a pool of `size` workers on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::NoRuntime`] if called outside a tokio runtime
    /// - [`RuntimeError::InvalidPoolSize`] if `size` is zero
    pub fn new(size: usize) -> Result<Self, RuntimeError> {
        let handle = Handle::try_current().map_err(|e| RuntimeError::NoRuntime(e.to_string()))?;
        Self::with_handle(handle, size)
    }

    /// Create a pool of `size` workers dispatching onto `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::InvalidPoolSize`] if `size` is zero.
    pub fn with_handle(handle: Handle, size: usize) -> Result<Self, RuntimeError> {
        if size == 0 {
            return Err(RuntimeError::InvalidPoolSize);
        }
        let (runs, _) = watch::channel(RunCount::default());
        tracing::debug!(size, "Worker pool created");
        Ok(Self {
            inner: Arc::new(PoolInner {
                handle,
                permits: Arc::new(Semaphore::new(size)),
                size,
                runs,
            }),
        })
    }

    /// Number of reads that may run concurrently.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Number of runs that have begun and not yet released their ticket.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.runs.borrow().in_flight
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.runs.borrow().closed
    }

    /// Register a new run.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ShutdownInProgress`] once shutdown was requested.
    pub fn begin_run(&self) -> Result<RunTicket, RuntimeError> {
        let mut accepted = false;
        self.inner.runs.send_modify(|count| {
            if !count.closed {
                count.in_flight += 1;
                accepted = true;
            }
        });
        if accepted {
            Ok(RunTicket {
                inner: Arc::clone(&self.inner),
            })
        } else {
            Err(RuntimeError::ShutdownInProgress)
        }
    }

    /// Run a blocking store read on the pool.
    ///
    /// The read is dispatched immediately; the returned future only observes
    /// its result. A read submitted after shutdown fails with
    /// [`QueryError::StoreUnavailable`].
    pub fn submit<T, F>(&self, read: F) -> BoxFuture<'static, Outcome<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    {
        metrics::counter!("worker_pool_jobs_total").increment(1);
        let permits = Arc::clone(&self.inner.permits);
        let job = self.inner.handle.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| QueryError::StoreUnavailable("worker pool is shut down".to_string()))?;
            match tokio::task::spawn_blocking(read).await {
                Ok(result) => result.map_err(QueryError::from),
                Err(e) => Err(QueryError::StoreUnavailable(format!("store read failed: {e}"))),
            }
        });
        async move {
            job.await.unwrap_or_else(|e| {
                Err(QueryError::StoreUnavailable(format!(
                    "worker task failed: {e}"
                )))
            })
        }
        .boxed()
    }

    /// Spawn a non-blocking continuation on the pool's runtime.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        drop(self.inner.handle.spawn(task));
    }

    /// Stop accepting runs and wait for in-flight runs to finish.
    ///
    /// Returns once every outstanding [`RunTicket`] has been dropped. Calling
    /// it again after a successful shutdown returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ShutdownTimeout`] if runs are still in flight
    /// when `timeout` elapses. Admission stays closed in that case.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), RuntimeError> {
        tracing::info!(in_flight = self.in_flight(), "Initiating worker pool shutdown");
        metrics::counter!("worker_pool_shutdowns_initiated_total").increment(1);

        self.inner.runs.send_modify(|count| count.closed = true);

        let mut runs = self.inner.runs.subscribe();
        let drained = tokio::time::timeout(timeout, async move {
            runs.wait_for(|count| count.in_flight == 0).await.is_ok()
        })
        .await;

        if drained.is_err() {
            let pending = self.in_flight();
            tracing::error!(
                in_flight = pending,
                "Shutdown timeout: {} runs still in flight", pending
            );
            metrics::counter!("worker_pool_shutdowns_timeout_total").increment(1);
            return Err(RuntimeError::ShutdownTimeout(pending));
        }

        self.inner.permits.close();
        tracing::info!("All runs completed, worker pool shut down");
        metrics::counter!("worker_pool_shutdowns_completed_total").increment(1);
        Ok(())
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.inner.size)
            .field("in_flight", &self.in_flight())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

/// Slot held by an in-flight run. Released on drop.
pub struct RunTicket {
    inner: Arc<PoolInner>,
}

impl Drop for RunTicket {
    fn drop(&mut self) {
        self.inner.runs.send_modify(|count| {
            count.in_flight = count.in_flight.saturating_sub(1);
        });
    }
}

impl std::fmt::Debug for RunTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunTicket").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test]
    async fn zero_sized_pool_is_rejected() {
        assert!(matches!(
            WorkerPool::new(0),
            Err(RuntimeError::InvalidPoolSize)
        ));
    }

    #[test]
    fn requires_a_runtime() {
        assert!(matches!(WorkerPool::new(2), Err(RuntimeError::NoRuntime(_))));
    }

    #[tokio::test]
    async fn submit_surfaces_store_errors() {
        let pool = WorkerPool::new(2).unwrap();
        let outcome: Outcome<()> = pool
            .submit(|| Err(StoreError::Unavailable("connection refused".to_string())))
            .await;
        assert_eq!(
            outcome,
            Err(QueryError::StoreUnavailable("connection refused".to_string()))
        );
    }

    #[tokio::test]
    async fn tickets_track_in_flight_runs() {
        let pool = WorkerPool::new(2).unwrap();
        let first = pool.begin_run().unwrap();
        let second = pool.begin_run().unwrap();
        assert_eq!(pool.in_flight(), 2);
        drop(first);
        assert_eq!(pool.in_flight(), 1);
        drop(second);
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn shutdown_closes_admission_and_dispatch() {
        let pool = WorkerPool::new(1).unwrap();
        pool.shutdown(Duration::from_secs(1)).await.unwrap();

        assert!(pool.is_shut_down());
        assert!(matches!(
            pool.begin_run(),
            Err(RuntimeError::ShutdownInProgress)
        ));
        let outcome = pool.submit(|| Ok(1)).await;
        assert!(matches!(outcome, Err(QueryError::StoreUnavailable(_))));
    }
}
