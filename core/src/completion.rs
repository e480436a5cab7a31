//! One-shot delivery of a run's terminal outcome.
//!
//! Every back-end has its own way of saying "done": a future resolves, an
//! observer receives `on_completed`, a subscriber sees the end of a publisher.
//! Adapters fold all of these into a [`Completer`] / [`Completion`] pair so the
//! orchestrator sees exactly one `Result` per run.
//!
//! # Example
//!
//! ```
//! use shop_query_core::completion::Completion;
//!
//! let (completer, completion) = Completion::<u32>::channel();
//! completer.complete(Ok(7));
//! assert_eq!(completion.blocking_wait(), Ok(7));
//! ```

use crate::error::QueryError;
use tokio::sync::oneshot;

/// Terminal outcome of an asynchronous computation: a value or a failure.
pub type Outcome<T> = Result<T, QueryError>;

/// Producing half. Consumed by [`Completer::complete`], so it can fire once.
#[derive(Debug)]
pub struct Completer<T> {
    tx: oneshot::Sender<Outcome<T>>,
}

impl<T> Completer<T> {
    /// Deliver the terminal outcome.
    ///
    /// If the waiting side has already gone away the outcome is dropped.
    pub fn complete(self, outcome: Outcome<T>) {
        if self.tx.send(outcome).is_err() {
            tracing::debug!("Completion receiver dropped before outcome was delivered");
        }
    }
}

/// Waiting half: resolves to the single terminal outcome of a computation.
#[derive(Debug)]
pub struct Completion<T> {
    rx: oneshot::Receiver<Outcome<T>>,
}

impl<T> Completion<T> {
    /// Create a linked completer/completion pair.
    #[must_use]
    pub fn channel() -> (Completer<T>, Self) {
        let (tx, rx) = oneshot::channel();
        (Completer { tx }, Self { rx })
    }

    /// A completion that is already resolved.
    #[must_use]
    pub fn ready(outcome: Outcome<T>) -> Self {
        let (completer, completion) = Self::channel();
        completer.complete(outcome);
        completion
    }

    /// Suspend until the outcome is delivered.
    ///
    /// A completer dropped without completing yields [`QueryError::Protocol`].
    ///
    /// # Errors
    ///
    /// Returns the failure delivered by the back-end, or
    /// [`QueryError::Protocol`] if none was delivered.
    pub async fn wait(self) -> Outcome<T> {
        self.rx.await.unwrap_or_else(|_| Err(abandoned()))
    }

    /// Block the current thread until the outcome is delivered.
    ///
    /// Must not be called from inside an async runtime.
    ///
    /// # Errors
    ///
    /// Same as [`Completion::wait`].
    pub fn blocking_wait(self) -> Outcome<T> {
        self.rx.blocking_recv().unwrap_or_else(|_| Err(abandoned()))
    }
}

fn abandoned() -> QueryError {
    QueryError::Protocol("run ended without delivering an outcome".to_string())
}
