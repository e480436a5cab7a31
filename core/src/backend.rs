//! The chaining contract every concurrency back-end implements.
//!
//! The orchestrator is written once against [`Backend`]. An adapter supplies:
//!
//! - an asynchronous container, [`Backend::Async`], yielding one value or one
//!   failure
//! - the two store reads wrapped into that container
//! - `map` (synchronous, fallible continuation) and `flat_map` (continuation
//!   that starts another asynchronous computation)
//! - `complete`, which subscribes to a container and hands back its single
//!   terminal outcome
//!
//! # Failure channel
//!
//! A failure produced by the source or raised by a `map` closure must skip all
//! later continuations and surface unchanged from `complete`. Adapters never
//! swallow, log-and-continue or default a failure.

use crate::completion::{Completion, Outcome};
use crate::model::{Order, UserRecord};

/// A concurrency back-end able to run the pipeline.
///
/// Adapters are cheap to clone; clones share the same store and scheduler.
pub trait Backend: Clone + Send + Sync + 'static {
    /// The back-end's asynchronous container for a `T`.
    type Async<T: Send + 'static>: Send + 'static;

    /// Look up the user stored under `key`.
    fn fetch_one(&self, key: &str) -> Self::Async<Option<UserRecord>>;

    /// Look up every order owned by `username`, in store order.
    fn fetch_many(&self, username: &str) -> Self::Async<Vec<Order>>;

    /// Apply a fallible synchronous continuation to the value of `source`.
    ///
    /// An `Err` returned by `f` becomes the container's failure.
    fn map<T, U, F>(&self, source: Self::Async<T>, f: F) -> Self::Async<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(T) -> Outcome<U> + Send + 'static;

    /// Chain a dependent asynchronous computation onto `source`.
    ///
    /// `f` is only invoked after `source` succeeded.
    fn flat_map<T, U, F>(&self, source: Self::Async<T>, f: F) -> Self::Async<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(T) -> Self::Async<U> + Send + 'static;

    /// Subscribe to `source` and deliver its terminal outcome exactly once.
    fn complete<T>(&self, source: Self::Async<T>) -> Completion<T>
    where
        T: Send + 'static;
}
