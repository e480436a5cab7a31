//! Completable-future back-end.
//!
//! Each store read is submitted to the [`WorkerPool`] as soon as it is
//! requested; the returned [`Task`] only observes the result. `map` and
//! `flat_map` are plain async continuations, so a failure short-circuits
//! through `?` without running later stages.

use crate::pool::WorkerPool;
use futures::FutureExt;
use futures::future::BoxFuture;
use shop_query_core::{Backend, Completion, Order, Outcome, RecordStore, UserRecord};
use std::sync::Arc;

/// A boxed future yielding one outcome.
pub type Task<T> = BoxFuture<'static, Outcome<T>>;

/// Back-end running the pipeline on eager futures.
#[derive(Clone)]
pub struct FutureBackend {
    store: Arc<dyn RecordStore>,
    pool: WorkerPool,
}

impl FutureBackend {
    /// Create a back-end reading from `store` on `pool`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, pool: WorkerPool) -> Self {
        Self { store, pool }
    }
}

impl Backend for FutureBackend {
    type Async<T: Send + 'static> = Task<T>;

    fn fetch_one(&self, key: &str) -> Task<Option<UserRecord>> {
        let store = Arc::clone(&self.store);
        let key = key.to_owned();
        self.pool.submit(move || store.find_user(&key))
    }

    fn fetch_many(&self, username: &str) -> Task<Vec<Order>> {
        let store = Arc::clone(&self.store);
        let username = username.to_owned();
        self.pool.submit(move || store.find_orders(&username))
    }

    fn map<T, U, F>(&self, source: Task<T>, f: F) -> Task<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(T) -> Outcome<U> + Send + 'static,
    {
        async move { f(source.await?) }.boxed()
    }

    fn flat_map<T, U, F>(&self, source: Task<T>, f: F) -> Task<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(T) -> Self::Async<U> + Send + 'static,
    {
        async move { f(source.await?).await }.boxed()
    }

    fn complete<T: Send + 'static>(&self, source: Task<T>) -> Completion<T> {
        let (completer, completion) = Completion::channel();
        self.pool.spawn(async move {
            completer.complete(source.await);
        });
        completion
    }
}
