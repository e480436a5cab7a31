//! Push-based reactive back-end.
//!
//! An [`Observable`] is hot: creating one from a store read dispatches the
//! read onto the pool straight away, and a producer task pushes every record
//! into an unbounded channel as it arrives. Operators are stream combinators
//! layered on the receiving end. A subscriber is an [`Observer`] receiving
//! `on_next`, then exactly one of `on_error` / `on_completed`.
//!
//! The user lookup emits zero or one record and the order lookup emits one
//! record per order. Both are collapsed with [`Observable::to_list`] before the
//! pipeline sees them.

use crate::pool::WorkerPool;
use crate::single::{SingleValue, bind_once, map_once};
use futures::channel::mpsc;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use shop_query_core::{
    Backend, Completion, Order, Outcome, QueryError, RecordStore, StoreError, UserRecord,
};
use std::sync::Arc;

/// Receives the signals of an [`Observable`].
pub trait Observer<T>: Send + 'static {
    /// A value was emitted.
    fn on_next(&mut self, value: T);

    /// The observable failed. No further signal follows.
    fn on_error(&mut self, error: QueryError);

    /// The observable finished. No further signal follows.
    fn on_completed(&mut self);
}

/// A push-based stream of values that ends with completion or a failure.
pub struct Observable<T> {
    stream: BoxStream<'static, Outcome<T>>,
}

impl<T: Send + 'static> Observable<T> {
    /// Dispatch `read` now and push each returned record to subscribers.
    pub fn from_read<F>(pool: &WorkerPool, read: F) -> Self
    where
        F: FnOnce() -> Result<Vec<T>, StoreError> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded();
        let pending = pool.submit(read);
        pool.spawn(async move {
            match pending.await {
                Ok(records) => {
                    for record in records {
                        if tx.unbounded_send(Ok(record)).is_err() {
                            break;
                        }
                    }
                },
                Err(error) => {
                    if tx.unbounded_send(Err(error)).is_err() {
                        tracing::debug!("Observable failure dropped, no subscriber left");
                    }
                },
            }
        });
        Self { stream: rx.boxed() }
    }

    /// Collect every emitted value into one `Vec`, failing on the first error.
    #[must_use]
    pub fn to_list(self) -> Observable<Vec<T>> {
        Observable {
            stream: stream::once(async move { self.stream.try_collect::<Vec<T>>().await }).boxed(),
        }
    }

    /// Apply a fallible continuation to the emitted value.
    #[must_use]
    pub fn map<U, F>(self, f: F) -> Observable<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Outcome<U> + Send + 'static,
    {
        Observable {
            stream: self.stream.map(map_once(f)).boxed(),
        }
    }

    /// Replace the emitted value with the values of the observable `f` returns.
    #[must_use]
    pub fn flat_map<U, F>(self, f: F) -> Observable<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Observable<U> + Send + 'static,
    {
        Observable {
            stream: self
                .stream
                .flat_map(bind_once(f, |inner: Observable<U>| inner.stream))
                .boxed(),
        }
    }

    /// Drive the observable on the pool, forwarding signals to `observer`.
    pub fn subscribe<O>(self, pool: &WorkerPool, mut observer: O)
    where
        O: Observer<T>,
    {
        let mut stream = self.stream;
        pool.spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(value) => observer.on_next(value),
                    Err(error) => {
                        observer.on_error(error);
                        return;
                    },
                }
            }
            observer.on_completed();
        });
    }
}

impl<T: Send + 'static> Observer<T> for SingleValue<T> {
    fn on_next(&mut self, value: T) {
        self.next(value);
    }

    fn on_error(&mut self, error: QueryError) {
        self.error(error);
    }

    fn on_completed(&mut self) {
        self.end();
    }
}

/// Back-end running the pipeline on hot observables.
#[derive(Clone)]
pub struct ObservableBackend {
    store: Arc<dyn RecordStore>,
    pool: WorkerPool,
}

impl ObservableBackend {
    /// Create a back-end reading from `store` on `pool`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, pool: WorkerPool) -> Self {
        Self { store, pool }
    }
}

impl Backend for ObservableBackend {
    type Async<T: Send + 'static> = Observable<T>;

    fn fetch_one(&self, key: &str) -> Observable<Option<UserRecord>> {
        let store = Arc::clone(&self.store);
        let key = key.to_owned();
        Observable::<UserRecord>::from_read(&self.pool, move || {
            store.find_user(&key).map(|user| user.into_iter().collect())
        })
        .to_list()
        .map(|users| Ok(users.into_iter().next()))
    }

    fn fetch_many(&self, username: &str) -> Observable<Vec<Order>> {
        let store = Arc::clone(&self.store);
        let username = username.to_owned();
        Observable::from_read(&self.pool, move || store.find_orders(&username)).to_list()
    }

    fn map<T, U, F>(&self, source: Observable<T>, f: F) -> Observable<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(T) -> Outcome<U> + Send + 'static,
    {
        source.map(f)
    }

    fn flat_map<T, U, F>(&self, source: Observable<T>, f: F) -> Observable<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(T) -> Self::Async<U> + Send + 'static,
    {
        source.flat_map(f)
    }

    fn complete<T: Send + 'static>(&self, source: Observable<T>) -> Completion<T> {
        let (completer, completion) = Completion::channel();
        source.subscribe(&self.pool, SingleValue::new(completer));
        completion
    }
}
