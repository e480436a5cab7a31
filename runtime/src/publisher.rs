//! Cold reactive-streams back-end.
//!
//! A [`Publisher`] is a recipe: nothing is dispatched until a [`Subscriber`]
//! attaches, and every subscription replays the recipe from scratch. The raw
//! store publishers emit one document at a time; [`Publisher::first`] and
//! [`Publisher::to_list`] collapse them into the single value the pipeline
//! chains on.
//!
//! Demand signalling is not modelled. Subscribers receive items as fast as
//! the source produces them.

use crate::pool::WorkerPool;
use crate::single::{SingleValue, bind_once, map_once};
use async_stream::stream;
use futures::stream::{self as futures_stream, BoxStream, StreamExt, TryStreamExt};
use shop_query_core::{
    Backend, Completion, Order, Outcome, QueryError, RecordStore, StoreError, UserRecord,
};
use std::sync::Arc;

type Source<T> = Box<dyn FnOnce() -> BoxStream<'static, Outcome<T>> + Send>;

/// Receives the signals of a subscribed [`Publisher`].
pub trait Subscriber<T>: Send + 'static {
    /// An item was published.
    fn on_next(&mut self, item: T);

    /// The publisher failed. No further signal follows.
    fn on_error(&mut self, error: QueryError);

    /// The publisher is exhausted. No further signal follows.
    fn on_complete(&mut self);
}

/// A deferred source of items, started once per subscription.
pub struct Publisher<T> {
    source: Source<T>,
}

impl<T: Send + 'static> Publisher<T> {
    /// Wrap a stream factory. The factory runs when the publisher is subscribed.
    pub fn defer<F>(factory: F) -> Self
    where
        F: FnOnce() -> BoxStream<'static, Outcome<T>> + Send + 'static,
    {
        Self {
            source: Box::new(factory),
        }
    }

    /// Publish the records returned by `read`, one at a time.
    ///
    /// `read` is dispatched onto `pool` only when the publisher is subscribed.
    pub fn from_read<F>(pool: &WorkerPool, read: F) -> Self
    where
        F: FnOnce() -> Result<Vec<T>, StoreError> + Send + 'static,
    {
        let pool = pool.clone();
        Self::defer(move || {
            let documents = stream! {
                match pool.submit(read).await {
                    Ok(records) => {
                        for record in records {
                            yield Ok(record);
                        }
                    },
                    Err(error) => yield Err(error),
                }
            };
            documents.boxed()
        })
    }

    /// Publish the first item, or `None` if the source is empty.
    #[must_use]
    pub fn first(self) -> Publisher<Option<T>> {
        Publisher::defer(move || {
            futures_stream::once(async move {
                let mut items = (self.source)();
                items.next().await.transpose()
            })
            .boxed()
        })
    }

    /// Publish every item as one `Vec`, failing on the first error.
    #[must_use]
    pub fn to_list(self) -> Publisher<Vec<T>> {
        Publisher::defer(move || {
            futures_stream::once(async move { (self.source)().try_collect::<Vec<T>>().await })
                .boxed()
        })
    }

    /// Apply a fallible continuation to the published item.
    #[must_use]
    pub fn map<U, F>(self, f: F) -> Publisher<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Outcome<U> + Send + 'static,
    {
        Publisher::defer(move || (self.source)().map(map_once(f)).boxed())
    }

    /// Replace the published item with the items of the publisher `f` returns.
    #[must_use]
    pub fn flat_map<U, F>(self, f: F) -> Publisher<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Publisher<U> + Send + 'static,
    {
        Publisher::defer(move || {
            (self.source)()
                .flat_map(bind_once(f, |inner: Publisher<U>| (inner.source)()))
                .boxed()
        })
    }

    /// Start the publisher on the pool, forwarding signals to `subscriber`.
    pub fn subscribe<S>(self, pool: &WorkerPool, mut subscriber: S)
    where
        S: Subscriber<T>,
    {
        let source = self.source;
        pool.spawn(async move {
            let mut items = source();
            while let Some(item) = items.next().await {
                match item {
                    Ok(item) => subscriber.on_next(item),
                    Err(error) => {
                        subscriber.on_error(error);
                        return;
                    },
                }
            }
            subscriber.on_complete();
        });
    }
}

impl<T: Send + 'static> Subscriber<T> for SingleValue<T> {
    fn on_next(&mut self, item: T) {
        self.next(item);
    }

    fn on_error(&mut self, error: QueryError) {
        self.error(error);
    }

    fn on_complete(&mut self) {
        self.end();
    }
}

/// Back-end running the pipeline on cold publishers.
#[derive(Clone)]
pub struct PublisherBackend {
    store: Arc<dyn RecordStore>,
    pool: WorkerPool,
}

impl PublisherBackend {
    /// Create a back-end reading from `store` on `pool`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, pool: WorkerPool) -> Self {
        Self { store, pool }
    }
}

impl Backend for PublisherBackend {
    type Async<T: Send + 'static> = Publisher<T>;

    fn fetch_one(&self, key: &str) -> Publisher<Option<UserRecord>> {
        let store = Arc::clone(&self.store);
        let key = key.to_owned();
        Publisher::<UserRecord>::from_read(&self.pool, move || {
            store.find_user(&key).map(|user| user.into_iter().collect())
        })
        .first()
    }

    fn fetch_many(&self, username: &str) -> Publisher<Vec<Order>> {
        let store = Arc::clone(&self.store);
        let username = username.to_owned();
        Publisher::from_read(&self.pool, move || store.find_orders(&username)).to_list()
    }

    fn map<T, U, F>(&self, source: Publisher<T>, f: F) -> Publisher<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(T) -> Outcome<U> + Send + 'static,
    {
        source.map(f)
    }

    fn flat_map<T, U, F>(&self, source: Publisher<T>, f: F) -> Publisher<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(T) -> Self::Async<U> + Send + 'static,
    {
        source.flat_map(f)
    }

    fn complete<T: Send + 'static>(&self, source: Publisher<T>) -> Completion<T> {
        let (completer, completion) = Completion::channel();
        source.subscribe(&self.pool, SingleValue::new(completer));
        completion
    }
}
