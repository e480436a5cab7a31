//! Helpers shared by the stream-based back-ends.
//!
//! Their containers are streams, but every container the pipeline builds
//! carries a single value once the raw documents have been collapsed. These
//! helpers enforce that: a continuation runs at most once, and a terminal
//! observer turns `next / error / complete` into one [`Completion`] outcome.
//!
//! [`Completion`]: shop_query_core::Completion

use futures::stream::{self, BoxStream, StreamExt};
use shop_query_core::{Completer, Outcome, QueryError};

fn more_than_one_value() -> QueryError {
    QueryError::Protocol("source emitted more than one value".to_string())
}

/// A stream that fails immediately with `error`.
pub(crate) fn failed<U: Send + 'static>(error: QueryError) -> BoxStream<'static, Outcome<U>> {
    stream::once(async move { Err(error) }).boxed()
}

/// Adapt a `map` continuation for use with `StreamExt::map`.
pub(crate) fn map_once<T, U, F>(f: F) -> impl FnMut(Outcome<T>) -> Outcome<U> + Send + 'static
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnOnce(T) -> Outcome<U> + Send + 'static,
{
    let mut f = Some(f);
    move |item| match (item, f.take()) {
        (Ok(value), Some(f)) => f(value),
        (Ok(_), None) => Err(more_than_one_value()),
        (Err(error), _) => Err(error),
    }
}

/// Adapt a `flat_map` continuation for use with `StreamExt::flat_map`.
///
/// `open` turns the container returned by `f` into the stream to splice in.
pub(crate) fn bind_once<T, U, A, F>(
    f: F,
    open: fn(A) -> BoxStream<'static, Outcome<U>>,
) -> impl FnMut(Outcome<T>) -> BoxStream<'static, Outcome<U>> + Send + 'static
where
    T: Send + 'static,
    U: Send + 'static,
    A: 'static,
    F: FnOnce(T) -> A + Send + 'static,
{
    let mut f = Some(f);
    move |item| match (item, f.take()) {
        (Ok(value), Some(f)) => open(f(value)),
        (Ok(_), None) => failed(more_than_one_value()),
        (Err(error), _) => failed(error),
    }
}

/// Terminal consumer that expects exactly one value before completion.
pub(crate) struct SingleValue<T> {
    value: Option<T>,
    completer: Option<Completer<T>>,
}

impl<T> SingleValue<T> {
    pub(crate) const fn new(completer: Completer<T>) -> Self {
        Self {
            value: None,
            completer: Some(completer),
        }
    }

    pub(crate) fn next(&mut self, value: T) {
        if self.value.is_some() {
            self.finish(Err(more_than_one_value()));
        } else {
            self.value = Some(value);
        }
    }

    pub(crate) fn error(&mut self, error: QueryError) {
        self.finish(Err(error));
    }

    pub(crate) fn end(&mut self) {
        let outcome = self.value.take().ok_or_else(|| {
            QueryError::Protocol("source completed without emitting a value".to_string())
        });
        self.finish(outcome);
    }

    fn finish(&mut self, outcome: Outcome<T>) {
        if let Some(completer) = self.completer.take() {
            completer.complete(outcome);
        }
    }
}
