//! Record store abstraction.
//!
//! The store is a black box offering two exact-match reads. It is synchronous
//! from the pipeline's point of view: back-end adapters decide where the
//! blocking call runs and wrap its result into their own container.
//!
//! # Thread Safety
//!
//! Implementations are shared by every in-flight run, so they must be
//! `Send + Sync`. Reads never span runs and hold no transactional state.

use crate::error::StoreError;
use crate::model::{Order, UserRecord};
use std::sync::Arc;

/// Read-only access to user and order documents.
pub trait RecordStore: Send + Sync {
    /// Find the user stored under `key`.
    ///
    /// Absence is `Ok(None)`, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot serve the read or the
    /// document cannot be decoded.
    fn find_user(&self, key: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Find every order whose owner is `username`, in store order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot serve the read or a
    /// document cannot be decoded.
    fn find_orders(&self, username: &str) -> Result<Vec<Order>, StoreError>;
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn find_user(&self, key: &str) -> Result<Option<UserRecord>, StoreError> {
        (**self).find_user(key)
    }

    fn find_orders(&self, username: &str) -> Result<Vec<Order>, StoreError> {
        (**self).find_orders(username)
    }
}
