//! In-memory document store.
//!
//! Holds user and order documents as JSON values, keyed the way a document
//! database would key them: users by `_id`, orders scanned by `username`.
//! Lookups are counted so tests can assert which stages reached the store.

use serde::Deserialize;
use serde_json::{Value, json};
use shop_query_core::{Order, RecordStore, StoreError, UserRecord};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;

/// Seeded user with two orders.
pub const LISA: &str = "lisa";
/// Password of [`LISA`].
pub const LISA_PASSWORD: &str = "password";
/// Seeded user with one order.
pub const BART: &str = "bart";
/// Password of [`BART`].
pub const BART_PASSWORD: &str = "skate";
/// Seeded user without orders.
pub const MAGGIE: &str = "maggie";
/// Password of [`MAGGIE`].
pub const MAGGIE_PASSWORD: &str = "pacifier";

/// Errors loading a fixture file.
#[derive(Error, Debug)]
pub enum FixtureError {
    /// The fixture file could not be read
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// The fixture is not valid JSON of the expected shape
    #[error("Invalid fixture: {0}")]
    Parse(#[from] serde_json::Error),

    /// A user document has no string `_id`
    #[error("User document {0} has no string `_id`")]
    MissingKey(usize),
}

#[derive(Deserialize)]
struct Fixture {
    #[serde(default)]
    users: Vec<Value>,
    #[serde(default)]
    orders: Vec<Value>,
}

/// Document store backed by in-memory collections.
///
/// # Example
///
/// ```
/// use shop_query_core::RecordStore;
/// use shop_query_testing::{InMemoryRecordStore, LISA};
///
/// let store = InMemoryRecordStore::seeded();
/// let user = store.find_user(LISA).unwrap();
/// assert!(user.is_some());
/// assert_eq!(store.find_orders(LISA).unwrap().len(), 2);
/// assert_eq!(store.user_lookups(), 1);
/// ```
#[derive(Debug)]
pub struct InMemoryRecordStore {
    users: RwLock<HashMap<String, Value>>,
    orders: RwLock<Vec<Value>>,
    available: AtomicBool,
    orders_available: AtomicBool,
    latency: Duration,
    user_lookups: AtomicUsize,
    order_lookups: AtomicUsize,
}

impl InMemoryRecordStore {
    /// Create an empty, available store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            orders: RwLock::new(Vec::new()),
            available: AtomicBool::new(true),
            orders_available: AtomicBool::new(true),
            latency: Duration::ZERO,
            user_lookups: AtomicUsize::new(0),
            order_lookups: AtomicUsize::new(0),
        }
    }

    /// Create a store holding the built-in users and orders.
    #[must_use]
    pub fn seeded() -> Self {
        let store = Self::new();
        store.insert_user(&UserRecord::new(LISA, LISA_PASSWORD));
        store.insert_user(&UserRecord::new(BART, BART_PASSWORD));
        store.insert_user(&UserRecord::new(MAGGIE, MAGGIE_PASSWORD));
        store.insert_order(json!({
            "username": LISA, "orderId": 1, "product": "saxophone reeds", "amount": 12.5
        }));
        store.insert_order(json!({
            "username": BART, "orderId": 2, "product": "skateboard", "amount": 79.9
        }));
        store.insert_order(json!({
            "username": LISA, "orderId": 3, "product": "vegetarian cookbook", "amount": 24.0
        }));
        store
    }

    /// Load users and orders from a JSON fixture.
    ///
    /// The fixture is an object with optional `users` and `orders` arrays.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError`] if the JSON is invalid or a user has no `_id`.
    pub fn from_json_str(fixture: &str) -> Result<Self, FixtureError> {
        let fixture: Fixture = serde_json::from_str(fixture)?;
        let store = Self::new();
        for (index, user) in fixture.users.into_iter().enumerate() {
            let key = user
                .get("_id")
                .and_then(Value::as_str)
                .ok_or(FixtureError::MissingKey(index))?
                .to_string();
            store.insert_user_under(key, user);
        }
        for order in fixture.orders {
            store.insert_order(order);
        }
        Ok(store)
    }

    /// Load a JSON fixture from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError`] if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Delay every read by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Store `user` under its own name.
    pub fn insert_user(&self, user: &UserRecord) {
        let document = json!({ "_id": user.name, "password": user.password });
        self.insert_user_under(user.name.clone(), document);
    }

    /// Store a raw user document under `key`, whatever its `_id` says.
    pub fn insert_user_under(&self, key: impl Into<String>, document: Value) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), document);
    }

    /// Append a raw order document.
    pub fn insert_order(&self, document: Value) {
        self.orders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(document);
    }

    /// Make every following read succeed or fail with an outage.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make every following order read succeed or fail with an outage.
    ///
    /// User lookups are unaffected.
    pub fn set_orders_available(&self, available: bool) {
        self.orders_available.store(available, Ordering::SeqCst);
    }

    /// Number of `find_user` calls so far.
    #[must_use]
    pub fn user_lookups(&self) -> usize {
        self.user_lookups.load(Ordering::SeqCst)
    }

    /// Number of `find_orders` calls so far.
    #[must_use]
    pub fn order_lookups(&self) -> usize {
        self.order_lookups.load(Ordering::SeqCst)
    }

    fn simulate_read(&self) -> Result<(), StoreError> {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Unavailable("store lock poisoned".to_string())
}

impl RecordStore for InMemoryRecordStore {
    fn find_user(&self, key: &str) -> Result<Option<UserRecord>, StoreError> {
        self.user_lookups.fetch_add(1, Ordering::SeqCst);
        self.simulate_read()?;
        let users = self.users.read().map_err(poisoned)?;
        users.get(key).map(UserRecord::from_document).transpose()
    }

    fn find_orders(&self, username: &str) -> Result<Vec<Order>, StoreError> {
        self.order_lookups.fetch_add(1, Ordering::SeqCst);
        self.simulate_read()?;
        if !self.orders_available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("orders offline".to_string()));
        }
        let orders = self.orders.read().map_err(poisoned)?;
        orders
            .iter()
            .filter(|document| document.get("username").and_then(Value::as_str) == Some(username))
            .map(Order::from_document)
            .collect()
    }
}
