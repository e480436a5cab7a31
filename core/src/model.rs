//! Domain types flowing through a pipeline run.
//!
//! All of them are request-scoped: created when a run starts, dropped when the
//! run reaches its terminal outcome. None is mutated after construction.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Login attempt supplied by the caller.
///
/// `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username, matched case-sensitively.
    pub username: String,
    /// Plain password compared against the stored one.
    pub password: String,
}

impl Credentials {
    /// Create credentials for a login attempt.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A user document as held by the record store.
///
/// The primary key of a user document is its `_id` field, which doubles as
/// the user's name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// The user's name (document key).
    #[serde(rename = "_id")]
    pub name: String,
    /// Stored password.
    pub password: String,
}

impl UserRecord {
    /// Create a user record.
    #[must_use]
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
        }
    }

    /// Decode a user record from a store document.
    ///
    /// Fields other than `_id` and `password` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] if either field is missing or not a string.
    pub fn from_document(document: &Value) -> Result<Self, StoreError> {
        Self::deserialize(document).map_err(|e| StoreError::Malformed(format!("user: {e}")))
    }
}

/// An order belonging to a user: the dependent record of the pipeline.
///
/// Only `username` is interpreted. Every other field of the document is kept
/// verbatim in `payload`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Owner of the order (secondary key).
    pub username: String,
    /// Remaining document fields, untouched.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Order {
    /// Create an order for `username` with the given payload fields.
    #[must_use]
    pub fn new(username: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            username: username.into(),
            payload,
        }
    }

    /// Decode an order from a store document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] if the document has no string `username`.
    pub fn from_document(document: &Value) -> Result<Self, StoreError> {
        Self::deserialize(document).map_err(|e| StoreError::Malformed(format!("order: {e}")))
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.payload.clone()))
    }
}

/// Combined output of a successful run.
///
/// Only constructed after authentication succeeded.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineResult {
    /// Authenticated username the result belongs to.
    pub subject_id: String,
    /// The user's orders, in store order.
    pub items: Vec<Order>,
}

impl PipelineResult {
    /// Combine an authenticated username with its orders.
    #[must_use]
    pub const fn new(subject_id: String, items: Vec<Order>) -> Self {
        Self { subject_id, items }
    }
}

impl fmt::Display for PipelineResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--------------------------------------------------")?;
        writeln!(
            f,
            "eCommerce statistics of user \"{}\": {} order(s)",
            self.subject_id,
            self.items.len()
        )?;
        for order in &self.items {
            writeln!(f, "  - {order}")?;
        }
        write!(f, "--------------------------------------------------")
    }
}
