//! # Shop Query Testing
//!
//! Testing utilities and fixtures for the shop query pipeline.
//!
//! This crate provides:
//! - An in-memory document store with lookup counters, latency and outage
//!   switches
//! - A sink collecting every outcome it receives
//! - A fixed clock for deterministic run reports
//! - proptest strategies for credentials and order documents
//!
//! ## Example
//!
//! ```ignore
//! use shop_query_testing::{CollectingSink, InMemoryRecordStore, LISA, LISA_PASSWORD};
//!
//! #[tokio::test]
//! async fn lisa_sees_her_orders() {
//!     let store = Arc::new(InMemoryRecordStore::seeded());
//!     let pipeline = Pipeline::new(FutureBackend::new(store.clone(), WorkerPool::new(2)?));
//!     let sink = CollectingSink::new();
//!
//!     let report = pipeline.execute(Credentials::new(LISA, LISA_PASSWORD), &sink).await;
//!
//!     assert_eq!(report.item_count, Some(2));
//!     assert_eq!(store.order_lookups(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use shop_query_core::environment::Clock;

/// In-memory record store and fixture loading
pub mod store;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use shop_query_core::{Outcome, PipelineResult, QueryError, ResultSink};
    use std::sync::{Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use shop_query_testing::mocks::FixedClock;
    /// use shop_query_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Sink recording every outcome in arrival order.
    #[derive(Debug, Default)]
    pub struct CollectingSink {
        outcomes: Mutex<Vec<Outcome<PipelineResult>>>,
    }

    impl CollectingSink {
        /// Create an empty sink
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Every outcome received so far.
        #[must_use]
        pub fn outcomes(&self) -> Vec<Outcome<PipelineResult>> {
            self.outcomes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Successful results received so far.
        #[must_use]
        pub fn successes(&self) -> Vec<PipelineResult> {
            self.outcomes().into_iter().filter_map(Result::ok).collect()
        }

        /// Failures received so far.
        #[must_use]
        pub fn failures(&self) -> Vec<QueryError> {
            self.outcomes().into_iter().filter_map(Result::err).collect()
        }

        /// Number of outcomes received.
        #[must_use]
        pub fn len(&self) -> usize {
            self.outcomes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }

        /// Whether no outcome has been received yet.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        fn push(&self, outcome: Outcome<PipelineResult>) {
            self.outcomes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(outcome);
        }
    }

    impl ResultSink for CollectingSink {
        fn on_success(&self, result: PipelineResult) {
            self.push(Ok(result));
        }

        fn on_failure(&self, error: QueryError) {
            self.push(Err(error));
        }
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use serde_json::{Value, json};
    use shop_query_core::Credentials;

    /// Lower-case usernames of 1 to 12 characters.
    pub fn username() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,11}"
    }

    /// Printable passwords of 1 to 16 characters.
    pub fn password() -> impl Strategy<Value = String> {
        "[ -~]{1,16}"
    }

    /// Arbitrary login attempts.
    pub fn credentials() -> impl Strategy<Value = Credentials> {
        (username(), password()).prop_map(|(username, password)| Credentials::new(username, password))
    }

    /// Order documents owned by `owner`, each with a distinct `orderId`.
    pub fn order_documents(owner: String, max: usize) -> impl Strategy<Value = Vec<Value>> {
        prop::collection::vec(("[a-z ]{1,20}", 0_u32..10_000), 0..=max).prop_map(move |rows| {
            rows.into_iter()
                .enumerate()
                .map(|(index, (product, cents))| {
                    json!({
                        "username": owner,
                        "orderId": index,
                        "product": product,
                        "amount": f64::from(cents) / 100.0,
                    })
                })
                .collect()
        })
    }
}

pub use mocks::{CollectingSink, FixedClock, test_clock};
pub use store::{
    BART, BART_PASSWORD, FixtureError, InMemoryRecordStore, LISA, LISA_PASSWORD, MAGGIE,
    MAGGIE_PASSWORD,
};
