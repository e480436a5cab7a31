//! # Shop Query Core
//!
//! Core types, chaining contract and orchestrator for the shop query pipeline.
//!
//! A run authenticates a user against a stored record, fetches that user's
//! orders, and combines both into a [`PipelineResult`]. The interesting part
//! is not the business logic but the composition layer: the chain is written
//! once against the [`Backend`] trait and runs unchanged on every
//! concurrency back-end that implements it.
//!
//! ## Core Concepts
//!
//! - **Record store** ([`RecordStore`]): two blocking exact-match reads
//! - **Authenticator** ([`authenticate`]): pure credential check
//! - **Backend**: an adapter providing `fetch_one`, `fetch_many`, `map`,
//!   `flat_map` and a terminal `complete`
//! - **Pipeline** ([`Pipeline`]): the `lookup → validate → dependent-fetch →
//!   combine` chain
//! - **Sink** ([`ResultSink`]): terminal consumer of each run's outcome
//!
//! ## Example
//!
//! ```ignore
//! use shop_query_core::{ConsoleSink, Credentials, Pipeline};
//!
//! let pipeline = Pipeline::new(backend);
//! let report = pipeline
//!     .execute(Credentials::new("lisa", "password"), &ConsoleSink)
//!     .await;
//! assert!(report.succeeded());
//! ```

pub mod auth;
pub mod backend;
pub mod completion;
pub mod environment;
pub mod error;
pub mod gateway;
pub mod model;
pub mod pipeline;
pub mod run;
pub mod sink;

pub use auth::authenticate;
pub use backend::Backend;
pub use completion::{Completer, Completion, Outcome};
pub use error::{QueryError, StoreError};
pub use gateway::RecordStore;
pub use model::{Credentials, Order, PipelineResult, UserRecord};
pub use pipeline::Pipeline;
pub use run::{RunPhase, RunReport, RunTracker, TransitionError};
pub use sink::{ConsoleSink, ResultSink};
