//! Per-run lifecycle tracking.
//!
//! ```text
//! Pending → Authenticating → Fetching → Combined → Displayed
//!                 │              │          │
//!                 └──────────────┴──────────┴────→ Failed
//! ```
//!
//! `Displayed` and `Failed` are terminal. A run never skips `Authenticating`.

use crate::error::QueryError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use thiserror::Error;

/// Lifecycle phase of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RunPhase {
    /// Created, nothing dispatched yet.
    Pending = 0,
    /// User lookup and credential check in progress.
    Authenticating = 1,
    /// Orders of the authenticated user are being fetched.
    Fetching = 2,
    /// Result combined, not yet handed to the sink.
    Combined = 3,
    /// The sink rendered the result.
    Displayed = 4,
    /// The sink reported a failure.
    Failed = 5,
}

impl RunPhase {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Displayed | Self::Failed)
    }

    /// Whether `self → next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Authenticating)
                | (Self::Authenticating, Self::Fetching)
                | (Self::Fetching, Self::Combined)
                | (Self::Combined, Self::Displayed)
                | (
                    Self::Authenticating | Self::Fetching | Self::Combined,
                    Self::Failed
                )
        )
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Pending,
            1 => Self::Authenticating,
            2 => Self::Fetching,
            3 => Self::Combined,
            4 => Self::Displayed,
            _ => Self::Failed,
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Authenticating => "authenticating",
            Self::Fetching => "fetching",
            Self::Combined => "combined",
            Self::Displayed => "displayed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Rejected phase transition.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Invalid run transition: {from} -> {to}")]
pub struct TransitionError {
    /// Phase the run was in.
    pub from: RunPhase,
    /// Phase that was requested.
    pub to: RunPhase,
}

/// Shared handle on one run's phase.
///
/// Clones observe the same run. Continuations on worker threads advance it.
#[derive(Debug, Clone)]
pub struct RunTracker {
    phase: Arc<AtomicU8>,
}

impl RunTracker {
    /// Start tracking a new run in [`RunPhase::Pending`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Arc::new(AtomicU8::new(RunPhase::Pending as u8)),
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> RunPhase {
        RunPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Move to `next` if the transition is legal.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] and leaves the phase unchanged if
    /// `current → next` is not a legal transition.
    pub fn try_advance(&self, next: RunPhase) -> Result<RunPhase, TransitionError> {
        self.phase
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                RunPhase::from_u8(current)
                    .can_transition_to(next)
                    .then_some(next as u8)
            })
            .map(RunPhase::from_u8)
            .map_err(|current| TransitionError {
                from: RunPhase::from_u8(current),
                to: next,
            })
    }

    /// Move to `next`, logging instead of failing on an illegal transition.
    pub fn advance(&self, next: RunPhase) {
        match self.try_advance(next) {
            Ok(previous) => tracing::debug!(from = %previous, to = %next, "Run phase changed"),
            Err(e) => tracing::warn!(error = %e, "Ignoring invalid run transition"),
        }
    }
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Username the run was started for.
    pub subject: String,
    /// Terminal phase reached.
    pub phase: RunPhase,
    /// Number of orders displayed, on success.
    pub item_count: Option<usize>,
    /// The failure reported to the sink, on failure.
    pub failure: Option<QueryError>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the sink received the outcome.
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Whether the run ended in [`RunPhase::Displayed`].
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.phase == RunPhase::Displayed
    }
}
