//! Error types shared by every stage of the pipeline.
//!
//! Two layers exist:
//!
//! - [`StoreError`]: raised by a [`RecordStore`](crate::gateway::RecordStore)
//!   implementation when a read cannot be served.
//! - [`QueryError`]: the single failure type that travels through every
//!   back-end's failure channel and ends up at the
//!   [`ResultSink`](crate::sink::ResultSink).
//!
//! Every variant of [`QueryError`] is terminal for the run that produced it.
//! Nothing in this workspace retries or recovers from one.

use thiserror::Error;

/// Errors raised by the record store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or refused the read.
    #[error("{0}")]
    Unavailable(String),

    /// A stored document could not be decoded into a record.
    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Failure of a single pipeline run.
///
/// The `Display` output is the message reported to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// No user record exists under the supplied username.
    #[error("User unknown: {username}")]
    NotFound {
        /// The username that was looked up.
        username: String,
    },

    /// A record was found but its name differs from the supplied username.
    #[error("Incorrect username: {username}")]
    IdentityMismatch {
        /// The username that was supplied.
        username: String,
    },

    /// The supplied password does not match the stored one.
    #[error("Bad password supplied for user: {username}")]
    BadCredential {
        /// The username that was supplied.
        username: String,
    },

    /// Transport or backing-store fault, surfaced as-is.
    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    /// An adapter broke the single-outcome contract.
    ///
    /// Raised when a container completes without a value, emits more than
    /// one value, or drops its completion handle.
    #[error("Back-end protocol violation: {0}")]
    Protocol(String),
}

impl QueryError {
    /// Returns `true` for the three authentication failures.
    #[must_use]
    pub const fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::IdentityMismatch { .. } | Self::BadCredential { .. }
        )
    }
}

impl From<StoreError> for QueryError {
    fn from(error: StoreError) -> Self {
        Self::StoreUnavailable(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_supplied_username() {
        let err = QueryError::BadCredential {
            username: "lisa".to_string(),
        };
        assert_eq!(err.to_string(), "Bad password supplied for user: lisa");

        let err = QueryError::NotFound {
            username: "LISA".to_string(),
        };
        assert_eq!(err.to_string(), "User unknown: LISA");
    }

    #[test]
    fn store_errors_surface_their_message() {
        let err: QueryError = StoreError::Unavailable("connection refused".to_string()).into();
        assert_eq!(
            err,
            QueryError::StoreUnavailable("connection refused".to_string())
        );
        assert!(!err.is_authentication_failure());
    }
}
