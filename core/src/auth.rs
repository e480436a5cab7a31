//! Credential check applied to the record returned by the first lookup.

use crate::error::QueryError;
use crate::model::{Credentials, UserRecord};

/// Validate a fetched user record against the supplied credentials.
///
/// Synchronous and back-end agnostic: adapters lift it into their container
/// with `map`, so a failure here travels that container's failure channel.
///
/// Comparison is exact. A username differing only in case is a distinct user.
///
/// # Errors
///
/// - [`QueryError::NotFound`] when no record was found
/// - [`QueryError::IdentityMismatch`] when the record's name differs from the username
/// - [`QueryError::BadCredential`] when the passwords differ
pub fn authenticate(
    record: Option<UserRecord>,
    credentials: &Credentials,
) -> Result<UserRecord, QueryError> {
    let Some(user) = record else {
        return Err(QueryError::NotFound {
            username: credentials.username.clone(),
        });
    };
    if user.name != credentials.username {
        return Err(QueryError::IdentityMismatch {
            username: credentials.username.clone(),
        });
    }
    if user.password != credentials.password {
        return Err(QueryError::BadCredential {
            username: credentials.username.clone(),
        });
    }
    Ok(user)
}
