//! Top-level error taxonomy for the creation flow.
//!
//! The crate has no HTTP layer of its own; `ApiError::status()` gives the
//! thin transport handler the status code each failure class maps to.

use crate::accounting::SeedError;
use crate::executor::StoreError;
use std::fmt;

/// Failure classes of the lease-creation operation.
#[derive(Debug)]
pub enum ApiError {
    /// Caller is not authenticated (precondition, checked upstream).
    Unauthorized,
    /// Caller is not a member of the organization (precondition).
    Forbidden(String),
    /// Payload failed validation; nothing was written.
    Validation(String),
    /// Storage failure during lease creation; the failing strategy rolled
    /// back or the procedure aborted, nothing was committed.
    Store(StoreError),
    /// Accounting seeding failed after the lease row was committed. Callers
    /// must treat this as "lease exists, accounting incomplete" and must not
    /// blindly retry creation.
    Seed { lease_id: i64, source: SeedError },
    /// External sync failed and the caller asked for strict semantics. Local
    /// writes are durable; a retry record exists.
    SyncFailed { lease_id: i64, error: String },
    /// Unexpected internal failure.
    Internal(String),
}

impl ApiError {
    /// HTTP status code this error maps to.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Unauthorized => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::Validation(_) => 400,
            ApiError::Store(_) => 500,
            ApiError::Seed { source, .. } => source.status(),
            ApiError::SyncFailed { .. } => 502,
            ApiError::Internal(_) => 500,
        }
    }

    /// Lease id for failures that happen after the lease row exists.
    pub fn lease_id(&self) -> Option<i64> {
        match self {
            ApiError::Seed { lease_id, .. } | ApiError::SyncFailed { lease_id, .. } => {
                Some(*lease_id)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized => write!(f, "authentication required"),
            ApiError::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            ApiError::Validation(msg) => write!(f, "validation error: {msg}"),
            ApiError::Store(e) => write!(f, "lease creation failed: {e}"),
            ApiError::Seed { lease_id, source } => write!(
                f,
                "lease {lease_id} exists but accounting seeding failed: {source}"
            ),
            ApiError::SyncFailed { lease_id, error } => {
                write!(f, "external sync failed for lease {lease_id}: {error}")
            }
            ApiError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounting::SeedError;
    use crate::executor::{DbErrorKind, StoreError};

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthorized.status(), 401);
        assert_eq!(ApiError::Forbidden("not a member".to_string()).status(), 403);
        assert_eq!(ApiError::Validation("bad".to_string()).status(), 400);
        assert_eq!(
            ApiError::Store(StoreError::Db {
                kind: DbErrorKind::Other,
                message: "boom".to_string()
            })
            .status(),
            500
        );
        assert_eq!(
            ApiError::SyncFailed {
                lease_id: 1,
                error: "down".to_string()
            }
            .status(),
            502
        );
    }

    #[test]
    fn test_seed_status_follows_source() {
        let gl = ApiError::Seed {
            lease_id: 9,
            source: SeedError::MissingGlSettings("no settings row".to_string()),
        };
        assert_eq!(gl.status(), 422);

        let step = ApiError::Seed {
            lease_id: 9,
            source: SeedError::Store(StoreError::Other("insert failed".to_string())),
        };
        assert_eq!(step.status(), 500);
    }

    #[test]
    fn test_lease_id_present_for_post_commit_failures() {
        let err = ApiError::Seed {
            lease_id: 42,
            source: SeedError::MissingGlSettings("x".to_string()),
        };
        assert_eq!(err.lease_id(), Some(42));
        assert_eq!(ApiError::Unauthorized.lease_id(), None);
    }
}
