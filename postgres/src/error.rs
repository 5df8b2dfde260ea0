//! Mapping from `sqlx` failures to [`StoreError`].

use ticketing_core::StoreError;

/// `serialization_failure`
const SERIALIZATION_FAILURE: &str = "40001";
/// `deadlock_detected`
const DEADLOCK_DETECTED: &str = "40P01";
/// `lock_not_available`, raised when `lock_timeout` expires
const LOCK_NOT_AVAILABLE: &str = "55P03";
/// `query_canceled`, raised when `statement_timeout` expires
const QUERY_CANCELED: &str = "57014";
/// `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// Classify a driver error by SQLSTATE so the coordinator can decide
/// whether to retry.
pub(crate) fn classify(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) => {
            let message = db.message().to_string();
            match db.code().as_deref() {
                Some(SERIALIZATION_FAILURE) => StoreError::Contention(message),
                Some(DEADLOCK_DETECTED) => StoreError::Deadlock(message),
                Some(LOCK_NOT_AVAILABLE | QUERY_CANCELED) => StoreError::LockTimeout(message),
                Some(UNIQUE_VIOLATION) => StoreError::DuplicateKey(
                    db.constraint().map_or(message, ToString::to_string),
                ),
                _ => StoreError::Database(err.to_string()),
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => StoreError::Unavailable(err.to_string()),
        _ => StoreError::Database(err.to_string()),
    }
}
