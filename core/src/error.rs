//! Error taxonomy.
//!
//! [`StoreError`] classifies what went wrong in a storage backend;
//! [`TicketingError`] is the domain error every public operation returns.
//! Callers branch on [`TicketingError::kind`], never on message text.

use crate::types::EventId;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a storage backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Serialization failure between concurrent transactions
    #[error("Serialization conflict: {0}")]
    Contention(String),

    /// Deadlock detected by the backend
    #[error("Deadlock detected: {0}")]
    Deadlock(String),

    /// Waited too long for a row lock
    #[error("Lock wait timed out: {0}")]
    LockTimeout(String),

    /// The transaction exceeded its maximum duration
    #[error("Transaction exceeded {0:?}")]
    TransactionTimeout(Duration),

    /// Unique constraint violation (e.g. ticket code collision)
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Connection or pool unavailable
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Whether retrying the whole transaction may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::Database(_))
    }
}

/// Coarse classification of a [`TicketingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Request failed a business precondition
    Validation,
    /// Referenced entity does not exist
    NotFound,
    /// Caller is not allowed to perform the operation
    Forbidden,
    /// Not enough tickets left
    InsufficientInventory,
    /// Entity is in the wrong lifecycle state
    InvalidState,
    /// Transient storage failure (retried internally)
    Transient,
    /// Notification enqueue failed
    NotificationFailure,
    /// Non-transient storage failure
    Internal,
}

impl ErrorKind {
    /// Stable label, used for metrics and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::InsufficientInventory => "insufficient_inventory",
            Self::InvalidState => "invalid_state",
            Self::Transient => "transient",
            Self::NotificationFailure => "notification_failure",
            Self::Internal => "internal",
        }
    }
}

/// Domain error returned by every ticketing operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketingError {
    /// Request failed a business precondition
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Referenced entity does not exist
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Entity type
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Caller is not allowed to perform the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Not enough tickets left
    #[error("Insufficient inventory for event {event_id}: requested {requested}, available {available}")]
    InsufficientInventory {
        /// Event
        event_id: EventId,
        /// Quantity requested
        requested: u32,
        /// Quantity that was left
        available: u32,
    },

    /// Entity is in the wrong lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Transient storage failure inside an attempt
    #[error("Transient storage failure: {0}")]
    Transient(StoreError),

    /// Transient failures persisted past the retry bound
    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Attempts made
        attempts: usize,
        /// Last transient failure
        last: StoreError,
    },

    /// Notification enqueue failed (logged, never surfaced by a purchase)
    #[error("Notification failed: {0}")]
    Notification(String),

    /// Non-transient storage failure
    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl TicketingError {
    /// Shorthand for [`TicketingError::NotFound`].
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::InsufficientInventory { .. } => ErrorKind::InsufficientInventory,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Transient(_) | Self::RetriesExhausted { .. } => ErrorKind::Transient,
            Self::Notification(_) => ErrorKind::NotificationFailure,
            Self::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Whether the coordinator should run the transaction again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<StoreError> for TicketingError {
    fn from(err: StoreError) -> Self {
        if err.is_transient() {
            Self::Transient(err)
        } else {
            Self::Storage(err)
        }
    }
}
