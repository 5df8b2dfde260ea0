//! Storage abstraction.
//!
//! All writes go through a [`TransactionScope`] obtained from
//! [`Database::begin`]. A scope holds row locks until it is committed or
//! rolled back; dropping an uncommitted scope rolls it back. Reads that do
//! not need locks use the narrow query traits ([`TicketStore`],
//! [`EventCatalog`], [`NotificationInbox`]).
//!
//! # Implementations
//!
//! - `PostgresBackend` (in `ticketing-postgres`): production
//! - `InMemoryBackend` (in `ticketing-testing`): fast, deterministic tests
//!   with fault injection

use crate::error::StoreError;
use crate::types::{
    Event, EventId, EventStatus, Notification, NotificationId, Ticket, TicketCode, TicketId,
    TicketStatus, UserId,
};
use async_trait::async_trait;
use std::time::Duration;

/// Default bound on a single row-lock wait.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bound on any single statement inside a scope.
pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Options applied when a scope is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeOptions {
    /// How long a row-lock acquisition may wait before failing with
    /// [`StoreError::LockTimeout`].
    pub lock_timeout: Duration,
    /// Server-side bound on any one statement. Backends that execute
    /// statements remotely cancel them once this elapses, so an abandoned
    /// attempt does not keep waiting on the server.
    pub statement_timeout: Duration,
}

impl Default for ScopeOptions {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
        }
    }
}

/// An open transaction.
///
/// `lock_*` methods take an exclusive row lock that lasts until the scope
/// ends. Locking a row the scope already holds succeeds immediately.
/// Writes are invisible to other scopes until [`commit`](Self::commit).
#[async_trait]
pub trait TransactionScope: Send {
    /// Lock an event row and return its current state.
    async fn lock_event(&mut self, id: EventId) -> Result<Option<Event>, StoreError>;

    /// Overwrite an event's available counter.
    async fn write_available(&mut self, id: EventId, available: u32) -> Result<(), StoreError>;

    /// Insert a new event row.
    async fn insert_event(&mut self, event: &Event) -> Result<(), StoreError>;

    /// Change an event's lifecycle status.
    async fn write_event_status(
        &mut self,
        id: EventId,
        status: EventStatus,
    ) -> Result<(), StoreError>;

    /// Lock a ticket row by id.
    async fn lock_ticket(&mut self, id: TicketId) -> Result<Option<Ticket>, StoreError>;

    /// Lock a ticket row by its code.
    async fn lock_ticket_by_code(
        &mut self,
        code: &TicketCode,
    ) -> Result<Option<Ticket>, StoreError>;

    /// Insert a new ticket row. A code collision is [`StoreError::DuplicateKey`].
    async fn insert_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError>;

    /// Change a ticket's status.
    async fn write_ticket_status(
        &mut self,
        id: TicketId,
        status: TicketStatus,
    ) -> Result<(), StoreError>;

    /// Stage a notification.
    ///
    /// A failure here must leave the rest of the scope usable so the caller
    /// can treat delivery as best-effort.
    async fn enqueue_notification(&mut self, notification: &Notification)
    -> Result<(), StoreError>;

    /// Make every staged write visible and release locks.
    async fn commit(&mut self) -> Result<(), StoreError>;

    /// Discard every staged write and release locks.
    async fn rollback(&mut self) -> Result<(), StoreError>;
}

/// Opens transaction scopes.
#[async_trait]
pub trait Database: Send + Sync {
    /// Begin a new transaction.
    async fn begin(&self, options: ScopeOptions) -> Result<Box<dyn TransactionScope>, StoreError>;

    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Committed ticket reads.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Ticket by id.
    async fn ticket(&self, id: TicketId) -> Result<Option<Ticket>, StoreError>;

    /// Ticket by presentable code.
    async fn ticket_by_code(&self, code: &TicketCode) -> Result<Option<Ticket>, StoreError>;

    /// All tickets owned by a user, newest first.
    async fn tickets_by_owner(&self, owner: UserId) -> Result<Vec<Ticket>, StoreError>;

    /// All tickets for an event, newest first.
    async fn tickets_by_event(&self, event_id: EventId) -> Result<Vec<Ticket>, StoreError>;
}

/// Committed event reads.
#[async_trait]
pub trait EventCatalog: Send + Sync {
    /// Event by id.
    async fn event(&self, id: EventId) -> Result<Option<Event>, StoreError>;
}

/// A user's notifications.
#[async_trait]
pub trait NotificationInbox: Send + Sync {
    /// Notifications for `recipient`, newest first.
    async fn notifications_for(
        &self,
        recipient: UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Notification>, StoreError>;

    /// Mark a notification read. Returns `false` if no notification with
    /// this id belongs to `recipient`.
    async fn mark_read(&self, recipient: UserId, id: NotificationId) -> Result<bool, StoreError>;
}

/// Everything a complete storage backend provides.
pub trait Backend: Database + TicketStore + EventCatalog + NotificationInbox {}

impl<T> Backend for T where T: Database + TicketStore + EventCatalog + NotificationInbox {}
