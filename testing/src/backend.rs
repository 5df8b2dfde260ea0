//! In-memory transactional backend.
//!
//! Behaves like the PostgreSQL backend where it matters for the engine:
//!
//! - `lock_*` takes an exclusive per-row lock held until the scope ends,
//!   bounded by the scope's lock timeout
//! - writes are staged per scope and only become visible at commit
//! - dropping a scope without committing discards its writes
//! - ticket codes are unique

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned test locks

use crate::faults::FaultInjector;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use ticketing_core::store::{
    Database, EventCatalog, NotificationInbox, ScopeOptions, TicketStore, TransactionScope,
};
use ticketing_core::{
    Event, EventId, EventStatus, Notification, NotificationId, StoreError, Ticket, TicketCode,
    TicketId, TicketStatus, UserId,
};
use tokio::sync::{Mutex as RowMutex, OwnedMutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
    Event(EventId),
    Ticket(TicketId),
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event(id) => write!(f, "event {id}"),
            Self::Ticket(id) => write!(f, "ticket {id}"),
        }
    }
}

#[derive(Debug, Default, Clone)]
struct Tables {
    events: HashMap<EventId, Event>,
    tickets: HashMap<TicketId, Ticket>,
    notifications: Vec<Notification>,
}

impl Tables {
    fn ticket_id_by_code(&self, code: &TicketCode) -> Option<TicketId> {
        self.tickets
            .values()
            .find(|ticket| &ticket.code == code)
            .map(|ticket| ticket.id)
    }
}

#[derive(Debug, Default)]
struct Shared {
    tables: RwLock<Tables>,
    row_locks: Mutex<HashMap<RowKey, Arc<RowMutex<()>>>>,
    faults: FaultInjector,
}

impl Shared {
    fn row_lock(&self, key: RowKey) -> Arc<RowMutex<()>> {
        Arc::clone(self.row_locks.lock().unwrap().entry(key).or_default())
    }
}

/// In-memory storage with real transaction semantics.
///
/// Cloning yields another handle to the same data.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use ticketing_core::{EngineConfig, TicketingEngine};
/// use ticketing_testing::{InMemoryBackend, test_clock};
///
/// let backend = Arc::new(InMemoryBackend::new());
/// let engine = TicketingEngine::new(
///     Arc::clone(&backend),
///     Arc::new(test_clock()),
///     EngineConfig::default(),
/// );
/// # let _ = engine;
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    shared: Arc<Shared>,
}

impl InMemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fault injection switches and transaction counters.
    #[must_use]
    pub fn faults(&self) -> &FaultInjector {
        &self.shared.faults
    }

    /// Insert an event directly, bypassing transactions.
    pub fn seed_event(&self, event: Event) {
        self.shared
            .tables
            .write()
            .unwrap()
            .events
            .insert(event.id, event);
    }

    /// Committed state of an event.
    #[must_use]
    pub fn event_snapshot(&self, id: EventId) -> Option<Event> {
        self.shared.tables.read().unwrap().events.get(&id).cloned()
    }

    /// Committed available counter of an event.
    ///
    /// # Panics
    ///
    /// If the event does not exist.
    #[must_use]
    pub fn available(&self, id: EventId) -> u32 {
        self.event_snapshot(id).unwrap().available
    }

    /// Committed tickets for an event.
    #[must_use]
    pub fn tickets_of(&self, id: EventId) -> Vec<Ticket> {
        self.shared
            .tables
            .read()
            .unwrap()
            .tickets
            .values()
            .filter(|ticket| ticket.event_id == id)
            .cloned()
            .collect()
    }

    /// Sum of quantities of active and used tickets for an event.
    #[must_use]
    pub fn outstanding(&self, id: EventId) -> u32 {
        self.tickets_of(id)
            .iter()
            .filter(|ticket| ticket.status.holds_inventory())
            .map(|ticket| ticket.quantity)
            .sum()
    }

    /// Whether `available + outstanding == total_capacity` holds for an event.
    #[must_use]
    pub fn is_conserved(&self, id: EventId) -> bool {
        self.event_snapshot(id).is_some_and(|event| {
            u64::from(event.available) + u64::from(self.outstanding(id))
                == u64::from(event.total_capacity)
        })
    }

    /// Every committed notification, oldest first.
    #[must_use]
    pub fn all_notifications(&self) -> Vec<Notification> {
        self.shared.tables.read().unwrap().notifications.clone()
    }
}

#[async_trait]
impl Database for InMemoryBackend {
    async fn begin(&self, options: ScopeOptions) -> Result<Box<dyn TransactionScope>, StoreError> {
        self.shared.faults.record_begin();
        Ok(Box::new(InMemoryScope {
            shared: Arc::clone(&self.shared),
            lock_timeout: options.lock_timeout,
            held: HashMap::new(),
            staged: Staged::default(),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl TicketStore for InMemoryBackend {
    async fn ticket(&self, id: TicketId) -> Result<Option<Ticket>, StoreError> {
        Ok(self.shared.tables.read().unwrap().tickets.get(&id).cloned())
    }

    async fn ticket_by_code(&self, code: &TicketCode) -> Result<Option<Ticket>, StoreError> {
        let tables = self.shared.tables.read().unwrap();
        Ok(tables
            .ticket_id_by_code(code)
            .and_then(|id| tables.tickets.get(&id).cloned()))
    }

    async fn tickets_by_owner(&self, owner: UserId) -> Result<Vec<Ticket>, StoreError> {
        let tables = self.shared.tables.read().unwrap();
        let mut tickets: Vec<Ticket> = tables
            .tickets
            .values()
            .filter(|ticket| ticket.owner_id == owner)
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.purchased_at.cmp(&a.purchased_at));
        Ok(tickets)
    }

    async fn tickets_by_event(&self, event_id: EventId) -> Result<Vec<Ticket>, StoreError> {
        let mut tickets = self.tickets_of(event_id);
        tickets.sort_by(|a, b| b.purchased_at.cmp(&a.purchased_at));
        Ok(tickets)
    }
}

#[async_trait]
impl EventCatalog for InMemoryBackend {
    async fn event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        Ok(self.event_snapshot(id))
    }
}

#[async_trait]
impl NotificationInbox for InMemoryBackend {
    async fn notifications_for(
        &self,
        recipient: UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Notification>, StoreError> {
        let tables = self.shared.tables.read().unwrap();
        Ok(tables
            .notifications
            .iter()
            .rev()
            .filter(|n| n.recipient_id == recipient)
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, recipient: UserId, id: NotificationId) -> Result<bool, StoreError> {
        let mut tables = self.shared.tables.write().unwrap();
        Ok(tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.recipient_id == recipient)
            .map(|n| n.read = true)
            .is_some())
    }
}

/// Writes a scope has made but not yet committed.
#[derive(Debug, Default)]
struct Staged {
    events: HashMap<EventId, Event>,
    tickets: HashMap<TicketId, Ticket>,
    notifications: Vec<Notification>,
}

impl Staged {
    fn clear(&mut self) {
        self.events.clear();
        self.tickets.clear();
        self.notifications.clear();
    }
}

struct InMemoryScope {
    shared: Arc<Shared>,
    lock_timeout: Duration,
    held: HashMap<RowKey, OwnedMutexGuard<()>>,
    staged: Staged,
}

impl InMemoryScope {
    async fn acquire(&mut self, key: RowKey) -> Result<(), StoreError> {
        if self.held.contains_key(&key) {
            return Ok(());
        }
        let row = self.shared.row_lock(key);
        let guard = tokio::time::timeout(self.lock_timeout, row.lock_owned())
            .await
            .map_err(|_| {
                StoreError::LockTimeout(format!(
                    "{key} still locked after {}ms",
                    self.lock_timeout.as_millis()
                ))
            })?;
        self.held.insert(key, guard);
        Ok(())
    }

    fn current_event(&self, id: EventId) -> Option<Event> {
        self.staged
            .events
            .get(&id)
            .cloned()
            .or_else(|| self.shared.tables.read().unwrap().events.get(&id).cloned())
    }

    fn current_ticket(&self, id: TicketId) -> Option<Ticket> {
        self.staged
            .tickets
            .get(&id)
            .cloned()
            .or_else(|| self.shared.tables.read().unwrap().tickets.get(&id).cloned())
    }

    fn code_in_use(&self, code: &TicketCode) -> bool {
        self.staged.tickets.values().any(|t| &t.code == code)
            || self
                .shared
                .tables
                .read()
                .unwrap()
                .ticket_id_by_code(code)
                .is_some()
    }

    fn release(&mut self) {
        self.staged.clear();
        self.held.clear();
    }
}

#[async_trait]
impl TransactionScope for InMemoryScope {
    async fn lock_event(&mut self, id: EventId) -> Result<Option<Event>, StoreError> {
        self.acquire(RowKey::Event(id)).await?;
        Ok(self.current_event(id))
    }

    async fn write_available(&mut self, id: EventId, available: u32) -> Result<(), StoreError> {
        self.acquire(RowKey::Event(id)).await?;
        let mut event = self
            .current_event(id)
            .ok_or_else(|| StoreError::Database(format!("no event row {id}")))?;
        event.available = available;
        self.staged.events.insert(id, event);
        Ok(())
    }

    async fn insert_event(&mut self, event: &Event) -> Result<(), StoreError> {
        self.acquire(RowKey::Event(event.id)).await?;
        if self.current_event(event.id).is_some() {
            return Err(StoreError::DuplicateKey(format!("event {}", event.id)));
        }
        self.staged.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn write_event_status(
        &mut self,
        id: EventId,
        status: EventStatus,
    ) -> Result<(), StoreError> {
        self.acquire(RowKey::Event(id)).await?;
        let mut event = self
            .current_event(id)
            .ok_or_else(|| StoreError::Database(format!("no event row {id}")))?;
        event.status = status;
        self.staged.events.insert(id, event);
        Ok(())
    }

    async fn lock_ticket(&mut self, id: TicketId) -> Result<Option<Ticket>, StoreError> {
        self.acquire(RowKey::Ticket(id)).await?;
        Ok(self.current_ticket(id))
    }

    async fn lock_ticket_by_code(
        &mut self,
        code: &TicketCode,
    ) -> Result<Option<Ticket>, StoreError> {
        let id = self
            .staged
            .tickets
            .values()
            .find(|t| &t.code == code)
            .map(|t| t.id)
            .or_else(|| self.shared.tables.read().unwrap().ticket_id_by_code(code));
        match id {
            Some(id) => self.lock_ticket(id).await,
            None => Ok(None),
        }
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        if let Some(err) = self.shared.faults.on_ticket_insert() {
            return Err(err);
        }
        if self.code_in_use(&ticket.code) {
            return Err(StoreError::DuplicateKey(format!(
                "ticket code {}",
                ticket.code
            )));
        }
        self.acquire(RowKey::Ticket(ticket.id)).await?;
        self.staged.tickets.insert(ticket.id, ticket.clone());
        Ok(())
    }

    async fn write_ticket_status(
        &mut self,
        id: TicketId,
        status: TicketStatus,
    ) -> Result<(), StoreError> {
        self.acquire(RowKey::Ticket(id)).await?;
        let mut ticket = self
            .current_ticket(id)
            .ok_or_else(|| StoreError::Database(format!("no ticket row {id}")))?;
        ticket.status = status;
        self.staged.tickets.insert(id, ticket);
        Ok(())
    }

    async fn enqueue_notification(
        &mut self,
        notification: &Notification,
    ) -> Result<(), StoreError> {
        if let Some(err) = self.shared.faults.on_notification() {
            return Err(err);
        }
        self.staged.notifications.push(notification.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        if let Some(err) = self.shared.faults.on_commit() {
            self.release();
            self.shared.faults.record_rollback();
            return Err(err);
        }

        {
            let mut tables = self.shared.tables.write().unwrap();
            tables.events.extend(self.staged.events.drain());
            tables.tickets.extend(self.staged.tickets.drain());
            tables.notifications.append(&mut self.staged.notifications);
        }
        self.held.clear();
        self.shared.faults.record_commit();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.release();
        self.shared.faults.record_rollback();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use ticketing_core::{NewEvent, NotificationKind};

    fn event() -> Event {
        let now = Utc::now();
        NewEvent {
            title: "Concert".to_string(),
            date: now + ChronoDuration::days(7),
            capacity: 5,
            price_cents: 1000,
        }
        .into_event(UserId::new(), now)
    }

    fn options(ms: u64) -> ScopeOptions {
        ScopeOptions {
            lock_timeout: Duration::from_millis(ms),
            ..ScopeOptions::default()
        }
    }

    #[tokio::test]
    async fn writes_are_invisible_until_commit() {
        let backend = InMemoryBackend::new();
        let event = event();
        backend.seed_event(event.clone());

        let mut scope = backend.begin(options(100)).await.unwrap();
        scope.write_available(event.id, 2).await.unwrap();
        assert_eq!(backend.available(event.id), 5);
        assert_eq!(scope.lock_event(event.id).await.unwrap().unwrap().available, 2);

        scope.commit().await.unwrap();
        assert_eq!(backend.available(event.id), 2);
    }

    #[tokio::test]
    async fn dropped_scope_discards_writes_and_releases_locks() {
        let backend = InMemoryBackend::new();
        let event = event();
        backend.seed_event(event.clone());

        {
            let mut scope = backend.begin(options(100)).await.unwrap();
            scope.write_available(event.id, 0).await.unwrap();
        }

        let mut next = backend.begin(options(100)).await.unwrap();
        let locked = next.lock_event(event.id).await.unwrap().unwrap();
        assert_eq!(locked.available, 5);
    }

    #[tokio::test]
    async fn row_lock_times_out_while_held() {
        let backend = InMemoryBackend::new();
        let event = event();
        backend.seed_event(event.clone());

        let mut holder = backend.begin(options(100)).await.unwrap();
        holder.lock_event(event.id).await.unwrap();

        let mut waiter = backend.begin(options(20)).await.unwrap();
        let err = waiter.lock_event(event.id).await.unwrap_err();
        assert!(matches!(err, StoreError::LockTimeout(_)));

        holder.rollback().await.unwrap();
        assert!(waiter.lock_event(event.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn locks_are_reentrant_within_a_scope() {
        let backend = InMemoryBackend::new();
        let event = event();
        backend.seed_event(event.clone());

        let mut scope = backend.begin(options(20)).await.unwrap();
        scope.lock_event(event.id).await.unwrap();
        scope.lock_event(event.id).await.unwrap();
        scope.write_available(event.id, 4).await.unwrap();
        scope.commit().await.unwrap();
        assert_eq!(backend.available(event.id), 4);
    }

    #[tokio::test]
    async fn duplicate_ticket_code_is_rejected() {
        let backend = InMemoryBackend::new();
        let event = event();
        backend.seed_event(event.clone());

        let first = Ticket::issue(event.id, UserId::new(), 1, Utc::now());
        let mut second = Ticket::issue(event.id, UserId::new(), 1, Utc::now());
        second.code = first.code.clone();

        let mut scope = backend.begin(options(20)).await.unwrap();
        scope.insert_ticket(&first).await.unwrap();
        let err = scope.insert_ticket(&second).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(_)));
    }

    #[tokio::test]
    async fn inbox_pages_newest_first() {
        let backend = InMemoryBackend::new();
        let user = UserId::new();
        let mut scope = backend.begin(options(20)).await.unwrap();
        for i in 0..3 {
            let n = Notification::new(
                user,
                format!("message {i}"),
                NotificationKind::Info,
                None,
                Utc::now(),
            );
            scope.enqueue_notification(&n).await.unwrap();
        }
        scope.commit().await.unwrap();

        let page = backend.notifications_for(user, 2, 0).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].message, "message 2");

        let rest = backend.notifications_for(user, 2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert!(backend.mark_read(user, rest[0].id).await.unwrap());
        assert!(!backend.mark_read(UserId::new(), rest[0].id).await.unwrap());
    }
}
