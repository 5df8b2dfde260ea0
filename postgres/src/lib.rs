//! `PostgreSQL` backend for the ticketing engine.
//!
//! [`PostgresBackend`] implements every storage trait from
//! `ticketing_core::store` on a `sqlx` connection pool:
//!
//! - Row locks via `SELECT ... FOR UPDATE`, bounded by `SET LOCAL lock_timeout`
//! - SQLSTATE classification into retryable and permanent failures
//! - `CHECK (available BETWEEN 0 AND total_capacity)` as a last line under the
//!   inventory ledger
//! - Embedded migrations
//!
//! # Example
//!
//! ```ignore
//! use ticketing_postgres::{PoolConfig, PostgresBackend};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = PostgresBackend::connect("postgres://localhost/tickets", &PoolConfig::default()).await?;
//!     backend.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod rows;
mod scope;

pub use scope::PostgresScope;

use async_trait::async_trait;
use error::classify;
use rows::{
    EVENT_COLUMNS, NOTIFICATION_COLUMNS, TICKET_COLUMNS, event_from_row, notification_from_row,
    ticket_from_row,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use ticketing_core::store::{
    Database, EventCatalog, NotificationInbox, ScopeOptions, TicketStore, TransactionScope,
};
use ticketing_core::{
    Event, EventId, Notification, NotificationId, StoreError, Ticket, TicketCode, TicketId,
    UserId,
};

/// Connection pool settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Upper bound on open connections
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// How long to wait for a free connection
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// `PostgreSQL`-backed storage.
#[derive(Clone, Debug)]
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Connect to `database_url` with the given pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if no connection can be made.
    pub async fn connect(database_url: &str, config: &PoolConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to connect: {e}")))?;
        tracing::info!(max_connections = config.max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl Database for PostgresBackend {
    async fn begin(&self, options: ScopeOptions) -> Result<Box<dyn TransactionScope>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;
        // SET does not take bind parameters; the values are integers.
        let lock_ms = options.lock_timeout.as_millis().max(1);
        let statement_ms = options.statement_timeout.as_millis().max(1);
        for setting in [
            format!("SET LOCAL lock_timeout = '{lock_ms}ms'"),
            format!("SET LOCAL statement_timeout = '{statement_ms}ms'"),
        ] {
            sqlx::query(&setting)
                .execute(&mut *tx)
                .await
                .map_err(classify)?;
        }
        Ok(Box::new(PostgresScope::new(tx)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }
}

#[async_trait]
impl TicketStore for PostgresBackend {
    async fn ticket(&self, id: TicketId) -> Result<Option<Ticket>, StoreError> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;
        row.as_ref().map(ticket_from_row).transpose()
    }

    async fn ticket_by_code(&self, code: &TicketCode) -> Result<Option<Ticket>, StoreError> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE code = $1");
        let row = sqlx::query(&sql)
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;
        row.as_ref().map(ticket_from_row).transpose()
    }

    async fn tickets_by_owner(&self, owner: UserId) -> Result<Vec<Ticket>, StoreError> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE owner_id = $1 ORDER BY purchased_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(owner.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
        rows.iter().map(ticket_from_row).collect()
    }

    async fn tickets_by_event(&self, event_id: EventId) -> Result<Vec<Ticket>, StoreError> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE event_id = $1 ORDER BY purchased_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(event_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
        rows.iter().map(ticket_from_row).collect()
    }
}

#[async_trait]
impl EventCatalog for PostgresBackend {
    async fn event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;
        row.as_ref().map(event_from_row).transpose()
    }
}

#[async_trait]
impl NotificationInbox for PostgresBackend {
    async fn notifications_for(
        &self,
        recipient: UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Notification>, StoreError> {
        let sql = format!(
            r"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE recipient_id = $1
            ORDER BY created_at DESC, seq DESC
            LIMIT $2 OFFSET $3
            "
        );
        let rows = sqlx::query(&sql)
            .bind(recipient.as_uuid())
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
        rows.iter().map(notification_from_row).collect()
    }

    async fn mark_read(&self, recipient: UserId, id: NotificationId) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE notifications SET read = true WHERE id = $1 AND recipient_id = $2")
                .bind(id.as_uuid())
                .bind(recipient.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(classify)?;
        Ok(result.rows_affected() == 1)
    }
}
