//! Transaction scope over a `sqlx` transaction.

use crate::error::classify;
use crate::rows::{
    EVENT_COLUMNS, TICKET_COLUMNS, event_from_row, ticket_from_row, to_db_counter,
};
use async_trait::async_trait;
use sqlx::postgres::PgQueryResult;
use sqlx::{PgConnection, Postgres, Transaction};
use ticketing_core::store::TransactionScope;
use ticketing_core::{
    Event, EventId, EventStatus, Notification, StoreError, Ticket, TicketCode, TicketId,
    TicketStatus,
};

/// One open `PostgreSQL` transaction.
///
/// Row locks are `SELECT ... FOR UPDATE`; waits are bounded by
/// `SET LOCAL lock_timeout`. Dropping the scope without committing lets
/// `sqlx` roll the transaction back.
pub struct PostgresScope {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PostgresScope {
    pub(crate) const fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx: Some(tx) }
    }

    fn conn(&mut self) -> Result<&mut PgConnection, StoreError> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| StoreError::Database("Transaction already finished".to_string()))
    }
}

fn expect_one(result: &PgQueryResult, what: &str) -> Result<(), StoreError> {
    if result.rows_affected() == 1 {
        Ok(())
    } else {
        Err(StoreError::Database(format!(
            "{what}: expected 1 row, updated {}",
            result.rows_affected()
        )))
    }
}

#[async_trait]
impl TransactionScope for PostgresScope {
    async fn lock_event(&mut self, id: EventId) -> Result<Option<Event>, StoreError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(self.conn()?)
            .await
            .map_err(classify)?;
        row.as_ref().map(event_from_row).transpose()
    }

    async fn write_available(&mut self, id: EventId, available: u32) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE events SET available = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(to_db_counter(available)?)
            .execute(self.conn()?)
            .await
            .map_err(classify)?;
        expect_one(&result, "write_available")
    }

    async fn insert_event(&mut self, event: &Event) -> Result<(), StoreError> {
        let price = i64::try_from(event.price.cents())
            .map_err(|_| StoreError::Database(format!("Price out of range: {}", event.price)))?;
        sqlx::query(
            r"
            INSERT INTO events
                (id, organizer_id, title, event_date, total_capacity, available,
                 price_cents, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(event.id.as_uuid())
        .bind(event.organizer_id.as_uuid())
        .bind(&event.title)
        .bind(event.date)
        .bind(to_db_counter(event.total_capacity)?)
        .bind(to_db_counter(event.available)?)
        .bind(price)
        .bind(event.status.as_str())
        .bind(event.created_at)
        .execute(self.conn()?)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn write_event_status(
        &mut self,
        id: EventId,
        status: EventStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE events SET status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status.as_str())
            .execute(self.conn()?)
            .await
            .map_err(classify)?;
        expect_one(&result, "write_event_status")
    }

    async fn lock_ticket(&mut self, id: TicketId) -> Result<Option<Ticket>, StoreError> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(self.conn()?)
            .await
            .map_err(classify)?;
        row.as_ref().map(ticket_from_row).transpose()
    }

    async fn lock_ticket_by_code(
        &mut self,
        code: &TicketCode,
    ) -> Result<Option<Ticket>, StoreError> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE code = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(code.as_str())
            .fetch_optional(self.conn()?)
            .await
            .map_err(classify)?;
        row.as_ref().map(ticket_from_row).transpose()
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO tickets
                (id, event_id, owner_id, quantity, code, status, purchased_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(ticket.id.as_uuid())
        .bind(ticket.event_id.as_uuid())
        .bind(ticket.owner_id.as_uuid())
        .bind(to_db_counter(ticket.quantity)?)
        .bind(ticket.code.as_str())
        .bind(ticket.status.as_str())
        .bind(ticket.purchased_at)
        .execute(self.conn()?)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn write_ticket_status(
        &mut self,
        id: TicketId,
        status: TicketStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE tickets SET status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status.as_str())
            .execute(self.conn()?)
            .await
            .map_err(classify)?;
        expect_one(&result, "write_ticket_status")
    }

    async fn enqueue_notification(
        &mut self,
        notification: &Notification,
    ) -> Result<(), StoreError> {
        // A failed statement aborts the whole transaction unless it runs
        // inside a savepoint.
        let conn = self.conn()?;
        sqlx::query("SAVEPOINT notification")
            .execute(&mut *conn)
            .await
            .map_err(classify)?;

        let inserted = sqlx::query(
            r"
            INSERT INTO notifications
                (id, recipient_id, message, kind, read, event_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(notification.id.as_uuid())
        .bind(notification.recipient_id.as_uuid())
        .bind(&notification.message)
        .bind(notification.kind.as_str())
        .bind(notification.read)
        .bind(notification.event_id.map(|id| *id.as_uuid()))
        .bind(notification.created_at)
        .execute(&mut *conn)
        .await;

        match inserted {
            Ok(_) => {
                sqlx::query("RELEASE SAVEPOINT notification")
                    .execute(&mut *conn)
                    .await
                    .map_err(classify)?;
                Ok(())
            }
            Err(e) => {
                sqlx::query("ROLLBACK TO SAVEPOINT notification")
                    .execute(&mut *conn)
                    .await
                    .map_err(classify)?;
                Err(classify(e))
            }
        }
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        match self.tx.take() {
            Some(tx) => tx.commit().await.map_err(classify),
            None => Ok(()),
        }
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        match self.tx.take() {
            Some(tx) => tx.rollback().await.map_err(classify),
            None => Ok(()),
        }
    }
}
