//! Row decoding.
//!
//! Counters are stored as `INTEGER` and prices as `BIGINT`; CHECK
//! constraints keep them non-negative, so a failed conversion means the
//! row is corrupt.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::PgRow;
use ticketing_core::{
    Event, EventId, EventStatus, Money, Notification, NotificationId, NotificationKind,
    StoreError, Ticket, TicketCode, TicketId, TicketStatus, UserId,
};
use uuid::Uuid;

pub(crate) const EVENT_COLUMNS: &str = "id, organizer_id, title, event_date, total_capacity, \
     available, price_cents, status, created_at";

pub(crate) const TICKET_COLUMNS: &str =
    "id, event_id, owner_id, quantity, code, status, purchased_at";

pub(crate) const NOTIFICATION_COLUMNS: &str =
    "id, recipient_id, message, kind, read, event_id, created_at";

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Database(format!("Failed to decode column {name}: {e}")))
}

fn counter(row: &PgRow, name: &str) -> Result<u32, StoreError> {
    let raw: i32 = column(row, name)?;
    u32::try_from(raw).map_err(|_| StoreError::Database(format!("Negative {name}: {raw}")))
}

pub(crate) fn to_db_counter(value: u32) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Database(format!("Counter out of range: {value}")))
}

pub(crate) fn event_from_row(row: &PgRow) -> Result<Event, StoreError> {
    let price: i64 = column(row, "price_cents")?;
    let status: String = column(row, "status")?;
    Ok(Event {
        id: EventId::from_uuid(column(row, "id")?),
        organizer_id: UserId::from_uuid(column(row, "organizer_id")?),
        title: column(row, "title")?,
        date: column::<DateTime<Utc>>(row, "event_date")?,
        total_capacity: counter(row, "total_capacity")?,
        available: counter(row, "available")?,
        price: Money::from_cents(
            u64::try_from(price)
                .map_err(|_| StoreError::Database(format!("Negative price: {price}")))?,
        ),
        status: EventStatus::parse(&status)?,
        created_at: column(row, "created_at")?,
    })
}

pub(crate) fn ticket_from_row(row: &PgRow) -> Result<Ticket, StoreError> {
    let status: String = column(row, "status")?;
    Ok(Ticket {
        id: TicketId::from_uuid(column(row, "id")?),
        event_id: EventId::from_uuid(column(row, "event_id")?),
        owner_id: UserId::from_uuid(column(row, "owner_id")?),
        quantity: counter(row, "quantity")?,
        code: TicketCode::from_stored(column(row, "code")?),
        status: TicketStatus::parse(&status)?,
        purchased_at: column(row, "purchased_at")?,
    })
}

pub(crate) fn notification_from_row(row: &PgRow) -> Result<Notification, StoreError> {
    let kind: String = column(row, "kind")?;
    let event_id: Option<Uuid> = column(row, "event_id")?;
    Ok(Notification {
        id: NotificationId::from_uuid(column(row, "id")?),
        recipient_id: UserId::from_uuid(column(row, "recipient_id")?),
        message: column(row, "message")?,
        kind: NotificationKind::parse(&kind)?,
        read: column(row, "read")?,
        event_id: event_id.map(EventId::from_uuid),
        created_at: column(row, "created_at")?,
    })
}
