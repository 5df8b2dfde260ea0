//! Notification messages and best-effort enqueue.

use crate::error::TicketingError;
use crate::store::TransactionScope;
use crate::types::{Event, Notification, NotificationKind, Ticket};
use chrono::{DateTime, Utc};

/// Stage `notification` in `scope` without letting a failure abort it.
///
/// Failures are logged and counted; the surrounding ledger and ticket
/// writes still commit. Returns whether the notification was staged.
pub async fn enqueue_best_effort(
    scope: &mut dyn TransactionScope,
    notification: &Notification,
) -> bool {
    match scope.enqueue_notification(notification).await {
        Ok(()) => true,
        Err(err) => {
            let err = TicketingError::Notification(err.to_string());
            tracing::warn!(
                recipient_id = %notification.recipient_id,
                kind = notification.kind.as_str(),
                error = %err,
                "Notification enqueue failed; continuing without it"
            );
            metrics::counter!("ticketing.notifications.failed").increment(1);
            false
        }
    }
}

/// "Purchase confirmed" message for the buyer.
#[must_use]
pub fn purchase_confirmed(ticket: &Ticket, event: &Event, now: DateTime<Utc>) -> Notification {
    let plural = if ticket.quantity == 1 { "" } else { "s" };
    Notification::new(
        ticket.owner_id,
        format!(
            "Purchase confirmed: {} ticket{plural} for \"{}\". Your code is {}.",
            ticket.quantity, event.title, ticket.code
        ),
        NotificationKind::Info,
        Some(ticket.event_id),
        now,
    )
}

/// "Cancellation confirmed" message for the ticket owner.
#[must_use]
pub fn cancellation_confirmed(ticket: &Ticket, event: &Event, now: DateTime<Utc>) -> Notification {
    Notification::new(
        ticket.owner_id,
        format!(
            "Cancellation confirmed: ticket {} for \"{}\" has been cancelled.",
            ticket.code, event.title
        ),
        NotificationKind::Warning,
        Some(ticket.event_id),
        now,
    )
}

/// Message telling the owner an organizer cancelled their ticket.
#[must_use]
pub fn cancelled_by_organizer(
    ticket: &Ticket,
    event: &Event,
    reason: &str,
    now: DateTime<Utc>,
) -> Notification {
    let reason = reason.trim();
    let suffix = if reason.is_empty() {
        String::new()
    } else {
        format!(" Reason: {reason}")
    };
    Notification::new(
        ticket.owner_id,
        format!(
            "The organizer of \"{}\" cancelled your ticket {}.{suffix}",
            event.title, ticket.code
        ),
        NotificationKind::Alert,
        Some(ticket.event_id),
        now,
    )
}
