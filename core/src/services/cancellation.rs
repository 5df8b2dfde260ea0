//! Ticket cancellation, the compensating flow for a purchase.
//!
//! Lock order is ticket row, then event row. Purchases only lock the event
//! row, so the two flows cannot wait on each other in a cycle.

use super::{CancellationPolicy, ServiceConfig, record_rejection};
use crate::coordinator::TransactionCoordinator;
use crate::environment::Clock;
use crate::error::TicketingError;
use crate::ledger::InventoryLedger;
use crate::notification::{self, enqueue_best_effort};
use crate::store::TransactionScope;
use crate::types::{Actor, Event, EventId, Role, Ticket, TicketId, TicketStatus};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Who initiated a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Initiator {
    Owner,
    Organizer,
}

impl Initiator {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Organizer => "organizer",
        }
    }
}

/// Cancels tickets and returns their inventory.
#[derive(Clone)]
pub struct CancellationService {
    coordinator: Arc<TransactionCoordinator>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
}

impl CancellationService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        coordinator: Arc<TransactionCoordinator>,
        clock: Arc<dyn Clock>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            coordinator,
            clock,
            config,
        }
    }

    /// Cancel a ticket on behalf of `requester`.
    ///
    /// Under [`CancellationPolicy::OwnerOnly`] only the owner may cancel;
    /// [`CancellationPolicy::OwnerOrOrganizer`] also admits the event's
    /// organizer. The whole quantity is re-credited.
    ///
    /// # Errors
    ///
    /// - [`TicketingError::NotFound`]: no such ticket
    /// - [`TicketingError::Forbidden`]: requester may not cancel it
    /// - [`TicketingError::InvalidState`]: ticket already used or cancelled
    /// - [`TicketingError::RetriesExhausted`]: storage kept failing transiently
    #[tracing::instrument(skip(self), fields(user_id = %requester.user_id))]
    pub async fn cancel(
        &self,
        requester: Actor,
        ticket_id: TicketId,
    ) -> Result<Ticket, TicketingError> {
        let policy = self.config.cancellation_policy;
        let now = self.clock.now();

        let result = self
            .coordinator
            .run_atomic("cancel", move |scope| {
                Box::pin(cancel_by_requester(scope, requester, ticket_id, policy, now))
            })
            .await;

        Self::record(result, ticket_id, "cancel")
    }

    /// Organizer override: cancel any ticket for one of the organizer's own
    /// events. The owner receives an alert carrying `reason`.
    ///
    /// # Errors
    ///
    /// - [`TicketingError::Forbidden`]: requester is not the event's organizer
    /// - [`TicketingError::NotFound`]: no such ticket for `event_id`
    /// - [`TicketingError::InvalidState`]: ticket already used or cancelled
    /// - [`TicketingError::RetriesExhausted`]: storage kept failing transiently
    #[tracing::instrument(skip(self, reason), fields(user_id = %organizer.user_id))]
    pub async fn cancel_as_organizer(
        &self,
        organizer: Actor,
        event_id: EventId,
        ticket_id: TicketId,
        reason: &str,
    ) -> Result<Ticket, TicketingError> {
        let result = match organizer.require(Role::Organizer, "cancel tickets for an event") {
            Ok(()) => {
                let now = self.clock.now();
                let reason = reason.to_string();
                self.coordinator
                    .run_atomic("cancel_as_organizer", move |scope| {
                        Box::pin(cancel_by_organizer(
                            scope,
                            organizer,
                            event_id,
                            ticket_id,
                            reason.clone(),
                            now,
                        ))
                    })
                    .await
            }
            Err(err) => Err(err),
        };

        Self::record(result, ticket_id, "cancel_as_organizer")
    }

    fn record(
        result: Result<(Ticket, Initiator), TicketingError>,
        ticket_id: TicketId,
        operation: &'static str,
    ) -> Result<Ticket, TicketingError> {
        match result {
            Ok((ticket, initiator)) => {
                metrics::counter!("ticketing.cancellations", "initiator" => initiator.as_str())
                    .increment(1);
                tracing::info!(
                    ticket_id = %ticket_id,
                    event_id = %ticket.event_id,
                    quantity = ticket.quantity,
                    initiator = initiator.as_str(),
                    "Ticket cancelled"
                );
                Ok(ticket)
            }
            Err(err) => {
                record_rejection("ticketing.cancellations.rejected", operation, &err);
                Err(err)
            }
        }
    }
}

async fn cancel_by_requester(
    scope: &mut dyn TransactionScope,
    requester: Actor,
    ticket_id: TicketId,
    policy: CancellationPolicy,
    now: DateTime<Utc>,
) -> Result<(Ticket, Initiator), TicketingError> {
    let ticket = lock_ticket(scope, ticket_id).await?;
    let event = InventoryLedger::read_for_update(scope, ticket.event_id).await?;

    let initiator = if ticket.owner_id == requester.user_id {
        Initiator::Owner
    } else if policy == CancellationPolicy::OwnerOrOrganizer
        && requester.role == Role::Organizer
        && event.organizer_id == requester.user_id
    {
        Initiator::Organizer
    } else {
        return Err(TicketingError::Forbidden(
            "only the ticket owner may cancel this ticket".to_string(),
        ));
    };

    let cancelled = release(scope, ticket, &event).await?;
    enqueue_best_effort(
        scope,
        &notification::cancellation_confirmed(&cancelled, &event, now),
    )
    .await;

    Ok((cancelled, initiator))
}

async fn cancel_by_organizer(
    scope: &mut dyn TransactionScope,
    organizer: Actor,
    event_id: EventId,
    ticket_id: TicketId,
    reason: String,
    now: DateTime<Utc>,
) -> Result<(Ticket, Initiator), TicketingError> {
    let ticket = lock_ticket(scope, ticket_id).await?;
    if ticket.event_id != event_id {
        return Err(TicketingError::not_found("ticket", ticket_id));
    }
    let event = InventoryLedger::read_for_update(scope, ticket.event_id).await?;

    if event.organizer_id != organizer.user_id {
        return Err(TicketingError::Forbidden(
            "only the event's organizer may cancel its tickets".to_string(),
        ));
    }

    let cancelled = release(scope, ticket, &event).await?;
    enqueue_best_effort(
        scope,
        &notification::cancelled_by_organizer(&cancelled, &event, &reason, now),
    )
    .await;

    Ok((cancelled, Initiator::Organizer))
}

async fn lock_ticket(
    scope: &mut dyn TransactionScope,
    ticket_id: TicketId,
) -> Result<Ticket, TicketingError> {
    scope
        .lock_ticket(ticket_id)
        .await?
        .ok_or_else(|| TicketingError::not_found("ticket", ticket_id))
}

/// Re-credit the ticket's quantity and mark it cancelled. Both rows must
/// already be locked.
async fn release(
    scope: &mut dyn TransactionScope,
    mut ticket: Ticket,
    event: &Event,
) -> Result<Ticket, TicketingError> {
    if ticket.status != TicketStatus::Active {
        return Err(TicketingError::InvalidState(format!(
            "ticket is {}",
            ticket.status.as_str()
        )));
    }

    InventoryLedger::adjust(scope, event.id, i64::from(ticket.quantity)).await?;
    scope
        .write_ticket_status(ticket.id, TicketStatus::Cancelled)
        .await?;

    ticket.status = TicketStatus::Cancelled;
    Ok(ticket)
}
