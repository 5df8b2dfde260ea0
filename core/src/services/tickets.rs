//! Ticket lookups, verification and check-in.

use crate::coordinator::TransactionCoordinator;
use crate::error::TicketingError;
use crate::ledger::InventoryLedger;
use crate::store::{EventCatalog, TicketStore, TransactionScope};
use crate::types::{Actor, EventId, Role, Ticket, TicketCode, TicketStatus};
use std::sync::Arc;

/// Read side of tickets plus redemption at the door.
#[derive(Clone)]
pub struct TicketService {
    coordinator: Arc<TransactionCoordinator>,
    tickets: Arc<dyn TicketStore>,
    catalog: Arc<dyn EventCatalog>,
}

impl TicketService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        coordinator: Arc<TransactionCoordinator>,
        tickets: Arc<dyn TicketStore>,
        catalog: Arc<dyn EventCatalog>,
    ) -> Self {
        Self {
            coordinator,
            tickets,
            catalog,
        }
    }

    /// Look up a ticket by code. Visible to its owner and to the event's
    /// organizer.
    ///
    /// # Errors
    ///
    /// [`TicketingError::Validation`] for a malformed code,
    /// [`TicketingError::NotFound`], or [`TicketingError::Forbidden`].
    pub async fn verify(&self, requester: Actor, code: &str) -> Result<Ticket, TicketingError> {
        let code = TicketCode::parse(code)?;
        let ticket = self
            .tickets
            .ticket_by_code(&code)
            .await?
            .ok_or_else(|| TicketingError::not_found("ticket", &code))?;

        if ticket.owner_id == requester.user_id {
            return Ok(ticket);
        }

        let organizer_id = self
            .catalog
            .event(ticket.event_id)
            .await?
            .map(|event| event.organizer_id);
        if organizer_id == Some(requester.user_id) {
            Ok(ticket)
        } else {
            Err(TicketingError::Forbidden(
                "ticket belongs to someone else".to_string(),
            ))
        }
    }

    /// Check a ticket in: `active -> used`. Only the event's organizer may
    /// redeem. Used tickets keep their inventory and can no longer be
    /// cancelled.
    ///
    /// # Errors
    ///
    /// [`TicketingError::Validation`], [`TicketingError::NotFound`],
    /// [`TicketingError::Forbidden`], or [`TicketingError::InvalidState`]
    /// when the ticket is not active.
    #[tracing::instrument(skip(self), fields(user_id = %organizer.user_id))]
    pub async fn redeem(&self, organizer: Actor, code: &str) -> Result<Ticket, TicketingError> {
        organizer.require(Role::Organizer, "redeem tickets")?;
        let code = TicketCode::parse(code)?;

        let ticket = self
            .coordinator
            .run_atomic("redeem", move |scope| {
                Box::pin(redeem_in_scope(scope, organizer, code.clone()))
            })
            .await?;

        tracing::info!(ticket_id = %ticket.id, event_id = %ticket.event_id, "Ticket redeemed");
        Ok(ticket)
    }

    /// Tickets owned by `requester`, newest first.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    pub async fn tickets_for(&self, requester: Actor) -> Result<Vec<Ticket>, TicketingError> {
        Ok(self.tickets.tickets_by_owner(requester.user_id).await?)
    }

    /// Every ticket for one of the organizer's events, newest first.
    ///
    /// # Errors
    ///
    /// [`TicketingError::Forbidden`] unless the caller organizes the event,
    /// [`TicketingError::NotFound`] for an unknown event.
    pub async fn tickets_for_event(
        &self,
        organizer: Actor,
        event_id: EventId,
    ) -> Result<Vec<Ticket>, TicketingError> {
        organizer.require(Role::Organizer, "list event tickets")?;
        let event = self
            .catalog
            .event(event_id)
            .await?
            .ok_or_else(|| TicketingError::not_found("event", event_id))?;
        if event.organizer_id != organizer.user_id {
            return Err(TicketingError::Forbidden(
                "only the event's organizer may list its tickets".to_string(),
            ));
        }
        Ok(self.tickets.tickets_by_event(event_id).await?)
    }
}

async fn redeem_in_scope(
    scope: &mut dyn TransactionScope,
    organizer: Actor,
    code: TicketCode,
) -> Result<Ticket, TicketingError> {
    let mut ticket = scope
        .lock_ticket_by_code(&code)
        .await?
        .ok_or_else(|| TicketingError::not_found("ticket", &code))?;
    let event = InventoryLedger::read_for_update(scope, ticket.event_id).await?;

    if event.organizer_id != organizer.user_id {
        return Err(TicketingError::Forbidden(
            "only the event's organizer may redeem its tickets".to_string(),
        ));
    }
    if ticket.status != TicketStatus::Active {
        return Err(TicketingError::InvalidState(format!(
            "ticket is {}",
            ticket.status.as_str()
        )));
    }

    scope.write_ticket_status(ticket.id, TicketStatus::Used).await?;
    ticket.status = TicketStatus::Used;
    Ok(ticket)
}
