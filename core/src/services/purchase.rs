//! Ticket purchase.
//!
//! `Requested -> Validated -> Reserved -> Issued`, or `Requested -> Rejected`
//! before anything is touched, or `Reserved -> Failed` with the whole
//! transaction rolled back.

use super::{ServiceConfig, record_rejection};
use crate::coordinator::TransactionCoordinator;
use crate::environment::Clock;
use crate::error::TicketingError;
use crate::ledger::InventoryLedger;
use crate::notification::{self, enqueue_best_effort};
use crate::store::TransactionScope;
use crate::types::{Actor, EventId, EventStatus, Role, Ticket};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Sells tickets against event inventory.
#[derive(Clone)]
pub struct PurchaseService {
    coordinator: Arc<TransactionCoordinator>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
}

impl PurchaseService {
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

    /// Buy `quantity` tickets for `event_id`.
    ///
    /// Decrements inventory, issues one ticket row carrying the whole
    /// quantity and notifies the buyer, all in one transaction. Repeating
    /// the call buys again.
    ///
    /// # Errors
    ///
    /// - [`TicketingError::Validation`]: quantity outside `1..=max_per_purchase`
    /// - [`TicketingError::Forbidden`]: requester is not a customer
    /// - [`TicketingError::NotFound`]: no such event
    /// - [`TicketingError::InvalidState`]: event not published, or already past
    /// - [`TicketingError::InsufficientInventory`]: not enough tickets left
    /// - [`TicketingError::RetriesExhausted`]: storage kept failing transiently
    #[tracing::instrument(skip(self), fields(user_id = %requester.user_id))]
    pub async fn purchase(
        &self,
        requester: Actor,
        event_id: EventId,
        quantity: u32,
    ) -> Result<Ticket, TicketingError> {
        let result = self.try_purchase(requester, event_id, quantity).await;

        match &result {
            Ok(ticket) => {
                metrics::counter!("ticketing.purchases").increment(1);
                tracing::info!(
                    ticket_id = %ticket.id,
                    event_id = %event_id,
                    quantity,
                    "Tickets purchased"
                );
            }
            Err(err) => record_rejection("ticketing.purchases.rejected", "purchase", err),
        }

        result
    }

    async fn try_purchase(
        &self,
        requester: Actor,
        event_id: EventId,
        quantity: u32,
    ) -> Result<Ticket, TicketingError> {
        let max = self.config.max_per_purchase;
        if quantity == 0 || quantity > max {
            return Err(TicketingError::Validation(format!(
                "quantity must be between 1 and {max}"
            )));
        }
        requester.require(Role::Customer, "purchase tickets")?;

        let now = self.clock.now();
        self.coordinator
            .run_atomic("purchase", move |scope| {
                Box::pin(reserve_and_issue(scope, requester, event_id, quantity, now))
            })
            .await
    }
}

async fn reserve_and_issue(
    scope: &mut dyn TransactionScope,
    requester: Actor,
    event_id: EventId,
    quantity: u32,
    now: DateTime<Utc>,
) -> Result<Ticket, TicketingError> {
    let event = InventoryLedger::read_for_update(scope, event_id).await?;

    if event.status != EventStatus::Published {
        return Err(TicketingError::InvalidState(format!(
            "event is {}, not on sale",
            event.status.as_str()
        )));
    }
    if event.date <= now {
        return Err(TicketingError::InvalidState(
            "event has already taken place".to_string(),
        ));
    }
    if event.available < quantity {
        return Err(TicketingError::InsufficientInventory {
            event_id,
            requested: quantity,
            available: event.available,
        });
    }

    InventoryLedger::adjust(scope, event_id, -i64::from(quantity)).await?;

    let ticket = Ticket::issue(event_id, requester.user_id, quantity, now);
    scope.insert_ticket(&ticket).await?;

    enqueue_best_effort(scope, &notification::purchase_confirmed(&ticket, &event, now)).await;

    Ok(ticket)
}
