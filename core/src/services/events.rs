//! Event lifecycle: the part of event management that seeds and closes
//! inventory ledgers.

use crate::coordinator::TransactionCoordinator;
use crate::environment::Clock;
use crate::error::TicketingError;
use crate::ledger::InventoryLedger;
use crate::store::{EventCatalog, TransactionScope};
use crate::types::{Actor, Event, EventId, EventStatus, NewEvent, Role};
use std::sync::Arc;

/// Creates, publishes and cancels events.
#[derive(Clone)]
pub struct EventService {
    coordinator: Arc<TransactionCoordinator>,
    catalog: Arc<dyn EventCatalog>,
    clock: Arc<dyn Clock>,
}

impl EventService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        coordinator: Arc<TransactionCoordinator>,
        catalog: Arc<dyn EventCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            coordinator,
            catalog,
            clock,
        }
    }

    /// Create a draft event whose inventory starts at full capacity.
    ///
    /// # Errors
    ///
    /// [`TicketingError::Forbidden`] unless the caller is an organizer,
    /// [`TicketingError::Validation`] for a bad title, capacity or date.
    #[tracing::instrument(skip(self, request), fields(user_id = %organizer.user_id))]
    pub async fn create_event(
        &self,
        organizer: Actor,
        request: NewEvent,
    ) -> Result<Event, TicketingError> {
        organizer.require(Role::Organizer, "create events")?;
        let now = self.clock.now();
        request.validate(now)?;

        let event = request.into_event(organizer.user_id, now);
        let created = self
            .coordinator
            .run_atomic("create_event", move |scope| {
                Box::pin(insert_event(scope, event.clone()))
            })
            .await?;

        tracing::info!(
            event_id = %created.id,
            capacity = created.total_capacity,
            "Event created"
        );
        Ok(created)
    }

    /// Put a draft event on sale.
    ///
    /// # Errors
    ///
    /// [`TicketingError::NotFound`], [`TicketingError::Forbidden`] for a
    /// caller who does not own the event, [`TicketingError::InvalidState`]
    /// unless the event is a draft.
    #[tracing::instrument(skip(self), fields(user_id = %organizer.user_id))]
    pub async fn publish_event(
        &self,
        organizer: Actor,
        event_id: EventId,
    ) -> Result<Event, TicketingError> {
        organizer.require(Role::Organizer, "publish events")?;
        let event = self
            .coordinator
            .run_atomic("publish_event", move |scope| {
                Box::pin(transition(
                    scope,
                    organizer,
                    event_id,
                    &[EventStatus::Draft],
                    EventStatus::Published,
                ))
            })
            .await?;

        tracing::info!(event_id = %event_id, "Event published");
        Ok(event)
    }

    /// Call off an event. Further purchases fail; issued tickets are left as
    /// they are and can still be cancelled by their owners.
    ///
    /// # Errors
    ///
    /// [`TicketingError::NotFound`], [`TicketingError::Forbidden`] for a
    /// caller who does not own the event, [`TicketingError::InvalidState`]
    /// if it is already cancelled.
    #[tracing::instrument(skip(self), fields(user_id = %organizer.user_id))]
    pub async fn cancel_event(
        &self,
        organizer: Actor,
        event_id: EventId,
    ) -> Result<Event, TicketingError> {
        organizer.require(Role::Organizer, "cancel events")?;
        let event = self
            .coordinator
            .run_atomic("cancel_event", move |scope| {
                Box::pin(transition(
                    scope,
                    organizer,
                    event_id,
                    &[EventStatus::Draft, EventStatus::Published],
                    EventStatus::Cancelled,
                ))
            })
            .await?;

        tracing::info!(event_id = %event_id, "Event cancelled");
        Ok(event)
    }

    /// Read an event.
    ///
    /// # Errors
    ///
    /// [`TicketingError::NotFound`] if it does not exist.
    pub async fn event(&self, event_id: EventId) -> Result<Event, TicketingError> {
        self.catalog
            .event(event_id)
            .await?
            .ok_or_else(|| TicketingError::not_found("event", event_id))
    }
}

async fn insert_event(
    scope: &mut dyn TransactionScope,
    event: Event,
) -> Result<Event, TicketingError> {
    scope.insert_event(&event).await?;
    Ok(event)
}

async fn transition(
    scope: &mut dyn TransactionScope,
    organizer: Actor,
    event_id: EventId,
    from: &'static [EventStatus],
    to: EventStatus,
) -> Result<Event, TicketingError> {
    let mut event = InventoryLedger::read_for_update(scope, event_id).await?;

    if event.organizer_id != organizer.user_id {
        return Err(TicketingError::Forbidden(
            "only the event's organizer may change it".to_string(),
        ));
    }
    if !from.contains(&event.status) {
        return Err(TicketingError::InvalidState(format!(
            "cannot move event from {} to {}",
            event.status.as_str(),
            to.as_str()
        )));
    }

    scope.write_event_status(event_id, to).await?;
    event.status = to;
    Ok(event)
}
