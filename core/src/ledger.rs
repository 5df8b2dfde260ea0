//! Inventory ledger: the per-event available-ticket counter.
//!
//! The counter lives on the event row. Every mutation goes through
//! [`InventoryLedger::adjust`], which needs an open [`TransactionScope`], so
//! the counter can only change inside a coordinator transaction.

use crate::error::TicketingError;
use crate::store::TransactionScope;
use crate::types::{Event, EventId};

/// Result of applying a delta to a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjustment {
    /// Counter before
    pub previous: u32,
    /// Counter after
    pub new: u32,
    /// Whether the result was capped at capacity
    pub clamped: bool,
}

/// A decrement asked for more than was available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortfall {
    /// Magnitude of the requested decrement
    pub requested: u32,
    /// What was available
    pub available: u32,
}

/// Apply `delta` to `available`, bounded by `[0, capacity]`.
///
/// Going below zero is a [`Shortfall`]; going above `capacity` clamps.
///
/// # Errors
///
/// Returns [`Shortfall`] when `available + delta < 0`.
pub fn apply_delta(available: u32, capacity: u32, delta: i64) -> Result<Adjustment, Shortfall> {
    let target = i64::from(available).saturating_add(delta);
    if target < 0 {
        return Err(Shortfall {
            requested: u32::try_from(delta.unsigned_abs()).unwrap_or(u32::MAX),
            available,
        });
    }

    let clamped = target > i64::from(capacity);
    let new = if clamped {
        capacity
    } else {
        u32::try_from(target).unwrap_or(capacity)
    };

    Ok(Adjustment {
        previous: available,
        new,
        clamped,
    })
}

/// Scoped access to event inventory.
pub struct InventoryLedger;

impl InventoryLedger {
    /// Lock the event row for the rest of the scope and return it.
    ///
    /// # Errors
    ///
    /// [`TicketingError::NotFound`] if the event does not exist, or the
    /// classified storage failure.
    pub async fn read_for_update(
        scope: &mut dyn TransactionScope,
        event_id: EventId,
    ) -> Result<Event, TicketingError> {
        scope
            .lock_event(event_id)
            .await?
            .ok_or_else(|| TicketingError::not_found("event", event_id))
    }

    /// Add `delta` to the event's available counter and return the new value.
    ///
    /// # Errors
    ///
    /// [`TicketingError::InsufficientInventory`] if the counter would go
    /// negative. The caller must let this abort the scope.
    pub async fn adjust(
        scope: &mut dyn TransactionScope,
        event_id: EventId,
        delta: i64,
    ) -> Result<u32, TicketingError> {
        let event = Self::read_for_update(scope, event_id).await?;

        let adjustment = apply_delta(event.available, event.total_capacity, delta).map_err(
            |shortfall| TicketingError::InsufficientInventory {
                event_id,
                requested: shortfall.requested,
                available: shortfall.available,
            },
        )?;

        if adjustment.clamped {
            tracing::warn!(
                event_id = %event_id,
                previous = adjustment.previous,
                delta,
                capacity = event.total_capacity,
                "Inventory credit clamped at capacity"
            );
        }

        scope.write_available(event_id, adjustment.new).await?;

        tracing::debug!(
            event_id = %event_id,
            previous = adjustment.previous,
            available = adjustment.new,
            "Inventory adjusted"
        );

        Ok(adjustment.new)
    }
}
