//! Event lifecycle and organizer ticket management.

use super::SuccessResponse;
use crate::error::AppError;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AuthenticatedUser};
use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::Deserialize;
use ticketing_core::{Event, EventId, NewEvent, Ticket, TicketId};

/// Create a draft event.
///
/// # Endpoint
///
/// ```text
/// POST /api/events
/// {"title": "...", "date": "2025-06-01T19:00:00Z", "capacity": 500, "price_cents": 2500}
/// ```
///
/// # Errors
///
/// 403 for customers, 422 when the request fails validation.
pub async fn create(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiJson(request): ApiJson<NewEvent>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let event = state.engine.events().create_event(actor, request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Fetch an event.
///
/// # Errors
///
/// 404 when unknown.
pub async fn show(
    State(state): State<AppState>,
    AuthenticatedUser(_actor): AuthenticatedUser,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<Json<Event>, AppError> {
    Ok(Json(state.engine.events().event(event_id).await?))
}

/// Put a draft event on sale.
///
/// # Errors
///
/// 403 unless the caller owns the event, 409 unless it is a draft.
pub async fn publish(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<Json<Event>, AppError> {
    Ok(Json(
        state.engine.events().publish_event(actor, event_id).await?,
    ))
}

/// Call an event off. Existing tickets stay valid for refund.
///
/// # Errors
///
/// 403 unless the caller owns the event, 409 when already cancelled.
pub async fn cancel(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<Json<Event>, AppError> {
    Ok(Json(
        state.engine.events().cancel_event(actor, event_id).await?,
    ))
}

/// Every ticket sold for an event.
///
/// # Errors
///
/// 403 unless the caller owns the event.
pub async fn tickets(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<Json<Vec<Ticket>>, AppError> {
    Ok(Json(
        state
            .engine
            .tickets()
            .tickets_for_event(actor, event_id)
            .await?,
    ))
}

/// Query string for the organizer override.
#[derive(Debug, Deserialize)]
pub struct OverrideParams {
    /// Shown to the ticket owner
    pub reason: Option<String>,
}

/// Organizer override: cancel a ticket for one of the caller's events.
///
/// # Endpoint
///
/// ```text
/// DELETE /api/events/{event_id}/tickets/{ticket_id}?reason=...
/// ```
///
/// # Errors
///
/// 403 unless the caller owns the event, 404 when the ticket does not
/// belong to it, 409 when the ticket is not active.
pub async fn cancel_ticket(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath((event_id, ticket_id)): ApiPath<(EventId, TicketId)>,
    ApiQuery(params): ApiQuery<OverrideParams>,
) -> Result<Json<SuccessResponse>, AppError> {
    let reason = params.reason.unwrap_or_default();
    state
        .engine
        .cancellations()
        .cancel_as_organizer(actor, event_id, ticket_id, &reason)
        .await?;
    Ok(Json(SuccessResponse::OK))
}
