//! Ticket purchase, cancellation, lookup and check-in.

use super::SuccessResponse;
use crate::error::AppError;
use crate::extractors::{ApiJson, ApiPath, AuthenticatedUser};
use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use ticketing_core::{EventId, Ticket, TicketCode, TicketId};

/// Purchase request body.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    /// Event to buy for
    pub event_id: EventId,
    /// Number of admissions
    pub quantity: u32,
}

/// Purchase response body.
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    /// Issued ticket
    pub ticket_id: TicketId,
    /// Presentable code
    pub code: TicketCode,
    /// Admissions on the ticket
    pub quantity: u32,
    /// Event the ticket admits to
    pub event_id: EventId,
}

/// Buy tickets.
///
/// # Endpoint
///
/// ```text
/// POST /api/tickets
/// {"event_id": "...", "quantity": 2}
/// ```
///
/// # Errors
///
/// 422 for a bad quantity, 404 for an unknown event, 409 when the event is
/// not on sale or sold out.
pub async fn purchase(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiJson(request): ApiJson<PurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseResponse>), AppError> {
    let ticket = state
        .engine
        .purchases()
        .purchase(actor, request.event_id, request.quantity)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PurchaseResponse {
            ticket_id: ticket.id,
            code: ticket.code,
            quantity: ticket.quantity,
            event_id: ticket.event_id,
        }),
    ))
}

/// Cancel one of the caller's tickets.
///
/// # Errors
///
/// 403 for someone else's ticket, 409 when already used or cancelled.
pub async fn cancel(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(ticket_id): ApiPath<TicketId>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .engine
        .cancellations()
        .cancel(actor, ticket_id)
        .await?;
    Ok(Json(SuccessResponse::OK))
}

/// The caller's tickets, newest first.
///
/// # Errors
///
/// 500 on storage failure.
pub async fn mine(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> Result<Json<Vec<Ticket>>, AppError> {
    Ok(Json(state.engine.tickets().tickets_for(actor).await?))
}

/// Look a ticket up by code.
///
/// # Errors
///
/// 422 for a malformed code, 404 when unknown, 403 when the caller is
/// neither the owner nor the organizer.
pub async fn verify(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(code): ApiPath<String>,
) -> Result<Json<Ticket>, AppError> {
    Ok(Json(state.engine.tickets().verify(actor, &code).await?))
}

/// Check a ticket in at the door.
///
/// # Errors
///
/// 403 unless the caller organizes the event, 409 when the ticket is not
/// active.
pub async fn redeem(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(code): ApiPath<String>,
) -> Result<Json<Ticket>, AppError> {
    Ok(Json(state.engine.tickets().redeem(actor, &code).await?))
}
