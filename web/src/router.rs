//! Route table.

use crate::handlers::{events, health, notifications, tickets};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

/// Build the full HTTP surface.
///
/// ```text
/// GET    /health
/// GET    /health/ready
/// POST   /api/tickets
/// GET    /api/tickets/mine
/// DELETE /api/tickets/:ticket_id
/// GET    /api/tickets/code/:code
/// POST   /api/tickets/code/:code/redeem
/// POST   /api/events
/// GET    /api/events/:event_id
/// POST   /api/events/:event_id/publish
/// POST   /api/events/:event_id/cancel
/// GET    /api/events/:event_id/tickets
/// DELETE /api/events/:event_id/tickets/:ticket_id
/// GET    /api/notifications
/// POST   /api/notifications/:notification_id/read
/// ```
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness))
        .route("/api/tickets", post(tickets::purchase))
        .route("/api/tickets/mine", get(tickets::mine))
        .route("/api/tickets/:ticket_id", delete(tickets::cancel))
        .route("/api/tickets/code/:code", get(tickets::verify))
        .route("/api/tickets/code/:code/redeem", post(tickets::redeem))
        .route("/api/events", post(events::create))
        .route("/api/events/:event_id", get(events::show))
        .route("/api/events/:event_id/publish", post(events::publish))
        .route("/api/events/:event_id/cancel", post(events::cancel))
        .route("/api/events/:event_id/tickets", get(events::tickets))
        .route(
            "/api/events/:event_id/tickets/:ticket_id",
            delete(events::cancel_ticket),
        )
        .route("/api/notifications", get(notifications::list))
        .route(
            "/api/notifications/:notification_id/read",
            post(notifications::mark_read),
        )
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
