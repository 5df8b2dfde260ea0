//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::error::AppError;
use crate::state::AppState;
use axum::{Json, extract::State};
use serde::Serialize;

/// Health probe body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` or `ready`
    pub status: &'static str,
}

/// Simple health check endpoint (for basic liveness).
///
/// This endpoint does NOT check dependencies (database, etc.).
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check: the database answers a ping.
///
/// # Status Codes
///
/// - 200 OK: database reachable
/// - 503 Service Unavailable: database unreachable
///
/// # Endpoint
///
/// ```text
/// GET /health/ready
/// ```
///
/// # Errors
///
/// Returns 503 when the ping fails.
pub async fn readiness(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    state.engine.ping().await.map_err(|err| {
        tracing::warn!(error = %err, "Readiness check failed");
        AppError::unavailable("Database unavailable")
    })?;
    Ok(Json(HealthResponse { status: "ready" }))
}
