//! HTTP error responses.
//!
//! [`AppError`] is what every handler returns on failure. Domain errors
//! convert into it by [`ErrorKind`], never by message text.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;
use ticketing_core::{ErrorKind, TicketingError};

/// Application error type for web handlers.
///
/// Carries the status, a stable machine-readable code and a user-facing
/// message. Server errors keep their cause for logging only.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>) -> Result<Json<Event>, AppError> {
///     let event = state.engine.events().event(id).await?;
///     Ok(Json(event))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: &'static str) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message.into(), "UNAUTHORIZED")
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message.into(), "FORBIDDEN")
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND",
        )
    }

    /// Create a 409 Conflict error with a specific code.
    #[must_use]
    pub fn conflict(message: impl Into<String>, code: &'static str) -> Self {
        Self::new(StatusCode::CONFLICT, message.into(), code)
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            message.into(),
            "VALIDATION_ERROR",
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR",
        )
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "SERVICE_UNAVAILABLE",
        )
    }

    /// HTTP status this error renders as.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: &'static str,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    error = %source,
                    "Request failed"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    "Request failed"
                ),
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<TicketingError> for AppError {
    fn from(err: TicketingError) -> Self {
        match err.kind() {
            ErrorKind::Validation => Self::validation(err.to_string()),
            ErrorKind::NotFound => match &err {
                TicketingError::NotFound { resource, id } => Self::not_found(resource, id),
                _ => Self::new(StatusCode::NOT_FOUND, err.to_string(), "NOT_FOUND"),
            },
            ErrorKind::Forbidden => Self::forbidden(err.to_string()),
            ErrorKind::InsufficientInventory => {
                Self::conflict(err.to_string(), "INSUFFICIENT_INVENTORY")
            }
            ErrorKind::InvalidState => Self::conflict(err.to_string(), "INVALID_STATE"),
            ErrorKind::Transient => {
                Self::internal("The request could not be completed, please retry")
                    .with_source(err.into())
            }
            ErrorKind::NotificationFailure | ErrorKind::Internal => {
                Self::internal("An internal error occurred").with_source(err.into())
            }
        }
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if matches!(rejection, JsonRejection::MissingJsonContentType(_)) {
            Self::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                rejection.body_text(),
                "UNSUPPORTED_MEDIA_TYPE",
            )
        } else {
            Self::validation(rejection.body_text())
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        if rejection.status().is_server_error() {
            Self::internal("Failed to read path parameters")
                .with_source(anyhow::anyhow!(rejection.body_text()))
        } else {
            Self::validation(rejection.body_text())
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketing_core::{EventId, StoreError};

    #[test]
    fn test_error_display() {
        let err = AppError::validation("quantity must be at least 1");
        assert_eq!(
            err.to_string(),
            "[VALIDATION_ERROR] quantity must be at least 1"
        );
    }

    #[test]
    fn test_domain_errors_map_to_status() {
        let cases = [
            (
                TicketingError::Validation("bad".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                TicketingError::not_found("ticket", "abc"),
                StatusCode::NOT_FOUND,
            ),
            (
                TicketingError::Forbidden("no".into()),
                StatusCode::FORBIDDEN,
            ),
            (
                TicketingError::InsufficientInventory {
                    event_id: EventId::new(),
                    requested: 3,
                    available: 1,
                },
                StatusCode::CONFLICT,
            ),
            (
                TicketingError::InvalidState("used".into()),
                StatusCode::CONFLICT,
            ),
            (
                TicketingError::RetriesExhausted {
                    attempts: 3,
                    last: StoreError::Deadlock("d".into()),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                TicketingError::Storage(StoreError::Database("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let err = AppError::from(TicketingError::Storage(StoreError::Database(
            "relation tickets does not exist".into(),
        )));
        assert_eq!(err.code(), "INTERNAL_SERVER_ERROR");
        assert!(!err.to_string().contains("relation"));
    }

    #[test]
    fn test_not_found_message() {
        let err = AppError::from(TicketingError::not_found("event", "42"));
        assert_eq!(err.to_string(), "[NOT_FOUND] event with id 42 not found");
    }
}
