//! Identity extraction.
//!
//! The auth gateway in front of this service verifies credentials and
//! forwards the caller as two headers. Requests without a valid pair are
//! rejected with 401 before any handler runs.

use crate::error::AppError;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};
use ticketing_core::{Actor, Role, UserId};
use uuid::Uuid;

/// Header carrying the caller's user id (UUID).
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Header carrying the caller's role (`customer` or `organizer`).
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// The verified caller.
///
/// # Example
///
/// ```ignore
/// async fn handler(AuthenticatedUser(actor): AuthenticatedUser) -> String {
///     format!("Hello {}", actor.user_id)
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER)?
            .parse::<Uuid>()
            .map_err(|_| AppError::unauthorized(format!("{USER_ID_HEADER} is not a valid id")))?;
        let role = header(parts, USER_ROLE_HEADER)?
            .parse::<Role>()
            .map_err(|_| AppError::unauthorized(format!("{USER_ROLE_HEADER} is not a known role")))?;

        Ok(Self(Actor::new(UserId::from_uuid(user_id), role)))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::unauthorized(format!("Missing {name} header")))
}

/// JSON body; malformed or mistyped bodies render as [`AppError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path parameters; unparseable ids render as [`AppError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query string; bad values render as [`AppError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
