//! Notification inbox.

use super::SuccessResponse;
use crate::error::AppError;
use crate::extractors::{ApiPath, ApiQuery, AuthenticatedUser};
use crate::state::AppState;
use axum::{
    Json,
    extract::State,
};
use serde::Deserialize;
use ticketing_core::{Notification, NotificationId};

const DEFAULT_PAGE_SIZE: u32 = 20;

/// Paging parameters.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    /// 1-based page number
    #[serde(default = "first_page")]
    pub page: u32,
    /// Page size, capped at 50
    #[serde(default = "default_limit")]
    pub limit: u32,
}

const fn first_page() -> u32 {
    1
}

const fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// The caller's notifications, newest first.
///
/// # Endpoint
///
/// ```text
/// GET /api/notifications?page=1&limit=20
/// ```
///
/// # Errors
///
/// 500 on storage failure.
pub async fn list(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Vec<Notification>>, AppError> {
    Ok(Json(
        state
            .engine
            .notifications()
            .notifications_for(actor, params.page, params.limit)
            .await?,
    ))
}

/// Mark one of the caller's notifications read.
///
/// # Errors
///
/// 404 when the notification does not exist or belongs to someone else.
pub async fn mark_read(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(notification_id): ApiPath<NotificationId>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .engine
        .notifications()
        .mark_read(actor, notification_id)
        .await?;
    Ok(Json(SuccessResponse::OK))
}
