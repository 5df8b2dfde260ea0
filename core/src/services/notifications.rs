//! Notification inbox.

use crate::error::TicketingError;
use crate::store::NotificationInbox;
use crate::types::{Actor, Notification, NotificationId};
use std::sync::Arc;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 50;

/// A user's view of their notifications.
#[derive(Clone)]
pub struct NotificationService {
    inbox: Arc<dyn NotificationInbox>,
}

impl NotificationService {
    /// Creates the service.
    #[must_use]
    pub fn new(inbox: Arc<dyn NotificationInbox>) -> Self {
        Self { inbox }
    }

    /// One page of the caller's notifications, newest first.
    ///
    /// `page` starts at 1 (0 is treated as 1). `limit` is clamped to
    /// `1..=MAX_PAGE_SIZE`.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    pub async fn notifications_for(
        &self,
        requester: Actor,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Notification>, TicketingError> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let offset = page.max(1).saturating_sub(1).saturating_mul(limit);
        Ok(self
            .inbox
            .notifications_for(requester.user_id, limit, offset)
            .await?)
    }

    /// Mark one of the caller's notifications read.
    ///
    /// # Errors
    ///
    /// [`TicketingError::NotFound`] if the notification does not exist or
    /// belongs to someone else.
    pub async fn mark_read(
        &self,
        requester: Actor,
        notification_id: NotificationId,
    ) -> Result<(), TicketingError> {
        if self.inbox.mark_read(requester.user_id, notification_id).await? {
            Ok(())
        } else {
            Err(TicketingError::not_found("notification", notification_id))
        }
    }
}
