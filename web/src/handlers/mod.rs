//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by domain.

pub mod events;
pub mod health;
pub mod notifications;
pub mod tickets;

use serde::Serialize;

/// Body for operations that return no resource.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    /// Always `true`
    pub success: bool,
}

impl SuccessResponse {
    pub(crate) const OK: Self = Self { success: true };
}
