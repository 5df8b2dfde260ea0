//! Application state for Axum handlers.

use std::sync::Arc;
use ticketing_core::TicketingEngine;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// The engine every handler dispatches to
    pub engine: Arc<TicketingEngine>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(engine: Arc<TicketingEngine>) -> Self {
        Self { engine }
    }
}
