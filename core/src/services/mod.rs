//! Public ticketing operations.
//!
//! Each service enforces authorization and business rules, then hands its
//! writes to the [`TransactionCoordinator`](crate::coordinator::TransactionCoordinator).

mod cancellation;
mod events;
mod notifications;
mod purchase;
mod tickets;

pub use cancellation::CancellationService;
pub use events::EventService;
pub use notifications::{MAX_PAGE_SIZE, NotificationService};
pub use purchase::PurchaseService;
pub use tickets::TicketService;

use crate::error::TicketingError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default cap on tickets per purchase.
pub const DEFAULT_MAX_PER_PURCHASE: u32 = 10;

/// Who may cancel a ticket through the regular cancellation path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationPolicy {
    /// Only the ticket owner
    #[default]
    OwnerOnly,
    /// The ticket owner or the event's organizer
    OwnerOrOrganizer,
}

impl FromStr for CancellationPolicy {
    type Err = TicketingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner_only" => Ok(Self::OwnerOnly),
            "owner_or_organizer" => Ok(Self::OwnerOrOrganizer),
            other => Err(TicketingError::Validation(format!(
                "unknown cancellation policy: {other}"
            ))),
        }
    }
}

/// Business-rule settings shared by the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Most tickets one purchase may request
    pub max_per_purchase: u32,
    /// Authorization rule for `cancel`
    pub cancellation_policy: CancellationPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_per_purchase: DEFAULT_MAX_PER_PURCHASE,
            cancellation_policy: CancellationPolicy::default(),
        }
    }
}

/// Log and count a rejected operation under its error kind.
fn record_rejection(counter: &'static str, operation: &'static str, err: &TicketingError) {
    let kind = err.kind().as_str();
    metrics::counter!(counter, "operation" => operation, "kind" => kind).increment(1);
    tracing::info!(operation, kind, error = %err, "Operation rejected");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_policy_parses() {
        assert_eq!(
            "owner_only".parse::<CancellationPolicy>().unwrap(),
            CancellationPolicy::OwnerOnly
        );
        assert_eq!(
            "OWNER_OR_ORGANIZER".parse::<CancellationPolicy>().unwrap(),
            CancellationPolicy::OwnerOrOrganizer
        );
        assert!("anyone".parse::<CancellationPolicy>().is_err());
    }
}
