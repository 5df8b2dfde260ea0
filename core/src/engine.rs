//! Wiring of services onto one backend.

use crate::coordinator::{CoordinatorConfig, TransactionCoordinator};
use crate::environment::Clock;
use crate::error::TicketingError;
use crate::services::{
    CancellationService, EventService, NotificationService, PurchaseService, ServiceConfig,
    TicketService,
};
use crate::store::{Backend, Database, EventCatalog, NotificationInbox, TicketStore};
use std::sync::Arc;

/// Everything needed to assemble a [`TicketingEngine`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    /// Transaction retry and timeout bounds
    pub coordinator: CoordinatorConfig,
    /// Business rules
    pub services: ServiceConfig,
}

/// All ticketing services sharing one backend and one coordinator.
#[derive(Clone)]
pub struct TicketingEngine {
    database: Arc<dyn Database>,
    purchases: PurchaseService,
    cancellations: CancellationService,
    events: EventService,
    tickets: TicketService,
    notifications: NotificationService,
}

impl TicketingEngine {
    /// Build the engine over `backend`.
    pub fn new<B>(backend: Arc<B>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self
    where
        B: Backend + 'static,
    {
        let database: Arc<dyn Database> = backend.clone();
        let catalog: Arc<dyn EventCatalog> = backend.clone();
        let ticket_store: Arc<dyn TicketStore> = backend.clone();
        let inbox: Arc<dyn NotificationInbox> = backend;

        let coordinator = Arc::new(TransactionCoordinator::new(
            Arc::clone(&database),
            config.coordinator,
        ));

        Self {
            purchases: PurchaseService::new(
                Arc::clone(&coordinator),
                Arc::clone(&clock),
                config.services,
            ),
            cancellations: CancellationService::new(
                Arc::clone(&coordinator),
                Arc::clone(&clock),
                config.services,
            ),
            events: EventService::new(Arc::clone(&coordinator), Arc::clone(&catalog), clock),
            tickets: TicketService::new(coordinator, ticket_store, catalog),
            notifications: NotificationService::new(inbox),
            database,
        }
    }

    /// Purchase operations.
    #[must_use]
    pub const fn purchases(&self) -> &PurchaseService {
        &self.purchases
    }

    /// Cancellation operations.
    #[must_use]
    pub const fn cancellations(&self) -> &CancellationService {
        &self.cancellations
    }

    /// Event lifecycle operations.
    #[must_use]
    pub const fn events(&self) -> &EventService {
        &self.events
    }

    /// Ticket lookups and redemption.
    #[must_use]
    pub const fn tickets(&self) -> &TicketService {
        &self.tickets
    }

    /// Notification inbox.
    #[must_use]
    pub const fn notifications(&self) -> &NotificationService {
        &self.notifications
    }

    /// Check the backend is reachable.
    ///
    /// # Errors
    ///
    /// The classified storage failure.
    pub async fn ping(&self) -> Result<(), TicketingError> {
        Ok(self.database.ping().await?)
    }
}
