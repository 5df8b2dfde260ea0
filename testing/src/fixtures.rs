//! Ready-made engine setups for tests.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Fixtures panic when setup fails

use crate::backend::InMemoryBackend;
use crate::mocks::{FixedClock, test_clock};
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use ticketing_core::environment::Clock;
use ticketing_core::retry::RetryPolicy;
use ticketing_core::{
    Actor, CoordinatorConfig, EngineConfig, Event, EventId, NewEvent, TicketingEngine, UserId,
};

/// Coordinator settings with millisecond backoff and no jitter, so retry
/// tests run fast and deterministically.
#[must_use]
pub fn fast_coordinator_config() -> CoordinatorConfig {
    CoordinatorConfig {
        retry: RetryPolicy::builder()
            .initial_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(5))
            .jitter(0.0)
            .build(),
        ..CoordinatorConfig::default()
    }
}

/// Engine over a fresh in-memory backend with a fixed clock.
pub struct TestHarness {
    /// Backend, for seeding, inspection and fault injection
    pub backend: Arc<InMemoryBackend>,
    /// Engine under test
    pub engine: TicketingEngine,
    /// Clock the engine reads
    pub clock: FixedClock,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Harness with default business rules and fast retries.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig {
            coordinator: fast_coordinator_config(),
            ..EngineConfig::default()
        })
    }

    /// Harness with explicit configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        let clock = test_clock();
        let engine = TicketingEngine::new(Arc::clone(&backend), Arc::new(clock.clone()), config);
        Self {
            backend,
            engine,
            clock,
        }
    }

    /// A fresh customer identity.
    #[must_use]
    pub fn customer() -> Actor {
        Actor::customer(UserId::new())
    }

    /// A fresh organizer identity.
    #[must_use]
    pub fn organizer() -> Actor {
        Actor::organizer(UserId::new())
    }

    /// Event creation request thirty days ahead of the harness clock.
    #[must_use]
    pub fn new_event(&self, capacity: u32) -> NewEvent {
        NewEvent {
            title: "Test Event".to_string(),
            date: self.clock.now() + ChronoDuration::days(30),
            capacity,
            price_cents: 5000,
        }
    }

    /// Create and publish an event owned by `organizer`.
    pub async fn published_event(&self, organizer: Actor, capacity: u32) -> Event {
        let events = self.engine.events();
        let draft = events
            .create_event(organizer, self.new_event(capacity))
            .await
            .unwrap();
        events.publish_event(organizer, draft.id).await.unwrap()
    }

    /// Committed available counter.
    #[must_use]
    pub fn available(&self, event_id: EventId) -> u32 {
        self.backend.available(event_id)
    }

    /// Assert `available + outstanding == capacity` for an event.
    pub fn assert_conserved(&self, event_id: EventId) {
        let event = self.backend.event_snapshot(event_id).unwrap();
        let outstanding = self.backend.outstanding(event_id);
        assert_eq!(
            event.available + outstanding,
            event.total_capacity,
            "inventory not conserved for event {event_id}: available {} + outstanding {outstanding} != capacity {}",
            event.available,
            event.total_capacity
        );
    }
}
