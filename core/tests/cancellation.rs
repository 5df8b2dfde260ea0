//! Cancellation service integration tests.
//!
//! Run with: `cargo test -p ticketing-core --test cancellation`

#![allow(clippy::unwrap_used)]

use ticketing_core::{
    CancellationPolicy, EngineConfig, ErrorKind, NotificationKind, ServiceConfig, TicketId,
    TicketStatus,
};
use ticketing_testing::{TestHarness, fast_coordinator_config};

/// Test 1: Owner cancels and inventory is re-credited
#[tokio::test]
async fn test_owner_cancellation_recredits_inventory() {
    let harness = TestHarness::new();
    let event = harness.published_event(TestHarness::organizer(), 10).await;
    let customer = TestHarness::customer();
    let ticket = harness
        .engine
        .purchases()
        .purchase(customer, event.id, 3)
        .await
        .unwrap();
    assert_eq!(harness.available(event.id), 7);

    let cancelled = harness
        .engine
        .cancellations()
        .cancel(customer, ticket.id)
        .await
        .unwrap();

    assert_eq!(cancelled.status, TicketStatus::Cancelled);
    assert_eq!(harness.available(event.id), 10);
    harness.assert_conserved(event.id);

    let inbox = harness
        .engine
        .notifications()
        .notifications_for(customer, 1, 10)
        .await
        .unwrap();
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0].kind, NotificationKind::Warning);
}

/// Test 2: Second cancellation is an invalid state
#[tokio::test]
async fn test_second_cancellation_is_invalid_state() {
    let harness = TestHarness::new();
    let event = harness.published_event(TestHarness::organizer(), 10).await;
    let customer = TestHarness::customer();
    let ticket = harness
        .engine
        .purchases()
        .purchase(customer, event.id, 2)
        .await
        .unwrap();
    let cancellations = harness.engine.cancellations();

    cancellations.cancel(customer, ticket.id).await.unwrap();
    let err = cancellations.cancel(customer, ticket.id).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(harness.available(event.id), 10);
}

/// Test 3: Strangers are forbidden and nothing changes
#[tokio::test]
async fn test_non_owner_is_forbidden() {
    let harness = TestHarness::new();
    let event = harness.published_event(TestHarness::organizer(), 10).await;
    let ticket = harness
        .engine
        .purchases()
        .purchase(TestHarness::customer(), event.id, 2)
        .await
        .unwrap();

    let err = harness
        .engine
        .cancellations()
        .cancel(TestHarness::customer(), ticket.id)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(harness.available(event.id), 8);
    let stored = harness.backend.tickets_of(event.id);
    assert_eq!(stored[0].status, TicketStatus::Active);
}

/// Test 4: Unknown ticket
#[tokio::test]
async fn test_unknown_ticket_is_not_found() {
    let harness = TestHarness::new();

    let err = harness
        .engine
        .cancellations()
        .cancel(TestHarness::customer(), TicketId::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

/// Test 5: Used tickets cannot be cancelled
#[tokio::test]
async fn test_used_ticket_cannot_be_cancelled() {
    let harness = TestHarness::new();
    let organizer = TestHarness::organizer();
    let event = harness.published_event(organizer, 10).await;
    let customer = TestHarness::customer();
    let ticket = harness
        .engine
        .purchases()
        .purchase(customer, event.id, 1)
        .await
        .unwrap();

    harness
        .engine
        .tickets()
        .redeem(organizer, ticket.code.as_str())
        .await
        .unwrap();

    let err = harness
        .engine
        .cancellations()
        .cancel(customer, ticket.id)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(harness.available(event.id), 9);
    harness.assert_conserved(event.id);
}

/// Test 6: Owner-only policy keeps organizers out of the regular path
#[tokio::test]
async fn test_owner_only_policy_rejects_organizer() {
    let harness = TestHarness::new();
    let organizer = TestHarness::organizer();
    let event = harness.published_event(organizer, 10).await;
    let ticket = harness
        .engine
        .purchases()
        .purchase(TestHarness::customer(), event.id, 1)
        .await
        .unwrap();

    let err = harness
        .engine
        .cancellations()
        .cancel(organizer, ticket.id)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(harness.available(event.id), 9);
}

/// Test 7: Owner-or-organizer policy admits the event's organizer only
#[tokio::test]
async fn test_owner_or_organizer_policy() {
    let harness = TestHarness::with_config(EngineConfig {
        coordinator: fast_coordinator_config(),
        services: ServiceConfig {
            cancellation_policy: CancellationPolicy::OwnerOrOrganizer,
            ..ServiceConfig::default()
        },
    });
    let organizer = TestHarness::organizer();
    let event = harness.published_event(organizer, 10).await;
    let ticket = harness
        .engine
        .purchases()
        .purchase(TestHarness::customer(), event.id, 4)
        .await
        .unwrap();

    let err = harness
        .engine
        .cancellations()
        .cancel(TestHarness::organizer(), ticket.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    harness
        .engine
        .cancellations()
        .cancel(organizer, ticket.id)
        .await
        .unwrap();
    assert_eq!(harness.available(event.id), 10);
}

/// Test 8: Organizer override alerts the owner
#[tokio::test]
async fn test_cancel_as_organizer_notifies_owner() {
    let harness = TestHarness::new();
    let organizer = TestHarness::organizer();
    let event = harness.published_event(organizer, 10).await;
    let customer = TestHarness::customer();
    let ticket = harness
        .engine
        .purchases()
        .purchase(customer, event.id, 5)
        .await
        .unwrap();

    let cancelled = harness
        .engine
        .cancellations()
        .cancel_as_organizer(organizer, event.id, ticket.id, "venue double-booked")
        .await
        .unwrap();

    assert_eq!(cancelled.status, TicketStatus::Cancelled);
    assert_eq!(harness.available(event.id), 10);
    harness.assert_conserved(event.id);

    let inbox = harness
        .engine
        .notifications()
        .notifications_for(customer, 1, 10)
        .await
        .unwrap();
    assert_eq!(inbox[0].kind, NotificationKind::Alert);
    assert!(inbox[0].message.contains("venue double-booked"));
}

/// Test 9: Organizer override is limited to the organizer's own events
#[tokio::test]
async fn test_cancel_as_organizer_requires_event_ownership() {
    let harness = TestHarness::new();
    let event = harness.published_event(TestHarness::organizer(), 10).await;
    let customer = TestHarness::customer();
    let ticket = harness
        .engine
        .purchases()
        .purchase(customer, event.id, 1)
        .await
        .unwrap();
    let cancellations = harness.engine.cancellations();

    let err = cancellations
        .cancel_as_organizer(TestHarness::organizer(), event.id, ticket.id, "")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = cancellations
        .cancel_as_organizer(customer, event.id, ticket.id, "")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let other = harness.published_event(TestHarness::organizer(), 10).await;
    let err = cancellations
        .cancel_as_organizer(TestHarness::organizer(), other.id, ticket.id, "")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(harness.available(event.id), 9);
}

/// Test 10: Cancellation after the event is called off still re-credits
#[tokio::test]
async fn test_cancellation_after_event_cancelled() {
    let harness = TestHarness::new();
    let organizer = TestHarness::organizer();
    let event = harness.published_event(organizer, 6).await;
    let customer = TestHarness::customer();
    let ticket = harness
        .engine
        .purchases()
        .purchase(customer, event.id, 2)
        .await
        .unwrap();

    harness
        .engine
        .events()
        .cancel_event(organizer, event.id)
        .await
        .unwrap();
    harness
        .engine
        .cancellations()
        .cancel(customer, ticket.id)
        .await
        .unwrap();

    assert_eq!(harness.available(event.id), 6);
    harness.assert_conserved(event.id);
}

/// Records which counters were touched, with their labels.
#[derive(Default)]
struct CounterLog(std::sync::Mutex<Vec<(String, Vec<(String, String)>)>>);

impl metrics::Recorder for CounterLog {
    fn describe_counter(&self, _: metrics::KeyName, _: Option<metrics::Unit>, _: metrics::SharedString) {}
    fn describe_gauge(&self, _: metrics::KeyName, _: Option<metrics::Unit>, _: metrics::SharedString) {}
    fn describe_histogram(&self, _: metrics::KeyName, _: Option<metrics::Unit>, _: metrics::SharedString) {}

    fn register_counter(&self, key: &metrics::Key, _: &metrics::Metadata<'_>) -> metrics::Counter {
        let labels = key
            .labels()
            .map(|label| (label.key().to_string(), label.value().to_string()))
            .collect();
        self.0.lock().unwrap().push((key.name().to_string(), labels));
        metrics::Counter::noop()
    }

    fn register_gauge(&self, _: &metrics::Key, _: &metrics::Metadata<'_>) -> metrics::Gauge {
        metrics::Gauge::noop()
    }

    fn register_histogram(&self, _: &metrics::Key, _: &metrics::Metadata<'_>) -> metrics::Histogram {
        metrics::Histogram::noop()
    }
}

/// Test 11: Override rejections are labelled apart from customer cancels
#[test]
fn test_override_rejections_have_their_own_label() {
    let log = CounterLog::default();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();

    metrics::with_local_recorder(&log, || {
        runtime.block_on(async {
            let harness = TestHarness::new();
            let event = harness.published_event(TestHarness::organizer(), 10).await;
            let customer = TestHarness::customer();
            let ticket = harness
                .engine
                .purchases()
                .purchase(customer, event.id, 1)
                .await
                .unwrap();
            let cancellations = harness.engine.cancellations();

            cancellations
                .cancel_as_organizer(TestHarness::organizer(), event.id, ticket.id, "")
                .await
                .unwrap_err();
            cancellations
                .cancel(TestHarness::customer(), ticket.id)
                .await
                .unwrap_err();
        });
    });

    let operations: Vec<String> = log
        .0
        .lock()
        .unwrap()
        .iter()
        .filter(|(name, _)| name == "ticketing.cancellations.rejected")
        .filter_map(|(_, labels)| {
            labels
                .iter()
                .find(|(key, _)| key == "operation")
                .map(|(_, value)| value.clone())
        })
        .collect();
    assert_eq!(operations, vec!["cancel_as_organizer", "cancel"]);
}
