//! Purchase service integration tests.
//!
//! Run with: `cargo test -p ticketing-core --test purchase_flow`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use chrono::Duration;
use ticketing_core::environment::Clock;
use ticketing_core::{
    ErrorKind, EventStatus, NewEvent, NotificationKind, TicketCode, TicketStatus, TicketingError,
};
use ticketing_testing::TestHarness;

/// Test 1: Happy path
///
/// A customer buys tickets; inventory drops, one ticket row carries the whole
/// quantity, and the buyer is notified.
#[tokio::test]
async fn test_purchase_issues_ticket_and_decrements_inventory() {
    let harness = TestHarness::new();
    let event = harness.published_event(TestHarness::organizer(), 10).await;
    let customer = TestHarness::customer();

    let ticket = harness
        .engine
        .purchases()
        .purchase(customer, event.id, 3)
        .await
        .unwrap();

    assert_eq!(ticket.quantity, 3);
    assert_eq!(ticket.owner_id, customer.user_id);
    assert_eq!(ticket.status, TicketStatus::Active);
    assert!(TicketCode::parse(ticket.code.as_str()).is_ok());
    assert_eq!(harness.available(event.id), 7);
    harness.assert_conserved(event.id);

    let inbox = harness
        .engine
        .notifications()
        .notifications_for(customer, 1, 10)
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationKind::Info);
    assert_eq!(inbox[0].event_id, Some(event.id));
    assert!(inbox[0].message.contains(ticket.code.as_str()));
}

/// Test 2: Buying the exact remainder leaves zero
#[tokio::test]
async fn test_purchase_of_exact_remainder() {
    let harness = TestHarness::new();
    let event = harness.published_event(TestHarness::organizer(), 4).await;

    harness
        .engine
        .purchases()
        .purchase(TestHarness::customer(), event.id, 4)
        .await
        .unwrap();

    assert_eq!(harness.available(event.id), 0);
    harness.assert_conserved(event.id);
}

/// Test 3: Over-asking is rejected without side effects
#[tokio::test]
async fn test_insufficient_inventory_changes_nothing() {
    let harness = TestHarness::new();
    let event = harness.published_event(TestHarness::organizer(), 3).await;

    let err = harness
        .engine
        .purchases()
        .purchase(TestHarness::customer(), event.id, 5)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        TicketingError::InsufficientInventory {
            event_id: event.id,
            requested: 5,
            available: 3,
        }
    );
    assert_eq!(harness.available(event.id), 3);
    assert!(harness.backend.tickets_of(event.id).is_empty());
    assert!(harness.backend.all_notifications().is_empty());
}

/// Test 4: Quantity bounds
#[tokio::test]
async fn test_quantity_must_be_between_one_and_max() {
    let harness = TestHarness::new();
    let event = harness.published_event(TestHarness::organizer(), 100).await;
    let purchases = harness.engine.purchases();

    for quantity in [0, 11] {
        let err = purchases
            .purchase(TestHarness::customer(), event.id, quantity)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "quantity {quantity}");
    }

    purchases
        .purchase(TestHarness::customer(), event.id, 10)
        .await
        .unwrap();
    assert_eq!(harness.available(event.id), 90);
    // Validation failures never open a transaction.
    assert_eq!(harness.backend.faults().transactions_rolled_back(), 0);
}

/// Test 5: Organizers cannot buy
#[tokio::test]
async fn test_organizer_cannot_purchase() {
    let harness = TestHarness::new();
    let organizer = TestHarness::organizer();
    let event = harness.published_event(organizer, 10).await;

    let err = harness
        .engine
        .purchases()
        .purchase(organizer, event.id, 1)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(harness.available(event.id), 10);
}

/// Test 6: Unknown event
#[tokio::test]
async fn test_purchase_for_unknown_event() {
    let harness = TestHarness::new();

    let err = harness
        .engine
        .purchases()
        .purchase(TestHarness::customer(), ticketing_core::EventId::new(), 1)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

/// Test 7: Only published events are on sale
#[tokio::test]
async fn test_draft_and_cancelled_events_are_not_on_sale() {
    let harness = TestHarness::new();
    let organizer = TestHarness::organizer();
    let events = harness.engine.events();

    let draft = events
        .create_event(organizer, harness.new_event(10))
        .await
        .unwrap();
    assert_eq!(draft.status, EventStatus::Draft);

    let err = harness
        .engine
        .purchases()
        .purchase(TestHarness::customer(), draft.id, 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let published = harness.published_event(organizer, 10).await;
    events.cancel_event(organizer, published.id).await.unwrap();
    let err = harness
        .engine
        .purchases()
        .purchase(TestHarness::customer(), published.id, 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(harness.available(published.id), 10);
}

/// Test 8: Past events are not on sale
#[tokio::test]
async fn test_past_event_is_not_on_sale() {
    let harness = TestHarness::new();
    let organizer = TestHarness::organizer();
    let mut event = NewEvent {
        title: "Yesterday".to_string(),
        date: harness.clock.now() + Duration::days(1),
        capacity: 5,
        price_cents: 0,
    }
    .into_event(organizer.user_id, harness.clock.now());
    event.status = EventStatus::Published;
    event.date = harness.clock.now() - Duration::hours(1);
    harness.backend.seed_event(event.clone());

    let err = harness
        .engine
        .purchases()
        .purchase(TestHarness::customer(), event.id, 1)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(harness.available(event.id), 5);
}

/// Test 9: Repeated requests buy again
#[tokio::test]
async fn test_repeated_purchase_is_not_deduplicated() {
    let harness = TestHarness::new();
    let event = harness.published_event(TestHarness::organizer(), 10).await;
    let customer = TestHarness::customer();
    let purchases = harness.engine.purchases();

    let first = purchases.purchase(customer, event.id, 2).await.unwrap();
    let second = purchases.purchase(customer, event.id, 2).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_ne!(first.code, second.code);
    assert_eq!(harness.available(event.id), 6);

    let mine = harness.engine.tickets().tickets_for(customer).await.unwrap();
    assert_eq!(mine.len(), 2);
}
