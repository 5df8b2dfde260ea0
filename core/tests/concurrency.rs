//! Concurrency tests: no overselling under racing purchases.
//!
//! Run with: `cargo test -p ticketing-core --test concurrency`

#![allow(clippy::unwrap_used)]

use futures::future::join_all;
use std::sync::Arc;
use ticketing_core::{ErrorKind, TicketingError};
use ticketing_testing::TestHarness;

/// Test 1: Last seat race
///
/// Capacity 1, two buyers at once: exactly one ticket, one
/// `InsufficientInventory`, nothing left.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_seat_goes_to_exactly_one_buyer() {
    let harness = Arc::new(TestHarness::new());
    let event = harness.published_event(TestHarness::organizer(), 1).await;

    let attempts = (0..2).map(|_| {
        let harness = Arc::clone(&harness);
        tokio::spawn(async move {
            harness
                .engine
                .purchases()
                .purchase(TestHarness::customer(), event.id, 1)
                .await
        })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    let sold = results.iter().filter(|r| r.is_ok()).count();
    let rejected: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
    assert_eq!(sold, 1);
    assert_eq!(rejected.len(), 1);
    assert!(matches!(
        rejected[0],
        TicketingError::InsufficientInventory { available: 0, .. }
    ));
    assert_eq!(harness.available(event.id), 0);
    assert_eq!(harness.backend.tickets_of(event.id).len(), 1);
    harness.assert_conserved(event.id);
}

/// Test 2: N buyers of q against A
///
/// At most `floor(A / q)` succeed and the counter never goes negative.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_purchases_never_oversell() {
    const CAPACITY: u32 = 25;
    const QUANTITY: u32 = 3;
    const BUYERS: usize = 40;

    let harness = Arc::new(TestHarness::new());
    let event = harness
        .published_event(TestHarness::organizer(), CAPACITY)
        .await;

    let attempts = (0..BUYERS).map(|_| {
        let harness = Arc::clone(&harness);
        tokio::spawn(async move {
            harness
                .engine
                .purchases()
                .purchase(TestHarness::customer(), event.id, QUANTITY)
                .await
        })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    let sold = results.iter().filter(|r| r.is_ok()).count();
    let max_sales = (CAPACITY / QUANTITY) as usize;
    assert_eq!(sold, max_sales);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.kind() == ErrorKind::InsufficientInventory)
    );
    assert_eq!(harness.available(event.id), CAPACITY % QUANTITY);
    harness.assert_conserved(event.id);
}

/// Test 3: Purchases and cancellations interleaved
///
/// Cancellations lock ticket then event; purchases lock only the event.
/// Mixing them must neither deadlock nor lose an update.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_mixed_purchases_and_cancellations_conserve_inventory() {
    let harness = Arc::new(TestHarness::new());
    let event = harness.published_event(TestHarness::organizer(), 30).await;

    let mut holders = Vec::new();
    for _ in 0..10 {
        let customer = TestHarness::customer();
        let ticket = harness
            .engine
            .purchases()
            .purchase(customer, event.id, 2)
            .await
            .unwrap();
        holders.push((customer, ticket.id));
    }
    assert_eq!(harness.available(event.id), 10);

    let cancels = holders.into_iter().map(|(customer, ticket_id)| {
        let harness = Arc::clone(&harness);
        tokio::spawn(async move {
            harness
                .engine
                .cancellations()
                .cancel(customer, ticket_id)
                .await
                .map(|_| ())
        })
    });
    let buys = (0..10).map(|_| {
        let harness = Arc::clone(&harness);
        tokio::spawn(async move {
            harness
                .engine
                .purchases()
                .purchase(TestHarness::customer(), event.id, 2)
                .await
                .map(|_| ())
        })
    });

    let results = join_all(cancels.chain(buys)).await;
    let cancelled_ok = results[..10].iter().all(|r| matches!(r, Ok(Ok(()))));
    assert!(cancelled_ok, "every owner cancellation should succeed");

    harness.assert_conserved(event.id);
}
