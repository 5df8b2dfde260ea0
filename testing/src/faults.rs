//! Fault injection for the in-memory backend.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use ticketing_core::StoreError;

/// A queue of `n` identical failures.
#[derive(Debug, Default)]
struct Armed {
    remaining: usize,
    error: Option<StoreError>,
}

impl Armed {
    fn take(&mut self) -> Option<StoreError> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.error.clone()
    }
}

/// Switches that make the in-memory backend misbehave on purpose.
///
/// Every knob is one-shot or counted so tests can script exactly which
/// attempt fails.
#[derive(Debug, Default)]
pub struct FaultInjector {
    ticket_inserts: Mutex<Armed>,
    commits: Mutex<Armed>,
    notifications: AtomicBool,
    begun: AtomicUsize,
    committed: AtomicUsize,
    rolled_back: AtomicUsize,
}

impl FaultInjector {
    /// Fail the next `count` ticket inserts with `error`.
    pub fn fail_ticket_inserts(&self, count: usize, error: StoreError) {
        *self.ticket_inserts.lock().unwrap() = Armed {
            remaining: count,
            error: Some(error),
        };
    }

    /// Fail the next `count` commits with `error`. The failed scope is
    /// rolled back.
    pub fn fail_commits(&self, count: usize, error: StoreError) {
        *self.commits.lock().unwrap() = Armed {
            remaining: count,
            error: Some(error),
        };
    }

    /// Make every notification enqueue fail while `enabled`.
    pub fn fail_notifications(&self, enabled: bool) {
        self.notifications.store(enabled, Ordering::SeqCst);
    }

    /// Transactions opened so far.
    #[must_use]
    pub fn transactions_begun(&self) -> usize {
        self.begun.load(Ordering::SeqCst)
    }

    /// Transactions committed so far.
    #[must_use]
    pub fn transactions_committed(&self) -> usize {
        self.committed.load(Ordering::SeqCst)
    }

    /// Transactions explicitly rolled back so far.
    #[must_use]
    pub fn transactions_rolled_back(&self) -> usize {
        self.rolled_back.load(Ordering::SeqCst)
    }

    pub(crate) fn on_ticket_insert(&self) -> Option<StoreError> {
        self.ticket_inserts.lock().unwrap().take()
    }

    pub(crate) fn on_commit(&self) -> Option<StoreError> {
        self.commits.lock().unwrap().take()
    }

    pub(crate) fn on_notification(&self) -> Option<StoreError> {
        self.notifications
            .load(Ordering::SeqCst)
            .then(|| StoreError::Unavailable("notification sink rejected message".to_string()))
    }

    pub(crate) fn record_begin(&self) {
        self.begun.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_commit(&self) {
        self.committed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_rollback(&self) {
        self.rolled_back.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn armed_failures_are_consumed() {
        let faults = FaultInjector::default();
        faults.fail_ticket_inserts(2, StoreError::DuplicateKey("code".into()));

        assert!(faults.on_ticket_insert().is_some());
        assert!(faults.on_ticket_insert().is_some());
        assert!(faults.on_ticket_insert().is_none());
    }

    #[test]
    fn notification_failure_toggles() {
        let faults = FaultInjector::default();
        assert!(faults.on_notification().is_none());
        faults.fail_notifications(true);
        assert!(faults.on_notification().is_some());
        faults.fail_notifications(false);
        assert!(faults.on_notification().is_none());
    }
}
