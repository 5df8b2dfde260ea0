//! # Ticketing Testing
//!
//! Testing utilities for the ticketing engine.
//!
//! This crate provides:
//! - [`InMemoryBackend`]: transactional in-memory storage with row locks
//! - [`FaultInjector`]: scripted storage failures and transaction counters
//! - [`FixedClock`]: deterministic time
//! - [`TestHarness`]: an engine wired to all of the above
//! - [`properties`]: proptest strategies for engine operations
//!
//! ## Example
//!
//! ```ignore
//! use ticketing_testing::TestHarness;
//!
//! #[tokio::test]
//! async fn buys_a_ticket() {
//!     let harness = TestHarness::new();
//!     let event = harness.published_event(TestHarness::organizer(), 10).await;
//!
//!     let ticket = harness
//!         .engine
//!         .purchases()
//!         .purchase(TestHarness::customer(), event.id, 2)
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(harness.available(event.id), 8);
//!     harness.assert_conserved(event.id);
//! }
//! ```

use chrono::{DateTime, Utc};
use ticketing_core::environment::Clock;

mod backend;
mod faults;
mod fixtures;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use ticketing_testing::mocks::FixedClock;
    /// use ticketing_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// One step in a randomized engine workload.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Step {
        /// Customer `buyer` tries to buy `quantity` tickets
        Purchase {
            /// Index into the test's customer pool
            buyer: usize,
            /// Requested quantity (may be invalid on purpose)
            quantity: u32,
        },
        /// Cancel the `nth` ticket issued so far (modulo the count)
        Cancel {
            /// Index into issued tickets
            nth: usize,
            /// Whether the owner (or a stranger) asks
            by_owner: bool,
        },
        /// Redeem the `nth` ticket issued so far
        Redeem {
            /// Index into issued tickets
            nth: usize,
        },
        /// Fail the next ticket insert permanently
        FailNextInsert,
    }

    /// Strategy over steps, biased toward purchases.
    pub fn step(buyers: usize) -> impl Strategy<Value = Step> {
        prop_oneof![
            4 => (0..buyers, 0u32..14).prop_map(|(buyer, quantity)| Step::Purchase { buyer, quantity }),
            2 => (any::<usize>(), any::<bool>()).prop_map(|(nth, by_owner)| Step::Cancel { nth, by_owner }),
            1 => any::<usize>().prop_map(|nth| Step::Redeem { nth }),
            1 => Just(Step::FailNextInsert),
        ]
    }

    /// Strategy over whole workloads.
    pub fn workload(buyers: usize, max_len: usize) -> impl Strategy<Value = Vec<Step>> {
        prop::collection::vec(step(buyers), 1..max_len)
    }
}

/// Install a test-friendly `tracing` subscriber. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ticketing=warn")),
        )
        .with_test_writer()
        .try_init();
}

pub use backend::InMemoryBackend;
pub use faults::FaultInjector;
pub use fixtures::{TestHarness, fast_coordinator_config};
pub use mocks::{FixedClock, test_clock};
