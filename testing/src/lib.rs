//! # Labbook Testing
//!
//! Testing utilities and in-memory collaborators for the labbook booking
//! system.
//!
//! This crate provides:
//! - In-memory implementations of the collaborator contracts
//!   ([`InMemoryResourceCatalog`], [`InMemoryBookingStore`],
//!   [`InMemoryChangeFeed`])
//! - A recording notification sink for asserting exactly-once delivery
//! - A fixed clock for deterministic timestamps
//!
//! ## Example
//!
//! ```ignore
//! use labbook_core::lifecycle::BookingLifecycle;
//! use labbook_testing::{test_clock, InMemoryBookingStore, InMemoryResourceCatalog, RecordingNotificationSink};
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn test_booking_flow() {
//!     let catalog = Arc::new(InMemoryResourceCatalog::new());
//!     let store = Arc::new(InMemoryBookingStore::new());
//!     let sink = Arc::new(RecordingNotificationSink::new());
//!     let lifecycle = BookingLifecycle::new(
//!         catalog.clone(), store.clone(), sink.clone(), Arc::new(test_clock()),
//!     );
//!
//!     let booking = lifecycle.create(proposal, requester).await.unwrap();
//!     assert_eq!(sink.count().await, 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use labbook_core::environment::Clock;

pub mod memory;

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
    /// use labbook_testing::mocks::FixedClock;
    /// use labbook_core::environment::Clock;
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

// Re-export commonly used items
pub use memory::{
    FailingNotificationSink, InMemoryBookingStore, InMemoryChangeFeed, InMemoryResourceCatalog,
    RecordingNotificationSink,
};
pub use mocks::{test_clock, FixedClock};
