//! Injected dependencies for the lifecycle manager.
//!
//! External effects the manager needs but should not hard-wire are abstracted
//! behind traits and passed in at construction, so tests can pin them.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability.
///
/// Production code uses [`SystemClock`]; tests use a fixed clock (see the
/// `labbook-testing` crate) so `created_at` values are deterministic.
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
