//! Notification sink trait.
//!
//! User-facing confirmation and error messages. Delivery is fire-and-forget:
//! the lifecycle manager logs a failed delivery and moves on, because a
//! notification that didn't arrive must not turn an already-persisted
//! transition into an error.

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Whether a notification reports success or an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    /// Confirmation of a completed operation
    Success,
    /// A user-visible failure
    Error,
}

/// A user-facing message about a booking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Success or error
    pub kind: NotificationKind,
    /// Human-readable message text
    pub message: String,
}

impl Notification {
    /// Creates a success notification
    #[must_use]
    pub const fn success(message: String) -> Self {
        Self {
            kind: NotificationKind::Success,
            message,
        }
    }

    /// Creates an error notification
    #[must_use]
    pub const fn error(message: String) -> Self {
        Self {
            kind: NotificationKind::Error,
            message,
        }
    }
}

/// Errors a sink implementation may report.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The message could not be delivered
    #[error("notification delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Delivers user-facing messages.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to be safely shared as
/// `Arc<dyn NotificationSink>`.
///
/// # Dyn Compatibility
///
/// Uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn` so the
/// lifecycle manager can hold the sink as a trait object.
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// - `DeliveryFailed`: the sink could not deliver the message. Callers in
    ///   this crate log the failure and do not propagate it.
    fn notify(
        &self,
        notification: Notification,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>>;
}
