//! Change feed abstraction for presentation-layer cache refresh.
//!
//! Store implementations publish a [`BookingChange`] after every successful
//! write; a UI subscribes and re-reads whatever views it has cached. This is
//! purely a responsiveness concern: the lifecycle manager never depends on the
//! feed, and nothing about booking correctness does either.
//!
//! # Delivery semantics
//!
//! Best-effort. A slow subscriber may observe [`ChangeFeedError::Lagged`] when
//! it has missed changes, in which case the correct response is to re-read
//! everything it displays rather than to reason about the gap. Publishing into
//! a feed with no subscribers is not an error.

use crate::types::{BookingId, BookingStatus};
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// What happened to a booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookingChangeKind {
    /// A new booking was inserted
    Created,
    /// An existing booking's status was updated
    StatusChanged,
}

/// A single "something changed, re-read" notification.
///
/// Carries just enough for a subscriber to decide which views to refresh; the
/// record itself must be re-read from the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BookingChange {
    /// Insert or status update
    pub kind: BookingChangeKind,
    /// The booking that changed
    pub booking_id: BookingId,
    /// The booking's status after the change
    pub status: BookingStatus,
}

/// Errors that can occur on the change feed.
#[derive(Error, Debug, Clone)]
pub enum ChangeFeedError {
    /// Failed to publish a change
    #[error("publish failed: {0}")]
    PublishFailed(String),

    /// Failed to establish a subscription
    #[error("subscription failed: {0}")]
    SubscriptionFailed(String),

    /// The subscriber fell behind and missed this many changes
    #[error("subscriber lagged, {0} changes dropped")]
    Lagged(u64),
}

/// Stream of booking changes delivered to one subscriber.
pub type ChangeStream = Pin<Box<dyn Stream<Item = Result<BookingChange, ChangeFeedError>> + Send>>;

/// Publish/subscribe channel for booking changes.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; a feed is typically shared between
/// one or more stores (publishers) and UI tasks (subscribers).
///
/// # Dyn Compatibility
///
/// Uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn` so
/// stores can hold the feed as `Arc<dyn ChangeFeed>`.
pub trait ChangeFeed: Send + Sync {
    /// Publish one change to all current subscribers.
    ///
    /// # Errors
    ///
    /// - `PublishFailed`: the feed backend refused the change. Having no
    ///   subscribers is not a failure.
    fn publish(
        &self,
        change: BookingChange,
    ) -> Pin<Box<dyn Future<Output = Result<(), ChangeFeedError>> + Send + '_>>;

    /// Subscribe to changes published after this call.
    ///
    /// # Errors
    ///
    /// - `SubscriptionFailed`: the feed backend could not register the
    ///   subscriber
    fn subscribe(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<ChangeStream, ChangeFeedError>> + Send + '_>>;
}
