//! In-memory collaborator implementations.
//!
//! Fast, deterministic stand-ins for the externally-owned pieces of the
//! booking system. They are full implementations of the collaborator
//! contracts, including the store's compare-and-swap, so the same tests
//! hold against them and against production backends. The demo binary runs
//! on them directly.

use labbook_core::change_feed::{
    BookingChange, BookingChangeKind, ChangeFeed, ChangeFeedError, ChangeStream,
};
use labbook_core::catalog::{CatalogError, ResourceCatalog};
use labbook_core::notify::{Notification, NotificationSink, NotifyError};
use labbook_core::store::{BookingStore, StoreError};
use labbook_core::types::{Booking, BookingId, BookingStatus, RequesterId, Resource, ResourceId};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::RwLock;

// ============================================================================
// Resource catalog
// ============================================================================

/// Resource catalog backed by a `HashMap`.
#[derive(Default)]
pub struct InMemoryResourceCatalog {
    resources: RwLock<HashMap<ResourceId, Resource>>,
}

impl InMemoryResourceCatalog {
    /// Creates an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a resource record
    pub async fn put(&self, resource: Resource) {
        self.resources.write().await.insert(resource.id, resource);
    }

    /// Remove a resource record, orphaning any bookings that reference it
    pub async fn remove(&self, id: ResourceId) {
        self.resources.write().await.remove(&id);
    }
}

impl ResourceCatalog for InMemoryResourceCatalog {
    fn get(
        &self,
        id: ResourceId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Resource>, CatalogError>> + Send + '_>> {
        Box::pin(async move { Ok(self.resources.read().await.get(&id).cloned()) })
    }
}

// ============================================================================
// Booking store
// ============================================================================

/// Booking store backed by a `HashMap`.
///
/// The conditional update checks and writes under one write lock, giving the
/// same atomicity the production store gets from a conditional `UPDATE`. When
/// built with [`with_change_feed`](Self::with_change_feed), a change is
/// published after every successful write.
#[derive(Default)]
pub struct InMemoryBookingStore {
    bookings: RwLock<HashMap<BookingId, Booking>>,
    feed: Option<Arc<dyn ChangeFeed>>,
}

impl InMemoryBookingStore {
    /// Creates an empty store with no change feed
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that publishes to `feed` after every write
    #[must_use]
    pub fn with_change_feed(feed: Arc<dyn ChangeFeed>) -> Self {
        Self {
            bookings: RwLock::new(HashMap::new()),
            feed: Some(feed),
        }
    }

    /// Number of bookings held
    pub async fn len(&self) -> usize {
        self.bookings.read().await.len()
    }

    /// Whether the store holds no bookings
    pub async fn is_empty(&self) -> bool {
        self.bookings.read().await.is_empty()
    }

    async fn publish(&self, change: BookingChange) {
        if let Some(feed) = &self.feed {
            // Best-effort; a full or subscriber-less feed never fails a write.
            let _ = feed.publish(change).await;
        }
    }
}

impl BookingStore for InMemoryBookingStore {
    fn insert(
        &self,
        booking: Booking,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async move {
            let change = {
                let mut bookings = self.bookings.write().await;
                if bookings.contains_key(&booking.id) {
                    return Err(StoreError::DatabaseError(format!(
                        "duplicate booking id {}",
                        booking.id
                    )));
                }
                let change = BookingChange {
                    kind: BookingChangeKind::Created,
                    booking_id: booking.id,
                    status: booking.status,
                };
                bookings.insert(booking.id, booking);
                change
            };
            self.publish(change).await;
            Ok(())
        })
    }

    fn get(
        &self,
        id: BookingId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Booking>, StoreError>> + Send + '_>> {
        Box::pin(async move { Ok(self.bookings.read().await.get(&id).cloned()) })
    }

    fn update_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        new: BookingStatus,
    ) -> Pin<Box<dyn Future<Output = Result<Booking, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let updated = {
                let mut bookings = self.bookings.write().await;
                let booking = bookings.get_mut(&id).ok_or(StoreError::NotFound(id))?;
                if booking.status != expected {
                    return Err(StoreError::Conflict {
                        booking_id: id,
                        expected,
                        actual: booking.status,
                    });
                }
                booking.status = new;
                booking.clone()
            };
            self.publish(BookingChange {
                kind: BookingChangeKind::StatusChanged,
                booking_id: id,
                status: new,
            })
            .await;
            Ok(updated)
        })
    }

    fn list_by_requester(
        &self,
        requester_id: RequesterId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Booking>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut bookings: Vec<Booking> = self
                .bookings
                .read()
                .await
                .values()
                .filter(|b| b.requester.id == requester_id)
                .cloned()
                .collect();
            bookings.sort_by_key(|b| Reverse(b.created_at));
            Ok(bookings)
        })
    }

    fn list_for_resource(
        &self,
        resource_id: ResourceId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Booking>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut bookings: Vec<Booking> = self
                .bookings
                .read()
                .await
                .values()
                .filter(|b| b.resource_id == resource_id)
                .cloned()
                .collect();
            bookings.sort_by_key(|b| Reverse(b.created_at));
            Ok(bookings)
        })
    }
}

// ============================================================================
// Notification sinks
// ============================================================================

/// Notification sink that records every delivery for later assertions.
#[derive(Default)]
pub struct RecordingNotificationSink {
    recorded: RwLock<Vec<Notification>>,
}

impl RecordingNotificationSink {
    /// Creates an empty recording sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications delivered so far, in delivery order
    pub async fn recorded(&self) -> Vec<Notification> {
        self.recorded.read().await.clone()
    }

    /// Number of notifications delivered so far
    pub async fn count(&self) -> usize {
        self.recorded.read().await.len()
    }

    /// Forget everything delivered so far
    pub async fn clear(&self) {
        self.recorded.write().await.clear();
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn notify(
        &self,
        notification: Notification,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>> {
        Box::pin(async move {
            self.recorded.write().await.push(notification);
            Ok(())
        })
    }
}

/// Notification sink that refuses every delivery.
///
/// For pinning down that a failed delivery never fails the operation that
/// triggered it.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingNotificationSink;

impl NotificationSink for FailingNotificationSink {
    fn notify(
        &self,
        _notification: Notification,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>> {
        Box::pin(async move { Err(NotifyError::DeliveryFailed("sink is down".to_string())) })
    }
}

// ============================================================================
// Change feed
// ============================================================================

/// Change feed backed by a `tokio::sync::broadcast` channel.
///
/// Every subscriber sees every change published after it subscribed. A
/// subscriber that falls more than the channel capacity behind observes
/// [`ChangeFeedError::Lagged`] and should re-read its views.
pub struct InMemoryChangeFeed {
    sender: broadcast::Sender<BookingChange>,
}

impl InMemoryChangeFeed {
    /// Default channel capacity before slow subscribers start lagging
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Creates a feed with [`Self::DEFAULT_CAPACITY`]
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a feed that buffers up to `capacity` changes per subscriber
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }
}

impl Default for InMemoryChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed for InMemoryChangeFeed {
    fn publish(
        &self,
        change: BookingChange,
    ) -> Pin<Box<dyn Future<Output = Result<(), ChangeFeedError>> + Send + '_>> {
        Box::pin(async move {
            // send only errors when there are no receivers, which the
            // contract treats as a successful no-op.
            let _ = self.sender.send(change);
            Ok(())
        })
    }

    fn subscribe(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<ChangeStream, ChangeFeedError>> + Send + '_>> {
        Box::pin(async move {
            let mut receiver = self.sender.subscribe();
            let stream = async_stream::stream! {
                loop {
                    match receiver.recv().await {
                        Ok(change) => yield Ok(change),
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            yield Err(ChangeFeedError::Lagged(missed));
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            };
            Ok(Box::pin(stream) as ChangeStream)
        })
    }
}
