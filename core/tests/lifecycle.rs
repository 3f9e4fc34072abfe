//! Integration tests for the booking lifecycle manager.
//!
//! Drives the manager end to end over the in-memory collaborators: creation
//! validation, the full transition table, terminal stability, concurrent
//! modification, and exactly-one-notification accounting.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use chrono::{TimeZone, Utc};
use labbook_core::lifecycle::{BookingLifecycle, LifecycleError, Transition};
use labbook_core::notify::NotificationKind;
use labbook_core::store::BookingStore;
use labbook_core::types::{
    Booking, BookingId, BookingProposal, BookingStatus, Capacity, Requester, RequesterId,
    RequesterRole, Resource, ResourceId, ResourceKind, ResourceStatus,
};
use labbook_core::validate::ValidationError;
use labbook_testing::{
    test_clock, FailingNotificationSink, InMemoryBookingStore, InMemoryResourceCatalog,
    RecordingNotificationSink,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

// ============================================================================
// Test Fixtures
// ============================================================================

struct Harness {
    lifecycle: BookingLifecycle,
    store: Arc<InMemoryBookingStore>,
    sink: Arc<RecordingNotificationSink>,
    resource: Resource,
}

async fn harness() -> Harness {
    harness_with_resource(ResourceStatus::Available, 10).await
}

async fn harness_with_resource(status: ResourceStatus, capacity: u32) -> Harness {
    let catalog = Arc::new(InMemoryResourceCatalog::new());
    let store = Arc::new(InMemoryBookingStore::new());
    let sink = Arc::new(RecordingNotificationSink::new());
    let resource = Resource::new(
        ResourceId::new(),
        ResourceKind::Lab,
        "Chemistry Lab B".to_string(),
        status,
        Capacity::new(capacity),
    );
    catalog.put(resource.clone()).await;
    let lifecycle = BookingLifecycle::new(
        catalog,
        store.clone(),
        sink.clone(),
        Arc::new(test_clock()),
    );
    Harness {
        lifecycle,
        store,
        sink,
        resource,
    }
}

fn requester() -> Requester {
    Requester::new(
        RequesterId::new(),
        "Priya Raman".to_string(),
        RequesterRole::Student,
    )
}

fn proposal(resource_id: ResourceId) -> BookingProposal {
    BookingProposal {
        resource_id,
        start_time: Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).single().unwrap(),
        end_time: Utc.with_ymd_and_hms(2024, 1, 10, 11, 0, 0).single().unwrap(),
        purpose: "Chemistry experiment".to_string(),
        attendees: 2,
        notes: None,
    }
}

/// Seed a booking directly in the store with the given status, bypassing the
/// manager, so transitions can be tested from any starting point.
async fn seed_booking(h: &Harness, status: BookingStatus) -> BookingId {
    let mut booking = Booking::new(
        BookingId::new(),
        proposal(h.resource.id),
        requester(),
        test_clock_now(),
    );
    booking.status = status;
    let id = booking.id;
    h.store.insert(booking).await.unwrap();
    id
}

fn test_clock_now() -> chrono::DateTime<Utc> {
    use labbook_core::environment::Clock;
    test_clock().now()
}

async fn apply(
    h: &Harness,
    transition: Transition,
    id: BookingId,
) -> Result<Booking, LifecycleError> {
    match transition {
        Transition::Approve => h.lifecycle.approve(id).await,
        Transition::Reject => h.lifecycle.reject(id).await,
        Transition::Cancel => h.lifecycle.cancel(id).await,
        Transition::Complete => h.lifecycle.complete(id).await,
    }
}

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
async fn create_persists_a_pending_booking_and_notifies_once() {
    let h = harness().await;

    let booking = h
        .lifecycle
        .create(proposal(h.resource.id), requester())
        .await
        .unwrap();

    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.created_at, test_clock_now());
    assert_eq!(booking.purpose, "Chemistry experiment");

    let stored = h.store.get(booking.id).await.unwrap().unwrap();
    assert_eq!(stored, booking);

    let notifications = h.sink.recorded().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Success);
    assert!(notifications[0].message.contains("pending approval"));
}

#[tokio::test]
async fn create_snapshots_the_requester_identity() {
    let h = harness().await;
    let who = requester();

    let booking = h
        .lifecycle
        .create(proposal(h.resource.id), who.clone())
        .await
        .unwrap();

    assert_eq!(booking.requester, who);
}

#[tokio::test]
async fn create_rejects_inverted_time_range() {
    let h = harness().await;
    let mut p = proposal(h.resource.id);
    p.start_time = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).single().unwrap();
    p.end_time = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).single().unwrap();

    let err = h.lifecycle.create(p, requester()).await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Validation(ValidationError::InvalidTimeRange)
    ));

    // Nothing persisted, nothing announced.
    assert!(h.store.is_empty().await);
    assert_eq!(h.sink.count().await, 0);
}

#[tokio::test]
async fn create_rejects_attendees_over_capacity() {
    let h = harness_with_resource(ResourceStatus::Available, 5).await;
    let mut p = proposal(h.resource.id);
    p.attendees = 6;

    let err = h.lifecycle.create(p, requester()).await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Validation(ValidationError::AttendeesOutOfRange {
            attendees: 6,
            capacity: 5,
        })
    ));
    assert!(h.store.is_empty().await);
    assert_eq!(h.sink.count().await, 0);
}

#[tokio::test]
async fn create_rejects_empty_purpose() {
    let h = harness().await;
    let mut p = proposal(h.resource.id);
    p.purpose = "   ".to_string();

    let err = h.lifecycle.create(p, requester()).await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Validation(ValidationError::EmptyPurpose)
    ));
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn create_refuses_unknown_resource() {
    let h = harness().await;
    let unknown = ResourceId::new();

    let err = h
        .lifecycle
        .create(proposal(unknown), requester())
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::ResourceNotFound(id) if id == unknown));
    assert!(h.store.is_empty().await);
    assert_eq!(h.sink.count().await, 0);
}

#[tokio::test]
async fn create_refuses_resource_under_maintenance() {
    let h = harness_with_resource(ResourceStatus::Maintenance, 10).await;

    let err = h
        .lifecycle
        .create(proposal(h.resource.id), requester())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::ResourceUnavailable {
            status: ResourceStatus::Maintenance,
            ..
        }
    ));
    assert!(h.store.is_empty().await);
    assert_eq!(h.sink.count().await, 0);
}

#[tokio::test]
async fn create_refuses_manually_booked_resource() {
    let h = harness_with_resource(ResourceStatus::Booked, 10).await;

    let err = h
        .lifecycle
        .create(proposal(h.resource.id), requester())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::ResourceUnavailable {
            status: ResourceStatus::Booked,
            ..
        }
    ));
}

// ============================================================================
// Transitions
// ============================================================================

#[tokio::test]
async fn approve_moves_pending_to_approved() {
    let h = harness().await;
    let id = seed_booking(&h, BookingStatus::Pending).await;

    let booking = h.lifecycle.approve(id).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Approved);
}

#[tokio::test]
async fn second_approve_fails_and_does_not_duplicate_notifications() {
    let h = harness().await;
    let id = seed_booking(&h, BookingStatus::Pending).await;

    h.lifecycle.approve(id).await.unwrap();
    let err = h.lifecycle.approve(id).await.unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::InvalidTransition {
            from: BookingStatus::Approved,
            attempted: Transition::Approve,
            ..
        }
    ));
    assert_eq!(
        h.store.get(id).await.unwrap().unwrap().status,
        BookingStatus::Approved
    );

    // One success for the first approve, one error for the refused second.
    let notifications = h.sink.recorded().await;
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0].kind, NotificationKind::Success);
    assert_eq!(notifications[1].kind, NotificationKind::Error);
}

#[tokio::test]
async fn cancel_approved_then_complete_is_refused() {
    let h = harness().await;
    let id = seed_booking(&h, BookingStatus::Approved).await;

    let booking = h.lifecycle.cancel(id).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Cancelled);

    let err = h.lifecycle.complete(id).await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::InvalidTransition {
            from: BookingStatus::Cancelled,
            attempted: Transition::Complete,
            ..
        }
    ));
    assert_eq!(
        h.store.get(id).await.unwrap().unwrap().status,
        BookingStatus::Cancelled
    );
}

#[tokio::test]
async fn double_reject_is_refused_and_status_unchanged() {
    let h = harness().await;
    let id = seed_booking(&h, BookingStatus::Rejected).await;

    let err = h.lifecycle.reject(id).await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::InvalidTransition {
            from: BookingStatus::Rejected,
            attempted: Transition::Reject,
            ..
        }
    ));
    assert_eq!(
        h.store.get(id).await.unwrap().unwrap().status,
        BookingStatus::Rejected
    );
}

#[tokio::test]
async fn transition_legality_matches_the_table_exactly() {
    const ALL_STATUSES: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Approved,
        BookingStatus::Rejected,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    for from in ALL_STATUSES {
        for transition in Transition::ALL {
            let h = harness().await;
            let id = seed_booking(&h, from).await;

            let result = apply(&h, transition, id).await;
            let stored = h.store.get(id).await.unwrap().unwrap().status;

            match transition.target(from) {
                Some(target) => {
                    let booking = result
                        .unwrap_or_else(|e| panic!("{transition} from {from} should succeed: {e}"));
                    assert_eq!(booking.status, target, "{transition} from {from}");
                    assert_eq!(stored, target, "{transition} from {from}");
                }
                None => {
                    let err = result.expect_err("illegal transition must fail");
                    assert!(
                        matches!(
                            err,
                            LifecycleError::InvalidTransition { from: f, attempted, .. }
                                if f == from && attempted == transition
                        ),
                        "{transition} from {from}: {err}"
                    );
                    assert_eq!(stored, from, "{transition} from {from} must not write");
                }
            }
        }
    }
}

#[tokio::test]
async fn terminal_statuses_never_move_again() {
    for terminal in [
        BookingStatus::Rejected,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ] {
        let h = harness().await;
        let id = seed_booking(&h, terminal).await;

        for transition in Transition::ALL {
            let err = apply(&h, transition, id).await.unwrap_err();
            assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
            assert_eq!(h.store.get(id).await.unwrap().unwrap().status, terminal);
        }
    }
}

#[tokio::test]
async fn transition_on_unknown_booking_is_not_found() {
    let h = harness().await;
    let unknown = BookingId::new();

    let err = h.lifecycle.approve(unknown).await.unwrap_err();
    assert!(matches!(err, LifecycleError::BookingNotFound(id) if id == unknown));
    // Not-found is the caller's message to deliver, not the manager's.
    assert_eq!(h.sink.count().await, 0);
}

// ============================================================================
// Concurrent modification
// ============================================================================

/// Store wrapper that simulates a rival administrator: every conditional
/// update is preceded by a competing approve, so the caller's expectation is
/// always stale by the time the write lands.
struct ContendedStore {
    inner: Arc<InMemoryBookingStore>,
}

impl BookingStore for ContendedStore {
    fn insert(
        &self,
        booking: Booking,
    ) -> Pin<Box<dyn Future<Output = Result<(), labbook_core::store::StoreError>> + Send + '_>>
    {
        self.inner.insert(booking)
    }

    fn get(
        &self,
        id: BookingId,
    ) -> Pin<
        Box<
            dyn Future<Output = Result<Option<Booking>, labbook_core::store::StoreError>>
                + Send
                + '_,
        >,
    > {
        self.inner.get(id)
    }

    fn update_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        new: BookingStatus,
    ) -> Pin<Box<dyn Future<Output = Result<Booking, labbook_core::store::StoreError>> + Send + '_>>
    {
        Box::pin(async move {
            // The rival wins the race first.
            let _ = self
                .inner
                .update_status(id, BookingStatus::Pending, BookingStatus::Approved)
                .await;
            self.inner.update_status(id, expected, new).await
        })
    }

    fn list_by_requester(
        &self,
        requester_id: RequesterId,
    ) -> Pin<
        Box<
            dyn Future<Output = Result<Vec<Booking>, labbook_core::store::StoreError>> + Send + '_,
        >,
    > {
        self.inner.list_by_requester(requester_id)
    }

    fn list_for_resource(
        &self,
        resource_id: ResourceId,
    ) -> Pin<
        Box<
            dyn Future<Output = Result<Vec<Booking>, labbook_core::store::StoreError>> + Send + '_,
        >,
    > {
        self.inner.list_for_resource(resource_id)
    }
}

#[tokio::test]
async fn losing_a_transition_race_surfaces_conflict() {
    let catalog = Arc::new(InMemoryResourceCatalog::new());
    let inner = Arc::new(InMemoryBookingStore::new());
    let sink = Arc::new(RecordingNotificationSink::new());
    let resource = Resource::new(
        ResourceId::new(),
        ResourceKind::Equipment,
        "Confocal Microscope 2".to_string(),
        ResourceStatus::Available,
        Capacity::new(2),
    );
    catalog.put(resource.clone()).await;

    let lifecycle = BookingLifecycle::new(
        catalog,
        Arc::new(ContendedStore {
            inner: inner.clone(),
        }),
        sink.clone(),
        Arc::new(test_clock()),
    );

    let booking = Booking::new(
        BookingId::new(),
        proposal(resource.id),
        requester(),
        test_clock_now(),
    );
    let id = booking.id;
    inner.insert(booking).await.unwrap();

    // We try to reject; the rival approves between our load and our write.
    let err = lifecycle.reject(id).await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Conflict {
            actual: BookingStatus::Approved,
            ..
        }
    ));

    // The rival's transition stands; ours wrote nothing.
    assert_eq!(
        inner.get(id).await.unwrap().unwrap().status,
        BookingStatus::Approved
    );

    // Exactly one error notification about the lost race.
    let notifications = sink.recorded().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Error);
    assert!(notifications[0].message.contains("approved"));
}

// ============================================================================
// Notification delivery failures
// ============================================================================

#[tokio::test]
async fn failed_notification_delivery_never_fails_the_operation() {
    let catalog = Arc::new(InMemoryResourceCatalog::new());
    let store = Arc::new(InMemoryBookingStore::new());
    let resource = Resource::new(
        ResourceId::new(),
        ResourceKind::Lab,
        "Chemistry Lab B".to_string(),
        ResourceStatus::Available,
        Capacity::new(10),
    );
    catalog.put(resource.clone()).await;

    let lifecycle = BookingLifecycle::new(
        catalog,
        store.clone(),
        Arc::new(FailingNotificationSink),
        Arc::new(test_clock()),
    );

    let booking = lifecycle
        .create(proposal(resource.id), requester())
        .await
        .unwrap();
    let booking = lifecycle.approve(booking.id).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Approved);
}
