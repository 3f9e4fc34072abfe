//! Booking store trait and related types.
//!
//! This module defines the persistence abstraction for booking records: a
//! durable map from [`BookingId`] to [`Booking`] with one conditional write.
//!
//! # Design
//!
//! The `BookingStore` trait is deliberately minimal. It provides exactly what
//! the lifecycle manager needs:
//!
//! - Insert a freshly created booking
//! - Load a booking for a transition precondition check
//! - Update the status field, conditionally on its current value
//!
//! The conditional update is the store's one concurrency guarantee: the
//! precondition check and the status write happen atomically, so of two racing
//! transitions on the same booking exactly one can succeed. The loser receives
//! [`StoreError::Conflict`] and must re-read rather than retry blindly.
//!
//! The two list queries are the read side a dashboard or admin screen
//! consumes; the lifecycle manager itself never calls them.
//!
//! # Implementations
//!
//! - `PostgresBookingStore` (in `labbook-postgres`): production implementation
//! - `InMemoryBookingStore` (in `labbook-testing`): fast, deterministic testing

use crate::types::{Booking, BookingId, BookingStatus, RequesterId, ResourceId};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during booking store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Conditional update failed: the booking's current status doesn't match
    /// the expected status.
    ///
    /// This typically means another caller transitioned the booking
    /// concurrently. The right response is to reload and re-decide, not to
    /// retry the same write.
    #[error("status conflict on booking {booking_id}: expected {expected}, found {actual}")]
    Conflict {
        /// The booking where the conflict occurred
        booking_id: BookingId,
        /// The status the caller expected the booking to be in
        expected: BookingStatus,
        /// The status actually found in the store
        actual: BookingStatus,
    },

    /// Booking not found in the store
    #[error("booking not found: {0}")]
    NotFound(BookingId),

    /// Database connection or query error
    #[error("database error: {0}")]
    DatabaseError(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Persistence abstraction for booking records.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to be safely shared across async
/// tasks as `Arc<dyn BookingStore>`.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of
/// `async fn` to enable trait object usage (`Arc<dyn BookingStore>`), which is
/// how the lifecycle manager holds its collaborators.
pub trait BookingStore: Send + Sync {
    /// Insert a freshly created booking.
    ///
    /// Ids are assigned by the caller and must be fresh; inserting an id that
    /// already exists is a caller bug and surfaces as
    /// [`StoreError::DatabaseError`].
    ///
    /// # Errors
    ///
    /// - `DatabaseError`: write failed (including duplicate id)
    /// - `SerializationError`: the booking could not be encoded
    fn insert(
        &self,
        booking: Booking,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>>;

    /// Load a booking by id.
    ///
    /// Returns `Ok(None)` for an unknown id; absence is an expected outcome,
    /// not a store failure.
    ///
    /// # Errors
    ///
    /// - `DatabaseError`: read failed
    /// - `SerializationError`: the stored record could not be decoded
    fn get(
        &self,
        id: BookingId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Booking>, StoreError>> + Send + '_>>;

    /// Update a booking's status, conditionally on its current value.
    ///
    /// The compare-and-swap: the write succeeds only if the stored status
    /// equals `expected` at the moment of the write. Check and write are
    /// atomic. Returns the booking as persisted after the update.
    ///
    /// # Errors
    ///
    /// - `Conflict`: the stored status no longer matches `expected`
    /// - `NotFound`: no booking with this id
    /// - `DatabaseError`: write failed
    fn update_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        new: BookingStatus,
    ) -> Pin<Box<dyn Future<Output = Result<Booking, StoreError>> + Send + '_>>;

    /// List bookings raised by a requester, newest first.
    ///
    /// # Errors
    ///
    /// - `DatabaseError`: read failed
    /// - `SerializationError`: a stored record could not be decoded
    fn list_by_requester(
        &self,
        requester_id: RequesterId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Booking>, StoreError>> + Send + '_>>;

    /// List bookings against a resource, newest first.
    ///
    /// Orphaned bookings (whose resource has since been deleted from the
    /// catalog) are still returned; resolving the dangling reference is the
    /// caller's concern.
    ///
    /// # Errors
    ///
    /// - `DatabaseError`: read failed
    /// - `SerializationError`: a stored record could not be decoded
    fn list_for_resource(
        &self,
        resource_id: ResourceId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Booking>, StoreError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_error_display() {
        let id = BookingId::new();
        let error = StoreError::Conflict {
            booking_id: id,
            expected: BookingStatus::Pending,
            actual: BookingStatus::Approved,
        };

        let display = format!("{error}");
        assert!(display.contains("expected pending"));
        assert!(display.contains("found approved"));
    }

    #[test]
    fn not_found_error_display() {
        let id = BookingId::new();
        let display = format!("{}", StoreError::NotFound(id));
        assert!(display.contains(&id.to_string()));
    }
}
