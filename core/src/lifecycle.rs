//! Booking lifecycle: the state machine and the manager that drives it.
//!
//! A booking is created `Pending` and moves through the lifecycle below. The
//! legal moves are owned by [`Transition::target`], a pure function the
//! manager consults before every write:
//!
//! ```text
//!         create
//!  (none) ------> Pending
//!  Pending  --approve--> Approved
//!  Pending  --reject--> Rejected
//!  Approved --complete--> Completed
//!  Pending|Approved --cancel--> Cancelled
//! ```
//!
//! `Rejected`, `Completed`, and `Cancelled` are terminal: every transition
//! attempted from them fails with [`LifecycleError::InvalidTransition`] rather
//! than being silently ignored.
//!
//! The manager persists each transition through the store's conditional
//! update, with the status it loaded as the expected value. Check and write
//! are therefore atomic at the store: of two racing transitions on one
//! booking, exactly one succeeds and the other surfaces
//! [`LifecycleError::Conflict`]. Nothing is retried automatically.

use crate::catalog::{CatalogError, ResourceCatalog};
use crate::environment::Clock;
use crate::notify::{Notification, NotificationSink};
use crate::store::{BookingStore, StoreError};
use crate::types::{
    Booking, BookingId, BookingProposal, BookingStatus, Requester, ResourceId, ResourceStatus,
};
use crate::validate::{validate, ValidationError};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

// ============================================================================
// Transitions
// ============================================================================

/// A requested move through the booking state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transition {
    /// `Pending` → `Approved`
    Approve,
    /// `Pending` → `Rejected`
    Reject,
    /// `Pending` or `Approved` → `Cancelled`
    Cancel,
    /// `Approved` → `Completed`
    Complete,
}

impl Transition {
    /// All transitions, for exhaustive table checks.
    pub const ALL: [Self; 4] = [Self::Approve, Self::Reject, Self::Cancel, Self::Complete];

    /// The status this transition leads to from `from`, or `None` if the move
    /// is illegal.
    ///
    /// This is the entire transition table; the manager performs no status
    /// change this function does not sanction.
    #[must_use]
    pub const fn target(self, from: BookingStatus) -> Option<BookingStatus> {
        match (self, from) {
            (Self::Approve, BookingStatus::Pending) => Some(BookingStatus::Approved),
            (Self::Reject, BookingStatus::Pending) => Some(BookingStatus::Rejected),
            (Self::Cancel, BookingStatus::Pending | BookingStatus::Approved) => {
                Some(BookingStatus::Cancelled)
            }
            (Self::Complete, BookingStatus::Approved) => Some(BookingStatus::Completed),
            _ => None,
        }
    }

    /// Verb form for logs and user-facing messages
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
            Self::Complete => "complete",
        }
    }

    /// Success message for the notification fired after this transition
    /// persists.
    const fn success_message(self) -> &'static str {
        match self {
            Self::Approve => "Booking approved",
            Self::Reject => "Booking rejected",
            Self::Cancel => "Booking cancelled",
            Self::Complete => "Booking marked as completed",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors surfaced by the lifecycle manager.
///
/// Everything is returned as a value to the immediate caller; nothing is
/// swallowed and nothing is retried automatically.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// The proposal violated a business rule (client-correctable)
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The proposal's target resource does not exist in the catalog
    #[error("resource not found: {0}")]
    ResourceNotFound(ResourceId),

    /// The target resource is not open for new bookings
    #[error("resource {resource_id} is not available for booking (status: {status})")]
    ResourceUnavailable {
        /// The resource that refused the booking
        resource_id: ResourceId,
        /// Its current lifecycle status
        status: ResourceStatus,
    },

    /// No booking with this id
    #[error("booking not found: {0}")]
    BookingNotFound(BookingId),

    /// The requested transition is not legal from the booking's current
    /// status. Retrying the same request will fail identically.
    #[error("cannot {attempted} booking {booking_id}: status is {from}")]
    InvalidTransition {
        /// The booking the transition was attempted on
        booking_id: BookingId,
        /// Its status at the time of the attempt
        from: BookingStatus,
        /// The transition that was attempted
        attempted: Transition,
    },

    /// The booking was transitioned concurrently between the precondition
    /// check and the write. Re-read and re-decide; do not blindly retry.
    #[error("booking {booking_id} changed concurrently, status is now {actual}")]
    Conflict {
        /// The booking that changed underneath the caller
        booking_id: BookingId,
        /// The status found in the store
        actual: BookingStatus,
    },

    /// Resource catalog failure
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Booking store failure
    #[error("store error: {0}")]
    Store(StoreError),
}

// ============================================================================
// Manager
// ============================================================================

/// Orchestrates booking creation and state transitions.
///
/// Owns no state of its own; every operation is a single round trip through
/// the injected collaborators. Identity is an explicit parameter of
/// [`create`](Self::create) rather than ambient session state, so the manager
/// is testable without mocking a global provider.
pub struct BookingLifecycle {
    catalog: Arc<dyn ResourceCatalog>,
    store: Arc<dyn BookingStore>,
    notifications: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl BookingLifecycle {
    /// Creates a new `BookingLifecycle` over the given collaborators.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn ResourceCatalog>,
        store: Arc<dyn BookingStore>,
        notifications: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            store,
            notifications,
            clock,
        }
    }

    /// Create a booking from a proposal.
    ///
    /// Resolves the resource, refuses one that is not `Available`, runs the
    /// validator, then persists a fresh `Pending` booking and fires a
    /// "submitted, pending approval" notification. On any failure nothing is
    /// persisted and no notification is sent; re-prompting the user is the
    /// caller's job for creation failures.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::ResourceNotFound`]: unknown resource id
    /// - [`LifecycleError::ResourceUnavailable`]: resource is `Booked` or
    ///   `Maintenance`
    /// - [`LifecycleError::Validation`]: the proposal violated a rule
    /// - [`LifecycleError::Catalog`] / [`LifecycleError::Store`]:
    ///   collaborator failure
    #[tracing::instrument(skip(self, proposal, requester), fields(resource_id = %proposal.resource_id, requester_id = %requester.id))]
    pub async fn create(
        &self,
        proposal: BookingProposal,
        requester: Requester,
    ) -> Result<Booking, LifecycleError> {
        let resource = self
            .catalog
            .get(proposal.resource_id)
            .await?
            .ok_or(LifecycleError::ResourceNotFound(proposal.resource_id))?;

        if !resource.is_available() {
            warn!(status = %resource.status, "resource refused new booking");
            return Err(LifecycleError::ResourceUnavailable {
                resource_id: resource.id,
                status: resource.status,
            });
        }

        validate(&proposal, &resource)?;

        let booking = Booking::new(BookingId::new(), proposal, requester, self.clock.now());
        self.store.insert(booking.clone()).await.map_err(|e| {
            error!(error = %e, "booking insert failed");
            LifecycleError::Store(e)
        })?;

        info!(booking_id = %booking.id, "booking created, pending approval");
        self.send(Notification::success(format!(
            "Booking request for {} submitted, pending approval",
            resource.name
        )))
        .await;

        Ok(booking)
    }

    /// Approve a `Pending` booking.
    ///
    /// Does not re-validate time range or attendee count; the validation
    /// done at creation is trusted.
    ///
    /// # Errors
    ///
    /// See [`LifecycleError`]; notably `InvalidTransition` when the booking is
    /// not `Pending`.
    #[tracing::instrument(skip(self))]
    pub async fn approve(&self, id: BookingId) -> Result<Booking, LifecycleError> {
        self.transition(id, Transition::Approve).await
    }

    /// Reject a `Pending` booking.
    ///
    /// # Errors
    ///
    /// See [`LifecycleError`]; notably `InvalidTransition` when the booking is
    /// not `Pending`.
    #[tracing::instrument(skip(self))]
    pub async fn reject(&self, id: BookingId) -> Result<Booking, LifecycleError> {
        self.transition(id, Transition::Reject).await
    }

    /// Cancel a `Pending` or `Approved` booking.
    ///
    /// # Errors
    ///
    /// See [`LifecycleError`]; notably `InvalidTransition` from a terminal
    /// status.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, id: BookingId) -> Result<Booking, LifecycleError> {
        self.transition(id, Transition::Cancel).await
    }

    /// Mark an `Approved` booking as completed.
    ///
    /// An explicit administrative action; nothing completes bookings on time
    /// elapse.
    ///
    /// # Errors
    ///
    /// See [`LifecycleError`]; notably `InvalidTransition` when the booking is
    /// not `Approved`.
    #[tracing::instrument(skip(self))]
    pub async fn complete(&self, id: BookingId) -> Result<Booking, LifecycleError> {
        self.transition(id, Transition::Complete).await
    }

    /// Shared transition path: load, consult the table, conditionally write.
    ///
    /// Exactly one notification fires per call: the success message after a
    /// persisted transition, or an error message for an illegal transition or
    /// a concurrent-modification conflict. Store failures propagate without a
    /// user-facing notification; the presentation layer owns messaging for
    /// infrastructure errors.
    async fn transition(
        &self,
        id: BookingId,
        transition: Transition,
    ) -> Result<Booking, LifecycleError> {
        let booking = self
            .store
            .get(id)
            .await
            .map_err(LifecycleError::Store)?
            .ok_or(LifecycleError::BookingNotFound(id))?;

        let Some(target) = transition.target(booking.status) else {
            warn!(from = %booking.status, %transition, "illegal transition refused");
            self.send(Notification::error(format!(
                "Cannot {transition} this booking: it is already {}",
                booking.status
            )))
            .await;
            return Err(LifecycleError::InvalidTransition {
                booking_id: id,
                from: booking.status,
                attempted: transition,
            });
        };

        match self.store.update_status(id, booking.status, target).await {
            Ok(updated) => {
                info!(from = %booking.status, to = %target, "booking transitioned");
                self.send(Notification::success(
                    transition.success_message().to_string(),
                ))
                .await;
                Ok(updated)
            }
            Err(StoreError::Conflict { actual, .. }) => {
                warn!(expected = %booking.status, %actual, "conditional update lost the race");
                self.send(Notification::error(format!(
                    "Booking changed while you were deciding: it is now {actual}"
                )))
                .await;
                Err(LifecycleError::Conflict {
                    booking_id: id,
                    actual,
                })
            }
            Err(StoreError::NotFound(_)) => Err(LifecycleError::BookingNotFound(id)),
            Err(other) => {
                error!(error = %other, "status update failed");
                Err(LifecycleError::Store(other))
            }
        }
    }

    /// Fire-and-forget delivery; a failed notification never fails the
    /// operation that triggered it.
    async fn send(&self, notification: Notification) {
        if let Err(err) = self.notifications.notify(notification).await {
            warn!(error = %err, "notification delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Approved,
        BookingStatus::Rejected,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    #[test]
    fn transition_table_matches_the_diagram() {
        for from in ALL_STATUSES {
            for transition in Transition::ALL {
                let expected = match (transition, from) {
                    (Transition::Approve, BookingStatus::Pending) => {
                        Some(BookingStatus::Approved)
                    }
                    (Transition::Reject, BookingStatus::Pending) => Some(BookingStatus::Rejected),
                    (Transition::Cancel, BookingStatus::Pending | BookingStatus::Approved) => {
                        Some(BookingStatus::Cancelled)
                    }
                    (Transition::Complete, BookingStatus::Approved) => {
                        Some(BookingStatus::Completed)
                    }
                    _ => None,
                };
                assert_eq!(
                    transition.target(from),
                    expected,
                    "{transition} from {from}"
                );
            }
        }
    }

    #[test]
    fn no_transition_leaves_a_terminal_status() {
        for from in ALL_STATUSES.into_iter().filter(BookingStatus::is_terminal) {
            for transition in Transition::ALL {
                assert_eq!(transition.target(from), None, "{transition} from {from}");
            }
        }
    }

    #[test]
    fn every_non_terminal_status_has_a_way_out() {
        for from in ALL_STATUSES.into_iter().filter(|s| !s.is_terminal()) {
            assert!(
                Transition::ALL.iter().any(|t| t.target(from).is_some()),
                "{from} is stuck"
            );
        }
    }

    #[test]
    fn transition_verbs() {
        assert_eq!(Transition::Approve.to_string(), "approve");
        assert_eq!(Transition::Reject.to_string(), "reject");
        assert_eq!(Transition::Cancel.to_string(), "cancel");
        assert_eq!(Transition::Complete.to_string(), "complete");
    }
}
