//! Pre-persistence validation of booking proposals.
//!
//! [`validate`] decides, given a proposed booking and the current state of its
//! target resource, whether the booking may be created. It is a pure function:
//! no side effects, no I/O, deterministic, safe to call repeatedly.
//!
//! Resource *existence* is the caller's concern (the lifecycle manager
//! resolves the resource before calling in), and resource *availability* is
//! checked by the manager against the catalog record, not here. There is
//! deliberately no overlap detection against other bookings: a resource's
//! status reflects its own lifecycle, not its booking calendar.

use crate::types::{BookingProposal, Resource};
use thiserror::Error;

/// Why a proposed booking was refused.
///
/// Each variant identifies exactly which rule failed so the caller can present
/// a precise user-facing message. All variants are client-correctable: the
/// caller should re-prompt with corrected input rather than retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Purpose is empty or whitespace-only
    #[error("purpose must not be empty")]
    EmptyPurpose,

    /// Start instant is not strictly before the end instant
    #[error("start time must be strictly before end time")]
    InvalidTimeRange,

    /// Attendee count is zero or exceeds the resource capacity
    #[error("attendees must be between 1 and {capacity}, got {attendees}")]
    AttendeesOutOfRange {
        /// Requested attendee count
        attendees: u32,
        /// Capacity of the target resource
        capacity: u32,
    },
}

/// Validates a proposal against the business rules, first failure wins.
///
/// Checks in order: non-empty purpose (after trimming), strict
/// `start_time < end_time`, then `1 <= attendees <= resource.capacity`.
/// The capacity bound holds at creation time only; it is never re-checked if
/// the resource's capacity later changes.
///
/// # Errors
///
/// Returns the [`ValidationError`] for the first rule the proposal violates.
pub fn validate(proposal: &BookingProposal, resource: &Resource) -> Result<(), ValidationError> {
    if proposal.purpose.trim().is_empty() {
        return Err(ValidationError::EmptyPurpose);
    }

    if proposal.start_time >= proposal.end_time {
        return Err(ValidationError::InvalidTimeRange);
    }

    if !(1..=resource.capacity.value()).contains(&proposal.attendees) {
        return Err(ValidationError::AttendeesOutOfRange {
            attendees: proposal.attendees,
            capacity: resource.capacity.value(),
        });
    }

    Ok(())
}
