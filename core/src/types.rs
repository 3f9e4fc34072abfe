//! Domain types for the labbook booking system.
//!
//! This module contains the value objects and entities shared by the
//! validator, the lifecycle manager, and every collaborator implementation:
//! bookable resources, requester identity snapshots, and booking records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BookingId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a bookable resource (lab or equipment)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(Uuid);

impl ResourceId {
    /// Creates a new random `ResourceId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ResourceId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for the user who raised a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequesterId(Uuid);

impl RequesterId {
    /// Creates a new random `RequesterId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `RequesterId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequesterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Capacity
// ============================================================================

/// Maximum number of simultaneous attendees a resource can hold
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Capacity(u32);

impl Capacity {
    /// Creates a new `Capacity`
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the capacity value
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Resources
// ============================================================================

/// Kind of bookable resource
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    /// A laboratory room or facility
    Lab,
    /// A piece of equipment (microscope, centrifuge, ...)
    Equipment,
}

/// Lifecycle status of a resource.
///
/// This is a flag maintained by facility staff, not a live calendar: a
/// resource stays `Available` while it accumulates pending and approved
/// bookings. Only `Available` resources accept new bookings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    /// Open for new bookings
    Available,
    /// Manually marked as taken
    Booked,
    /// Out of service
    Maintenance,
}

impl ResourceStatus {
    /// Stable lowercase name, also used as the database representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Booked => "booked",
            Self::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bookable lab or equipment record from the resource catalog.
///
/// Read-only from the lifecycle manager's perspective; ownership of these
/// records lives with the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource identifier
    pub id: ResourceId,
    /// Lab or equipment
    pub kind: ResourceKind,
    /// Display name (e.g. "Chemistry Lab B", "Confocal Microscope 2")
    pub name: String,
    /// Current lifecycle status
    pub status: ResourceStatus,
    /// Maximum simultaneous attendees
    pub capacity: Capacity,
}

impl Resource {
    /// Creates a new `Resource`
    #[must_use]
    pub const fn new(
        id: ResourceId,
        kind: ResourceKind,
        name: String,
        status: ResourceStatus,
        capacity: Capacity,
    ) -> Self {
        Self {
            id,
            kind,
            name,
            status,
            capacity,
        }
    }

    /// Whether the resource accepts new bookings
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self.status, ResourceStatus::Available)
    }
}

// ============================================================================
// Requesters
// ============================================================================

/// Role of the requester within the institution.
///
/// Carried on bookings as part of the identity snapshot; no authorization
/// logic in this crate keys off it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequesterRole {
    /// Enrolled student
    Student,
    /// Teaching or research faculty
    Faculty,
    /// Laboratory manager
    LabManager,
    /// System administrator
    Admin,
}

/// Identity snapshot of the user who raised a booking.
///
/// Captured once at creation and never refreshed, so a later rename or role
/// change does not retroactively alter historical bookings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    /// Unique requester identifier
    pub id: RequesterId,
    /// Display name at creation time
    pub name: String,
    /// Role at creation time
    pub role: RequesterRole,
}

impl Requester {
    /// Creates a new `Requester`
    #[must_use]
    pub const fn new(id: RequesterId, name: String, role: RequesterRole) -> Self {
        Self { id, name, role }
    }
}

// ============================================================================
// Bookings
// ============================================================================

/// Booking status (lifecycle state machine).
///
/// A booking is created `Pending` and only ever mutates this field. The legal
/// transitions are owned by [`crate::lifecycle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Awaiting an approval decision
    Pending,
    /// Approved, waiting to run
    Approved,
    /// Turned down by an approver
    Rejected,
    /// Ran and finished
    Completed,
    /// Withdrawn before completion
    Cancelled,
}

impl BookingStatus {
    /// Stable lowercase name, also used as the database representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no transition may ever leave this status
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Completed | Self::Cancelled)
    }

    /// Parse the stable lowercase name back into a status.
    ///
    /// Inverse of [`as_str`](Self::as_str); returns `None` for anything else.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A proposed booking, as submitted by a requester.
///
/// Input to the validator; everything a [`Booking`] carries except the fields
/// the lifecycle manager assigns (`id`, `status`, `created_at`, requester
/// snapshot).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingProposal {
    /// Resource to book
    pub resource_id: ResourceId,
    /// Requested start instant
    pub start_time: DateTime<Utc>,
    /// Requested end instant (strictly after `start_time`)
    pub end_time: DateTime<Utc>,
    /// What the booking is for (non-empty after trimming)
    pub purpose: String,
    /// Number of attendees (between 1 and the resource capacity)
    pub attendees: u32,
    /// Free-form remarks for the approver
    pub notes: Option<String>,
}

/// A booking request against a resource.
///
/// `resource_id` is a weak reference: deleting the resource orphans the
/// booking rather than cascading, and callers must handle the absence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique booking identifier, assigned at creation
    pub id: BookingId,
    /// Resource being booked
    pub resource_id: ResourceId,
    /// Identity snapshot of whoever raised the booking
    pub requester: Requester,
    /// Start instant
    pub start_time: DateTime<Utc>,
    /// End instant
    pub end_time: DateTime<Utc>,
    /// What the booking is for
    pub purpose: String,
    /// Number of attendees
    pub attendees: u32,
    /// Free-form remarks
    pub notes: Option<String>,
    /// Current lifecycle status
    pub status: BookingStatus,
    /// When the booking was created; set once, immutable
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Creates a new `Pending` booking from an accepted proposal.
    #[must_use]
    pub fn new(
        id: BookingId,
        proposal: BookingProposal,
        requester: Requester,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            resource_id: proposal.resource_id,
            requester,
            start_time: proposal.start_time,
            end_time: proposal.end_time,
            purpose: proposal.purpose,
            attendees: proposal.attendees,
            notes: proposal.notes,
            status: BookingStatus::Pending,
            created_at,
        }
    }
}
