//! # Labbook Core
//!
//! Booking lifecycle core for the labbook laboratory resource manager.
//!
//! This crate owns the one piece of the system with real structure: the rules
//! governing creation, validation, and state transition of a booking request
//! against a bookable resource (a lab or a piece of equipment). Everything
//! around it (catalogs, persistence, notifications, identity) is reached
//! through collaborator traits so the manager stays a thin, testable
//! orchestrator.
//!
//! ## Core Concepts
//!
//! - **Types** ([`types`]): resources, requester snapshots, bookings, and
//!   their statuses
//! - **Validator** ([`validate`]): pure pre-persistence check of a proposal
//! - **Lifecycle** ([`lifecycle`]): the `Pending → Approved/Rejected →
//!   Completed/Cancelled` state machine and the manager that drives it
//! - **Collaborators** ([`catalog`], [`store`], [`notify`]): dyn-compatible
//!   traits for the externally-owned pieces
//! - **Change feed** ([`change_feed`]): optional "re-read your views" push
//!   channel for the presentation layer; never part of correctness
//!
//! ## Concurrency
//!
//! The store's status update is a compare-and-swap: the precondition check
//! and the write are atomic, so of two racing transitions on one booking
//! exactly one succeeds. The core fans out no parallel requests, holds no
//! cross-call locks, and never retries automatically.
//!
//! ## Example
//!
//! ```ignore
//! use labbook_core::environment::SystemClock;
//! use labbook_core::lifecycle::BookingLifecycle;
//! use std::sync::Arc;
//!
//! let lifecycle = BookingLifecycle::new(catalog, store, notifications, Arc::new(SystemClock));
//! let booking = lifecycle.create(proposal, requester).await?;
//! let booking = lifecycle.approve(booking.id).await?;
//! ```

pub mod catalog;
pub mod change_feed;
pub mod environment;
pub mod lifecycle;
pub mod notify;
pub mod store;
pub mod types;
pub mod validate;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

pub use catalog::{CatalogError, ResourceCatalog};
pub use change_feed::{BookingChange, BookingChangeKind, ChangeFeed, ChangeFeedError, ChangeStream};
pub use environment::{Clock, SystemClock};
pub use lifecycle::{BookingLifecycle, LifecycleError, Transition};
pub use notify::{Notification, NotificationKind, NotificationSink, NotifyError};
pub use store::{BookingStore, StoreError};
pub use types::{
    Booking, BookingId, BookingProposal, BookingStatus, Capacity, Requester, RequesterId,
    RequesterRole, Resource, ResourceId, ResourceKind, ResourceStatus,
};
pub use validate::{validate, ValidationError};
