//! Resource catalog trait.
//!
//! The catalog owns facility and equipment records; the booking core only
//! ever reads from it. A missing resource is an expected outcome (`Ok(None)`),
//! since bookings hold weak references and resources can be retired or deleted
//! underneath them.

use crate::types::{Resource, ResourceId};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during catalog lookups.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Backend connection or query error
    #[error("catalog backend error: {0}")]
    BackendError(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Read-only lookup of bookable resources.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to be safely shared as
/// `Arc<dyn ResourceCatalog>`.
///
/// # Dyn Compatibility
///
/// Uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn` so the
/// lifecycle manager can hold the catalog as a trait object.
pub trait ResourceCatalog: Send + Sync {
    /// Look up a resource by id.
    ///
    /// Returns `Ok(None)` for an unknown id.
    ///
    /// # Errors
    ///
    /// - `BackendError`: the lookup itself failed
    /// - `SerializationError`: the record could not be decoded
    fn get(
        &self,
        id: ResourceId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Resource>, CatalogError>> + Send + '_>>;
}
