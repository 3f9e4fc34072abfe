//! `PostgreSQL` booking store for labbook.
//!
//! Production implementation of the `BookingStore` contract from
//! `labbook-core`. Each booking is stored as a JSONB document beside a few
//! indexed columns, and the status compare-and-swap is a single conditional
//! `UPDATE`, so the precondition check and the write are atomic at the
//! database.
//!
//! When built with a change feed, a [`BookingChange`] is published after
//! every successful write; publication is best-effort and never fails the
//! write that triggered it.
//!
//! # Example
//!
//! ```ignore
//! use labbook_postgres::{PostgresBookingStore, StoreConfig};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresBookingStore::connect(&StoreConfig::from_env()).await?;
//!     store.run_migrations().await?;
//!     Ok(())
//! }
//! ```

mod config;

pub use config::StoreConfig;

use labbook_core::change_feed::{BookingChange, BookingChangeKind, ChangeFeed};
use labbook_core::store::{BookingStore, StoreError};
use labbook_core::types::{Booking, BookingId, BookingStatus, RequesterId, ResourceId};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS bookings (
    id UUID PRIMARY KEY,
    resource_id UUID NOT NULL,
    requester_id UUID NOT NULL,
    status TEXT NOT NULL,
    data JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS bookings_requester_idx
    ON bookings (requester_id, created_at DESC);

CREATE INDEX IF NOT EXISTS bookings_resource_idx
    ON bookings (resource_id, created_at DESC);
";

/// `PostgreSQL`-backed booking store.
#[derive(Clone)]
pub struct PostgresBookingStore {
    pool: PgPool,
    feed: Option<Arc<dyn ChangeFeed>>,
}

impl PostgresBookingStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool, feed: None }
    }

    /// Connects a new pool from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DatabaseError`] if the pool cannot be
    /// established.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("failed to connect: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Publish booking changes to `feed` after every successful write.
    #[must_use]
    pub fn with_change_feed(mut self, feed: Arc<dyn ChangeFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Create the bookings table and its indexes if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DatabaseError`] if the DDL fails.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("failed to run migrations: {e}")))?;
        Ok(())
    }

    async fn publish(&self, change: BookingChange) {
        if let Some(feed) = &self.feed {
            if let Err(err) = feed.publish(change).await {
                tracing::debug!(error = %err, "change feed publish failed");
            }
        }
    }

    fn decode(json: sqlx::types::JsonValue) -> Result<Booking, StoreError> {
        serde_json::from_value(json)
            .map_err(|e| StoreError::SerializationError(format!("failed to decode booking: {e}")))
    }

    fn decode_all(rows: Vec<(sqlx::types::JsonValue,)>) -> Result<Vec<Booking>, StoreError> {
        rows.into_iter().map(|(json,)| Self::decode(json)).collect()
    }
}

impl BookingStore for PostgresBookingStore {
    fn insert(
        &self,
        booking: Booking,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async move {
            let json = serde_json::to_value(&booking).map_err(|e| {
                StoreError::SerializationError(format!("failed to encode booking: {e}"))
            })?;

            sqlx::query(
                "INSERT INTO bookings (id, resource_id, requester_id, status, data, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(booking.id.as_uuid())
            .bind(booking.resource_id.as_uuid())
            .bind(booking.requester.id.as_uuid())
            .bind(booking.status.as_str())
            .bind(&json)
            .bind(booking.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("failed to insert booking: {e}")))?;

            tracing::debug!(booking_id = %booking.id, "booking inserted");
            self.publish(BookingChange {
                kind: BookingChangeKind::Created,
                booking_id: booking.id,
                status: booking.status,
            })
            .await;
            Ok(())
        })
    }

    fn get(
        &self,
        id: BookingId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Booking>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let row: Option<(sqlx::types::JsonValue,)> =
                sqlx::query_as("SELECT data FROM bookings WHERE id = $1")
                    .bind(id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| {
                        StoreError::DatabaseError(format!("failed to query booking: {e}"))
                    })?;

            row.map(|(json,)| Self::decode(json)).transpose()
        })
    }

    fn update_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        new: BookingStatus,
    ) -> Pin<Box<dyn Future<Output = Result<Booking, StoreError>> + Send + '_>> {
        Box::pin(async move {
            // The compare-and-swap: the WHERE clause makes the precondition
            // check and the write one atomic statement.
            let row: Option<(sqlx::types::JsonValue,)> = sqlx::query_as(
                "UPDATE bookings
                 SET status = $3, data = jsonb_set(data, '{status}', to_jsonb($3::text))
                 WHERE id = $1 AND status = $2
                 RETURNING data",
            )
            .bind(id.as_uuid())
            .bind(expected.as_str())
            .bind(new.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("failed to update status: {e}")))?;

            if let Some((json,)) = row {
                let booking = Self::decode(json)?;
                tracing::debug!(booking_id = %id, from = %expected, to = %new, "status updated");
                self.publish(BookingChange {
                    kind: BookingChangeKind::StatusChanged,
                    booking_id: id,
                    status: new,
                })
                .await;
                return Ok(booking);
            }

            // Zero rows: either the booking is gone or someone else moved it.
            let current: Option<(String,)> =
                sqlx::query_as("SELECT status FROM bookings WHERE id = $1")
                    .bind(id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| {
                        StoreError::DatabaseError(format!("failed to query status: {e}"))
                    })?;

            match current {
                None => Err(StoreError::NotFound(id)),
                Some((status,)) => {
                    let actual = BookingStatus::parse(&status).ok_or_else(|| {
                        StoreError::SerializationError(format!("unknown status '{status}'"))
                    })?;
                    Err(StoreError::Conflict {
                        booking_id: id,
                        expected,
                        actual,
                    })
                }
            }
        })
    }

    fn list_by_requester(
        &self,
        requester_id: RequesterId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Booking>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let rows: Vec<(sqlx::types::JsonValue,)> = sqlx::query_as(
                "SELECT data FROM bookings
                 WHERE requester_id = $1
                 ORDER BY created_at DESC",
            )
            .bind(requester_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("failed to query bookings: {e}")))?;

            Self::decode_all(rows)
        })
    }

    fn list_for_resource(
        &self,
        resource_id: ResourceId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Booking>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let rows: Vec<(sqlx::types::JsonValue,)> = sqlx::query_as(
                "SELECT data FROM bookings
                 WHERE resource_id = $1
                 ORDER BY created_at DESC",
            )
            .bind(resource_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("failed to query bookings: {e}")))?;

            Self::decode_all(rows)
        })
    }
}
