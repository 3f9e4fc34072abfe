//! Front-desk walkthrough binary.
//!
//! Wires the lifecycle manager to the in-memory collaborators and walks a
//! booking day end to end: submissions, approvals, a rejection, a
//! cancellation, and the refusals the state machine hands back. A change-feed
//! subscriber runs alongside, printing the "re-read your views" pings a UI
//! would consume.

use chrono::{Duration, Utc};
use futures::StreamExt;
use labbook_core::change_feed::ChangeFeed;
use labbook_core::environment::SystemClock;
use labbook_core::lifecycle::BookingLifecycle;
use labbook_core::notify::{Notification, NotificationKind, NotificationSink, NotifyError};
use labbook_core::store::BookingStore;
use labbook_core::types::{
    BookingProposal, Capacity, Requester, RequesterId, RequesterRole, Resource, ResourceId,
    ResourceKind, ResourceStatus,
};
use labbook_testing::{InMemoryBookingStore, InMemoryChangeFeed, InMemoryResourceCatalog};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Notification sink that prints to the terminal, standing in for whatever
/// toast/email channel the real deployment uses.
struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn notify(
        &self,
        notification: Notification,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>> {
        Box::pin(async move {
            let tag = match notification.kind {
                NotificationKind::Success => "ok",
                NotificationKind::Error => "error",
            };
            println!("  [notify/{tag}] {}", notification.message);
            Ok(())
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "frontdesk=info,labbook_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Frontdesk: a day of lab bookings ===\n");

    // Collaborators: in-memory catalog and store, console notifications, and
    // a broadcast change feed the store publishes into.
    let feed: Arc<InMemoryChangeFeed> = Arc::new(InMemoryChangeFeed::new());
    let catalog = Arc::new(InMemoryResourceCatalog::new());
    let store = Arc::new(InMemoryBookingStore::with_change_feed(feed.clone()));

    // A UI-side subscriber: on every change it would re-read its views; here
    // it just narrates the pings.
    let mut changes = feed
        .subscribe()
        .await
        .map_err(|e| anyhow::anyhow!("subscribe failed: {e}"))?;
    let listener = tokio::spawn(async move {
        while let Some(change) = changes.next().await {
            match change {
                Ok(c) => println!("  [feed] {:?} {} -> {}", c.kind, c.booking_id, c.status),
                Err(e) => println!("  [feed] lagged: {e}"),
            }
        }
    });

    let lifecycle = BookingLifecycle::new(
        catalog.clone(),
        store.clone(),
        Arc::new(ConsoleSink),
        Arc::new(SystemClock),
    );

    // Seed the catalog.
    let chem_lab = Resource::new(
        ResourceId::new(),
        ResourceKind::Lab,
        "Chemistry Lab B".to_string(),
        ResourceStatus::Available,
        Capacity::new(12),
    );
    let microscope = Resource::new(
        ResourceId::new(),
        ResourceKind::Equipment,
        "Confocal Microscope 2".to_string(),
        ResourceStatus::Maintenance,
        Capacity::new(2),
    );
    catalog.put(chem_lab.clone()).await;
    catalog.put(microscope.clone()).await;
    info!(lab = %chem_lab.id, microscope = %microscope.id, "catalog seeded");

    let priya = Requester::new(
        RequesterId::new(),
        "Priya Raman".to_string(),
        RequesterRole::Student,
    );
    let tomorrow = Utc::now() + Duration::days(1);
    let proposal = |hours: i64, purpose: &str, attendees: u32| BookingProposal {
        resource_id: chem_lab.id,
        start_time: tomorrow + Duration::hours(hours),
        end_time: tomorrow + Duration::hours(hours + 2),
        purpose: purpose.to_string(),
        attendees,
        notes: None,
    };

    println!(">>> Priya books the chemistry lab, and the request sails through");
    let first = lifecycle
        .create(proposal(9, "Titration practical", 4), priya.clone())
        .await?;
    let first = lifecycle.approve(first.id).await?;
    let first = lifecycle.complete(first.id).await?;
    println!("  booking {} ended up {}\n", first.id, first.status);

    println!(">>> A second request is turned down");
    let second = lifecycle
        .create(proposal(13, "Makeup session", 2), priya.clone())
        .await?;
    let second = lifecycle.reject(second.id).await?;
    println!("  booking {} ended up {}\n", second.id, second.status);

    println!(">>> A third is approved, then withdrawn");
    let third = lifecycle
        .create(proposal(16, "Polymer synthesis", 3), priya.clone())
        .await?;
    lifecycle.approve(third.id).await?;
    let third = lifecycle.cancel(third.id).await?;
    println!("  booking {} ended up {}\n", third.id, third.status);

    println!(">>> The state machine refuses a second approval of a finished booking");
    if let Err(err) = lifecycle.approve(first.id).await {
        println!("  refused: {err}\n");
    }

    println!(">>> The microscope is down for maintenance");
    if let Err(err) = lifecycle
        .create(
            BookingProposal {
                resource_id: microscope.id,
                ..proposal(10, "Cell imaging", 1)
            },
            priya.clone(),
        )
        .await
    {
        println!("  refused: {err}\n");
    }

    println!(">>> And a proposal that ends before it starts never leaves the gate");
    if let Err(err) = lifecycle
        .create(
            BookingProposal {
                start_time: tomorrow + Duration::hours(9),
                end_time: tomorrow + Duration::hours(8),
                ..proposal(9, "Time travel", 1)
            },
            priya.clone(),
        )
        .await
    {
        println!("  refused: {err}\n");
    }

    println!(">>> Priya's dashboard view, newest first:");
    for booking in store.list_by_requester(priya.id).await? {
        println!(
            "  {} | {} | {} attendees | {}",
            booking.id, booking.purpose, booking.attendees, booking.status
        );
    }

    // Let the feed listener drain before shutting down.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    listener.abort();

    println!("\n=== Walkthrough complete ===");
    Ok(())
}
