//! Scripted end-to-end run of the booking confirmation flow
//!
//! Drives the full machine against the in-crate mock gateway: watch the
//! seat grid, hold a seat, initiate an M-Pesa payment, and follow it to
//! completion over the fallback poller while a pushed seat update lands
//! through the mocked realtime channel.
//!
//! ```bash
//! cargo run -p booking-demo
//! ```

use std::sync::Arc;
use std::time::Duration;

use moihub_api::{PaymentStatus, RealtimeEvent, SeatAvailability, StatusSnapshot};
use moihub_booking::mocks::{ConnectScript, MockGateway};
use moihub_booking::{
    status_display, BookingConfig, BookingCoordinator, BookingSummary, MemoryDraftStore,
    PaymentConfig, RouteInfo, SeatConfig, SeatView, TripContext,
};
use moihub_core::environment::SystemClock;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type DemoCoordinator = BookingCoordinator<MockGateway, MemoryDraftStore>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "booking_demo=info,moihub_booking=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== MoiHub Booking Flow Demo ===\n");

    // Scripted backend: the STK push succeeds, the first status poll still
    // sees `processing`, the second sees completion. Meanwhile another
    // passenger books seat 14 and the update arrives as a push event.
    let gateway = MockGateway::new();
    gateway.script_connect(ConnectScript::Deliver(vec![RealtimeEvent::SeatUpdate {
        status: SeatAvailability::Booked,
        seat_number: "14".to_string(),
    }]));
    gateway.script_status(Ok(StatusSnapshot {
        status: PaymentStatus::Processing,
        message: None,
        raw: json!({"status": "processing"}),
    }));
    gateway.script_status(Ok(StatusSnapshot {
        status: PaymentStatus::Completed,
        message: Some("Payment received".to_string()),
        raw: json!({
            "status": "completed",
            "message": "Payment received",
            "booking": {
                "id": "bk-2041",
                "registration": "KDA 123X",
                "route": "Main Campus - Town",
                "seats": ["12"],
            },
            "MpesaReceiptNumber": "SGR7TKQ2XP",
        }),
    }));

    // Tight timers so the demo finishes in seconds; a real screen keeps
    // BookingConfig::new() as-is.
    let config = BookingConfig::new()
        .with_payment(
            PaymentConfig::new()
                .with_push_grace(Duration::from_millis(600))
                .with_poll_interval(Duration::from_millis(400)),
        )
        .with_seats(SeatConfig::new().with_refresh_interval(Duration::from_millis(800)));

    let trip = TripContext {
        registration: "KDA 123X".to_string(),
        route: RouteInfo {
            id: "7".to_string(),
            name: "Main Campus - Town".to_string(),
            price: 150,
        },
        departure_time: "10:30 AM".to_string(),
        seat_layout: (11..=14).map(|n| n.to_string()).collect(),
    };

    let coordinator = BookingCoordinator::start(
        config,
        trip,
        Arc::new(gateway),
        Arc::new(MemoryDraftStore::new()),
        Arc::new(SystemClock),
    )
    .await?;

    // Let the first availability round and the pushed seat update land
    tokio::time::sleep(Duration::from_millis(300)).await;
    print_grid(&coordinator).await;

    println!("\n>>> Selecting seat 12");
    let mut handle = coordinator.toggle_seat("12").await?;
    handle.wait().await;

    let (selection, draft) = coordinator
        .state(|s| (s.selection.clone(), s.draft.clone()))
        .await;
    if let Some(lock) = selection {
        println!(
            "Seat {} held for {} seconds",
            lock.seat_number, lock.remaining_secs
        );
    }
    if let Some(draft) = draft {
        println!(
            "Draft: {} seat(s) on {} - KES {}",
            draft.seats.len(),
            draft.route.name,
            draft.total_amount()
        );
    }

    println!("\n>>> Submitting payment for 0712345678");
    let mut handle = coordinator.submit_payment("0712345678").await?;
    handle.wait().await;

    follow_payment(&coordinator).await;

    let payload = coordinator
        .state(|s| s.payment.completed_payload.clone())
        .await;
    if let Some(payload) = payload {
        let summary = BookingSummary::from_value(&payload);
        println!("\nBooking confirmed:");
        println!("  id:           {}", summary.booking_id.as_deref().unwrap_or("-"));
        println!("  vehicle:      {}", summary.registration.as_deref().unwrap_or("-"));
        println!("  route:        {}", summary.route.as_deref().unwrap_or("-"));
        println!("  seats:        {}", summary.seats.join(", "));
        println!("  receipt:      {}", summary.receipt.as_deref().unwrap_or("-"));
    }

    let draft_cleared = coordinator.state(|s| s.draft.is_none()).await;
    println!("Draft cleared after completion: {draft_cleared}");

    coordinator.stop(Duration::from_secs(10)).await?;
    println!("\n=== Demo complete ===");
    Ok(())
}

/// Print the watched seat grid, sorted by seat number
async fn print_grid(coordinator: &DemoCoordinator) {
    let mut seats: Vec<(String, SeatView)> = coordinator
        .state(|s| s.seats.iter().map(|(k, v)| (k.clone(), *v)).collect())
        .await;
    seats.sort_by(|a, b| a.0.cmp(&b.0));

    println!("Seat grid:");
    for (seat_number, view) in seats {
        println!("  seat {seat_number}: {}", seat_label(view));
    }
}

/// Human label for one seat view
fn seat_label(view: SeatView) -> &'static str {
    if view.locked_by_you {
        return "held by you";
    }
    match view.availability {
        SeatAvailability::Available => "open",
        SeatAvailability::Locked => "held by another passenger",
        SeatAvailability::Booked => "booked",
        SeatAvailability::Unknown => "unknown",
    }
}

/// Poll machine state until the payment reaches a terminal status,
/// printing the indicator on every transition
async fn follow_payment(coordinator: &DemoCoordinator) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    let mut last: Option<PaymentStatus> = None;

    loop {
        let status = coordinator
            .state(|s| s.payment.session.as_ref().map(|p| p.status))
            .await;

        if status != last {
            let display = status_display(status);
            println!("    [{}] {} - {}", display.color, display.title, display.description);
            last = status;
        }

        if status.is_some_and(|s| s.is_terminal()) {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            println!("    (no terminal status within 10s)");
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
