//! # MoiHub Booking API Client
//!
//! Rust client for the MoiHub booking backend: M-Pesa payment
//! initiation and status, seat locks and availability, and the
//! realtime event stream.
//!
//! ## Example
//!
//! ```no_run
//! use moihub_api::{InitiatePaymentRequest, MoiHubClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create client from MOIHUB_API_TOKEN environment variable
//!     let client = MoiHubClient::from_env()?;
//!
//!     // Initiate a payment for a held seat
//!     let response = client
//!         .initiate_payment(&InitiatePaymentRequest {
//!             phone_number: "254712345678".to_string(),
//!             registration: "KDA 123X".to_string(),
//!             route_id: "7".to_string(),
//!             seats: vec!["12".to_string()],
//!             departure_time: "10:30 AM".to_string(),
//!         })
//!         .await?;
//!
//!     println!("STK push dispatched, payment {}", response.payment_id);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - Payment initiation and status polling with Bearer auth
//! - Seat lock and availability endpoints
//! - Realtime events with Server-Sent Events (SSE)
//! - Defensive status decoding (unknown values never fail a poll)

pub mod bookings;
pub mod client;
pub mod error;
pub mod events;
pub mod types;

// Re-export main types for convenience
pub use bookings::{
    CheckSeatResponse, InitiatePaymentRequest, InitiatePaymentResponse, LockSeatResponse,
    StatusSnapshot,
};
pub use client::MoiHubClient;
pub use error::{ApiError, GENERIC_FAILURE_TEXT};
pub use events::{EventStream, RealtimeEvent};
pub use types::{PaymentId, PaymentStatus, SeatAvailability};
