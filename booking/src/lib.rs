//! # MoiHub Booking
//!
//! The booking confirmation engine: M-Pesa payment confirmation and seat
//! reservation for one matatu trip, built as a composable state machine on
//! `moihub-core` and `moihub-runtime`.
//!
//! ## What runs here
//!
//! - **Seat reservation**: a watched availability grid (5s refresh), a
//!   single server-backed seat lock with a 5-minute client countdown, and
//!   invalidation when another customer takes the held seat
//! - **Payment session**: phone validation, STK push initiation, and a
//!   status machine driven by two producers (realtime push events and a
//!   fallback HTTP poller) converging on one terminal-state gate
//! - **Recovery**: the booking draft and an in-flight payment hint are
//!   persisted so a reload resumes observation instead of double-charging
//! - **Session countdown**: a one-hour booking session with a five-minute
//!   warning and forced teardown at zero
//!
//! All of it is reducers and effects; the only tasks are the store's
//! effect executor and the realtime channel loop in [`channel`].
//!
//! ## Example
//!
//! ```ignore
//! use moihub_booking::{BookingConfig, BookingCoordinator, TripContext};
//!
//! let coordinator = BookingCoordinator::from_env(BookingConfig::new(), trip).await?;
//!
//! coordinator.toggle_seat("12").await?;
//! coordinator.submit_payment("0712345678").await?;
//!
//! let status = coordinator
//!     .state(|s| s.payment.session.as_ref().map(|p| p.status))
//!     .await;
//! ```

pub mod actions;
pub mod channel;
pub mod config;
pub mod coordinator;
pub mod display;
pub mod environment;
pub mod error;
pub mod mocks;
pub mod msisdn;
pub mod providers;
pub mod reducers;
pub mod state;

// Re-export the surface a booking screen needs
pub use actions::{BookingAction, StatusSource};
pub use config::{BookingConfig, ChannelConfig, PaymentConfig, SeatConfig, SessionConfig};
pub use coordinator::{BookingCoordinator, BookingStore};
pub use display::{BookingSummary, Notice, StatusDisplay, status_display};
pub use environment::{BookingEnvironment, BookingGateway, DraftStore, EventSource, TripContext};
pub use error::BookingError;
pub use msisdn::Msisdn;
pub use providers::MemoryDraftStore;
pub use reducers::BookingReducer;
pub use state::{
    BookingDraft, BookingState, ChannelHealth, PaymentFlow, PaymentSession, PendingPayment,
    PollerState, RouteInfo, SeatLock, SeatView, SessionCountdown,
};
