//! Domain state for the booking confirmation machine
//!
//! One [`BookingState`] value holds everything the flow tracks: the booking
//! draft, the observed seat grid, the active seat lock and its countdown,
//! the live payment session, the fallback poller bookkeeping, channel
//! health, and the session-wide expiry countdown. The reducers are the only
//! writers; every timer chain is guarded by presence checks on this state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use moihub_api::{PaymentId, PaymentStatus, SeatAvailability};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::display::Notice;
use crate::msisdn::Msisdn;

/// Route metadata carried by a booking draft
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    /// Backend route identifier
    pub id: String,
    /// Human-readable route name ("Main Campus - Town")
    pub name: String,
    /// Fare per seat in KES
    pub price: u32,
}

/// Client-held draft of one booking, created at seat selection
///
/// Persisted to the session-scoped draft store and consumed (deleted) once
/// payment completes or the flow is abandoned. Payment initiation requires
/// a draft with at least one seat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDraft {
    /// Vehicle registration ("KDA 123X")
    pub registration: String,
    /// Route the booking is for
    pub route: RouteInfo,
    /// Selected seat identifiers
    pub seats: Vec<String>,
    /// Departure time as displayed to the user ("10:30 AM")
    pub departure_time: String,
}

impl BookingDraft {
    /// Whether the draft can back a payment initiation
    #[must_use]
    pub fn is_payable(&self) -> bool {
        !self.seats.is_empty()
    }

    /// Total fare for the drafted seats in KES
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn total_amount(&self) -> u32 {
        self.route.price.saturating_mul(self.seats.len() as u32)
    }
}

/// Recovery hint persisted on successful initiation
///
/// Consumed exactly once at coordinator start so an in-flight payment keeps
/// being observed across a reload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPayment {
    /// Backend-assigned id of the in-flight payment
    pub payment_id: PaymentId,
    /// Normalized phone the payment was initiated with
    pub phone: Msisdn,
}

/// Last observed availability of one seat
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeatView {
    /// Availability reported by the backend (`Unknown` when a check failed)
    pub availability: SeatAvailability,
    /// Whether the backend attributes the current lock to this session
    pub locked_by_you: bool,
}

impl SeatView {
    /// A seat nobody has reported on yet
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            availability: SeatAvailability::Unknown,
            locked_by_you: false,
        }
    }

    /// Whether the user may select this seat
    ///
    /// Available seats and seats the backend says are locked by this very
    /// session are selectable; booked, foreign-locked, and unknown seats
    /// are not.
    #[must_use]
    pub const fn is_selectable(&self) -> bool {
        match self.availability {
            SeatAvailability::Available => true,
            SeatAvailability::Locked => self.locked_by_you,
            SeatAvailability::Booked | SeatAvailability::Unknown => false,
        }
    }
}

impl Default for SeatView {
    fn default() -> Self {
        Self::unknown()
    }
}

/// A time-boxed exclusive hold on one seat
///
/// At most one lock is active per session. `seq` tags the countdown chain
/// generation: ticks carrying a stale `seq` are no-ops, which is how
/// deselection and replacement kill an old countdown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeatLock {
    /// Backend seat identifier returned by the lock endpoint
    pub seat_id: String,
    /// Seat number as shown on the grid
    pub seat_number: String,
    /// Seconds left on the local lease countdown
    pub remaining_secs: u32,
    /// Countdown chain generation
    pub seq: u64,
}

/// One payment attempt, created on successful initiation
///
/// Terminal statuses freeze the session (`completed`, `refund_required`) or
/// clear it so the form reopens (`failed`, `cancelled`, `expired`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentSession {
    /// Backend-assigned payment identifier
    pub payment_id: PaymentId,
    /// Normalized phone the STK push was sent to
    pub phone: Msisdn,
    /// Current machine status
    pub status: PaymentStatus,
    /// Amount due in KES
    pub amount: u32,
    /// When initiation succeeded
    pub created_at: DateTime<Utc>,
    /// Set once any push event has been observed for this attempt
    pub push_observed: bool,
}

/// Payment-side state: the live session plus form presentation bits
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PaymentFlow {
    /// The live payment attempt, if any (`None` renders the entry form)
    pub session: Option<PaymentSession>,
    /// Inline validation or initiation error shown at the form
    pub form_error: Option<String>,
    /// Raw backend payload captured when the payment completed,
    /// for the success view
    pub completed_payload: Option<Value>,
}

impl PaymentFlow {
    /// Whether a session exists and is between initiation and settlement
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.status.is_in_flight())
    }
}

/// Bookkeeping for the fallback status poller
///
/// Presence of this value is the re-entrancy guard: a second start request
/// for the same payment finds it set and does nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollerState {
    /// Payment the poller is observing
    pub payment_id: PaymentId,
    /// Consecutive failed polls; reset to zero by any success
    pub consecutive_failures: u32,
    /// When polling started, for the absolute deadline ceiling
    pub started_at: DateTime<Utc>,
}

/// Health of the realtime push channel
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ChannelHealth {
    /// Not yet connected
    #[default]
    Pending,
    /// Stream established and delivering events
    Connected,
    /// Reconnect budget exhausted; the poller is the only observer left
    Down {
        /// Why the channel gave up
        reason: String,
    },
}

impl ChannelHealth {
    /// Whether push delivery is currently believed unavailable
    #[must_use]
    pub const fn is_down(&self) -> bool {
        matches!(self, Self::Down { .. })
    }
}

/// Session-wide expiry countdown (one hour, warning at five minutes)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionCountdown {
    /// Countdown chain running
    pub active: bool,
    /// Seconds until forced logout
    pub remaining_secs: u32,
    /// One-time warning already surfaced
    pub warned: bool,
    /// Session reached zero; the shell should redirect to login
    pub expired: bool,
}

/// Complete state of the booking confirmation machine
#[derive(Clone, Debug, Default)]
pub struct BookingState {
    /// Current booking draft, mirrored from the draft store
    pub draft: Option<BookingDraft>,

    /// Last observed availability per seat number
    pub seats: HashMap<String, SeatView>,

    /// Seat grid refresh chain running
    pub watching: bool,

    /// The active seat lock, if any (at most one)
    pub selection: Option<SeatLock>,

    /// Monotonic lock generation; bumped on every selection change so
    /// countdown ticks from superseded locks become no-ops
    pub lock_seq: u64,

    /// Payment session and form presentation
    pub payment: PaymentFlow,

    /// Fallback poller bookkeeping, present while polling
    pub poller: Option<PollerState>,

    /// Realtime channel health
    pub channel: ChannelHealth,

    /// Session expiry countdown
    pub session: SessionCountdown,

    /// Most recent user-facing notice
    pub last_notice: Option<Notice>,
}

impl BookingState {
    /// The seat view for `seat_number`, defaulting to unknown
    #[must_use]
    pub fn seat_view(&self, seat_number: &str) -> SeatView {
        self.seats.get(seat_number).copied().unwrap_or_default()
    }

    /// Whether the given seat is the currently selected one
    #[must_use]
    pub fn is_selected(&self, seat_number: &str) -> bool {
        self.selection
            .as_ref()
            .is_some_and(|lock| lock.seat_number == seat_number)
    }
}
