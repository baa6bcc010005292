//! Actions processed by the booking machine
//!
//! Every input to the flow is one [`BookingAction`]: user commands, backend
//! call results, observed push events, and timer ticks. The push channel
//! and the fallback poller both feed status observations through
//! [`BookingAction::StatusObserved`] and [`BookingAction::PollCompleted`],
//! which converge on the same terminal-state gate inside the payment
//! reducer.

use moihub_api::{LockSeatResponse, PaymentId, PaymentStatus, SeatAvailability, StatusSnapshot};
use serde_json::Value;

use crate::msisdn::Msisdn;
use crate::state::BookingDraft;

/// Which producer observed a payment status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusSource {
    /// The realtime push channel
    Push,
    /// The fallback HTTP poller
    Poll,
}

impl StatusSource {
    /// Metric label for this source
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Poll => "poll",
        }
    }
}

/// All inputs to the booking confirmation machine
#[derive(Clone, Debug, PartialEq)]
pub enum BookingAction {
    // ------------------------------------------------------------------
    // Seat reservation
    // ------------------------------------------------------------------
    /// Begin watching the seat grid for the given layout (5s refresh chain)
    WatchSeats {
        /// Seat numbers in the vehicle layout
        seats: Vec<String>,
    },

    /// Periodic tick of the grid refresh chain
    RefreshSeatStatuses,

    /// One seat's availability came back (failures arrive as `Unknown`)
    SeatStatusFetched {
        /// The seat reported on
        seat_number: String,
        /// Observed availability
        status: SeatAvailability,
        /// Whether the backend attributes the lock to this session
        locked_by_you: bool,
    },

    /// User tapped a seat: select it, or deselect if already selected
    ToggleSeat {
        /// The seat tapped
        seat_number: String,
    },

    /// The server-side lock request resolved
    SeatLockResolved {
        /// The seat the request was for
        seat_number: String,
        /// Lock outcome, or a user-facing failure message
        result: Result<LockSeatResponse, String>,
    },

    /// One-second tick of the seat lock countdown
    LockCountdownTicked {
        /// Generation of the countdown chain this tick belongs to
        seq: u64,
    },

    /// A push `seat_update` event arrived
    SeatUpdateObserved {
        /// Reported availability
        status: SeatAvailability,
        /// The seat it concerns
        seat_number: String,
    },

    /// A previously persisted booking draft was loaded at startup
    DraftLoaded {
        /// The draft found in the store
        draft: BookingDraft,
    },

    // ------------------------------------------------------------------
    // Payment session
    // ------------------------------------------------------------------
    /// User submitted the payment form with a phone number
    SubmitPayment {
        /// Raw phone input (validated and normalized by the reducer)
        phone: String,
    },

    /// Payment initiation succeeded; an STK push is on its way
    PaymentInitiated {
        /// Backend-assigned payment id
        payment_id: PaymentId,
        /// Normalized phone the push was sent to
        phone: Msisdn,
        /// Amount due in KES, captured at submission
        amount: u32,
    },

    /// Payment initiation failed; the form stays open
    PaymentInitiationFailed {
        /// User-facing message (backend-provided or generic)
        message: String,
    },

    /// The 15s push-silence grace period elapsed
    PushGraceElapsed {
        /// The payment the grace period was armed for
        payment_id: PaymentId,
    },

    /// Start the fallback status poller (re-entrancy guarded)
    StartStatusPolling {
        /// The payment to observe
        payment_id: PaymentId,
    },

    /// Periodic tick of the fallback poller
    PollTick {
        /// The payment this tick belongs to
        payment_id: PaymentId,
    },

    /// A fallback status request resolved
    PollCompleted {
        /// The payment that was polled
        payment_id: PaymentId,
        /// Status snapshot, or a user-facing failure message
        result: Result<StatusSnapshot, String>,
    },

    /// A payment status was observed (push event or forced transition)
    StatusObserved {
        /// Which producer delivered it
        source: StatusSource,
        /// The observed status
        status: PaymentStatus,
        /// Optional operator message accompanying the status
        message: Option<String>,
        /// Raw payload for the success view
        payload: Value,
    },

    /// Resume observing an in-flight payment found at startup
    ResumePayment {
        /// The persisted payment id
        payment_id: PaymentId,
        /// The phone it was initiated with
        phone: Msisdn,
    },

    // ------------------------------------------------------------------
    // Session countdown
    // ------------------------------------------------------------------
    /// Begin the session-wide expiry countdown
    StartSessionCountdown,

    /// One-second tick of the session countdown
    SessionTicked,

    // ------------------------------------------------------------------
    // Realtime channel health
    // ------------------------------------------------------------------
    /// The push channel connected and is delivering events
    ChannelEstablished,

    /// The push channel exhausted its reconnect budget
    ChannelUnavailable {
        /// Why the channel gave up
        reason: String,
    },
}

impl BookingAction {
    /// Short name for logs and metrics
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::WatchSeats { .. } => "watch_seats",
            Self::RefreshSeatStatuses => "refresh_seat_statuses",
            Self::SeatStatusFetched { .. } => "seat_status_fetched",
            Self::ToggleSeat { .. } => "toggle_seat",
            Self::SeatLockResolved { .. } => "seat_lock_resolved",
            Self::LockCountdownTicked { .. } => "lock_countdown_ticked",
            Self::SeatUpdateObserved { .. } => "seat_update_observed",
            Self::DraftLoaded { .. } => "draft_loaded",
            Self::SubmitPayment { .. } => "submit_payment",
            Self::PaymentInitiated { .. } => "payment_initiated",
            Self::PaymentInitiationFailed { .. } => "payment_initiation_failed",
            Self::PushGraceElapsed { .. } => "push_grace_elapsed",
            Self::StartStatusPolling { .. } => "start_status_polling",
            Self::PollTick { .. } => "poll_tick",
            Self::PollCompleted { .. } => "poll_completed",
            Self::StatusObserved { .. } => "status_observed",
            Self::ResumePayment { .. } => "resume_payment",
            Self::StartSessionCountdown => "start_session_countdown",
            Self::SessionTicked => "session_ticked",
            Self::ChannelEstablished => "channel_established",
            Self::ChannelUnavailable { .. } => "channel_unavailable",
        }
    }
}
