//! Core vocabulary for the MoiHub booking API

use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend-assigned identifier for one payment attempt
///
/// Opaque to the client; it only flows back into the status endpoint
/// and correlates polling rounds with the session that started them.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PaymentId(String);

impl PaymentId {
    /// Create a payment ID from its backend representation
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The backend representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PaymentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PaymentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Status of one payment attempt as reported by the gateway
///
/// Canonical lifecycle: `stk_pushed` (the mobile-money prompt has been
/// dispatched to the customer's phone) then `processing` (the gateway is
/// settling), ending in exactly one of the five terminal values. The
/// backend has historically used `initiated` as a synonym for
/// `stk_pushed`; both spellings deserialize to [`StkPushed`](Self::StkPushed).
///
/// Unrecognized values map to [`Unknown`](Self::Unknown) instead of
/// failing deserialization, so a backend rollout of a new status never
/// breaks an in-flight payment observation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// The STK push prompt was dispatched to the customer's phone
    #[serde(alias = "initiated")]
    StkPushed,
    /// The gateway is settling the payment
    Processing,
    /// Payment settled successfully (terminal)
    Completed,
    /// Payment failed (terminal)
    Failed,
    /// Customer cancelled the prompt (terminal)
    Cancelled,
    /// The prompt or the payment window timed out (terminal)
    Expired,
    /// Money moved but the booking could not be honored; the backend
    /// will refund asynchronously (terminal, not user-retriable)
    RefundRequired,
    /// A status this client does not recognize
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    /// Whether this status ends the payment attempt
    ///
    /// Once a terminal status is applied, no further transitions are
    /// accepted from any channel.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Expired | Self::RefundRequired
        )
    }

    /// Whether the attempt is underway and worth observing
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(self, Self::StkPushed | Self::Processing)
    }

    /// Whether this is the successful terminal status
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Wire spelling of this status
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StkPushed => "stk_pushed",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::RefundRequired => "refund_required",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Availability of one seat as reported by the backend
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeatAvailability {
    /// Free to select
    Available,
    /// Held by a short-lived lock
    Locked,
    /// Sold
    Booked,
    /// Availability could not be determined; treated as not selectable
    #[serde(other)]
    Unknown,
}

impl SeatAvailability {
    /// Whether a user may start selecting this seat
    ///
    /// Anything other than a definite `available` is treated as not
    /// selectable, including [`Unknown`](Self::Unknown).
    #[must_use]
    pub const fn is_selectable(&self) -> bool {
        matches!(self, Self::Available)
    }
}
