//! Booking API request and response types

use crate::types::{PaymentId, PaymentStatus, SeatAvailability};
use serde::{Deserialize, Serialize};

/// Request to initiate an M-Pesa payment for a booking
///
/// The phone number must already be normalized to `254XXXXXXXXX`; the
/// backend does not accept `0`- or `+254`-prefixed spellings.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct InitiatePaymentRequest {
    /// Normalized MSISDN the STK push goes to
    pub phone_number: String,
    /// Vehicle registration the booking is for
    pub registration: String,
    /// Route identifier
    pub route_id: String,
    /// Seat identifiers being paid for
    pub seats: Vec<String>,
    /// Departure time as displayed to the user
    pub departure_time: String,
}

/// Response from payment initiation
///
/// Unknown fields in the body are ignored; only the payment ID matters
/// to the flow, everything else arrives later through status updates.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct InitiatePaymentResponse {
    /// Backend-assigned ID for the new payment attempt
    pub payment_id: PaymentId,
}

/// One observation of payment status from the status endpoint
///
/// Keeps the complete response body alongside the decoded fields: the
/// success view extracts booking details (registration, seats, receipt
/// number) from whichever payload shape the backend produced, and that
/// extraction needs the raw value.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusSnapshot {
    /// Decoded payment status
    pub status: PaymentStatus,
    /// Backend message accompanying the status, if any
    pub message: Option<String>,
    /// The full response body
    pub raw: serde_json::Value,
}

impl StatusSnapshot {
    /// Decode a snapshot from a status endpoint response body
    ///
    /// # Errors
    ///
    /// Returns a deserialization error when the body has no usable
    /// `status` field.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        struct Fields {
            status: PaymentStatus,
            #[serde(default)]
            message: Option<String>,
        }

        let fields: Fields = serde_json::from_value(value.clone())?;
        Ok(Self {
            status: fields.status,
            message: fields.message,
            raw: value,
        })
    }
}

/// Response from the seat lock endpoint
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct LockSeatResponse {
    /// Whether the server granted the hold
    pub success: bool,
    /// The seat the hold applies to (backend uses camelCase here)
    #[serde(rename = "seatId")]
    pub seat_id: String,
}

/// Response from the seat availability endpoint
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct CheckSeatResponse {
    /// Current availability of the seat
    pub status: SeatAvailability,
    /// Whether the active session holds the lock on this seat
    #[serde(default)]
    pub locked_by_you: bool,
}
