//! Realtime event types delivered over the booking event stream

use crate::error::ApiError;
use crate::types::{PaymentId, PaymentStatus, SeatAvailability};
use futures::stream::Stream;
use serde::Deserialize;
use std::pin::Pin;

/// Stream of realtime events, as produced by
/// [`MoiHubClient::events`](crate::client::MoiHubClient::events)
pub type EventStream = Pin<Box<dyn Stream<Item = Result<RealtimeEvent, ApiError>> + Send>>;

/// Events delivered over the realtime channel
///
/// Each server-sent frame is a JSON object tagged by an `event` field.
/// Three kinds matter to the booking flow; anything else is dropped at
/// the parse boundary.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RealtimeEvent {
    /// The STK push was dispatched to the customer's phone
    PaymentRequested {
        /// Payment attempt the push belongs to, when the backend says
        #[serde(default)]
        payment_id: Option<PaymentId>,
    },
    /// A payment status transition
    PaymentStatusUpdate {
        /// The new status
        status: PaymentStatus,
        /// Backend message accompanying the transition, if any
        #[serde(default)]
        message: Option<String>,
        /// Payload fields beyond the canonical pair (receipt number,
        /// booking object); preserved for the success view
        #[serde(flatten)]
        extra: serde_json::Map<String, serde_json::Value>,
    },
    /// A seat changed availability
    SeatUpdate {
        /// The seat's new availability
        status: SeatAvailability,
        /// Which seat changed
        seat_number: String,
    },
}
