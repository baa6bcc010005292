//! Presentation mapping: pure functions from machine state to display data
//!
//! Nothing here mutates state. [`status_display`] maps a payment status to
//! the indicator rendering, [`BookingSummary::from_value`] digs the success
//! view's fields out of whichever payload shape the backend produced, and
//! [`Notice`] carries every user-facing message with its text behind
//! `Display`.

use moihub_api::PaymentStatus;
use serde_json::Value;

/// Indicator rendering for one payment status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusDisplay {
    /// Icon name for the renderer ("phone", "check-circle", ...)
    pub icon: &'static str,
    /// Accent color name
    pub color: &'static str,
    /// Short headline
    pub title: &'static str,
    /// One-sentence description
    pub description: &'static str,
}

/// Map a payment status to its indicator rendering
///
/// `None` is the pre-initiation state (entry form visible).
#[must_use]
pub const fn status_display(status: Option<PaymentStatus>) -> StatusDisplay {
    match status {
        None => StatusDisplay {
            icon: "phone",
            color: "gray",
            title: "Ready to pay",
            description: "Enter your M-Pesa number to receive a payment prompt.",
        },
        Some(PaymentStatus::StkPushed) => StatusDisplay {
            icon: "phone-vibrate",
            color: "blue",
            title: "Check your phone",
            description: "Enter your M-Pesa PIN to authorize the payment.",
        },
        Some(PaymentStatus::Processing) => StatusDisplay {
            icon: "clock",
            color: "amber",
            title: "Processing payment",
            description: "M-Pesa is confirming your payment. This takes a moment.",
        },
        Some(PaymentStatus::Completed) => StatusDisplay {
            icon: "check-circle",
            color: "green",
            title: "Payment received",
            description: "Your seat is booked. See you on board!",
        },
        Some(PaymentStatus::Failed) => StatusDisplay {
            icon: "x-circle",
            color: "red",
            title: "Payment failed",
            description: "The payment did not go through. Please try again.",
        },
        Some(PaymentStatus::Cancelled) => StatusDisplay {
            icon: "ban",
            color: "red",
            title: "Payment cancelled",
            description: "You cancelled the payment request. Try again when ready.",
        },
        Some(PaymentStatus::Expired) => StatusDisplay {
            icon: "hourglass",
            color: "red",
            title: "Payment request expired",
            description: "The M-Pesa prompt expired before it was authorized. Please try again.",
        },
        Some(PaymentStatus::RefundRequired) => StatusDisplay {
            icon: "rotate-ccw",
            color: "orange",
            title: "Refund on the way",
            description: "We received your payment but could not complete the booking. \
                          You will be refunded automatically.",
        },
        Some(PaymentStatus::Unknown) => StatusDisplay {
            icon: "help-circle",
            color: "gray",
            title: "Checking status",
            description: "We are confirming the state of your payment.",
        },
    }
}

/// User-facing notices surfaced by the machine
///
/// Every failure path ends in one of these; `Display` renders the exact
/// text shown to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// The local seat lock countdown reached zero
    LockExpired,
    /// A seat lock request failed or was refused
    LockFailed {
        /// What to tell the user
        message: String,
    },
    /// A grid refresh reported the selected seat taken by someone else
    SeatTaken {
        /// The seat that was lost
        seat_number: String,
    },
    /// A push event confirmed the selected seat as booked
    SeatConfirmed {
        /// The confirmed seat
        seat_number: String,
    },
    /// Payment reached `failed`, `cancelled`, or `expired`
    PaymentTerminal {
        /// The terminal status reached
        status: PaymentStatus,
        /// Backend-provided or default message
        message: String,
    },
    /// Payment reached `refund_required`
    RefundPending,
    /// Polling abandoned after consecutive request failures
    PollingAbandoned,
    /// Polling hit the absolute deadline without a terminal status
    StatusCheckTimeout,
    /// One-time warning that the session is about to expire
    SessionExpiryWarning {
        /// Whole minutes remaining
        minutes_left: u32,
    },
    /// The session expired; the shell should redirect to login
    SessionExpired,
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LockExpired => {
                write!(
                    f,
                    "Your seat reservation expired. Please select a seat again."
                )
            },
            Self::LockFailed { message } => write!(f, "{message}"),
            Self::SeatTaken { seat_number } => {
                write!(
                    f,
                    "Seat {seat_number} was just taken by another passenger. \
                     Please choose a different seat."
                )
            },
            Self::SeatConfirmed { seat_number } => {
                write!(f, "Seat {seat_number} is confirmed as yours.")
            },
            Self::PaymentTerminal { message, .. } => write!(f, "{message}"),
            Self::RefundPending => {
                write!(
                    f,
                    "Your payment was received but the booking could not be completed. \
                     You will be refunded shortly."
                )
            },
            Self::PollingAbandoned => {
                write!(
                    f,
                    "We are having trouble reaching the server. \
                     Please check My Bookings to confirm whether your payment went through."
                )
            },
            Self::StatusCheckTimeout => {
                write!(
                    f,
                    "We could not confirm your payment in time. \
                     Please verify via the M-Pesa SMS or check My Bookings."
                )
            },
            Self::SessionExpiryWarning { minutes_left } => {
                write!(
                    f,
                    "Your booking session expires in {minutes_left} minutes. \
                     Please complete your payment soon."
                )
            },
            Self::SessionExpired => {
                write!(f, "Your booking session has expired. Please log in again.")
            },
        }
    }
}

/// Default user message for a terminal status when the backend sent none
#[must_use]
pub const fn default_terminal_message(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Failed => "Payment failed. Please try again.",
        PaymentStatus::Cancelled => "Payment was cancelled.",
        PaymentStatus::Expired => "The payment request expired. Please try again.",
        PaymentStatus::RefundRequired => {
            "Payment received but booking failed. A refund is on the way."
        },
        _ => "Payment status updated.",
    }
}

/// Success-view fields extracted from a completed-payment payload
///
/// Backend responses are inconsistent about where these live (top level,
/// nested under `booking` or `data`) and what the keys are called, so
/// extraction tries every known spelling and scope. Missing fields stay
/// `None` rather than failing the success view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BookingSummary {
    /// Backend booking identifier
    pub booking_id: Option<String>,
    /// Vehicle registration
    pub registration: Option<String>,
    /// Route name
    pub route: Option<String>,
    /// Booked seat numbers
    pub seats: Vec<String>,
    /// M-Pesa receipt number
    pub receipt: Option<String>,
}

impl BookingSummary {
    /// Extract a summary from whatever payload shape is present
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self {
            booking_id: find_string(value, &["booking_id", "bookingId", "id"]),
            registration: find_string(value, &["registration", "matatu_registration"]),
            route: find_string(value, &["route_name", "routeName", "route"]),
            seats: find_seats(value),
            receipt: find_string(
                value,
                &[
                    "mpesa_receipt",
                    "mpesa_receipt_number",
                    "MpesaReceiptNumber",
                    "receipt",
                ],
            ),
        }
    }
}

/// Scopes searched for summary fields, in priority order
fn scopes(value: &Value) -> impl Iterator<Item = &Value> {
    std::iter::once(value)
        .chain(value.get("booking"))
        .chain(value.get("data"))
}

/// First string (or number rendered as string) found under any key in any scope
fn find_string(value: &Value, keys: &[&str]) -> Option<String> {
    for scope in scopes(value) {
        for key in keys {
            match scope.get(key) {
                Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
                Some(Value::Number(n)) => return Some(n.to_string()),
                _ => {},
            }
        }
    }
    None
}

/// Seat numbers from an array of strings/numbers or a comma-separated string
fn find_seats(value: &Value) -> Vec<String> {
    for scope in scopes(value) {
        for key in ["seats", "seat_numbers", "seatNumbers"] {
            match scope.get(key) {
                Some(Value::Array(items)) => {
                    return items
                        .iter()
                        .filter_map(|item| match item {
                            Value::String(s) => Some(s.clone()),
                            Value::Number(n) => Some(n.to_string()),
                            _ => None,
                        })
                        .collect();
                },
                Some(Value::String(s)) if !s.is_empty() => {
                    return s.split(',').map(|part| part.trim().to_string()).collect();
                },
                _ => {},
            }
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

    use super::*;
    use serde_json::json;

    #[test]
    fn every_status_has_a_distinct_title() {
        let statuses = [
            None,
            Some(PaymentStatus::StkPushed),
            Some(PaymentStatus::Processing),
            Some(PaymentStatus::Completed),
            Some(PaymentStatus::Failed),
            Some(PaymentStatus::Cancelled),
            Some(PaymentStatus::Expired),
            Some(PaymentStatus::RefundRequired),
            Some(PaymentStatus::Unknown),
        ];

        let titles: Vec<&str> = statuses.iter().map(|s| status_display(*s).title).collect();
        let mut unique = titles.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), titles.len());
    }

    #[test]
    fn terminal_statuses_render_red_except_refund() {
        assert_eq!(status_display(Some(PaymentStatus::Failed)).color, "red");
        assert_eq!(status_display(Some(PaymentStatus::Cancelled)).color, "red");
        assert_eq!(status_display(Some(PaymentStatus::Expired)).color, "red");
        assert_eq!(
            status_display(Some(PaymentStatus::RefundRequired)).color,
            "orange"
        );
        assert_eq!(status_display(Some(PaymentStatus::Completed)).color, "green");
    }

    #[test]
    fn summary_from_flat_payload() {
        let payload = json!({
            "booking_id": 88,
            "registration": "KDA 123X",
            "route_name": "Main Campus - Town",
            "seats": ["12", "14"],
            "mpesa_receipt": "QGH7K1XYZP",
        });

        let summary = BookingSummary::from_value(&payload);
        assert_eq!(summary.booking_id.as_deref(), Some("88"));
        assert_eq!(summary.registration.as_deref(), Some("KDA 123X"));
        assert_eq!(summary.route.as_deref(), Some("Main Campus - Town"));
        assert_eq!(summary.seats, vec!["12", "14"]);
        assert_eq!(summary.receipt.as_deref(), Some("QGH7K1XYZP"));
    }

    #[test]
    fn summary_from_nested_booking_payload() {
        let payload = json!({
            "status": "completed",
            "booking": {
                "id": "bk-55",
                "registration": "KCB 889J",
                "route": "Stage - Library",
                "seat_numbers": [3, 4],
            },
            "MpesaReceiptNumber": "ABCD1234",
        });

        let summary = BookingSummary::from_value(&payload);
        assert_eq!(summary.booking_id.as_deref(), Some("bk-55"));
        assert_eq!(summary.registration.as_deref(), Some("KCB 889J"));
        assert_eq!(summary.route.as_deref(), Some("Stage - Library"));
        assert_eq!(summary.seats, vec!["3", "4"]);
        assert_eq!(summary.receipt.as_deref(), Some("ABCD1234"));
    }

    #[test]
    fn summary_from_data_scope_with_comma_seats() {
        let payload = json!({
            "data": {
                "booking_id": "901",
                "seats": "7, 8, 9",
            }
        });

        let summary = BookingSummary::from_value(&payload);
        assert_eq!(summary.booking_id.as_deref(), Some("901"));
        assert_eq!(summary.seats, vec!["7", "8", "9"]);
        assert!(summary.receipt.is_none());
    }

    #[test]
    fn summary_of_empty_payload_is_all_none() {
        let summary = BookingSummary::from_value(&Value::Null);
        assert_eq!(summary, BookingSummary::default());
    }

    #[test]
    fn notice_texts_are_user_readable() {
        assert!(Notice::LockExpired.to_string().contains("reservation expired"));
        assert!(
            Notice::PollingAbandoned
                .to_string()
                .contains("My Bookings")
        );
        assert!(Notice::StatusCheckTimeout.to_string().contains("SMS"));
        assert!(
            Notice::SessionExpiryWarning { minutes_left: 5 }
                .to_string()
                .contains("5 minutes")
        );
        assert!(
            Notice::SeatTaken {
                seat_number: "12".to_string()
            }
            .to_string()
            .contains("Seat 12")
        );
    }

    #[test]
    fn default_terminal_messages_cover_the_retriable_statuses() {
        assert!(default_terminal_message(PaymentStatus::Failed).contains("try again"));
        assert!(default_terminal_message(PaymentStatus::Cancelled).contains("cancelled"));
        assert!(default_terminal_message(PaymentStatus::Expired).contains("expired"));
    }
}
