//! MoiHub booking API client implementation

use crate::{
    bookings::{
        CheckSeatResponse, InitiatePaymentRequest, InitiatePaymentResponse, LockSeatResponse,
        StatusSnapshot,
    },
    error::{ApiError, GENERIC_FAILURE_TEXT},
    events::{EventStream, RealtimeEvent},
    types::PaymentId,
};
use async_stream::stream;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

/// Event kinds the booking flow consumes; frames tagged with anything
/// else are dropped without an error.
const KNOWN_EVENT_KINDS: [&str; 3] = ["payment_requested", "payment_status_update", "seat_update"];

/// MoiHub booking API client
///
/// One instance serves every endpoint the booking flow touches:
/// payment initiation, status polling, seat locks, availability
/// checks, and the realtime event stream. All requests carry the
/// session's bearer token.
#[derive(Clone)]
pub struct MoiHubClient {
    client: Client,
    token: String,
    base_url: String,
}

impl MoiHubClient {
    /// Create a new client with the session token from the environment
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MissingToken`] if `MOIHUB_API_TOKEN` is not set
    pub fn from_env() -> Result<Self, ApiError> {
        let token = std::env::var("MOIHUB_API_TOKEN").map_err(|_| ApiError::MissingToken)?;

        Ok(Self::new(token))
    }

    /// Create a new client with an explicit session token
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            base_url: "https://api.moihub.co.ke/api".to_string(),
        }
    }

    /// Builder: point the client at a different API host
    ///
    /// Mostly for tests against a local mock server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Initiate an M-Pesa payment for a booking
    ///
    /// On success the backend has dispatched the STK push and assigned
    /// a payment ID for status observation.
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API rejections (the
    /// backend's `message` passes through verbatim), or parsing failures
    pub async fn initiate_payment(
        &self,
        request: &InitiatePaymentRequest,
    ) -> Result<InitiatePaymentResponse, ApiError> {
        let response = self
            .client
            .post(format!("{}/bookings/payments/initiate", self.base_url))
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json::<InitiatePaymentResponse>()
                .await
                .map_err(|e| ApiError::ResponseParseFailed(e.to_string())),
            StatusCode::TOO_MANY_REQUESTS => Err(ApiError::RateLimited),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(api_error(status, &body))
            },
        }
    }

    /// Fetch the current status of a payment attempt
    ///
    /// The full response body is preserved in the snapshot so the
    /// success view can extract booking details from it.
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or a body
    /// without a usable `status` field
    pub async fn payment_status(&self, payment_id: &PaymentId) -> Result<StatusSnapshot, ApiError> {
        let response = self
            .client
            .get(format!(
                "{}/bookings/payments/{}/status",
                self.base_url, payment_id
            ))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let value = response
                    .json::<serde_json::Value>()
                    .await
                    .map_err(|e| ApiError::ResponseParseFailed(e.to_string()))?;
                StatusSnapshot::from_value(value)
                    .map_err(|e| ApiError::ResponseParseFailed(e.to_string()))
            },
            StatusCode::TOO_MANY_REQUESTS => Err(ApiError::RateLimited),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(api_error(status, &body))
            },
        }
    }

    /// Request a short-lived server-side hold on a seat
    ///
    /// # Errors
    ///
    /// Returns errors for network failures or API rejections; a seat
    /// already held by someone else comes back as an API error with the
    /// backend's wording
    pub async fn lock_seat(
        &self,
        matatu_id: &str,
        seat_id: &str,
    ) -> Result<LockSeatResponse, ApiError> {
        let response = self
            .client
            .post(format!(
                "{}/bookings/{}/lock/{}",
                self.base_url, matatu_id, seat_id
            ))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json::<LockSeatResponse>()
                .await
                .map_err(|e| ApiError::ResponseParseFailed(e.to_string())),
            StatusCode::TOO_MANY_REQUESTS => Err(ApiError::RateLimited),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(api_error(status, &body))
            },
        }
    }

    /// Check the availability of one seat
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or parsing
    /// failures; callers in the grid-refresh path map an error to an
    /// unknown (not selectable) status instead of surfacing it
    pub async fn check_seat(
        &self,
        matatu_id: &str,
        seat_number: &str,
    ) -> Result<CheckSeatResponse, ApiError> {
        let response = self
            .client
            .get(format!("{}/bookings/{}/check-seat", self.base_url, matatu_id))
            .query(&[("seat_number", seat_number)])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json::<CheckSeatResponse>()
                .await
                .map_err(|e| ApiError::ResponseParseFailed(e.to_string())),
            StatusCode::TOO_MANY_REQUESTS => Err(ApiError::RateLimited),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(api_error(status, &body))
            },
        }
    }

    /// Open the realtime event stream
    ///
    /// Returns a stream of [`RealtimeEvent`] items parsed from
    /// server-sent `data:` frames. Frames tagged with event kinds the
    /// booking flow does not consume are skipped; malformed frames for
    /// known kinds surface as item-level errors. The stream ends when
    /// the server closes the connection.
    ///
    /// # Errors
    ///
    /// Returns errors for connection failures or an unsuccessful
    /// response to the stream request
    pub async fn events(&self) -> Result<EventStream, ApiError> {
        let response = self
            .client
            .get(format!("{}/bookings/events/stream", self.base_url))
            .bearer_auth(&self.token)
            .header("accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            if status == StatusCode::UNAUTHORIZED {
                return Err(ApiError::Unauthorized);
            }
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        let byte_stream = response.bytes_stream();

        Ok(Box::pin(stream! {
            let mut buffer = String::new();

            for await chunk in byte_stream {
                match chunk {
                    Ok(bytes) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));

                        // Parse SSE frames (lines starting with "data: ");
                        // comment/heartbeat lines fall through untouched
                        while let Some(pos) = buffer.find('\n') {
                            let line = buffer[..pos].trim().to_string();
                            buffer.drain(..=pos);

                            if let Some(json_data) = line.strip_prefix("data: ") {
                                match parse_event_frame(json_data) {
                                    Ok(Some(event)) => yield Ok(event),
                                    Ok(None) => {}, // not an event kind we consume
                                    Err(e) => yield Err(e),
                                }
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(ApiError::StreamFailed(e.to_string()));
                        break;
                    }
                }
            }
        }))
    }
}

/// Parse one `data:` frame into a realtime event
///
/// Returns `Ok(None)` for frames tagged with event kinds outside the
/// booking flow's interest.
fn parse_event_frame(json_data: &str) -> Result<Option<RealtimeEvent>, ApiError> {
    let value: serde_json::Value = serde_json::from_str(json_data)
        .map_err(|e| ApiError::ResponseParseFailed(e.to_string()))?;

    let known = value
        .get("event")
        .and_then(|kind| kind.as_str())
        .is_some_and(|kind| KNOWN_EVENT_KINDS.contains(&kind));
    if !known {
        return Ok(None);
    }

    serde_json::from_value::<RealtimeEvent>(value)
        .map(Some)
        .map_err(|e| ApiError::ResponseParseFailed(e.to_string()))
}

/// Build the error for a non-2xx response, surfacing the backend's
/// `message` field verbatim when the body carries one
fn api_error(status: StatusCode, body: &str) -> ApiError {
    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        message: Option<String>,
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| GENERIC_FAILURE_TEXT.to_string());

    ApiError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;
    use crate::types::PaymentStatus;

    #[test]
    fn test_client_creation() {
        let client = MoiHubClient::new("test-token");
        assert_eq!(client.token, "test-token");
        assert_eq!(client.base_url, "https://api.moihub.co.ke/api");
    }

    #[test]
    fn test_with_base_url() {
        let client = MoiHubClient::new("test-token").with_base_url("http://127.0.0.1:9999");
        assert_eq!(client.base_url, "http://127.0.0.1:9999");
    }

    #[test]
    fn test_api_error_uses_backend_message() {
        let err = api_error(StatusCode::BAD_REQUEST, r#"{"message":"Seat taken"}"#);
        assert_eq!(
            err,
            ApiError::Api {
                status: 400,
                message: "Seat taken".to_string(),
            }
        );
    }

    #[test]
    fn test_api_error_falls_back_to_generic_text() {
        let err = api_error(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert_eq!(
            err,
            ApiError::Api {
                status: 500,
                message: GENERIC_FAILURE_TEXT.to_string(),
            }
        );
    }

    #[test]
    fn test_parse_event_frame_known_kind() {
        let event = parse_event_frame(
            r#"{"event":"payment_status_update","status":"processing"}"#,
        )
        .unwrap();
        assert!(matches!(
            event,
            Some(RealtimeEvent::PaymentStatusUpdate {
                status: PaymentStatus::Processing,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_event_frame_skips_foreign_kinds() {
        let event = parse_event_frame(r#"{"event":"driver_location","lat":-0.39}"#).unwrap();
        assert!(event.is_none());
    }

    #[test]
    fn test_parse_event_frame_rejects_malformed_known_kind() {
        // seat_update without its required fields is an error, not a skip
        let result = parse_event_frame(r#"{"event":"seat_update"}"#);
        assert!(result.is_err());
    }
}
