//! Error types for the MoiHub booking API client

use thiserror::Error;

/// Fallback text shown when the backend rejects a request without a
/// usable `message` field in the body.
pub const GENERIC_FAILURE_TEXT: &str = "Something went wrong. Please try again.";

/// Errors that can occur when interacting with the MoiHub booking API
///
/// The enum is `Clone` because actions in the booking flow carry the
/// error that produced them back through the reducer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Missing `MOIHUB_API_TOKEN` environment variable
    #[error("Missing MOIHUB_API_TOKEN environment variable")]
    MissingToken,

    /// HTTP request failed before a response arrived
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response parsing failed
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// Rate limited - too many requests
    #[error("Rate limited - too many requests")]
    RateLimited,

    /// Unauthorized - missing or expired session token
    #[error("Unauthorized - missing or expired session token")]
    Unauthorized,

    /// API returned an error
    ///
    /// `message` is the backend's own wording when the body had one,
    /// otherwise [`GENERIC_FAILURE_TEXT`].
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Event stream processing failed
    #[error("Stream failed: {0}")]
    StreamFailed(String),
}

impl ApiError {
    /// Human-readable text suitable for showing directly to the user
    ///
    /// Backend-provided messages pass through verbatim; transport and
    /// parse failures collapse to the generic fallback so a raw error
    /// string never reaches the screen.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::Unauthorized | Self::MissingToken => {
                "Your session has expired. Please log in again.".to_string()
            },
            Self::RateLimited
            | Self::RequestFailed(_)
            | Self::ResponseParseFailed(_)
            | Self::StreamFailed(_) => GENERIC_FAILURE_TEXT.to_string(),
        }
    }
}
