//! Error types for the booking coordinator

use moihub_api::ApiError;
use moihub_runtime::StoreError;

/// Errors surfaced by the booking coordinator and its building blocks
///
/// Validation errors (`InvalidPhoneNumber`, `EmptyDraft`) are caught before
/// any network call and rendered inline at the payment form. Credential
/// errors are fatal for the flow and signal a login redirect. Transport
/// errors wrap [`ApiError`] with its user-facing message intact.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    /// Phone number does not match a Safaricom M-Pesa MSISDN
    #[error("Please enter a valid Safaricom number (07XX XXX XXX or 01XX XXX XXX)")]
    InvalidPhoneNumber,

    /// No booking draft exists; payment initiation is not allowed
    #[error("No seats selected. Please pick a seat before paying.")]
    EmptyDraft,

    /// No bearer credential available for the session
    #[error("Your session has expired. Please log in again.")]
    MissingCredentials,

    /// Backend API call failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Store runtime failure (shutdown, channel closed, timeout)
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias for booking results
pub type Result<T> = std::result::Result<T, BookingError>;
