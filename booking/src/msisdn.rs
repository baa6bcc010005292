//! Safaricom MSISDN validation and normalization
//!
//! M-Pesa payment initiation requires a Safaricom subscriber number. The
//! backend accepts exactly one canonical form (`254XXXXXXXXX`), while users
//! type local (`07XX...`, `01XX...`), international (`254...`), or
//! plus-prefixed (`+254...`) variants. [`Msisdn::parse`] accepts all three
//! and canonicalizes before anything touches the network.

use serde::{Deserialize, Serialize};

use crate::error::BookingError;

/// A validated, canonical Safaricom mobile number (`254XXXXXXXXX`, 12 digits)
///
/// The only way to construct an `Msisdn` is through [`Msisdn::parse`], so a
/// value of this type is always safe to submit to the payments endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Msisdn(String);

impl Msisdn {
    /// Parse and normalize a phone number entered by the user
    ///
    /// Accepted shapes (X is any digit, the subscriber prefix must be `7`
    /// or `1`):
    ///
    /// - `0XXXXXXXXX` (local, 10 digits)
    /// - `254XXXXXXXXX` (international, 12 digits)
    /// - `+254XXXXXXXXX` (plus-prefixed international)
    ///
    /// All are canonicalized to `254XXXXXXXXX`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidPhoneNumber`] for anything else. No
    /// network call is made on failure; the message is rendered inline.
    pub fn parse(input: &str) -> Result<Self, BookingError> {
        let trimmed = input.trim();

        let subscriber = trimmed
            .strip_prefix("+254")
            .or_else(|| trimmed.strip_prefix("254"))
            .or_else(|| trimmed.strip_prefix('0'))
            .ok_or(BookingError::InvalidPhoneNumber)?;

        let mut chars = subscriber.chars();
        let leading = chars.next().ok_or(BookingError::InvalidPhoneNumber)?;

        if leading != '7' && leading != '1' {
            return Err(BookingError::InvalidPhoneNumber);
        }

        let rest: Vec<char> = chars.collect();
        if rest.len() != 8 || !rest.iter().all(char::is_ascii_digit) {
            return Err(BookingError::InvalidPhoneNumber);
        }

        Ok(Self(format!("254{subscriber}")))
    }

    /// The canonical `254XXXXXXXXX` form
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Msisdn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Msisdn {
    type Error = BookingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Msisdn> for String {
    fn from(msisdn: Msisdn) -> Self {
        msisdn.0
    }
}
