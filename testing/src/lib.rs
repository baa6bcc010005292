//! # MoiHub Testing
//!
//! Testing utilities and helpers for the MoiHub booking confirmation engine.
//!
//! This crate provides:
//! - Deterministic clocks for time-dependent reducers
//! - A fluent Given-When-Then API for single reducer transitions
//! - A harness for multi-step scenarios (countdowns, polling rounds)
//! - Assertion helpers for effect descriptions
//!
//! ## Example
//!
//! ```ignore
//! use moihub_testing::{ReducerHarness, mocks::ManualClock};
//!
//! let clock = ManualClock::new(departure_day());
//! let env = test_environment(clock.clone());
//! let mut harness = ReducerHarness::new(reducer, BookingState::default(), env);
//!
//! harness.send(BookingAction::PaymentInitiated { payment_id: 7.into() });
//!
//! // Five minutes later the polling deadline has passed
//! clock.advance(chrono::Duration::minutes(5));
//! harness.send(BookingAction::PollTick { payment_id: 7.into() });
//!
//! assert!(harness.state().payment_expired());
//! ```

use chrono::{DateTime, Utc};
use moihub_core::environment::Clock;

pub mod reducer_test;

/// Mock implementations of Environment traits
///
/// Deterministic stand-ins for the ambient dependencies reducers read
/// through their environment. Domain-specific mocks (payment gateways,
/// draft stores, event sources) live next to the code they fake.
pub mod mocks {
    #![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
    #![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use moihub_testing::mocks::FixedClock;
    /// use moihub_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Manually advanced clock for tests that travel through time
    ///
    /// Clones share the same underlying instant, so a test can keep one
    /// handle while the environment under test holds another:
    ///
    /// ```
    /// use moihub_testing::mocks::{ManualClock, test_clock};
    /// use moihub_core::environment::Clock;
    ///
    /// let clock = ManualClock::new(test_clock().now());
    /// let handle = clock.clone();
    ///
    /// handle.advance(chrono::Duration::minutes(5));
    /// assert_eq!(clock.now(), test_clock().now() + chrono::Duration::minutes(5));
    /// ```
    ///
    /// Use this for deadline behavior: absolute polling ceilings, lock
    /// expiry measured against wall time, session countdowns.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a new manual clock starting at the given instant
        #[must_use]
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Arc::new(Mutex::new(start)),
            }
        }

        /// Advance the clock by the given duration
        pub fn advance(&self, by: chrono::Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }

        /// Jump the clock to a specific instant
        pub fn set(&self, to: DateTime<Utc>) {
            *self.now.lock().unwrap() = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock};
pub use reducer_test::{ReducerHarness, ReducerTest, assertions};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_manual_clock_advances_across_clones() {
        let clock = ManualClock::new(test_clock().now());
        let handle = clock.clone();

        handle.advance(chrono::Duration::seconds(300));

        assert_eq!(
            clock.now(),
            test_clock().now() + chrono::Duration::seconds(300)
        );
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::new(test_clock().now());
        let later = test_clock().now() + chrono::Duration::hours(1);

        clock.set(later);

        assert_eq!(clock.now(), later);
    }
}
