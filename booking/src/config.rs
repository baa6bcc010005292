//! Configuration for the booking coordinator
//!
//! All timing constants of the flow live here with their production values
//! as defaults: the 6s fallback poll, the 3-failure and 5-minute poller
//! ceilings, the 15s push-silence grace, the 5s seat refresh, the 300s seat
//! lock, the one-hour session with its 5-minute warning, and the bounded
//! channel reconnect policy. Tests shrink the intervals through the
//! `with_*` builders; production code uses `Default`.

use std::time::Duration;

use moihub_runtime::RetryPolicy;

/// Payment session and fallback poller settings
#[derive(Clone, Debug)]
pub struct PaymentConfig {
    /// Interval between fallback status polls
    pub poll_interval: Duration,

    /// Consecutive poll failures after which polling is abandoned
    pub max_poll_failures: u32,

    /// Absolute ceiling on polling; non-terminal past this forces `expired`
    pub poll_deadline: Duration,

    /// Push silence after initiation before the fallback poller starts
    pub push_grace: Duration,
}

impl PaymentConfig {
    /// Production defaults: 6s poll, 3 failures, 5 minute deadline, 15s grace
    #[must_use]
    pub const fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(6),
            max_poll_failures: 3,
            poll_deadline: Duration::from_secs(300),
            push_grace: Duration::from_secs(15),
        }
    }

    /// Set the fallback poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the consecutive-failure ceiling
    #[must_use]
    pub const fn with_max_poll_failures(mut self, failures: u32) -> Self {
        self.max_poll_failures = failures;
        self
    }

    /// Set the absolute polling deadline
    #[must_use]
    pub const fn with_poll_deadline(mut self, deadline: Duration) -> Self {
        self.poll_deadline = deadline;
        self
    }

    /// Set the push-silence grace period
    #[must_use]
    pub const fn with_push_grace(mut self, grace: Duration) -> Self {
        self.push_grace = grace;
        self
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Seat grid refresh and lock lease settings
#[derive(Clone, Debug)]
pub struct SeatConfig {
    /// Interval between full seat-grid availability refreshes
    pub refresh_interval: Duration,

    /// Seat lock lease in seconds; the local countdown starts here
    pub lock_ttl_secs: u32,
}

impl SeatConfig {
    /// Production defaults: 5s refresh, 300s lock
    #[must_use]
    pub const fn new() -> Self {
        Self {
            refresh_interval: Duration::from_secs(5),
            lock_ttl_secs: 300,
        }
    }

    /// Set the grid refresh interval
    #[must_use]
    pub const fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Set the seat lock lease in seconds
    #[must_use]
    pub const fn with_lock_ttl_secs(mut self, secs: u32) -> Self {
        self.lock_ttl_secs = secs;
        self
    }
}

impl Default for SeatConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Session-wide expiry countdown settings
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Total session lifetime in seconds
    pub ttl_secs: u32,

    /// Remaining seconds at which the one-time expiry warning fires
    pub warn_at_secs: u32,
}

impl SessionConfig {
    /// Production defaults: one hour session, warning at five minutes left
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ttl_secs: 3600,
            warn_at_secs: 300,
        }
    }

    /// Set the session lifetime in seconds
    #[must_use]
    pub const fn with_ttl_secs(mut self, secs: u32) -> Self {
        self.ttl_secs = secs;
        self
    }

    /// Set the warning threshold in seconds
    #[must_use]
    pub const fn with_warn_at_secs(mut self, secs: u32) -> Self {
        self.warn_at_secs = secs;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Realtime channel reconnect settings
///
/// Reconnection is bounded, not infinite: when the budget is exhausted the
/// channel reports itself unavailable and the fallback poller takes over.
#[derive(Clone, Debug)]
pub struct ChannelConfig {
    /// Maximum reconnect attempts per disconnection
    pub max_attempts: u32,

    /// Delay between reconnect attempts (flat, no exponential growth)
    pub retry_delay: Duration,
}

impl ChannelConfig {
    /// Production defaults: 5 attempts, 1s apart
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Set the reconnect attempt budget
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the flat delay between reconnect attempts
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Render as a runtime [`RetryPolicy`] with flat backoff
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_attempts(self.max_attempts)
            .with_initial_delay(self.retry_delay)
            .with_max_delay(self.retry_delay)
            .with_backoff_multiplier(1.0)
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate configuration for the whole booking flow
#[derive(Clone, Debug, Default)]
pub struct BookingConfig {
    /// Payment session and poller settings
    pub payment: PaymentConfig,

    /// Seat grid and lock settings
    pub seats: SeatConfig,

    /// Session countdown settings
    pub session: SessionConfig,

    /// Realtime channel settings
    pub channel: ChannelConfig,
}

impl BookingConfig {
    /// Production defaults for every component
    #[must_use]
    pub const fn new() -> Self {
        Self {
            payment: PaymentConfig::new(),
            seats: SeatConfig::new(),
            session: SessionConfig::new(),
            channel: ChannelConfig::new(),
        }
    }

    /// Replace the payment settings
    #[must_use]
    pub fn with_payment(mut self, payment: PaymentConfig) -> Self {
        self.payment = payment;
        self
    }

    /// Replace the seat settings
    #[must_use]
    pub fn with_seats(mut self, seats: SeatConfig) -> Self {
        self.seats = seats;
        self
    }

    /// Replace the session settings
    #[must_use]
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Replace the channel settings
    #[must_use]
    pub fn with_channel(mut self, channel: ChannelConfig) -> Self {
        self.channel = channel;
        self
    }
}
