//! Session countdown reducer
//!
//! One-hour booking session measured by a one-second tick chain, with a
//! single warning when five minutes remain and a full teardown at zero:
//! the seat refresh chain dies, the selection is dropped, and the shell is
//! told to redirect to login via the `expired` flag.

use std::marker::PhantomData;
use std::time::Duration;

use moihub_core::{Effect, Reducer, SmallVec, smallvec};

use crate::actions::BookingAction;
use crate::config::SessionConfig;
use crate::display::Notice;
use crate::environment::{BookingEnvironment, BookingGateway, DraftStore};
use crate::state::BookingState;

type Effects = SmallVec<[Effect<BookingAction>; 4]>;

/// Reducer slice for the session-wide expiry countdown
pub struct SessionReducer<G, D> {
    config: SessionConfig,
    _providers: PhantomData<fn() -> (G, D)>,
}

impl<G, D> SessionReducer<G, D> {
    /// Build the slice from its configuration
    #[must_use]
    pub const fn new(config: SessionConfig) -> Self {
        Self {
            config,
            _providers: PhantomData,
        }
    }
}

impl<G, D> Clone for SessionReducer<G, D> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            _providers: PhantomData,
        }
    }
}

impl<G, D> Reducer for SessionReducer<G, D>
where
    G: BookingGateway + 'static,
    D: DraftStore + 'static,
{
    type State = BookingState;
    type Action = BookingAction;
    type Environment = BookingEnvironment<G, D>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> Effects {
        match action {
            BookingAction::StartSessionCountdown => self.start(state),
            BookingAction::SessionTicked => self.tick(state),
            _ => smallvec![],
        }
    }
}

impl<G, D> SessionReducer<G, D> {
    /// Arm the countdown if it is not already running
    fn start(&self, state: &mut BookingState) -> Effects {
        if state.session.active {
            tracing::debug!("Session countdown already running");
            return smallvec![];
        }

        state.session.active = true;
        state.session.remaining_secs = self.config.ttl_secs;
        state.session.warned = false;
        state.session.expired = false;

        tracing::info!(ttl_secs = self.config.ttl_secs, "Session countdown started");
        smallvec![Effect::delay(
            Duration::from_secs(1),
            BookingAction::SessionTicked,
        )]
    }

    /// One second elapsed: warn at the threshold, tear down at zero
    fn tick(&self, state: &mut BookingState) -> Effects {
        if !state.session.active {
            return smallvec![];
        }

        state.session.remaining_secs = state.session.remaining_secs.saturating_sub(1);

        if state.session.remaining_secs == self.config.warn_at_secs && !state.session.warned {
            state.session.warned = true;
            state.last_notice = Some(Notice::SessionExpiryWarning {
                minutes_left: self.config.warn_at_secs / 60,
            });
            metrics::counter!("booking.session.expiry_warned").increment(1);
            tracing::warn!(
                remaining_secs = state.session.remaining_secs,
                "Session expiry warning"
            );
        }

        if state.session.remaining_secs > 0 {
            return smallvec![Effect::delay(
                Duration::from_secs(1),
                BookingAction::SessionTicked,
            )];
        }

        // Expired: stop every chain this session was driving
        state.session.active = false;
        state.session.expired = true;
        state.watching = false;
        state.selection = None;
        state.lock_seq += 1;
        state.last_notice = Some(Notice::SessionExpired);

        metrics::counter!("booking.session.expired").increment(1);
        tracing::warn!("Session expired");
        smallvec![]
    }
}
