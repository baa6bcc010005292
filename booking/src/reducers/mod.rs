//! Reducers for the booking confirmation machine
//!
//! The machine is split into three slices that share [`BookingState`] and
//! [`BookingAction`]: payment session + fallback poller, seat reservation,
//! and the session countdown. [`BookingReducer`] runs them in sequence and
//! concatenates their effects, the same shape as
//! [`moihub_core::composition::combine_reducers`] but statically typed so
//! the store can clone it.

pub mod payment;
pub mod seats;
pub mod session;

use moihub_core::{Effect, Reducer, SmallVec};

use crate::actions::BookingAction;
use crate::config::BookingConfig;
use crate::environment::{BookingEnvironment, BookingGateway, DraftStore};
use crate::state::BookingState;

pub use payment::PaymentReducer;
pub use seats::SeatReducer;
pub use session::SessionReducer;

/// The combined reducer for the whole booking flow
pub struct BookingReducer<G, D> {
    payment: PaymentReducer<G, D>,
    seats: SeatReducer<G, D>,
    session: SessionReducer<G, D>,
}

impl<G, D> BookingReducer<G, D> {
    /// Build the combined reducer from configuration
    #[must_use]
    pub fn new(config: &BookingConfig) -> Self {
        Self {
            payment: PaymentReducer::new(config.payment.clone()),
            seats: SeatReducer::new(config.seats.clone()),
            session: SessionReducer::new(config.session.clone()),
        }
    }
}

impl<G, D> Clone for BookingReducer<G, D> {
    fn clone(&self) -> Self {
        Self {
            payment: self.payment.clone(),
            seats: self.seats.clone(),
            session: self.session.clone(),
        }
    }
}

impl<G, D> Reducer for BookingReducer<G, D>
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
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let mut effects = self.payment.reduce(state, action.clone(), env);
        effects.extend(self.seats.reduce(state, action.clone(), env));
        effects.extend(self.session.reduce(state, action, env));
        effects
    }
}
