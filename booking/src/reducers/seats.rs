//! Seat reservation reducer: grid watching, selection locks, and the lease
//! countdown
//!
//! This slice owns the seat map: a 5-second availability refresh chain, the
//! select/deselect toggle backed by server-side locks, the 300-second local
//! lease countdown (generation-tagged so superseded countdowns die), and
//! reconciliation of push `seat_update` events against the current
//! selection. At most one seat is selected per session.

use std::marker::PhantomData;
use std::sync::Arc;

use moihub_api::{LockSeatResponse, SeatAvailability};
use moihub_core::{Effect, Reducer, SmallVec, smallvec};

use crate::actions::BookingAction;
use crate::config::SeatConfig;
use crate::display::Notice;
use crate::environment::{BookingEnvironment, BookingGateway, DraftStore};
use crate::state::{BookingDraft, BookingState, SeatLock, SeatView};

type Effects = SmallVec<[Effect<BookingAction>; 4]>;

/// Reducer slice for the seat grid and the active selection
pub struct SeatReducer<G, D> {
    config: SeatConfig,
    _providers: PhantomData<fn() -> (G, D)>,
}

impl<G, D> SeatReducer<G, D> {
    /// Build the slice from its configuration
    #[must_use]
    pub const fn new(config: SeatConfig) -> Self {
        Self {
            config,
            _providers: PhantomData,
        }
    }
}

impl<G, D> Clone for SeatReducer<G, D> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            _providers: PhantomData,
        }
    }
}

impl<G, D> Reducer for SeatReducer<G, D>
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
    ) -> Effects {
        match action {
            BookingAction::WatchSeats { seats } => self.watch(state, env, seats),
            BookingAction::RefreshSeatStatuses => self.refresh(state, env),
            BookingAction::SeatStatusFetched {
                seat_number,
                status,
                locked_by_you,
            } => Self::status_fetched(state, env, seat_number, status, locked_by_you),
            BookingAction::ToggleSeat { seat_number } => Self::toggle(state, env, seat_number),
            BookingAction::SeatLockResolved {
                seat_number,
                result,
            } => self.lock_resolved(state, env, seat_number, result),
            BookingAction::LockCountdownTicked { seq } => Self::countdown_ticked(state, env, seq),
            BookingAction::SeatUpdateObserved {
                status,
                seat_number,
            } => {
                Self::update_observed(state, &seat_number, status);
                smallvec![]
            },
            BookingAction::DraftLoaded { draft } => {
                tracing::debug!(seats = ?draft.seats, "Booking draft restored");
                state.draft = Some(draft);
                smallvec![]
            },
            _ => smallvec![],
        }
    }
}

impl<G, D> SeatReducer<G, D>
where
    G: BookingGateway + 'static,
    D: DraftStore + 'static,
{
    /// Seed the grid for the layout and start the refresh chain
    fn watch(
        &self,
        state: &mut BookingState,
        env: &BookingEnvironment<G, D>,
        seats: Vec<String>,
    ) -> Effects {
        if state.watching {
            tracing::debug!("Seat watching already active");
            return smallvec![];
        }

        state.watching = true;
        for seat_number in seats {
            state.seats.entry(seat_number).or_default();
        }

        tracing::info!(seats = state.seats.len(), "Watching seat availability");
        smallvec![
            Self::fetch_round(state, env),
            Effect::delay(
                self.config.refresh_interval,
                BookingAction::RefreshSeatStatuses,
            ),
        ]
    }

    /// One refresh interval elapsed: fetch the grid again and reschedule
    ///
    /// The chain dies silently once `watching` is cleared.
    fn refresh(&self, state: &BookingState, env: &BookingEnvironment<G, D>) -> Effects {
        if !state.watching {
            return smallvec![];
        }

        smallvec![
            Self::fetch_round(state, env),
            Effect::delay(
                self.config.refresh_interval,
                BookingAction::RefreshSeatStatuses,
            ),
        ]
    }

    /// Per-seat availability checks for every seat on the grid, in parallel
    ///
    /// Failed checks degrade to `Unknown` for that seat instead of erroring
    /// the whole round.
    fn fetch_round(
        state: &BookingState,
        env: &BookingEnvironment<G, D>,
    ) -> Effect<BookingAction> {
        let checks = state
            .seats
            .keys()
            .cloned()
            .map(|seat_number| {
                let gateway = Arc::clone(&env.gateway);
                let registration = env.trip.registration.clone();
                Effect::Future(Box::pin(async move {
                    let action = match gateway.check_seat(&registration, &seat_number).await {
                        Ok(response) => BookingAction::SeatStatusFetched {
                            seat_number,
                            status: response.status,
                            locked_by_you: response.locked_by_you,
                        },
                        Err(err) => {
                            tracing::debug!(seat = %seat_number, error = %err, "Seat check failed");
                            BookingAction::SeatStatusFetched {
                                seat_number,
                                status: SeatAvailability::Unknown,
                                locked_by_you: false,
                            }
                        },
                    };
                    Some(action)
                }))
            })
            .collect();
        Effect::Parallel(checks)
    }

    /// A seat availability report arrived; reconcile it with the selection
    ///
    /// Losing the selected seat to another passenger clears the selection
    /// and the draft, except while a payment session exists: a refresh
    /// racing a settling payment must not tear down the booking it is
    /// paying for.
    fn status_fetched(
        state: &mut BookingState,
        env: &BookingEnvironment<G, D>,
        seat_number: String,
        status: SeatAvailability,
        locked_by_you: bool,
    ) -> Effects {
        state.seats.insert(
            seat_number.clone(),
            SeatView {
                availability: status,
                locked_by_you,
            },
        );

        if !state.is_selected(&seat_number) || state.payment.session.is_some() {
            return smallvec![];
        }

        let lost = match status {
            SeatAvailability::Booked => true,
            SeatAvailability::Locked => !locked_by_you,
            SeatAvailability::Available | SeatAvailability::Unknown => false,
        };
        if !lost {
            return smallvec![];
        }

        metrics::counter!("booking.seats.selection_invalidated").increment(1);
        tracing::warn!(seat = %seat_number, status = ?status, "Selected seat reported taken");
        let cleanup = Self::release_selection(state, env);
        state.last_notice = Some(Notice::SeatTaken { seat_number });
        smallvec![cleanup]
    }

    /// User tapped a seat: deselect, replace, or request a lock
    fn toggle(
        state: &mut BookingState,
        env: &BookingEnvironment<G, D>,
        seat_number: String,
    ) -> Effects {
        if state.payment.session.is_some() {
            tracing::debug!(seat = %seat_number, "Seat toggle ignored during payment session");
            return smallvec![];
        }

        // Tapping the selected seat releases it
        if state.is_selected(&seat_number) {
            tracing::info!(seat = %seat_number, "Seat deselected");
            let cleanup = Self::release_selection(state, env);
            return smallvec![cleanup];
        }

        if !state.seat_view(&seat_number).is_selectable() {
            tracing::debug!(seat = %seat_number, "Seat not selectable");
            return smallvec![];
        }

        let mut effects: Effects = smallvec![];
        // Replacing one selection with another releases the old one first
        if state.selection.is_some() {
            effects.push(Self::release_selection(state, env));
        }

        tracing::info!(seat = %seat_number, "Requesting seat lock");
        let gateway = Arc::clone(&env.gateway);
        let registration = env.trip.registration.clone();
        effects.push(Effect::Future(Box::pin(async move {
            // Seat ids and seat numbers coincide on this backend
            let result = gateway
                .lock_seat(&registration, &seat_number)
                .await
                .map_err(|err| err.user_message());
            Some(BookingAction::SeatLockResolved {
                seat_number,
                result,
            })
        })));
        effects
    }

    /// The lock request resolved: install the selection or surface failure
    fn lock_resolved(
        &self,
        state: &mut BookingState,
        env: &BookingEnvironment<G, D>,
        seat_number: String,
        result: Result<LockSeatResponse, String>,
    ) -> Effects {
        if state.payment.session.is_some() {
            // A payment began while the request was in flight; the
            // selection backing it must not change under it
            tracing::warn!(seat = %seat_number, "Lock resolution ignored during payment session");
            return smallvec![];
        }

        match result {
            Ok(response) if response.success => {
                state.lock_seq += 1;
                let seq = state.lock_seq;
                state.selection = Some(SeatLock {
                    seat_id: response.seat_id,
                    seat_number: seat_number.clone(),
                    remaining_secs: self.config.lock_ttl_secs,
                    seq,
                });
                state.seats.insert(
                    seat_number.clone(),
                    SeatView {
                        availability: SeatAvailability::Locked,
                        locked_by_you: true,
                    },
                );

                let draft = BookingDraft {
                    registration: env.trip.registration.clone(),
                    route: env.trip.route.clone(),
                    seats: vec![seat_number.clone()],
                    departure_time: env.trip.departure_time.clone(),
                };
                state.draft = Some(draft.clone());

                metrics::counter!("booking.seats.locked").increment(1);
                tracing::info!(
                    seat = %seat_number,
                    ttl_secs = self.config.lock_ttl_secs,
                    "Seat locked"
                );

                let drafts = Arc::clone(&env.drafts);
                smallvec![
                    Effect::Future(Box::pin(async move {
                        drafts.save_draft(draft).await;
                        None
                    })),
                    Effect::delay(
                        std::time::Duration::from_secs(1),
                        BookingAction::LockCountdownTicked { seq },
                    ),
                ]
            },
            Ok(_) => {
                metrics::counter!("booking.seats.lock_failed").increment(1);
                tracing::warn!(seat = %seat_number, "Seat lock refused");
                state.last_notice = Some(Notice::LockFailed {
                    message: format!(
                        "Seat {seat_number} could not be held. Please pick another seat."
                    ),
                });
                smallvec![]
            },
            Err(message) => {
                metrics::counter!("booking.seats.lock_failed").increment(1);
                tracing::warn!(seat = %seat_number, error = %message, "Seat lock request failed");
                state.last_notice = Some(Notice::LockFailed { message });
                smallvec![]
            },
        }
    }

    /// One second of the lock lease elapsed
    ///
    /// Ticks carry the generation they were armed with; any tick whose
    /// `seq` no longer matches the live selection belongs to a superseded
    /// countdown and does nothing.
    fn countdown_ticked(
        state: &mut BookingState,
        env: &BookingEnvironment<G, D>,
        seq: u64,
    ) -> Effects {
        let Some(lock) = state.selection.as_mut() else {
            return smallvec![];
        };
        if lock.seq != seq {
            return smallvec![];
        }

        lock.remaining_secs = lock.remaining_secs.saturating_sub(1);
        if lock.remaining_secs > 0 {
            return smallvec![Effect::delay(
                std::time::Duration::from_secs(1),
                BookingAction::LockCountdownTicked { seq },
            )];
        }

        let seat_number = lock.seat_number.clone();
        metrics::counter!("booking.seats.lock_expired").increment(1);
        tracing::info!(seat = %seat_number, "Seat lock expired");

        let cleanup = Self::release_selection(state, env);
        // The server lease has the same TTL; the next refresh corrects drift
        state.seats.insert(
            seat_number,
            SeatView {
                availability: SeatAvailability::Available,
                locked_by_you: false,
            },
        );
        state.last_notice = Some(Notice::LockExpired);
        smallvec![cleanup]
    }

    /// A push `seat_update` arrived; fold it into the grid
    ///
    /// `booked` for the selected seat can only be this session's own
    /// booking settling (the server lock excludes everyone else), so it is
    /// surfaced as confirmation rather than loss.
    fn update_observed(state: &mut BookingState, seat_number: &str, status: SeatAvailability) {
        let selected = state.is_selected(seat_number);
        state.seats.insert(
            seat_number.to_string(),
            SeatView {
                availability: status,
                locked_by_you: selected && status == SeatAvailability::Locked,
            },
        );

        if selected && status == SeatAvailability::Booked {
            metrics::counter!("booking.seats.confirmed").increment(1);
            tracing::info!(seat = %seat_number, "Selected seat confirmed booked");
            state.last_notice = Some(Notice::SeatConfirmed {
                seat_number: seat_number.to_string(),
            });
        }
    }

    /// Drop the selection and draft; returns the draft-store cleanup effect
    ///
    /// Bumping `lock_seq` is what kills the old countdown chain.
    fn release_selection(
        state: &mut BookingState,
        env: &BookingEnvironment<G, D>,
    ) -> Effect<BookingAction> {
        state.selection = None;
        state.lock_seq += 1;
        state.draft = None;

        let drafts = Arc::clone(&env.drafts);
        Effect::Future(Box::pin(async move {
            drafts.clear_draft().await;
            None
        }))
    }
}
