//! Coordinator: assembles the store, the realtime channel, and recovery
//!
//! [`BookingCoordinator::start`] is the single entry point for a booking
//! screen. It builds the store from configuration, rehydrates a persisted
//! draft, spawns the push channel, arms the session countdown and the seat
//! grid watcher, and resumes an in-flight payment if one was recorded.
//! The shell then drives the running machine through the thin facade:
//! toggle a seat, submit a payment, read state, subscribe to actions.

use std::sync::Arc;
use std::time::Duration;

use moihub_api::{ApiError, MoiHubClient, PaymentStatus, RealtimeEvent};
use moihub_core::environment::{Clock, SystemClock};
use moihub_runtime::{EffectHandle, Store};
use tokio::sync::broadcast;

use crate::actions::{BookingAction, StatusSource};
use crate::channel::{EventHandler, RealtimeChannel};
use crate::config::BookingConfig;
use crate::environment::{BookingEnvironment, BookingGateway, DraftStore, EventSource, TripContext};
use crate::error::BookingError;
use crate::providers::MemoryDraftStore;
use crate::reducers::BookingReducer;
use crate::state::BookingState;

/// The assembled store type for the booking machine
pub type BookingStore<G, D> =
    Store<BookingState, BookingAction, BookingEnvironment<G, D>, BookingReducer<G, D>>;

/// Action broadcast capacity
///
/// A grid refresh fans out one `SeatStatusFetched` per seat, so a slow
/// observer must survive a full-layout burst without lagging.
const ACTION_BROADCAST_CAPACITY: usize = 64;

/// Translates channel callbacks into store actions
///
/// `payment_requested` carries no status of its own; it means the STK push
/// reached the handset, which the machine models as a forced `stk_pushed`
/// observation. The other two events map field-for-field.
struct StoreSink<G, D>
where
    G: BookingGateway + 'static,
    D: DraftStore + 'static,
{
    store: Arc<BookingStore<G, D>>,
}

impl<G, D> EventHandler for StoreSink<G, D>
where
    G: BookingGateway + 'static,
    D: DraftStore + 'static,
{
    async fn on_connected(&self) {
        // Store may already be shutting down; nothing to do then
        let _ = self.store.send(BookingAction::ChannelEstablished).await;
    }

    async fn on_event(&self, event: RealtimeEvent) {
        let action = match event {
            RealtimeEvent::PaymentRequested { .. } => BookingAction::StatusObserved {
                source: StatusSource::Push,
                status: PaymentStatus::StkPushed,
                message: None,
                payload: serde_json::Value::Null,
            },
            RealtimeEvent::PaymentStatusUpdate {
                status,
                message,
                extra,
            } => BookingAction::StatusObserved {
                source: StatusSource::Push,
                status,
                message,
                payload: serde_json::Value::Object(extra),
            },
            RealtimeEvent::SeatUpdate {
                status,
                seat_number,
            } => BookingAction::SeatUpdateObserved {
                status,
                seat_number,
            },
        };

        if let Err(err) = self.store.send(action).await {
            tracing::warn!(error = %err, "Dropped push event, store rejected action");
        }
    }

    async fn on_unavailable(&self, reason: String) {
        let _ = self
            .store
            .send(BookingAction::ChannelUnavailable { reason })
            .await;
    }
}

/// A running booking flow for one trip
///
/// Owns the store and the realtime channel task. Dropping the coordinator
/// without calling [`stop`](Self::stop) detaches the channel task; always
/// stop it when the screen unmounts.
pub struct BookingCoordinator<G, D>
where
    G: BookingGateway + EventSource + 'static,
    D: DraftStore + 'static,
{
    store: Arc<BookingStore<G, D>>,
    channel: Option<RealtimeChannel>,
}

impl<G, D> BookingCoordinator<G, D>
where
    G: BookingGateway + EventSource + 'static,
    D: DraftStore + 'static,
{
    /// Start the booking flow for one trip
    ///
    /// Startup order matters: the draft is rehydrated before any watcher
    /// runs so the first render already shows the recovered selection
    /// summary, and the pending-payment hint is consumed last so resumed
    /// polling finds the channel health already settled.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Store`] if the store rejects one of the
    /// startup actions.
    pub async fn start(
        config: BookingConfig,
        trip: TripContext,
        gateway: Arc<G>,
        drafts: Arc<D>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BookingError> {
        let environment = BookingEnvironment::new(
            Arc::clone(&gateway),
            Arc::clone(&drafts),
            clock,
            trip.clone(),
        );
        let store = Arc::new(Store::with_broadcast_capacity(
            BookingState::default(),
            BookingReducer::new(&config),
            environment,
            ACTION_BROADCAST_CAPACITY,
        ));

        if let Some(draft) = drafts.load_draft().await {
            tracing::info!(seats = draft.seats.len(), "Rehydrating persisted draft");
            store.send(BookingAction::DraftLoaded { draft }).await?;
        }

        let channel = RealtimeChannel::spawn(
            gateway,
            Arc::new(StoreSink {
                store: Arc::clone(&store),
            }),
            config.channel.retry_policy(),
        );

        store.send(BookingAction::StartSessionCountdown).await?;
        store
            .send(BookingAction::WatchSeats {
                seats: trip.seat_layout,
            })
            .await?;

        if let Some(pending) = drafts.take_pending_payment().await {
            tracing::info!(payment_id = %pending.payment_id, "Resuming in-flight payment");
            store
                .send(BookingAction::ResumePayment {
                    payment_id: pending.payment_id,
                    phone: pending.phone,
                })
                .await?;
        }

        Ok(Self {
            store,
            channel: Some(channel),
        })
    }

    /// Select or deselect a seat
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Store`] if the store is shutting down.
    pub async fn toggle_seat(
        &self,
        seat_number: impl Into<String>,
    ) -> Result<EffectHandle, BookingError> {
        Ok(self
            .store
            .send(BookingAction::ToggleSeat {
                seat_number: seat_number.into(),
            })
            .await?)
    }

    /// Submit the payment form with a raw phone input
    ///
    /// Validation happens inside the reducer; a rejected number surfaces
    /// as `payment.form_error`, not as an `Err` here.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Store`] if the store is shutting down.
    pub async fn submit_payment(
        &self,
        phone: impl Into<String>,
    ) -> Result<EffectHandle, BookingError> {
        Ok(self
            .store
            .send(BookingAction::SubmitPayment {
                phone: phone.into(),
            })
            .await?)
    }

    /// Read current state via a closure
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&BookingState) -> T,
    {
        self.store.state(f).await
    }

    /// Subscribe to actions produced by effects
    ///
    /// Status indicators and tests observe the flow through this receiver.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BookingAction> {
        self.store.subscribe_actions()
    }

    /// The underlying store, for request-response waiters
    ///
    /// ```ignore
    /// let terminal = coordinator.store().send_and_wait_for(
    ///     BookingAction::SubmitPayment { phone },
    ///     |action| matches!(action, BookingAction::StatusObserved { status, .. } if status.is_terminal()),
    ///     Duration::from_secs(330),
    /// ).await?;
    /// ```
    #[must_use]
    pub const fn store(&self) -> &Arc<BookingStore<G, D>> {
        &self.store
    }

    /// Stop the channel task, then drain the store
    ///
    /// An armed timer counts as in-flight work until it fires, so
    /// `timeout` must exceed the longest armed interval (the 6-second
    /// poll tick under the default configuration) or this returns
    /// [`moihub_runtime::StoreError::ShutdownTimeout`].
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Store`] if pending effects do not drain
    /// within `timeout`.
    pub async fn stop(mut self, timeout: Duration) -> Result<(), BookingError> {
        if let Some(channel) = self.channel.take() {
            channel.stop().await;
        }
        self.store.shutdown(timeout).await?;
        Ok(())
    }
}

impl<G, D> std::fmt::Debug for BookingCoordinator<G, D>
where
    G: BookingGateway + EventSource + 'static,
    D: DraftStore + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingCoordinator")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl BookingCoordinator<MoiHubClient, MemoryDraftStore> {
    /// Start the production flow: API client from the environment,
    /// in-memory draft store, system clock
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::MissingCredentials`] when no bearer
    /// credential is configured; the shell should redirect to login.
    pub async fn from_env(config: BookingConfig, trip: TripContext) -> Result<Self, BookingError> {
        let client = MoiHubClient::from_env().map_err(|err| match err {
            ApiError::MissingToken => BookingError::MissingCredentials,
            other => BookingError::Api(other),
        })?;
        Self::start(
            config,
            trip,
            Arc::new(client),
            Arc::new(MemoryDraftStore::new()),
            Arc::new(SystemClock),
        )
        .await
    }
}
