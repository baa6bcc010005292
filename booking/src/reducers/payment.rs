//! Payment session reducer: initiation, the status gate, and the fallback
//! poller
//!
//! This slice owns the payment finite state machine
//! (`None → stk_pushed → processing → terminal`) and the one authoritative
//! transition gate both producers feed: push events arrive as
//! `StatusObserved`, poll results as `PollCompleted`, and the gate ignores
//! anything once the session is terminal. It also owns the poller's two
//! ceilings (3 consecutive failures, 5-minute deadline) and the 15s
//! push-silence grace that activates polling when the channel stays quiet.

use std::marker::PhantomData;
use std::sync::Arc;

use moihub_api::{InitiatePaymentRequest, PaymentId, PaymentStatus, StatusSnapshot};
use moihub_core::{Effect, Reducer, SmallVec, smallvec};
use serde_json::Value;

use crate::actions::{BookingAction, StatusSource};
use crate::config::PaymentConfig;
use crate::display::{Notice, default_terminal_message};
use crate::environment::{BookingEnvironment, BookingGateway, DraftStore};
use crate::error::BookingError;
use crate::msisdn::Msisdn;
use crate::state::{BookingState, ChannelHealth, PaymentSession, PendingPayment, PollerState};

type Effects = SmallVec<[Effect<BookingAction>; 4]>;

/// Reducer slice for the payment session and fallback poller
pub struct PaymentReducer<G, D> {
    config: PaymentConfig,
    _providers: PhantomData<fn() -> (G, D)>,
}

impl<G, D> PaymentReducer<G, D> {
    /// Build the slice from its configuration
    #[must_use]
    pub const fn new(config: PaymentConfig) -> Self {
        Self {
            config,
            _providers: PhantomData,
        }
    }
}

impl<G, D> Clone for PaymentReducer<G, D> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            _providers: PhantomData,
        }
    }
}

impl<G, D> Reducer for PaymentReducer<G, D>
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
            BookingAction::SubmitPayment { phone } => Self::submit(state, &phone, env),
            BookingAction::PaymentInitiated {
                payment_id,
                phone,
                amount,
            } => self.initiated(state, env, payment_id, phone, amount),
            BookingAction::PaymentInitiationFailed { message } => {
                metrics::counter!("booking.payments.initiation_failed").increment(1);
                state.payment.form_error = Some(message);
                smallvec![]
            },
            BookingAction::PushGraceElapsed { payment_id } => {
                self.push_grace_elapsed(state, env, payment_id)
            },
            BookingAction::StartStatusPolling { payment_id } => {
                self.start_poller(state, env, payment_id)
            },
            BookingAction::PollTick { payment_id } => self.poll_tick(state, env, &payment_id),
            BookingAction::PollCompleted { payment_id, result } => {
                self.poll_completed(state, env, payment_id, result)
            },
            BookingAction::StatusObserved {
                source,
                status,
                message,
                payload,
            } => {
                if source == StatusSource::Push {
                    if let Some(session) = state.payment.session.as_mut() {
                        session.push_observed = true;
                    }
                }
                Self::apply_status(state, env, status, message, payload, source)
            },
            BookingAction::ResumePayment { payment_id, phone } => {
                self.resume(state, env, payment_id, phone)
            },
            BookingAction::ChannelEstablished => {
                tracing::debug!("Realtime channel established");
                state.channel = ChannelHealth::Connected;
                smallvec![]
            },
            BookingAction::ChannelUnavailable { reason } => {
                self.channel_unavailable(state, env, reason)
            },
            _ => smallvec![],
        }
    }
}

impl<G, D> PaymentReducer<G, D>
where
    G: BookingGateway + 'static,
    D: DraftStore + 'static,
{
    /// Validate the form and kick off payment initiation
    ///
    /// Validation failures set `form_error` and never touch the network.
    fn submit(
        state: &mut BookingState,
        phone: &str,
        env: &BookingEnvironment<G, D>,
    ) -> Effects {
        if state.payment.session.is_some() {
            tracing::warn!("Payment submission ignored, a session already exists");
            return smallvec![];
        }

        let Some(draft) = state.draft.clone() else {
            state.payment.form_error = Some(BookingError::EmptyDraft.to_string());
            return smallvec![];
        };
        if !draft.is_payable() {
            state.payment.form_error = Some(BookingError::EmptyDraft.to_string());
            return smallvec![];
        }

        let msisdn = match Msisdn::parse(phone) {
            Ok(msisdn) => msisdn,
            Err(err) => {
                state.payment.form_error = Some(err.to_string());
                return smallvec![];
            },
        };

        state.payment.form_error = None;
        let amount = draft.total_amount();
        let request = InitiatePaymentRequest {
            phone_number: msisdn.as_str().to_string(),
            registration: draft.registration,
            route_id: draft.route.id,
            seats: draft.seats,
            departure_time: draft.departure_time,
        };

        metrics::counter!("booking.payments.submitted").increment(1);
        tracing::info!(phone = %msisdn, amount, "Initiating M-Pesa payment");

        let gateway = Arc::clone(&env.gateway);
        smallvec![Effect::Future(Box::pin(async move {
            match gateway.initiate_payment(request).await {
                Ok(response) => Some(BookingAction::PaymentInitiated {
                    payment_id: response.payment_id,
                    phone: msisdn,
                    amount,
                }),
                Err(err) => {
                    tracing::warn!(error = %err, "Payment initiation failed");
                    Some(BookingAction::PaymentInitiationFailed {
                        message: err.user_message(),
                    })
                },
            }
        }))]
    }

    /// Create the session, persist the recovery hint, arm the push grace
    fn initiated(
        &self,
        state: &mut BookingState,
        env: &BookingEnvironment<G, D>,
        payment_id: PaymentId,
        phone: Msisdn,
        amount: u32,
    ) -> Effects {
        if state.payment.session.is_some() {
            tracing::warn!(payment_id = %payment_id, "Initiation resolved but a session already exists, ignoring");
            return smallvec![];
        }

        state.payment.session = Some(PaymentSession {
            payment_id: payment_id.clone(),
            phone: phone.clone(),
            status: PaymentStatus::StkPushed,
            amount,
            created_at: env.clock.now(),
            push_observed: false,
        });

        metrics::counter!("booking.payments.initiated").increment(1);
        tracing::info!(payment_id = %payment_id, "STK push dispatched");

        let drafts = Arc::clone(&env.drafts);
        let hint = PendingPayment {
            payment_id: payment_id.clone(),
            phone,
        };
        let mut effects: Effects = smallvec![
            Effect::Future(Box::pin(async move {
                drafts.save_pending_payment(hint).await;
                None
            })),
            Effect::delay(
                self.config.push_grace,
                BookingAction::PushGraceElapsed {
                    payment_id: payment_id.clone(),
                },
            ),
        ];

        // No push is coming if the channel is already down; poll from the start
        if state.channel.is_down() {
            effects.extend(self.start_poller(state, env, payment_id));
        }

        effects
    }

    /// Push stayed silent through the grace period: fall back to polling
    fn push_grace_elapsed(
        &self,
        state: &mut BookingState,
        env: &BookingEnvironment<G, D>,
        payment_id: PaymentId,
    ) -> Effects {
        let observed = match state.payment.session.as_ref() {
            Some(session) if session.payment_id == payment_id => {
                session.push_observed || !session.status.is_in_flight()
            },
            _ => return smallvec![],
        };
        if observed {
            return smallvec![];
        }

        tracing::info!(payment_id = %payment_id, "No push event within grace period");
        self.start_poller(state, env, payment_id)
    }

    /// Start the fallback poller if one is not already running
    ///
    /// Presence of `state.poller` is the re-entrancy guard: at most one
    /// poller per session, whichever path requested it.
    fn start_poller(
        &self,
        state: &mut BookingState,
        env: &BookingEnvironment<G, D>,
        payment_id: PaymentId,
    ) -> Effects {
        if state.poller.is_some() {
            tracing::debug!(payment_id = %payment_id, "Poller already active");
            return smallvec![];
        }

        let in_flight = state.payment.session.as_ref().is_some_and(|session| {
            session.payment_id == payment_id && session.status.is_in_flight()
        });
        if !in_flight {
            return smallvec![];
        }

        state.poller = Some(PollerState {
            payment_id: payment_id.clone(),
            consecutive_failures: 0,
            started_at: env.clock.now(),
        });

        metrics::counter!("booking.poller.started").increment(1);
        tracing::info!(payment_id = %payment_id, "Fallback status poller started");

        smallvec![Effect::delay(
            self.config.poll_interval,
            BookingAction::PollTick { payment_id },
        )]
    }

    /// One poll interval elapsed: check ceilings, then issue the status read
    fn poll_tick(
        &self,
        state: &mut BookingState,
        env: &BookingEnvironment<G, D>,
        payment_id: &PaymentId,
    ) -> Effects {
        let Some(poller) = state.poller.as_ref() else {
            // Stale tick from a cancelled chain
            return smallvec![];
        };
        if poller.payment_id != *payment_id {
            return smallvec![];
        }

        if state
            .payment
            .session
            .as_ref()
            .is_none_or(|session| session.status.is_terminal())
        {
            state.poller = None;
            return smallvec![];
        }

        let elapsed = env
            .clock
            .now()
            .signed_duration_since(poller.started_at)
            .to_std()
            .unwrap_or_default();
        if elapsed >= self.config.poll_deadline {
            metrics::counter!("booking.poller.forced_expiry").increment(1);
            tracing::warn!(
                payment_id = %payment_id,
                elapsed_secs = elapsed.as_secs(),
                "Polling deadline reached without a terminal status, forcing expiry"
            );
            state.poller = None;
            let effects = Self::apply_status(
                state,
                env,
                PaymentStatus::Expired,
                None,
                Value::Null,
                StatusSource::Poll,
            );
            // The deadline gets its own message, not the generic expired text
            state.last_notice = Some(Notice::StatusCheckTimeout);
            return effects;
        }

        let gateway = Arc::clone(&env.gateway);
        let id = payment_id.clone();
        smallvec![Effect::Future(Box::pin(async move {
            let result = gateway
                .payment_status(&id)
                .await
                .map_err(|err| err.user_message());
            Some(BookingAction::PollCompleted {
                payment_id: id,
                result,
            })
        }))]
    }

    /// A poll resolved: feed the gate on success, count failures otherwise
    fn poll_completed(
        &self,
        state: &mut BookingState,
        env: &BookingEnvironment<G, D>,
        payment_id: PaymentId,
        result: Result<StatusSnapshot, String>,
    ) -> Effects {
        let Some(poller) = state.poller.as_mut() else {
            return smallvec![];
        };
        if poller.payment_id != payment_id {
            return smallvec![];
        }

        match result {
            Ok(snapshot) => {
                poller.consecutive_failures = 0;
                let StatusSnapshot {
                    status,
                    message,
                    raw,
                } = snapshot;
                let mut effects =
                    Self::apply_status(state, env, status, message, raw, StatusSource::Poll);
                // Keep polling only while the gate left the poller in place
                if state.poller.is_some() {
                    effects.push(Effect::delay(
                        self.config.poll_interval,
                        BookingAction::PollTick { payment_id },
                    ));
                }
                effects
            },
            Err(message) => {
                poller.consecutive_failures += 1;
                let failures = poller.consecutive_failures;
                metrics::counter!("booking.poller.failures").increment(1);
                tracing::warn!(
                    payment_id = %payment_id,
                    consecutive_failures = failures,
                    error = %message,
                    "Status poll failed"
                );

                if failures >= self.config.max_poll_failures {
                    metrics::counter!("booking.poller.abandoned").increment(1);
                    tracing::error!(
                        payment_id = %payment_id,
                        "Abandoning status polling after repeated failures"
                    );
                    state.poller = None;
                    state.last_notice = Some(Notice::PollingAbandoned);
                    smallvec![]
                } else {
                    smallvec![Effect::delay(
                        self.config.poll_interval,
                        BookingAction::PollTick { payment_id },
                    )]
                }
            },
        }
    }

    /// The single authoritative status transition gate
    ///
    /// Both producers converge here. Rules, in order: no session → ignore;
    /// already terminal → ignore; unknown status → ignore; duplicate →
    /// idempotent no-op. Terminal statuses additionally tear down the
    /// poller and, per status, the draft, selection, and form.
    fn apply_status(
        state: &mut BookingState,
        env: &BookingEnvironment<G, D>,
        status: PaymentStatus,
        message: Option<String>,
        payload: Value,
        source: StatusSource,
    ) -> Effects {
        let Some(session) = state.payment.session.as_mut() else {
            tracing::debug!(
                status = %status,
                source = source.as_str(),
                "Status observed without a live session, ignoring"
            );
            metrics::counter!("booking.status.ignored", "reason" => "no_session").increment(1);
            return smallvec![];
        };

        if session.status.is_terminal() {
            metrics::counter!("booking.status.ignored", "reason" => "terminal").increment(1);
            tracing::debug!(
                current = %session.status,
                observed = %status,
                source = source.as_str(),
                "Session already terminal, ignoring"
            );
            return smallvec![];
        }

        if status == PaymentStatus::Unknown {
            metrics::counter!("booking.status.ignored", "reason" => "unknown").increment(1);
            tracing::warn!(source = source.as_str(), "Unrecognized payment status, ignoring");
            return smallvec![];
        }

        if session.status == status {
            metrics::counter!("booking.status.ignored", "reason" => "duplicate").increment(1);
            return smallvec![];
        }

        session.status = status;
        metrics::counter!(
            "booking.status.applied",
            "source" => source.as_str(),
            "status" => status.as_str()
        )
        .increment(1);
        tracing::info!(status = %status, source = source.as_str(), "Payment status applied");

        if !status.is_terminal() {
            return smallvec![];
        }

        state.poller = None;
        let drafts = Arc::clone(&env.drafts);

        match status {
            PaymentStatus::Completed => {
                state.payment.completed_payload = Some(payload);
                state.draft = None;
                state.selection = None;
                state.lock_seq += 1;
                smallvec![Effect::Future(Box::pin(async move {
                    drafts.clear_draft().await;
                    drafts.clear_pending_payment().await;
                    None
                }))]
            },
            PaymentStatus::Failed | PaymentStatus::Cancelled | PaymentStatus::Expired => {
                let text =
                    message.unwrap_or_else(|| default_terminal_message(status).to_string());
                state.last_notice = Some(Notice::PaymentTerminal {
                    status,
                    message: text,
                });
                // Clear the session so the form reopens for a fresh attempt
                state.payment.session = None;
                smallvec![Effect::Future(Box::pin(async move {
                    drafts.clear_pending_payment().await;
                    None
                }))]
            },
            PaymentStatus::RefundRequired => {
                // Frozen: backend-remediated, not user-retriable
                state.last_notice = Some(Notice::RefundPending);
                smallvec![Effect::Future(Box::pin(async move {
                    drafts.clear_pending_payment().await;
                    None
                }))]
            },
            _ => smallvec![],
        }
    }

    /// Recreate a session from a recovery hint and poll immediately
    fn resume(
        &self,
        state: &mut BookingState,
        env: &BookingEnvironment<G, D>,
        payment_id: PaymentId,
        phone: Msisdn,
    ) -> Effects {
        if state.payment.session.is_some() {
            return smallvec![];
        }

        let amount = state
            .draft
            .as_ref()
            .map_or(0, crate::state::BookingDraft::total_amount);
        state.payment.session = Some(PaymentSession {
            payment_id: payment_id.clone(),
            phone,
            status: PaymentStatus::StkPushed,
            amount,
            created_at: env.clock.now(),
            push_observed: false,
        });

        metrics::counter!("booking.payments.resumed").increment(1);
        tracing::info!(payment_id = %payment_id, "Resuming observation of in-flight payment");

        self.start_poller(state, env, payment_id)
    }

    /// The channel gave up: mark it down and make sure someone is watching
    fn channel_unavailable(
        &self,
        state: &mut BookingState,
        env: &BookingEnvironment<G, D>,
        reason: String,
    ) -> Effects {
        metrics::counter!("booking.channel.unavailable").increment(1);
        tracing::warn!(reason = %reason, "Realtime channel unavailable");
        state.channel = ChannelHealth::Down { reason };

        let in_flight_payment = state
            .payment
            .session
            .as_ref()
            .filter(|session| session.status.is_in_flight())
            .map(|session| session.payment_id.clone());

        match in_flight_payment {
            Some(payment_id) => self.start_poller(state, env, payment_id),
            None => smallvec![],
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

    use std::time::Duration;

    use moihub_core::environment::Clock;
    use moihub_testing::{ManualClock, ReducerHarness, assertions, test_clock};

    use super::*;
    use crate::mocks::MockGateway;
    use crate::providers::MemoryDraftStore;
    use crate::state::{BookingDraft, RouteInfo};

    type PaymentHarness = ReducerHarness<
        PaymentReducer<MockGateway, MemoryDraftStore>,
        BookingState,
        BookingAction,
        BookingEnvironment<MockGateway, MemoryDraftStore>,
    >;

    fn test_draft() -> BookingDraft {
        BookingDraft {
            registration: "KDA 123X".to_string(),
            route: RouteInfo {
                id: "7".to_string(),
                name: "Main Campus - Town".to_string(),
                price: 100,
            },
            seats: vec!["12".to_string()],
            departure_time: "10:30 AM".to_string(),
        }
    }

    fn test_env(clock: ManualClock) -> BookingEnvironment<MockGateway, MemoryDraftStore> {
        BookingEnvironment::new(
            Arc::new(MockGateway::new()),
            Arc::new(MemoryDraftStore::new()),
            Arc::new(clock),
            crate::environment::TripContext {
                registration: "KDA 123X".to_string(),
                route: RouteInfo {
                    id: "7".to_string(),
                    name: "Main Campus - Town".to_string(),
                    price: 100,
                },
                departure_time: "10:30 AM".to_string(),
                seat_layout: vec!["11".to_string(), "12".to_string()],
            },
        )
    }

    fn harness(clock: ManualClock) -> PaymentHarness {
        let mut state = BookingState::default();
        state.draft = Some(test_draft());
        ReducerHarness::new(
            PaymentReducer::new(PaymentConfig::new()),
            state,
            test_env(clock),
        )
    }

    fn session_at(harness: &mut PaymentHarness, status: PaymentStatus) {
        let effects = harness.send(BookingAction::PaymentInitiated {
            payment_id: PaymentId::new("abc123"),
            phone: Msisdn::parse("0712345678").unwrap(),
            amount: 100,
        });
        assert_eq!(effects.len(), 2);
        if status != PaymentStatus::StkPushed {
            harness.send(BookingAction::StatusObserved {
                source: StatusSource::Push,
                status,
                message: None,
                payload: Value::Null,
            });
        }
    }

    #[test]
    fn submit_rejects_invalid_phone_without_effects() {
        let mut harness = harness(ManualClock::new(test_clock().now()));
        let effects = harness.send(BookingAction::SubmitPayment {
            phone: "0812345678".to_string(),
        });

        assertions::assert_no_effects(&effects);
        let error = harness.state().payment.form_error.clone().unwrap();
        assert!(error.contains("Safaricom"));
    }

    #[test]
    fn submit_rejects_missing_draft() {
        let mut harness = ReducerHarness::new(
            PaymentReducer::<MockGateway, MemoryDraftStore>::new(PaymentConfig::new()),
            BookingState::default(),
            test_env(ManualClock::new(test_clock().now())),
        );

        let effects = harness.send(BookingAction::SubmitPayment {
            phone: "0712345678".to_string(),
        });

        assertions::assert_no_effects(&effects);
        assert!(harness.state().payment.form_error.is_some());
    }

    #[test]
    fn submit_with_valid_phone_issues_initiation() {
        let mut harness = harness(ManualClock::new(test_clock().now()));
        let effects = harness.send(BookingAction::SubmitPayment {
            phone: "0712345678".to_string(),
        });

        assertions::assert_has_future_effect(&effects);
        assert!(harness.state().payment.form_error.is_none());
        // No session until initiation resolves
        assert!(harness.state().payment.session.is_none());
    }

    #[test]
    fn initiation_creates_session_and_arms_push_grace() {
        let mut harness = harness(ManualClock::new(test_clock().now()));
        let effects = harness.send(BookingAction::PaymentInitiated {
            payment_id: PaymentId::new("abc123"),
            phone: Msisdn::parse("0712345678").unwrap(),
            amount: 100,
        });

        // Hint persistence plus the 15s grace timer
        assertions::assert_has_future_effect(&effects);
        assert_eq!(
            assertions::delay_durations(&effects),
            vec![Duration::from_secs(15)]
        );

        let session = harness.state().payment.session.clone().unwrap();
        assert_eq!(session.status, PaymentStatus::StkPushed);
        assert_eq!(session.payment_id, PaymentId::new("abc123"));
        assert!(!session.push_observed);
    }

    #[test]
    fn initiation_failure_reopens_form() {
        let mut harness = harness(ManualClock::new(test_clock().now()));
        harness.send(BookingAction::PaymentInitiationFailed {
            message: "Seat 12 is no longer available".to_string(),
        });

        assert!(harness.state().payment.session.is_none());
        assert_eq!(
            harness.state().payment.form_error.as_deref(),
            Some("Seat 12 is no longer available")
        );
    }

    #[test]
    fn terminal_status_is_idempotent() {
        let mut harness = harness(ManualClock::new(test_clock().now()));
        session_at(&mut harness, PaymentStatus::Failed);
        // Failed clears the session so the form reopens
        assert!(harness.state().payment.session.is_none());
        let notice = harness.state().last_notice.clone();

        let effects = harness.send(BookingAction::StatusObserved {
            source: StatusSource::Poll,
            status: PaymentStatus::Failed,
            message: Some("duplicate delivery".to_string()),
            payload: Value::Null,
        });

        assertions::assert_no_effects(&effects);
        assert_eq!(harness.state().last_notice, notice);
    }

    #[test]
    fn completed_is_not_regressed_by_late_processing() {
        let mut harness = harness(ManualClock::new(test_clock().now()));
        session_at(&mut harness, PaymentStatus::Completed);
        assert_eq!(
            harness.state().payment.session.as_ref().unwrap().status,
            PaymentStatus::Completed
        );

        for status in [PaymentStatus::Processing, PaymentStatus::StkPushed] {
            let effects = harness.send(BookingAction::StatusObserved {
                source: StatusSource::Poll,
                status,
                message: None,
                payload: Value::Null,
            });
            assertions::assert_no_effects(&effects);
        }

        assert_eq!(
            harness.state().payment.session.as_ref().unwrap().status,
            PaymentStatus::Completed
        );
    }

    #[test]
    fn completed_clears_draft_selection_and_poller() {
        let mut harness = harness(ManualClock::new(test_clock().now()));
        session_at(&mut harness, PaymentStatus::StkPushed);
        harness.send(BookingAction::StartStatusPolling {
            payment_id: PaymentId::new("abc123"),
        });
        assert!(harness.state().poller.is_some());

        let effects = harness.send(BookingAction::StatusObserved {
            source: StatusSource::Push,
            status: PaymentStatus::Completed,
            message: None,
            payload: serde_json::json!({"mpesa_receipt": "QGH7K1XYZP"}),
        });

        // Draft and hint cleanup runs as one future effect
        assertions::assert_has_future_effect(&effects);
        assert!(harness.state().draft.is_none());
        assert!(harness.state().selection.is_none());
        assert!(harness.state().poller.is_none());
        let payload = harness.state().payment.completed_payload.clone().unwrap();
        assert_eq!(
            payload.get("mpesa_receipt").and_then(Value::as_str),
            Some("QGH7K1XYZP")
        );
    }

    #[test]
    fn refund_required_freezes_the_session() {
        let mut harness = harness(ManualClock::new(test_clock().now()));
        session_at(&mut harness, PaymentStatus::RefundRequired);

        let session = harness.state().payment.session.clone().unwrap();
        assert_eq!(session.status, PaymentStatus::RefundRequired);
        assert_eq!(harness.state().last_notice, Some(Notice::RefundPending));

        // The form stays closed: a new submission is ignored
        let effects = harness.send(BookingAction::SubmitPayment {
            phone: "0712345678".to_string(),
        });
        assertions::assert_no_effects(&effects);
    }

    #[test]
    fn unknown_status_is_ignored() {
        let mut harness = harness(ManualClock::new(test_clock().now()));
        session_at(&mut harness, PaymentStatus::Processing);

        let effects = harness.send(BookingAction::StatusObserved {
            source: StatusSource::Push,
            status: PaymentStatus::Unknown,
            message: None,
            payload: Value::Null,
        });

        assertions::assert_no_effects(&effects);
        assert_eq!(
            harness.state().payment.session.as_ref().unwrap().status,
            PaymentStatus::Processing
        );
    }

    #[test]
    fn push_observation_marks_the_session() {
        let mut harness = harness(ManualClock::new(test_clock().now()));
        session_at(&mut harness, PaymentStatus::StkPushed);

        harness.send(BookingAction::StatusObserved {
            source: StatusSource::Push,
            status: PaymentStatus::Processing,
            message: None,
            payload: Value::Null,
        });

        assert!(harness.state().payment.session.as_ref().unwrap().push_observed);
    }

    #[test]
    fn push_grace_starts_poller_only_when_push_is_silent() {
        let mut harness = harness(ManualClock::new(test_clock().now()));
        session_at(&mut harness, PaymentStatus::StkPushed);

        // Push arrived: grace elapse is a no-op
        harness.send(BookingAction::StatusObserved {
            source: StatusSource::Push,
            status: PaymentStatus::Processing,
            message: None,
            payload: Value::Null,
        });
        let effects = harness.send(BookingAction::PushGraceElapsed {
            payment_id: PaymentId::new("abc123"),
        });
        assertions::assert_no_effects(&effects);
        assert!(harness.state().poller.is_none());
    }

    #[test]
    fn silent_push_grace_starts_poller() {
        let mut harness = harness(ManualClock::new(test_clock().now()));
        session_at(&mut harness, PaymentStatus::StkPushed);

        let effects = harness.send(BookingAction::PushGraceElapsed {
            payment_id: PaymentId::new("abc123"),
        });

        assertions::assert_has_delay_effect(&effects);
        assert_eq!(
            harness.state().poller.as_ref().unwrap().payment_id,
            PaymentId::new("abc123")
        );
    }

    #[test]
    fn poller_start_is_reentrancy_guarded() {
        let mut harness = harness(ManualClock::new(test_clock().now()));
        session_at(&mut harness, PaymentStatus::StkPushed);

        let first = harness.send(BookingAction::StartStatusPolling {
            payment_id: PaymentId::new("abc123"),
        });
        assertions::assert_effects_count(&first, 1);

        let second = harness.send(BookingAction::StartStatusPolling {
            payment_id: PaymentId::new("abc123"),
        });
        assertions::assert_no_effects(&second);
    }

    #[test]
    fn three_consecutive_poll_failures_abandon_polling() {
        let mut harness = harness(ManualClock::new(test_clock().now()));
        session_at(&mut harness, PaymentStatus::StkPushed);
        harness.send(BookingAction::StartStatusPolling {
            payment_id: PaymentId::new("abc123"),
        });

        for attempt in 1..=2 {
            let effects = harness.send(BookingAction::PollCompleted {
                payment_id: PaymentId::new("abc123"),
                result: Err("connection reset".to_string()),
            });
            // Failure below the ceiling reschedules the next tick
            assertions::assert_has_delay_effect(&effects);
            assert_eq!(
                harness.state().poller.as_ref().unwrap().consecutive_failures,
                attempt
            );
        }

        let effects = harness.send(BookingAction::PollCompleted {
            payment_id: PaymentId::new("abc123"),
            result: Err("connection reset".to_string()),
        });

        assertions::assert_no_effects(&effects);
        assert!(harness.state().poller.is_none());
        assert_eq!(harness.state().last_notice, Some(Notice::PollingAbandoned));
        // Session stays in flight; the user is pointed at My Bookings
        assert!(harness.state().payment.is_in_flight());
    }

    #[test]
    fn poll_success_resets_the_failure_count() {
        let mut harness = harness(ManualClock::new(test_clock().now()));
        session_at(&mut harness, PaymentStatus::StkPushed);
        harness.send(BookingAction::StartStatusPolling {
            payment_id: PaymentId::new("abc123"),
        });

        for _ in 0..2 {
            harness.send(BookingAction::PollCompleted {
                payment_id: PaymentId::new("abc123"),
                result: Err("timeout".to_string()),
            });
        }
        harness.send(BookingAction::PollCompleted {
            payment_id: PaymentId::new("abc123"),
            result: Ok(StatusSnapshot {
                status: PaymentStatus::Processing,
                message: None,
                raw: Value::Null,
            }),
        });
        assert_eq!(
            harness.state().poller.as_ref().unwrap().consecutive_failures,
            0
        );

        // Two more failures stay below the consecutive ceiling
        for _ in 0..2 {
            harness.send(BookingAction::PollCompleted {
                payment_id: PaymentId::new("abc123"),
                result: Err("timeout".to_string()),
            });
        }
        assert!(harness.state().poller.is_some());
    }

    #[test]
    fn poll_delivered_failure_reopens_the_form() {
        let mut harness = harness(ManualClock::new(test_clock().now()));
        session_at(&mut harness, PaymentStatus::StkPushed);
        harness.send(BookingAction::StartStatusPolling {
            payment_id: PaymentId::new("abc123"),
        });

        let effects = harness.send(BookingAction::PollCompleted {
            payment_id: PaymentId::new("abc123"),
            result: Ok(StatusSnapshot {
                status: PaymentStatus::Failed,
                message: Some("Insufficient funds".to_string()),
                raw: Value::Null,
            }),
        });

        // Hint cleanup only; the poll chain is not rescheduled
        assertions::assert_effects_count(&effects, 1);
        assertions::assert_has_future_effect(&effects);
        assert!(harness.state().poller.is_none());
        assert!(harness.state().payment.session.is_none());
        assert_eq!(
            harness.state().last_notice,
            Some(Notice::PaymentTerminal {
                status: PaymentStatus::Failed,
                message: "Insufficient funds".to_string(),
            })
        );
    }

    #[test]
    fn poll_deadline_forces_expiry() {
        let clock = ManualClock::new(test_clock().now());
        let mut harness = harness(clock.clone());
        session_at(&mut harness, PaymentStatus::StkPushed);
        harness.send(BookingAction::StartStatusPolling {
            payment_id: PaymentId::new("abc123"),
        });

        clock.advance(chrono::Duration::seconds(301));
        let effects = harness.send(BookingAction::PollTick {
            payment_id: PaymentId::new("abc123"),
        });

        // Forced expiry clears the session (retriable terminal) and the poller
        assert!(harness.state().poller.is_none());
        assert!(harness.state().payment.session.is_none());
        assert_eq!(
            harness.state().last_notice,
            Some(Notice::StatusCheckTimeout)
        );
        // Only the hint cleanup future, no further polling
        assertions::assert_effects_count(&effects, 1);
        assertions::assert_has_future_effect(&effects);
    }

    #[test]
    fn poll_tick_below_deadline_issues_status_read() {
        let clock = ManualClock::new(test_clock().now());
        let mut harness = harness(clock.clone());
        session_at(&mut harness, PaymentStatus::StkPushed);
        harness.send(BookingAction::StartStatusPolling {
            payment_id: PaymentId::new("abc123"),
        });

        clock.advance(chrono::Duration::seconds(30));
        let effects = harness.send(BookingAction::PollTick {
            payment_id: PaymentId::new("abc123"),
        });

        assertions::assert_effects_count(&effects, 1);
        assertions::assert_has_future_effect(&effects);
    }

    #[test]
    fn stale_poll_tick_is_a_no_op() {
        let mut harness = harness(ManualClock::new(test_clock().now()));
        session_at(&mut harness, PaymentStatus::StkPushed);

        // No poller was ever started
        let effects = harness.send(BookingAction::PollTick {
            payment_id: PaymentId::new("abc123"),
        });
        assertions::assert_no_effects(&effects);

        // Poller for a different payment
        harness.send(BookingAction::StartStatusPolling {
            payment_id: PaymentId::new("abc123"),
        });
        let effects = harness.send(BookingAction::PollTick {
            payment_id: PaymentId::new("other"),
        });
        assertions::assert_no_effects(&effects);
    }

    #[test]
    fn channel_loss_with_in_flight_session_starts_poller() {
        let mut harness = harness(ManualClock::new(test_clock().now()));
        session_at(&mut harness, PaymentStatus::Processing);

        let effects = harness.send(BookingAction::ChannelUnavailable {
            reason: "retries exhausted".to_string(),
        });

        assertions::assert_has_delay_effect(&effects);
        assert!(harness.state().poller.is_some());
        assert!(harness.state().channel.is_down());
    }

    #[test]
    fn channel_loss_without_session_only_marks_health() {
        let mut harness = harness(ManualClock::new(test_clock().now()));

        let effects = harness.send(BookingAction::ChannelUnavailable {
            reason: "retries exhausted".to_string(),
        });

        assertions::assert_no_effects(&effects);
        assert!(harness.state().poller.is_none());
        assert!(harness.state().channel.is_down());
    }

    #[test]
    fn initiation_while_channel_down_polls_from_the_start() {
        let mut harness = harness(ManualClock::new(test_clock().now()));
        harness.send(BookingAction::ChannelUnavailable {
            reason: "retries exhausted".to_string(),
        });

        let effects = harness.send(BookingAction::PaymentInitiated {
            payment_id: PaymentId::new("abc123"),
            phone: Msisdn::parse("0712345678").unwrap(),
            amount: 100,
        });

        // Hint save + push grace + first poll tick
        assert_eq!(assertions::delay_durations(&effects).len(), 2);
        assert!(harness.state().poller.is_some());
    }

    #[test]
    fn resume_recreates_session_and_polls() {
        let mut harness = harness(ManualClock::new(test_clock().now()));

        let effects = harness.send(BookingAction::ResumePayment {
            payment_id: PaymentId::new("abc123"),
            phone: Msisdn::parse("0712345678").unwrap(),
        });

        assertions::assert_has_delay_effect(&effects);
        let session = harness.state().payment.session.clone().unwrap();
        assert_eq!(session.status, PaymentStatus::StkPushed);
        assert_eq!(session.amount, 100);
        assert!(harness.state().poller.is_some());
    }
}
