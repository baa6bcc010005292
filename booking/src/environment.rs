//! Environment: injected dependencies for the booking reducers
//!
//! Reducers never perform I/O directly; every backend call and persistence
//! write goes through the provider traits here, captured into effect
//! futures. Production wires [`moihub_api::MoiHubClient`] and the in-memory
//! draft store; tests substitute the in-crate mocks.

use std::future::Future;
use std::sync::Arc;

use moihub_api::{
    ApiError, CheckSeatResponse, EventStream, InitiatePaymentRequest, InitiatePaymentResponse,
    LockSeatResponse, PaymentId, StatusSnapshot,
};
use moihub_core::environment::Clock;

use crate::state::{BookingDraft, PendingPayment, RouteInfo};

/// Backend booking operations the machine depends on
///
/// Mirrors the consumed REST boundary: payment initiation, status reads,
/// seat locks, and per-seat availability checks.
pub trait BookingGateway: Send + Sync {
    /// Initiate an M-Pesa payment for the drafted seats
    fn initiate_payment(
        &self,
        request: InitiatePaymentRequest,
    ) -> impl Future<Output = Result<InitiatePaymentResponse, ApiError>> + Send;

    /// Read the current status of a payment
    fn payment_status(
        &self,
        payment_id: &PaymentId,
    ) -> impl Future<Output = Result<StatusSnapshot, ApiError>> + Send;

    /// Request a server-side hold on one seat
    fn lock_seat(
        &self,
        registration: &str,
        seat_id: &str,
    ) -> impl Future<Output = Result<LockSeatResponse, ApiError>> + Send;

    /// Check one seat's availability
    fn check_seat(
        &self,
        registration: &str,
        seat_number: &str,
    ) -> impl Future<Output = Result<CheckSeatResponse, ApiError>> + Send;
}

/// Session-scoped persistence for the draft and the recovery hint
///
/// Failures are swallowed by the providers themselves; losing the draft
/// store never fails the payment flow, it only weakens reload recovery.
pub trait DraftStore: Send + Sync {
    /// Load the current booking draft, if one was persisted
    fn load_draft(&self) -> impl Future<Output = Option<BookingDraft>> + Send;

    /// Persist the booking draft
    fn save_draft(&self, draft: BookingDraft) -> impl Future<Output = ()> + Send;

    /// Delete the booking draft
    fn clear_draft(&self) -> impl Future<Output = ()> + Send;

    /// Consume the pending-payment recovery hint (returns it at most once)
    fn take_pending_payment(&self) -> impl Future<Output = Option<PendingPayment>> + Send;

    /// Persist the pending-payment recovery hint
    fn save_pending_payment(&self, pending: PendingPayment) -> impl Future<Output = ()> + Send;

    /// Delete the pending-payment recovery hint
    fn clear_pending_payment(&self) -> impl Future<Output = ()> + Send;
}

/// Source of the realtime push event stream
///
/// Each call opens a fresh connection; the channel task calls it again on
/// every reconnect attempt.
pub trait EventSource: Send + Sync {
    /// Open the authenticated event stream
    fn connect(&self) -> impl Future<Output = Result<EventStream, ApiError>> + Send;
}

/// The trip this booking flow is for
///
/// Seat identifiers double as seat numbers on this backend, so the lock
/// endpoint receives the seat number as the seat id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TripContext {
    /// Vehicle registration ("KDA 123X")
    pub registration: String,
    /// Route being booked
    pub route: RouteInfo,
    /// Departure time as displayed ("10:30 AM")
    pub departure_time: String,
    /// Seat numbers in the vehicle layout
    pub seat_layout: Vec<String>,
}

/// Injected dependencies for the booking reducers
///
/// Providers sit behind `Arc` so effect futures can own their handles
/// past the reducer call that created them.
pub struct BookingEnvironment<G, D> {
    /// Backend gateway
    pub gateway: Arc<G>,
    /// Draft and recovery-hint persistence
    pub drafts: Arc<D>,
    /// Time source (`SystemClock` in production, manual clocks in tests)
    pub clock: Arc<dyn Clock>,
    /// The trip being booked
    pub trip: TripContext,
}

impl<G, D> BookingEnvironment<G, D> {
    /// Assemble an environment from its parts
    #[must_use]
    pub fn new(gateway: Arc<G>, drafts: Arc<D>, clock: Arc<dyn Clock>, trip: TripContext) -> Self {
        Self {
            gateway,
            drafts,
            clock,
            trip,
        }
    }
}

impl<G, D> Clone for BookingEnvironment<G, D> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            drafts: Arc::clone(&self.drafts),
            clock: Arc::clone(&self.clock),
            trip: self.trip.clone(),
        }
    }
}

impl<G, D> std::fmt::Debug for BookingEnvironment<G, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingEnvironment")
            .field("trip", &self.trip)
            .finish_non_exhaustive()
    }
}
