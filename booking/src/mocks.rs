//! Scriptable provider mocks for reducer and coordinator tests
//!
//! [`MockGateway`] stands in for both the booking gateway and the event
//! source. Responses are scripted per call through FIFO queues; an empty
//! queue yields a benign default (payment `test-payment`, status
//! `processing`, locks granted, seats available, a silent open stream),
//! so tests only script the calls they care about.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use futures::StreamExt;
use futures::stream;
use moihub_api::{
    ApiError, CheckSeatResponse, EventStream, InitiatePaymentRequest, InitiatePaymentResponse,
    LockSeatResponse, PaymentId, PaymentStatus, RealtimeEvent, SeatAvailability, StatusSnapshot,
};
use tokio::sync::mpsc;

use crate::environment::{BookingGateway, EventSource};

/// One scripted outcome for an event stream connection attempt
#[derive(Debug)]
pub enum ConnectScript {
    /// Refuse the connection with this error
    Refuse(ApiError),
    /// Deliver these events, then keep the stream open silently
    Deliver(Vec<RealtimeEvent>),
    /// Deliver these events, then end the stream as if the server closed it
    DeliverThenClose(Vec<RealtimeEvent>),
    /// Deliver raw stream items (including item-level errors), then keep
    /// the stream open silently
    DeliverItems(Vec<Result<RealtimeEvent, ApiError>>),
    /// Deliver items pushed through a channel while the test runs; the
    /// stream ends when the sender is dropped
    Feed(mpsc::UnboundedReceiver<Result<RealtimeEvent, ApiError>>),
}

impl ConnectScript {
    /// A live-fed stream: the returned sender injects items into the
    /// connected stream as the test progresses
    #[must_use]
    pub fn feed() -> (mpsc::UnboundedSender<Result<RealtimeEvent, ApiError>>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::Feed(rx))
    }
}

/// Scriptable stand-in for the booking gateway and event source
#[derive(Debug, Default)]
pub struct MockGateway {
    initiate_responses: Mutex<VecDeque<Result<InitiatePaymentResponse, ApiError>>>,
    initiate_requests: Mutex<Vec<InitiatePaymentRequest>>,
    status_responses: Mutex<VecDeque<Result<StatusSnapshot, ApiError>>>,
    status_polls: AtomicU32,
    lock_responses: Mutex<VecDeque<Result<LockSeatResponse, ApiError>>>,
    seat_statuses: Mutex<HashMap<String, CheckSeatResponse>>,
    connect_scripts: Mutex<VecDeque<ConnectScript>>,
    connect_attempts: AtomicU32,
}

impl MockGateway {
    /// Create a gateway where every call succeeds with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next payment initiation outcome
    pub fn script_initiate(&self, result: Result<InitiatePaymentResponse, ApiError>) {
        self.initiate_responses.lock().unwrap().push_back(result);
    }

    /// Queue the next status poll outcome
    pub fn script_status(&self, result: Result<StatusSnapshot, ApiError>) {
        self.status_responses.lock().unwrap().push_back(result);
    }

    /// Queue the next seat lock outcome
    pub fn script_lock(&self, result: Result<LockSeatResponse, ApiError>) {
        self.lock_responses.lock().unwrap().push_back(result);
    }

    /// Fix the availability reported for one seat
    pub fn set_seat_status(&self, seat_number: impl Into<String>, response: CheckSeatResponse) {
        self.seat_statuses
            .lock()
            .unwrap()
            .insert(seat_number.into(), response);
    }

    /// Queue the next event stream connection outcome
    pub fn script_connect(&self, script: ConnectScript) {
        self.connect_scripts.lock().unwrap().push_back(script);
    }

    /// Initiation requests observed so far
    #[must_use]
    pub fn initiate_requests(&self) -> Vec<InitiatePaymentRequest> {
        self.initiate_requests.lock().unwrap().clone()
    }

    /// Number of status polls observed so far
    #[must_use]
    pub fn status_polls(&self) -> u32 {
        self.status_polls.load(Ordering::SeqCst)
    }

    /// Number of event stream connection attempts observed so far
    #[must_use]
    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts.load(Ordering::SeqCst)
    }
}

impl BookingGateway for MockGateway {
    async fn initiate_payment(
        &self,
        request: InitiatePaymentRequest,
    ) -> Result<InitiatePaymentResponse, ApiError> {
        self.initiate_requests.lock().unwrap().push(request);
        self.initiate_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(InitiatePaymentResponse {
                    payment_id: PaymentId::new("test-payment"),
                })
            })
    }

    async fn payment_status(&self, _payment_id: &PaymentId) -> Result<StatusSnapshot, ApiError> {
        self.status_polls.fetch_add(1, Ordering::SeqCst);
        self.status_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(StatusSnapshot {
                    status: PaymentStatus::Processing,
                    message: None,
                    raw: serde_json::Value::Null,
                })
            })
    }

    async fn lock_seat(
        &self,
        _registration: &str,
        seat_id: &str,
    ) -> Result<LockSeatResponse, ApiError> {
        self.lock_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(LockSeatResponse {
                    success: true,
                    seat_id: seat_id.to_string(),
                })
            })
    }

    async fn check_seat(
        &self,
        _registration: &str,
        seat_number: &str,
    ) -> Result<CheckSeatResponse, ApiError> {
        Ok(self
            .seat_statuses
            .lock()
            .unwrap()
            .get(seat_number)
            .cloned()
            .unwrap_or(CheckSeatResponse {
                status: SeatAvailability::Available,
                locked_by_you: false,
            }))
    }
}

impl EventSource for MockGateway {
    async fn connect(&self) -> Result<EventStream, ApiError> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        let script = self.connect_scripts.lock().unwrap().pop_front();
        match script {
            None => Ok(Box::pin(stream::pending())),
            Some(ConnectScript::Refuse(err)) => Err(err),
            Some(ConnectScript::Deliver(events)) => Ok(Box::pin(
                stream::iter(events.into_iter().map(Ok)).chain(stream::pending()),
            )),
            Some(ConnectScript::DeliverThenClose(events)) => {
                Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
            },
            Some(ConnectScript::DeliverItems(items)) => Ok(Box::pin(
                stream::iter(items).chain(stream::pending()),
            )),
            Some(ConnectScript::Feed(rx)) => Ok(Box::pin(stream::unfold(
                rx,
                |mut rx| async move { rx.recv().await.map(|item| (item, rx)) },
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn scripted_statuses_drain_in_order_then_default() {
        let gateway = MockGateway::new();
        gateway.script_status(Err(ApiError::RequestFailed("reset".to_string())));
        gateway.script_status(Ok(StatusSnapshot {
            status: PaymentStatus::Completed,
            message: None,
            raw: serde_json::Value::Null,
        }));

        let id = PaymentId::new("abc123");
        assert!(gateway.payment_status(&id).await.is_err());
        assert_eq!(
            gateway.payment_status(&id).await.unwrap().status,
            PaymentStatus::Completed
        );
        // Queue exhausted: the benign default takes over
        assert_eq!(
            gateway.payment_status(&id).await.unwrap().status,
            PaymentStatus::Processing
        );
        assert_eq!(gateway.status_polls(), 3);
    }

    #[tokio::test]
    async fn lock_default_echoes_the_requested_seat() {
        let gateway = MockGateway::new();
        let response = gateway.lock_seat("KDA 123X", "12").await.unwrap();
        assert!(response.success);
        assert_eq!(response.seat_id, "12");
    }

    #[tokio::test]
    async fn closed_stream_script_ends_after_delivery() {
        let gateway = MockGateway::new();
        gateway.script_connect(ConnectScript::DeliverThenClose(vec![
            RealtimeEvent::PaymentRequested { payment_id: None },
        ]));

        let mut stream = gateway.connect().await.unwrap();
        assert_eq!(
            stream.next().await.map(Result::unwrap),
            Some(RealtimeEvent::PaymentRequested { payment_id: None })
        );
        assert!(stream.next().await.is_none());
        assert_eq!(gateway.connect_attempts(), 1);
    }

    #[tokio::test]
    async fn refused_connection_surfaces_the_error() {
        let gateway = MockGateway::new();
        gateway.script_connect(ConnectScript::Refuse(ApiError::Unauthorized));

        assert_eq!(gateway.connect().await.err(), Some(ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn fed_stream_delivers_live_items_until_sender_drops() {
        let gateway = MockGateway::new();
        let (tx, script) = ConnectScript::feed();
        gateway.script_connect(script);

        let mut stream = gateway.connect().await.unwrap();
        tx.send(Ok(RealtimeEvent::PaymentRequested { payment_id: None }))
            .unwrap();
        assert_eq!(
            stream.next().await.map(Result::unwrap),
            Some(RealtimeEvent::PaymentRequested { payment_id: None })
        );

        drop(tx);
        assert!(stream.next().await.is_none());
    }
}
