//! Realtime channel task: connect, consume, reconnect within a budget
//!
//! One background task owns the push channel. It connects through the
//! [`EventSource`], hands every event to an [`EventHandler`], and
//! reconnects on stream loss with a bounded [`RetryPolicy`]. Two things
//! end it for good: an authentication refusal (credentials will not
//! improve by retrying) and an exhausted retry budget. Both are reported
//! through [`EventHandler::on_unavailable`], which is what flips the flow
//! onto the fallback poller.

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use moihub_api::{ApiError, RealtimeEvent};
use moihub_runtime::RetryPolicy;
use tokio::task::JoinHandle;

use crate::environment::EventSource;

/// Callbacks the channel task drives
///
/// The coordinator's implementation translates these into store actions;
/// tests record them.
pub trait EventHandler: Send + Sync {
    /// The stream connected and is delivering events
    fn on_connected(&self) -> impl Future<Output = ()> + Send;

    /// One realtime event arrived
    fn on_event(&self, event: RealtimeEvent) -> impl Future<Output = ()> + Send;

    /// The channel gave up for good
    fn on_unavailable(&self, reason: String) -> impl Future<Output = ()> + Send;
}

/// Handle to the running channel task
pub struct RealtimeChannel {
    handle: JoinHandle<()>,
}

impl RealtimeChannel {
    /// Spawn the channel task
    pub fn spawn<S, H>(source: Arc<S>, handler: Arc<H>, policy: RetryPolicy) -> Self
    where
        S: EventSource + 'static,
        H: EventHandler + 'static,
    {
        let handle = tokio::spawn(run(source, handler, policy));
        Self { handle }
    }

    /// Stop the channel task and wait for it to finish
    pub async fn stop(self) {
        self.handle.abort();
        // Abort surfaces as a JoinError; nothing to do with it
        let _ = self.handle.await;
    }
}

impl std::fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

async fn run<S, H>(source: Arc<S>, handler: Arc<H>, policy: RetryPolicy)
where
    S: EventSource,
    H: EventHandler,
{
    let mut attempt: u32 = 0;

    loop {
        match source.connect().await {
            Ok(mut stream) => {
                attempt = 0;
                metrics::counter!("booking.channel.connected").increment(1);
                tracing::info!("Realtime channel connected");
                handler.on_connected().await;

                while let Some(item) = stream.next().await {
                    match item {
                        Ok(event) => handler.on_event(event).await,
                        Err(ApiError::ResponseParseFailed(reason)) => {
                            // One malformed frame; the stream itself is fine
                            tracing::warn!(reason = %reason, "Skipping malformed event frame");
                        },
                        Err(err) => {
                            tracing::warn!(error = %err, "Event stream failed");
                            break;
                        },
                    }
                }
                tracing::info!("Event stream ended, reconnecting");
            },
            Err(err @ (ApiError::Unauthorized | ApiError::MissingToken)) => {
                tracing::warn!(error = %err, "Event stream connection refused");
                handler.on_unavailable(err.user_message()).await;
                return;
            },
            Err(err) => {
                tracing::warn!(error = %err, attempt, "Event stream connection failed");
            },
        }

        attempt += 1;
        if !policy.should_retry(attempt) {
            metrics::counter!("booking.channel.gave_up").increment(1);
            tracing::error!(attempts = attempt, "Realtime channel retry budget exhausted");
            handler
                .on_unavailable("Realtime updates are unavailable".to_string())
                .await;
            return;
        }

        metrics::counter!("booking.channel.reconnects").increment(1);
        tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

    use std::time::Duration;

    use moihub_api::SeatAvailability;
    use tokio::sync::mpsc;

    use super::*;
    use crate::mocks::{ConnectScript, MockGateway};

    #[derive(Debug, PartialEq)]
    enum Happening {
        Connected,
        Event(RealtimeEvent),
        Unavailable(String),
    }

    struct Recorder {
        tx: mpsc::UnboundedSender<Happening>,
    }

    impl EventHandler for Recorder {
        async fn on_connected(&self) {
            let _ = self.tx.send(Happening::Connected);
        }

        async fn on_event(&self, event: RealtimeEvent) {
            let _ = self.tx.send(Happening::Event(event));
        }

        async fn on_unavailable(&self, reason: String) {
            let _ = self.tx.send(Happening::Unavailable(reason));
        }
    }

    fn recorder() -> (Arc<Recorder>, mpsc::UnboundedReceiver<Happening>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Recorder { tx }), rx)
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_attempts(max_attempts)
            .with_initial_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(1))
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<Happening>) -> Happening {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for channel happening")
            .expect("channel task ended unexpectedly")
    }

    #[tokio::test]
    async fn delivers_events_and_reconnects_after_stream_end() {
        let gateway = Arc::new(MockGateway::new());
        gateway.script_connect(ConnectScript::DeliverThenClose(vec![
            RealtimeEvent::PaymentRequested { payment_id: None },
        ]));
        gateway.script_connect(ConnectScript::Deliver(vec![RealtimeEvent::SeatUpdate {
            status: SeatAvailability::Booked,
            seat_number: "12".to_string(),
        }]));

        let (handler, mut rx) = recorder();
        let channel = RealtimeChannel::spawn(Arc::clone(&gateway), handler, fast_policy(5));

        assert_eq!(next(&mut rx).await, Happening::Connected);
        assert_eq!(
            next(&mut rx).await,
            Happening::Event(RealtimeEvent::PaymentRequested { payment_id: None })
        );
        // Server closed the stream; the channel reconnects on its own
        assert_eq!(next(&mut rx).await, Happening::Connected);
        assert_eq!(
            next(&mut rx).await,
            Happening::Event(RealtimeEvent::SeatUpdate {
                status: SeatAvailability::Booked,
                seat_number: "12".to_string(),
            })
        );
        assert!(gateway.connect_attempts() >= 2);

        channel.stop().await;
    }

    #[tokio::test]
    async fn auth_refusal_gives_up_without_retrying() {
        let gateway = Arc::new(MockGateway::new());
        gateway.script_connect(ConnectScript::Refuse(ApiError::Unauthorized));

        let (handler, mut rx) = recorder();
        let channel = RealtimeChannel::spawn(Arc::clone(&gateway), handler, fast_policy(5));

        match next(&mut rx).await {
            Happening::Unavailable(reason) => assert!(reason.contains("log in")),
            other => panic!("expected unavailable, got {other:?}"),
        }
        assert_eq!(gateway.connect_attempts(), 1);

        channel.stop().await;
    }

    #[tokio::test]
    async fn exhausted_retry_budget_reports_unavailable() {
        let gateway = Arc::new(MockGateway::new());
        for _ in 0..3 {
            gateway.script_connect(ConnectScript::Refuse(ApiError::RequestFailed(
                "connection refused".to_string(),
            )));
        }

        let (handler, mut rx) = recorder();
        let channel = RealtimeChannel::spawn(Arc::clone(&gateway), handler, fast_policy(3));

        match next(&mut rx).await {
            Happening::Unavailable(reason) => assert!(reason.contains("unavailable")),
            other => panic!("expected unavailable, got {other:?}"),
        }
        assert_eq!(gateway.connect_attempts(), 3);

        channel.stop().await;
    }

    #[tokio::test]
    async fn malformed_frames_are_skipped_not_fatal() {
        let gateway = Arc::new(MockGateway::new());
        gateway.script_connect(ConnectScript::DeliverItems(vec![
            Err(ApiError::ResponseParseFailed("bad json".to_string())),
            Ok(RealtimeEvent::SeatUpdate {
                status: SeatAvailability::Available,
                seat_number: "11".to_string(),
            }),
        ]));

        let (handler, mut rx) = recorder();
        let channel = RealtimeChannel::spawn(Arc::clone(&gateway), handler, fast_policy(5));

        assert_eq!(next(&mut rx).await, Happening::Connected);
        // The bad frame is dropped; the next good one still arrives
        assert_eq!(
            next(&mut rx).await,
            Happening::Event(RealtimeEvent::SeatUpdate {
                status: SeatAvailability::Available,
                seat_number: "11".to_string(),
            })
        );
        assert_eq!(gateway.connect_attempts(), 1);

        channel.stop().await;
    }
}
