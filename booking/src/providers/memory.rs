//! In-memory draft store
//!
//! Session-scoped persistence with the same lifetime as the coordinator
//! that owns it. Operations are infallible; losing this store never fails
//! the payment flow, it only weakens recovery after a restart.

use tokio::sync::RwLock;

use crate::environment::DraftStore;
use crate::state::{BookingDraft, PendingPayment};

#[derive(Debug, Default)]
struct Inner {
    draft: Option<BookingDraft>,
    pending: Option<PendingPayment>,
}

/// In-memory store for the booking draft and the pending-payment hint
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    inner: RwLock<Inner>,
}

impl MemoryDraftStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for MemoryDraftStore {
    async fn load_draft(&self) -> Option<BookingDraft> {
        self.inner.read().await.draft.clone()
    }

    async fn save_draft(&self, draft: BookingDraft) {
        self.inner.write().await.draft = Some(draft);
    }

    async fn clear_draft(&self) {
        self.inner.write().await.draft = None;
    }

    async fn take_pending_payment(&self) -> Option<PendingPayment> {
        self.inner.write().await.pending.take()
    }

    async fn save_pending_payment(&self, pending: PendingPayment) {
        self.inner.write().await.pending = Some(pending);
    }

    async fn clear_pending_payment(&self) {
        self.inner.write().await.pending = None;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

    use super::*;
    use crate::msisdn::Msisdn;
    use crate::state::RouteInfo;
    use moihub_api::PaymentId;

    fn draft() -> BookingDraft {
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

    #[tokio::test]
    async fn draft_round_trips_and_clears() {
        let store = MemoryDraftStore::new();
        assert!(store.load_draft().await.is_none());

        store.save_draft(draft()).await;
        assert_eq!(store.load_draft().await, Some(draft()));

        store.clear_draft().await;
        assert!(store.load_draft().await.is_none());
    }

    #[tokio::test]
    async fn pending_payment_is_consumed_at_most_once() {
        let store = MemoryDraftStore::new();
        store
            .save_pending_payment(PendingPayment {
                payment_id: PaymentId::new("abc123"),
                phone: Msisdn::parse("0712345678").unwrap(),
            })
            .await;

        let first = store.take_pending_payment().await;
        assert_eq!(
            first.map(|p| p.payment_id),
            Some(PaymentId::new("abc123"))
        );

        // The hint is gone after the first take
        assert!(store.take_pending_payment().await.is_none());
    }
}
