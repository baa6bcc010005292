//! HTTP-backed providers: the production gateway and event source
//!
//! Thin delegation onto [`MoiHubClient`]; the client owns request
//! construction, error mapping, and SSE frame parsing.

use moihub_api::{
    ApiError, CheckSeatResponse, EventStream, InitiatePaymentRequest, InitiatePaymentResponse,
    LockSeatResponse, MoiHubClient, PaymentId, StatusSnapshot,
};

use crate::environment::{BookingGateway, EventSource};

impl BookingGateway for MoiHubClient {
    async fn initiate_payment(
        &self,
        request: InitiatePaymentRequest,
    ) -> Result<InitiatePaymentResponse, ApiError> {
        MoiHubClient::initiate_payment(self, &request).await
    }

    async fn payment_status(&self, payment_id: &PaymentId) -> Result<StatusSnapshot, ApiError> {
        MoiHubClient::payment_status(self, payment_id).await
    }

    async fn lock_seat(
        &self,
        registration: &str,
        seat_id: &str,
    ) -> Result<LockSeatResponse, ApiError> {
        MoiHubClient::lock_seat(self, registration, seat_id).await
    }

    async fn check_seat(
        &self,
        registration: &str,
        seat_number: &str,
    ) -> Result<CheckSeatResponse, ApiError> {
        MoiHubClient::check_seat(self, registration, seat_number).await
    }
}

impl EventSource for MoiHubClient {
    async fn connect(&self) -> Result<EventStream, ApiError> {
        self.events().await
    }
}
