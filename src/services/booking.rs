use serde::Serialize;
use serde_json::Value;

use super::api::{endpoints, ApiClient, ApiRequest, ApiResult};
use super::with_fallback;
use crate::errors::ApiError;
use crate::models::{
    AvailabilityCheck, Booking, BookingChanges, CancelRequest, NewBooking, TrackingCredentials,
    UpdateRequest,
};

fn to_body<T: Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Calls the public booking endpoints. One request per call, no retries.
#[derive(Clone)]
pub struct BookingService {
    api: ApiClient,
}

impl BookingService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn check_availability(
        &self,
        slot_id: &str,
        group_size: u32,
    ) -> ApiResult<AvailabilityCheck> {
        let request = ApiRequest::get(endpoints::BOOKING_AVAILABILITY)
            .segment(slot_id)
            .query("groupSize", group_size);
        self.api
            .fetch(request)
            .await
            .map_err(|e| with_fallback(e, "Failed to check availability. Please try again."))
    }

    pub async fn create_booking(&self, booking: &NewBooking) -> ApiResult<Booking> {
        let request = ApiRequest::post(endpoints::BOOKINGS, to_body(booking)?);
        let created: Booking = self
            .api
            .fetch(request)
            .await
            .map_err(|e| with_fallback(e, "Failed to create booking"))?;

        tracing::info!(
            booking_id = %created.id,
            slot_id = %created.slot_id,
            group_size = created.group_size,
            "booking created"
        );
        Ok(created)
    }

    pub async fn track_booking(&self, credentials: &TrackingCredentials) -> ApiResult<Booking> {
        let request = ApiRequest::get(endpoints::TRACK_BOOKING)
            .query("email", &credentials.email)
            .query("token", &credentials.token);
        self.api
            .fetch(request)
            .await
            .map_err(|e| with_fallback(e, "Failed to track booking"))
    }

    /// The reason is forwarded as-is; what the backend records is up to it.
    pub async fn cancel_booking(
        &self,
        credentials: &TrackingCredentials,
        reason: &str,
    ) -> ApiResult<Booking> {
        let body = CancelRequest {
            email: credentials.email.clone(),
            token: credentials.token.clone(),
            reason: reason.to_string(),
        };
        let cancelled: Booking = self
            .api
            .fetch(ApiRequest::put(endpoints::CANCEL_BOOKING, to_body(&body)?))
            .await
            .map_err(|e| with_fallback(e, "Failed to cancel booking"))?;

        tracing::info!(booking_id = %cancelled.id, "booking cancelled");
        Ok(cancelled)
    }

    /// Sends `changes` verbatim. Callers diff against their last snapshot
    /// first so unchanged fields are not sent.
    pub async fn update_booking(
        &self,
        credentials: &TrackingCredentials,
        changes: &BookingChanges,
    ) -> ApiResult<Booking> {
        let body = UpdateRequest {
            email: credentials.email.clone(),
            token: credentials.token.clone(),
            changes: changes.clone(),
        };
        let updated: Booking = self
            .api
            .fetch(ApiRequest::put(endpoints::UPDATE_BOOKING, to_body(&body)?))
            .await
            .map_err(|e| with_fallback(e, "Failed to update booking"))?;

        tracing::info!(booking_id = %updated.id, "booking updated");
        Ok(updated)
    }
}
