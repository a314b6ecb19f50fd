use super::booking::BookingService;
use crate::errors::ApiError;
use crate::models::{Booking, BookingChanges, TrackingCredentials};
use crate::validation::{
    validate_cancel_reason, validate_group_size, validate_special_requirements, Field,
    FieldErrors, FALLBACK_CAPACITY,
};

const MISSING_BOOKING: &str = "Missing booking information";
const NOT_MODIFIABLE: &str = "This booking can no longer be modified";
const NO_CHANGES: &str = "No changes to update";

/// Why a lookup did not produce a booking.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LookupError {
    #[error("Please enter both email and tracking token")]
    MissingCredentials,

    /// Covers a wrong email, a wrong token and a missing booking alike.
    #[error("Booking not found. Please check your email and tracking token.")]
    NotFound,

    #[error(transparent)]
    Upstream(ApiError),
}

impl From<ApiError> for LookupError {
    /// Only a refusal of the credentials reads as not found. Unusable payloads
    /// and transport failures keep their own message.
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Backend(_) => LookupError::NotFound,
            e if matches!(e.status(), Some(401 | 403 | 404)) => LookupError::NotFound,
            e => LookupError::Upstream(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackingState {
    Idle,
    Searching,
    /// A booking is on screen. Cancel and update work against it and record
    /// their failures in `errors`.
    Loaded {
        booking: Booking,
        credentials: TrackingCredentials,
        errors: FieldErrors,
    },
    Failed(LookupError),
}

/// Look up, cancel or edit an existing booking with the email and tracking
/// token handed out at creation.
pub struct TrackingFlow {
    state: TrackingState,
}

impl Default for TrackingFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutation responses may omit the nested slot and visitor; keep the ones
/// already on screen.
fn carry_nested(previous: &Booking, mut fresh: Booking) -> Booking {
    if fresh.slot.is_none() {
        fresh.slot = previous.slot.clone();
    }
    if fresh.visitor.is_none() {
        fresh.visitor = previous.visitor.clone();
    }
    fresh
}

impl TrackingFlow {
    pub fn new() -> Self {
        Self {
            state: TrackingState::Idle,
        }
    }

    pub fn state(&self) -> &TrackingState {
        &self.state
    }

    pub fn booking(&self) -> Option<&Booking> {
        match &self.state {
            TrackingState::Loaded { booking, .. } => Some(booking),
            _ => None,
        }
    }

    pub fn can_modify(&self) -> bool {
        self.booking().is_some_and(Booking::can_modify)
    }

    pub async fn track(
        &mut self,
        bookings: &BookingService,
        email: &str,
        token: &str,
    ) -> &TrackingState {
        let (email, token) = (email.trim(), token.trim());
        if email.is_empty() || token.is_empty() {
            self.state = TrackingState::Failed(LookupError::MissingCredentials);
            return &self.state;
        }

        self.state = TrackingState::Searching;
        let credentials = TrackingCredentials {
            email: email.to_string(),
            token: token.to_string(),
        };

        self.state = match bookings.track_booking(&credentials).await {
            Ok(booking) => TrackingState::Loaded {
                booking,
                credentials,
                errors: FieldErrors::new(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "booking lookup failed");
                TrackingState::Failed(e.into())
            }
        };
        &self.state
    }

    /// Records `errors` on the loaded booking, if any, and hands them back.
    fn reject(&mut self, errors: FieldErrors) -> FieldErrors {
        if let TrackingState::Loaded { errors: shown, .. } = &mut self.state {
            *shown = errors.clone();
        }
        errors
    }

    fn modifiable(&self) -> Result<(&Booking, &TrackingCredentials), FieldErrors> {
        match &self.state {
            TrackingState::Loaded {
                booking,
                credentials,
                ..
            } => {
                if booking.can_modify() {
                    Ok((booking, credentials))
                } else {
                    Err(FieldErrors::single(Field::Submit, NOT_MODIFIABLE))
                }
            }
            _ => Err(FieldErrors::single(Field::Submit, MISSING_BOOKING)),
        }
    }

    fn replace_booking(&mut self, fresh: Booking) -> Result<&Booking, FieldErrors> {
        match &mut self.state {
            TrackingState::Loaded {
                booking, errors, ..
            } => {
                *booking = carry_nested(booking, fresh);
                errors.clear();
                Ok(&*booking)
            }
            _ => Err(FieldErrors::single(Field::Submit, MISSING_BOOKING)),
        }
    }

    /// Cancels the loaded booking. A blank reason is refused before anything
    /// is sent.
    pub async fn cancel(
        &mut self,
        bookings: &BookingService,
        reason: &str,
    ) -> Result<&Booking, FieldErrors> {
        if let Some(message) = validate_cancel_reason(reason) {
            return Err(self.reject(FieldErrors::single(Field::Reason, message)));
        }
        let credentials = match self.modifiable().map(|(_, c)| c.clone()) {
            Ok(credentials) => credentials,
            Err(errors) => return Err(self.reject(errors)),
        };

        match bookings.cancel_booking(&credentials, reason.trim()).await {
            Ok(cancelled) => self.replace_booking(cancelled),
            Err(e) => Err(self.reject(FieldErrors::single(Field::Submit, e.to_string()))),
        }
    }

    /// Sends the edits that differ from the loaded booking.
    pub async fn update(
        &mut self,
        bookings: &BookingService,
        edits: &BookingChanges,
    ) -> Result<&Booking, FieldErrors> {
        let prepared = self.modifiable().and_then(|(booking, credentials)| {
            let changes = edits.diff_against(booking);
            Self::check_changes(booking, &changes)?;
            Ok((changes, credentials.clone()))
        });
        let (changes, credentials) = match prepared {
            Ok(prepared) => prepared,
            Err(errors) => return Err(self.reject(errors)),
        };

        match bookings.update_booking(&credentials, &changes).await {
            Ok(updated) => self.replace_booking(updated),
            Err(e) => {
                let field = if e.is_capacity_conflict() {
                    Field::GroupSize
                } else {
                    Field::Submit
                };
                Err(self.reject(FieldErrors::single(field, e.to_string())))
            }
        }
    }

    fn check_changes(booking: &Booking, changes: &BookingChanges) -> Result<(), FieldErrors> {
        if changes.is_empty() {
            return Err(FieldErrors::single(Field::Update, NO_CHANGES));
        }

        let mut errors = FieldErrors::new();
        if let Some(group_size) = changes.group_size {
            // The booking's own seats are already counted in `booked`.
            let (capacity, booked) = booking
                .slot
                .as_ref()
                .map(|s| (s.capacity, s.booked.saturating_sub(booking.group_size)))
                .unwrap_or((FALLBACK_CAPACITY, 0));
            errors.set(
                Field::GroupSize,
                validate_group_size(f64::from(group_size), capacity, booked),
            );
        }
        errors.set(
            Field::SpecialRequirements,
            validate_special_requirements(changes.special_requests.as_deref()),
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::models::BookingStatus;
    use crate::services::api::testing::MockTransport;
    use crate::services::api::ApiClient;

    fn booking_json(status: &str) -> Value {
        json!({
            "id": "bk-1",
            "slotId": "slot-1",
            "visitorId": "v-1",
            "groupSize": 3,
            "status": status,
            "specialRequests": "Stroller parking",
            "slot": {
                "id": "slot-1",
                "date": "2025-06-16",
                "startTime": "10:00:00",
                "endTime": "11:00:00",
                "capacity": 10,
                "bookedCount": 8,
                "status": "available"
            }
        })
    }

    fn wrapped(data: Value) -> Result<Value, ApiError> {
        Ok(json!({"success": true, "data": data}))
    }

    async fn loaded(
        status: &str,
        more: Vec<Result<Value, ApiError>>,
    ) -> (TrackingFlow, BookingService, std::sync::Arc<MockTransport>) {
        let mut responses = vec![wrapped(booking_json(status))];
        responses.extend(more);
        let transport = MockTransport::new(responses);
        let service = BookingService::new(ApiClient::new(transport.clone()));
        let mut flow = TrackingFlow::new();
        flow.track(&service, " jo@example.com ", "tok-1").await;
        (flow, service, transport)
    }

    #[tokio::test]
    async fn test_track_requires_both_credentials() {
        let transport = MockTransport::new(vec![]);
        let service = BookingService::new(ApiClient::new(transport.clone()));
        let mut flow = TrackingFlow::new();

        let state = flow.track(&service, "jo@example.com", "  ").await;
        assert_eq!(state, &TrackingState::Failed(LookupError::MissingCredentials));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_track_loads_booking() {
        let (flow, _, transport) = loaded("confirmed", vec![]).await;
        let booking = flow.booking().unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert!(flow.can_modify());
        assert_eq!(transport.request(0).query_value("email"), Some("jo@example.com"));
    }

    #[tokio::test]
    async fn test_track_not_found_is_generic() {
        for err in [
            ApiError::http(404, Some("No booking with that token".to_string())),
            ApiError::http(401, None),
            ApiError::Backend("Invalid token".to_string()),
        ] {
            let transport = MockTransport::new(vec![Err(err)]);
            let service = BookingService::new(ApiClient::new(transport));
            let mut flow = TrackingFlow::new();
            let state = flow.track(&service, "jo@example.com", "bad").await;
            assert_eq!(state, &TrackingState::Failed(LookupError::NotFound));
        }
    }

    #[test]
    fn test_not_found_message_is_generic() {
        assert_eq!(
            LookupError::NotFound.to_string(),
            "Booking not found. Please check your email and tracking token."
        );
        assert_eq!(
            LookupError::MissingCredentials.to_string(),
            "Please enter both email and tracking token"
        );
    }

    #[tokio::test]
    async fn test_track_malformed_response_is_not_reported_as_missing() {
        let transport =
            MockTransport::new(vec![Ok(json!({"success": true, "data": {"unexpected": 1}}))]);
        let service = BookingService::new(ApiClient::new(transport));
        let mut flow = TrackingFlow::new();

        match flow.track(&service, "jo@example.com", "tok").await {
            TrackingState::Failed(LookupError::Upstream(e)) => {
                assert_eq!(e.to_string(), "Failed to track booking");
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_track_network_failure_surfaces_message() {
        let transport = MockTransport::new(vec![Err(ApiError::Timeout)]);
        let service = BookingService::new(ApiClient::new(transport));
        let mut flow = TrackingFlow::new();
        let state = flow.track(&service, "jo@example.com", "tok").await;
        match state {
            TrackingState::Failed(e) => {
                assert_eq!(e.to_string(), "Request timed out. Please try again.");
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_with_blank_reason_sends_nothing() {
        let (mut flow, service, transport) = loaded("confirmed", vec![]).await;

        let errors = flow.cancel(&service, "   ").await.unwrap_err();
        assert_eq!(
            errors.get(Field::Reason),
            Some("Please provide a reason for cancellation")
        );
        assert_eq!(transport.request_count(), 1);
        match flow.state() {
            TrackingState::Loaded { errors, .. } => assert!(errors.contains(Field::Reason)),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_without_booking() {
        let transport = MockTransport::new(vec![]);
        let service = BookingService::new(ApiClient::new(transport));
        let mut flow = TrackingFlow::new();
        let errors = flow.cancel(&service, "Sick").await.unwrap_err();
        assert_eq!(errors.get(Field::Submit), Some(MISSING_BOOKING));
    }

    #[tokio::test]
    async fn test_cancel_replaces_booking_and_keeps_slot() {
        let mut cancelled = booking_json("cancelled");
        cancelled.as_object_mut().unwrap().remove("slot");
        let (mut flow, service, transport) = loaded("confirmed", vec![wrapped(cancelled)]).await;

        let booking = flow.cancel(&service, " Weather ").await.unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);
        assert!(booking.slot.is_some());
        assert!(!flow.can_modify());

        let body = transport.request(1).body.unwrap();
        assert_eq!(body["reason"], "Weather");
        assert_eq!(body["email"], "jo@example.com");
    }

    #[tokio::test]
    async fn test_cancelled_booking_cannot_be_modified() {
        let (mut flow, service, transport) = loaded("cancelled", vec![]).await;

        let errors = flow.cancel(&service, "Again").await.unwrap_err();
        assert_eq!(errors.get(Field::Submit), Some(NOT_MODIFIABLE));

        let edits = BookingChanges {
            notes: Some("late".to_string()),
            ..BookingChanges::default()
        };
        let errors = flow.update(&service, &edits).await.unwrap_err();
        assert_eq!(errors.get(Field::Submit), Some(NOT_MODIFIABLE));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_update_without_changes_sends_nothing() {
        let (mut flow, service, transport) = loaded("pending", vec![]).await;
        let edits = BookingChanges {
            group_size: Some(3),
            special_requests: Some("Stroller parking".to_string()),
            ..BookingChanges::default()
        };

        let errors = flow.update(&service, &edits).await.unwrap_err();
        assert_eq!(errors.get(Field::Update), Some(NO_CHANGES));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_update_group_size_credits_own_seats() {
        // capacity 10, booked 8 of which 3 are ours: up to 5 is fine.
        let mut updated = booking_json("pending");
        updated["groupSize"] = json!(5);
        let (mut flow, service, transport) = loaded("pending", vec![wrapped(updated)]).await;

        let too_many = BookingChanges {
            group_size: Some(6),
            ..BookingChanges::default()
        };
        let errors = flow.update(&service, &too_many).await.unwrap_err();
        assert!(errors
            .get(Field::GroupSize)
            .unwrap()
            .contains("exceeds available spots (5)"));
        assert_eq!(transport.request_count(), 1);

        let fits = BookingChanges {
            group_size: Some(5),
            special_requests: Some("Stroller parking".to_string()),
            ..BookingChanges::default()
        };
        let booking = flow.update(&service, &fits).await.unwrap();
        assert_eq!(booking.group_size, 5);

        let body = transport.request(1).body.unwrap();
        assert_eq!(
            body,
            json!({"email": "jo@example.com", "token": "tok-1", "groupSize": 5})
        );
    }

    #[tokio::test]
    async fn test_update_rejects_zero_group_size() {
        let (mut flow, service, _) = loaded("pending", vec![]).await;
        let edits = BookingChanges {
            group_size: Some(0),
            ..BookingChanges::default()
        };
        let errors = flow.update(&service, &edits).await.unwrap_err();
        assert_eq!(
            errors.get(Field::GroupSize),
            Some("Group size must be at least 1")
        );
    }

    #[tokio::test]
    async fn test_update_conflict_lands_on_group_size() {
        let (mut flow, service, _) = loaded(
            "pending",
            vec![Err(ApiError::http(409, Some("Only 1 spots remaining".to_string())))],
        )
        .await;
        let edits = BookingChanges {
            group_size: Some(4),
            ..BookingChanges::default()
        };
        let errors = flow.update(&service, &edits).await.unwrap_err();
        assert_eq!(errors.get(Field::GroupSize), Some("Only 1 spots remaining"));
        assert!(flow.booking().is_some());
    }
}
