use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::{AvailabilityCheck, Booking, BookingChanges, Visitor, VisitorData};
use crate::services::api::ApiResponse;
use crate::services::booking_flow::{BookingFlow, BookingState, Confirmation};
use crate::services::tracking_flow::{LookupError, TrackingFlow, TrackingState};
use crate::state::AppState;
use crate::validation::{
    coerce_group_size, validate_cancel_reason, validate_visitor_data, whole_group_size, Field,
    FieldErrors,
};

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::MissingCredentials => {
                AppError::Validation(FieldErrors::single(Field::Submit, err.to_string()))
            }
            LookupError::NotFound => AppError::NotFound(err.to_string()),
            LookupError::Upstream(e) => AppError::Upstream(e),
        }
    }
}

/// Reads a group size the way the booking form does: numbers as given,
/// strings coerced, anything else as 0 so it fails the "at least 1" rule.
fn group_size_input(raw: &Value) -> f64 {
    match raw {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => coerce_group_size(s),
        _ => 0.0,
    }
}

fn checked_group_size(raw: f64) -> Result<u32, AppError> {
    whole_group_size(raw)
        .map_err(|message| AppError::Validation(FieldErrors::single(Field::GroupSize, message)))
}

/// Looks the booking up so cancel and update run against a fresh snapshot.
async fn load(state: &AppState, email: &str, token: &str) -> Result<TrackingFlow, AppError> {
    let mut flow = TrackingFlow::new();
    if let TrackingState::Failed(e) = flow.track(&state.bookings, email, token).await {
        return Err(e.clone().into());
    }
    Ok(flow)
}

// GET /api/bookings/availability/:slot_id
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub group_size: Option<String>,
}

pub async fn check_availability(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<ApiResponse<AvailabilityCheck>>, AppError> {
    let group_size = match query.group_size.as_deref() {
        Some(raw) => checked_group_size(coerce_group_size(raw))?,
        None => 1,
    };

    let check = state
        .bookings
        .check_availability(&slot_id, group_size)
        .await?;
    Ok(Json(ApiResponse::ok(check)))
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CaptchaAnswer {
    pub token: String,
    pub answer: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub slot_id: String,
    #[serde(default)]
    pub visitor: VisitorData,
    #[serde(default)]
    pub group_size: Option<Value>,
    pub captcha: Option<CaptchaAnswer>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Confirmation>>), AppError> {
    let now = state.clock.now();
    let mut flow = BookingFlow::open(&state.schedule, state.clock.as_ref(), &req.slot_id)
        .await
        .map_err(AppError::Validation)?;

    let visitor = req.visitor;
    flow.set_field(Field::Name, &visitor.name);
    flow.set_field(Field::Email, &visitor.email);
    let optional = [
        (Field::Phone, visitor.phone),
        (Field::Organization, visitor.organization),
        (Field::SpecialRequirements, visitor.special_requirements),
        (Field::VisitorType, visitor.visitor_type),
        (Field::Country, visitor.country),
    ];
    for (field, value) in optional {
        if let Some(value) = value {
            flow.set_field(field, &value);
        }
    }
    let group_size = req.group_size.as_ref().map(group_size_input).unwrap_or(0.0);
    flow.set_field(Field::GroupSize, &group_size.to_string());

    if let Some(captcha) = &req.captcha {
        match state.captcha.open(&captcha.token, now) {
            Ok(challenge) => {
                flow.use_challenge(challenge);
                flow.answer_captcha(&captcha.answer);
            }
            Err(e) => tracing::info!(error = %e, "rejected captcha token"),
        }
    }

    match flow.submit(&state.bookings).await {
        BookingState::Confirmed(confirmation) => Ok((
            StatusCode::CREATED,
            Json(ApiResponse::ok(confirmation.clone())),
        )),
        BookingState::Idle { errors } | BookingState::Failed { errors } => {
            Err(AppError::Validation(errors.clone()))
        }
        BookingState::Validating | BookingState::Submitting => Err(AppError::Validation(
            FieldErrors::single(Field::Submit, "Failed to create booking"),
        )),
    }
}

// GET /api/bookings/track
#[derive(Deserialize)]
pub struct TrackQuery {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub token: String,
}

pub async fn track_booking(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrackQuery>,
) -> Result<Json<ApiResponse<Booking>>, AppError> {
    let flow = load(&state, &query.email, &query.token).await?;
    let booking = flow
        .booking()
        .cloned()
        .ok_or_else(|| AppError::NotFound(LookupError::NotFound.to_string()))?;
    Ok(Json(ApiResponse::ok(booking)))
}

// PUT /api/bookings/cancel
#[derive(Deserialize)]
pub struct CancelBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub reason: String,
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CancelBody>,
) -> Result<Json<ApiResponse<Booking>>, AppError> {
    if let Some(message) = validate_cancel_reason(&body.reason) {
        return Err(AppError::Validation(FieldErrors::single(Field::Reason, message)));
    }

    let mut flow = load(&state, &body.email, &body.token).await?;
    let booking = flow
        .cancel(&state.bookings, &body.reason)
        .await
        .map_err(AppError::Validation)?;
    Ok(Json(ApiResponse::ok(booking.clone())))
}

// PUT /api/bookings/update
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub token: String,
    /// Taken here rather than by `changes` so any JSON value gets a field error.
    #[serde(default)]
    pub group_size: Option<Value>,
    #[serde(flatten)]
    pub changes: BookingChanges,
}

pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    Json(mut body): Json<UpdateBody>,
) -> Result<Json<ApiResponse<Booking>>, AppError> {
    if let Some(raw) = &body.group_size {
        body.changes.group_size = Some(checked_group_size(group_size_input(raw))?);
    }

    let mut flow = load(&state, &body.email, &body.token).await?;
    let booking = flow
        .update(&state.bookings, &body.changes)
        .await
        .map_err(AppError::Validation)?;
    Ok(Json(ApiResponse::ok(booking.clone())))
}

// POST /api/visitors
pub async fn create_visitor(
    State(state): State<Arc<AppState>>,
    Json(data): Json<VisitorData>,
) -> Result<(StatusCode, Json<ApiResponse<Visitor>>), AppError> {
    let errors = validate_visitor_data(&data);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let visitor = state.visitors.create_visitor(&data.to_new_visitor()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(visitor))))
}
