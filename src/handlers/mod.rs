pub mod booking;
pub mod captcha;
pub mod health;
pub mod schedule;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/slots", get(schedule::list_slots))
        .route("/api/slots/:id", get(schedule::get_slot))
        .route("/api/captcha", get(captcha::new_challenge))
        .route(
            "/api/bookings/availability/:slot_id",
            get(booking::check_availability),
        )
        .route("/api/bookings", post(booking::create_booking))
        .route("/api/bookings/track", get(booking::track_booking))
        .route("/api/bookings/cancel", put(booking::cancel_booking))
        .route("/api/bookings/update", put(booking::update_booking))
        .route("/api/visitors", post(booking::create_visitor))
        .with_state(state)
}
