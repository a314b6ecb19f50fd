use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::errors::AppError;
use crate::services::api::ApiResponse;
use crate::services::captcha::{MathChallenge, SignedChallenge};
use crate::state::AppState;

// GET /api/captcha
pub async fn new_challenge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SignedChallenge>>, AppError> {
    let signed = state
        .captcha
        .issue(MathChallenge::random(), state.clock.now())
        .map_err(|e| AppError::Config(e.to_string()))?;
    Ok(Json(ApiResponse::ok(signed)))
}
