use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;

use crate::errors::AppError;
use crate::models::{schedule_board, ScheduleDay, SlotView};
use crate::services::api::ApiResponse;
use crate::services::schedule::SlotFilter;
use crate::state::AppState;

// GET /api/slots
pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<SlotFilter>,
) -> Result<Json<ApiResponse<Vec<ScheduleDay>>>, AppError> {
    let slots = state.schedule.list_available_slots(&filter).await?;
    let board = schedule_board(&slots, state.clock.now());
    Ok(Json(ApiResponse::ok(board)))
}

// GET /api/slots/:id
pub async fn get_slot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SlotView>>, AppError> {
    let slot = state.schedule.get_slot(&id).await.map_err(|e| {
        if e.is_not_found() {
            AppError::NotFound("Slot not found.".to_string())
        } else {
            AppError::Upstream(e)
        }
    })?;
    Ok(Json(ApiResponse::ok(slot.view(state.clock.now()))))
}
