use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::state::AppState;
use crate::use_cases::RoomError;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

#[derive(Debug, serde::Deserialize)]
pub struct RoomInitRequest {
    // Room id chosen by the caller.
    room_id: String,
}

#[derive(Debug, serde::Serialize)]
struct RoomInitResponse {
    // The room id that was created.
    room_id: String,
}

pub async fn create_room_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RoomInitRequest>,
) -> impl IntoResponse {
    let room_id = payload.room_id.trim().to_string();
    if room_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "room_id is required".to_string(),
            }),
        )
            .into_response();
    }

    match state.room_registry.create_room(room_id.clone()).await {
        Ok(()) => (StatusCode::CREATED, Json(RoomInitResponse { room_id })).into_response(),
        Err(RoomError::AlreadyExists) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "room already exists".to_string(),
            }),
        )
            .into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "room creation failed".to_string(),
            }),
        )
            .into_response(),
    }
}

pub async fn healthz_handler() -> &'static str {
    "ok"
}
