//! Read-only view of direct sessions

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::domain::{DirectId, DirectSession};
use crate::interfaces::http::AppState;

type ApiError = (StatusCode, Json<Value>);

/// `GET /direct/sessions/{id}`, after lazy expiry.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DirectSession>, ApiError> {
    let direct_id = DirectId::parse(&id).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    state
        .handler
        .direct
        .session(&direct_id, Utc::now())
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("unknown direct session {}", direct_id) })),
            )
        })
}
