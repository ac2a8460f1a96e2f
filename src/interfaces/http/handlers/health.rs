//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::interfaces::http::AppState;

/// Service health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub direct_sessions: usize,
    pub evse_statuses: usize,
    pub endpoints: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let handler = &state.handler;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        direct_sessions: handler.direct.count(),
        evse_statuses: handler.status.evse_count(),
        endpoints: handler.endpoints.count(),
    })
}
