use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::state::AppState;
use crate::utils::time::current_timestamp;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64,
    pub active: usize,
    pub completed: usize,
    pub listeners: usize,
}

/// Health check handler
///
/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            timestamp: current_timestamp(),
            active: state.registry.active_count(),
            completed: state.registry.completed_count(),
            listeners: state.broadcaster.listener_count(),
        }),
    )
}
