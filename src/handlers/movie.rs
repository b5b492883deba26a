use axum::{
    extract::{Query, State},
    response::Json,
};
use serde_json::Value;
use std::sync::Arc;

use super::required;
use crate::core::error::ApiError;
use crate::core::state::AppState;
use crate::models::requests::MovieQuery;

/// Resolve a torrent name to movie metadata
///
/// GET /api/movie?title=<torrent name>
pub async fn movie_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MovieQuery>,
) -> Result<Json<Value>, ApiError> {
    let title = required(params.title, "title")?;
    let metadata = state.resolver.resolve(&title).await?;
    Ok(Json(metadata))
}
