use axum::{
    extract::{Query, State},
    response::Json,
};
use std::sync::Arc;
use tracing::error;

use super::required;
use crate::core::error::ApiError;
use crate::core::state::AppState;
use crate::models::requests::{DownloadQuery, DownloadResponse};
use crate::models::transfer::InfoHash;
use crate::stores::registry::DownloadOutcome;

pub const ALREADY_KNOWN_MESSAGE: &str =
    "Torrent is already being downloaded or has been downloaded";

/// Start downloading a torrent by info hash
///
/// GET /api/download?infoHash=<40 hex chars>
pub async fn download_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DownloadQuery>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let raw = required(params.info_hash, "infoHash")?;
    let info_hash = InfoHash::parse(&raw)
        .ok_or_else(|| ApiError::InvalidParameter(format!("infoHash '{}' is not a 40 character hex string", raw)))?;

    let outcome = state
        .registry
        .request_download(&info_hash, state.engine.as_ref(), &state.add_options())
        .await
        .inspect_err(|e| error!(error = %e, info_hash = %info_hash, "Error adding torrent"))?;

    let response = match outcome {
        DownloadOutcome::Started { tracking_id } => DownloadResponse {
            message: format!("Downloading torrent with infoHash: {}", info_hash),
            tracking_id: Some(tracking_id),
        },
        DownloadOutcome::AlreadyKnown => DownloadResponse {
            message: ALREADY_KNOWN_MESSAGE.to_string(),
            tracking_id: None,
        },
    };

    Ok(Json(response))
}
