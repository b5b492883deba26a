// Centralized error handling for the service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::path::PathBuf;
use thiserror::Error;

use crate::models::requests::ErrorResponse;

/// Failures talking to an external HTTP API (search index, LLM, movie db)
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("Request to {service} failed: {message}")]
    Transport { service: &'static str, message: String },

    #[error("{service} returned error status: {status}")]
    Status { service: &'static str, status: u16 },

    #[error("{service} returned a malformed response: {message}")]
    Malformed { service: &'static str, message: String },

    #[error("{service} response did not contain a completion")]
    MissingCompletion { service: &'static str },
}

/// Failures reported by the torrent engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to reach torrent engine: {0}")]
    Transport(String),

    #[error("Torrent engine returned error status: {0}")]
    Status(u16),

    #[error("Torrent engine rejected the request: {0}")]
    Rejected(String),

    #[error("Torrent engine returned a malformed response: {0}")]
    Malformed(String),
}

/// Failures while moving finished content into place
#[derive(Error, Debug)]
pub enum FilesystemError {
    #[error("Failed to create directory {}: {}", .path.display(), .source)]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {} to {}: {}", .from.display(), .to.display(), .source)]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors surfaced by the HTTP endpoints
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Upstream(UpstreamError::Transport { .. }) => StatusCode::BAD_GATEWAY,
            ApiError::Upstream(UpstreamError::Status { .. }) => StatusCode::BAD_GATEWAY,
            ApiError::Upstream(UpstreamError::Malformed { .. }) => StatusCode::BAD_GATEWAY,
            ApiError::Upstream(UpstreamError::MissingCompletion { .. }) => StatusCode::BAD_GATEWAY,
            ApiError::Upstream(UpstreamError::Client(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
