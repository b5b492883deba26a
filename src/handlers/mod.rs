pub mod download;
pub mod fallback;
pub mod health;
pub mod movie;
pub mod search;
pub mod stats;

use crate::core::error::ApiError;

/// Pull a required, non-blank query parameter
pub(crate) fn required(value: Option<String>, name: &'static str) -> Result<String, ApiError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ApiError::MissingParameter(name)),
    }
}
