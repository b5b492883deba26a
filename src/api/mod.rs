pub mod completion;
pub mod movie_db;
pub mod resolver;
pub mod search;

use std::time::Duration;

use crate::core::error::UpstreamError;

/// Build an HTTP client with a request timeout
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, UpstreamError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| UpstreamError::Client(e.to_string()))
}

/// Check the status and decode the body as JSON
pub(crate) async fn json_body(
    service: &'static str,
    response: reqwest::Response,
) -> Result<serde_json::Value, UpstreamError> {
    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::Status {
            service,
            status: status.as_u16(),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| UpstreamError::Transport {
            service,
            message: e.to_string(),
        })?;

    serde_json::from_slice(&bytes).map_err(|e| UpstreamError::Malformed {
        service,
        message: e.to_string(),
    })
}

pub(crate) fn transport_error(service: &'static str, err: reqwest::Error) -> UpstreamError {
    UpstreamError::Transport {
        service,
        message: err.to_string(),
    }
}
