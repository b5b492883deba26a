use serde_json::Value;
use tracing::{debug, error};

use super::{http_client, json_body, transport_error};
use crate::core::config::SearchConfig;
use crate::core::error::UpstreamError;

const SERVICE: &str = "search index";

/// Pass-through client for the torrent index search API
pub struct SearchClient {
    client: reqwest::Client,
    endpoint: String,
    category: u32,
}

impl SearchClient {
    pub fn new(config: &SearchConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: http_client(config.timeout)?,
            endpoint: format!("{}/q.php", config.api_base.trim_end_matches('/')),
            category: config.category,
        })
    }

    /// Search the index within the configured category and return its JSON unchanged
    pub async fn search(&self, query: &str) -> Result<Value, UpstreamError> {
        let category = self.category.to_string();

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("cat", category.as_str())])
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let body = json_body(SERVICE, response).await.inspect_err(|e| {
            error!(error = %e, query = query, "Torrent search failed");
        })?;

        debug!(query = query, "Torrent search completed");
        Ok(body)
    }
}
