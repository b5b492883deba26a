use serde_json::Value;

use super::{http_client, json_body, transport_error};
use crate::core::config::MetadataConfig;
use crate::core::error::UpstreamError;

const SERVICE: &str = "movie database";

/// Movie search client; results are returned as the API sent them
pub struct MovieDbClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl MovieDbClient {
    pub fn new(config: &MetadataConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: http_client(config.timeout)?,
            endpoint: format!("{}/search/movie", config.api_base.trim_end_matches('/')),
            api_key: config.api_key.clone(),
        })
    }

    pub async fn search_movie(&self, title: &str) -> Result<Value, UpstreamError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("api_key", self.api_key.as_str()), ("query", title)])
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        json_body(SERVICE, response).await
    }
}
