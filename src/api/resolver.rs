use serde_json::Value;
use tracing::{error, info};

use super::completion::CompletionClient;
use super::movie_db::MovieDbClient;
use crate::core::config::{LlmConfig, MetadataConfig};
use crate::core::error::UpstreamError;

/// Torrent name to movie metadata: the language model cleans the title,
/// then the movie database is searched with it. No caching, no retries.
pub struct MetadataResolver {
    completion: CompletionClient,
    movie_db: MovieDbClient,
}

impl MetadataResolver {
    pub fn new(llm: &LlmConfig, metadata: &MetadataConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            completion: CompletionClient::new(llm)?,
            movie_db: MovieDbClient::new(metadata)?,
        })
    }

    pub async fn resolve(&self, raw_title: &str) -> Result<Value, UpstreamError> {
        let title = self
            .completion
            .extract_title(raw_title)
            .await
            .inspect_err(|e| error!(error = %e, raw_title = raw_title, "Title extraction failed"))?;

        info!(raw_title = raw_title, title = %title, "Resolved movie title");

        self.movie_db
            .search_movie(&title)
            .await
            .inspect_err(|e| error!(error = %e, title = %title, "Movie lookup failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::spawn_upstream;
    use axum::{
        extract::Query,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;

    fn resolver(base: &str) -> MetadataResolver {
        let llm = LlmConfig {
            api_base: base.to_string(),
            api_key: "sk-test".to_string(),
            ..LlmConfig::default()
        };
        let metadata = MetadataConfig {
            api_base: base.to_string(),
            api_key: "tmdb-key".to_string(),
            timeout: 5,
        };
        MetadataResolver::new(&llm, &metadata).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_chains_both_calls() {
        let router = Router::new()
            .route(
                "/chat/completions",
                post(|| async {
                    Json(json!({ "choices": [{ "message": { "content": "Heat\n" } }] }))
                }),
            )
            .route(
                "/search/movie",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    Json(json!({ "results": [{ "title": params["query"], "id": 949 }] }))
                }),
            );
        let base = spawn_upstream(router).await;

        let body = resolver(&base).resolve("Heat.1995.REMASTERED.1080p").await.unwrap();

        assert_eq!(body["results"][0]["title"], "Heat");
        assert_eq!(body["results"][0]["id"], 949);
    }

    #[tokio::test]
    async fn test_resolve_stops_when_title_extraction_fails() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { Json(json!({ "choices": [] })) }),
        );
        let base = spawn_upstream(router).await;

        let result = resolver(&base).resolve("whatever").await;
        assert!(matches!(result, Err(UpstreamError::MissingCompletion { .. })));
    }
}
