use axum::{
    extract::{Query, State},
    response::Json,
};
use serde_json::Value;
use std::sync::Arc;

use super::required;
use crate::core::error::ApiError;
use crate::core::state::AppState;
use crate::models::requests::SearchQuery;

/// Torrent search, passed through from the index unchanged
///
/// GET /api/search?q=<query>
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let query = required(params.q, "q")?;
    let results = state.search.search(&query).await?;
    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::{create_test_state, spawn_upstream};
    use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tempfile::TempDir;

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_search_passthrough() {
        let upstream = spawn_upstream(Router::new().route(
            "/q.php",
            get(|| async { Json(json!([{ "id": "1", "name": "Big Buck Bunny" }])) }),
        ))
        .await;
        let dir = TempDir::new().unwrap();
        let (state, _engine) = create_test_state(&upstream, dir.path());

        let Json(body) = search_handler(
            State(state),
            Query(SearchQuery {
                q: Some("bunny".to_string()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(body, json!([{ "id": "1", "name": "Big Buck Bunny" }]));
    }

    #[tokio::test]
    async fn test_search_upstream_failure_is_json_error() {
        let upstream = spawn_upstream(Router::new().route(
            "/q.php",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        ))
        .await;
        let dir = TempDir::new().unwrap();
        let (state, _engine) = create_test_state(&upstream, dir.path());

        let err = search_handler(
            State(state),
            Query(SearchQuery {
                q: Some("bunny".to_string()),
            }),
        )
        .await
        .unwrap_err();

        let response = err.into_response();
        assert!(response.status().is_server_error());
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_search_unreachable_upstream() {
        let dir = TempDir::new().unwrap();
        let (state, _engine) = create_test_state("http://127.0.0.1:1", dir.path());

        let err = search_handler(
            State(state),
            Query(SearchQuery {
                q: Some("bunny".to_string()),
            }),
        )
        .await
        .unwrap_err();

        let response = err.into_response();
        assert!(response.status().is_server_error());
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let dir = TempDir::new().unwrap();
        let (state, _engine) = create_test_state("http://127.0.0.1:1", dir.path());

        let err = search_handler(State(state), Query(SearchQuery { q: None }))
            .await
            .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
