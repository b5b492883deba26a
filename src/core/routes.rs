// HTTP routes configuration

use crate::core::state::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::services::ServeDir;

pub fn build_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route("/api/search", get(crate::handlers::search::search_handler))
        .route("/api/download", get(crate::handlers::download::download_handler))
        .route(
            "/api/download-stats",
            get(crate::handlers::stats::download_stats_handler),
        )
        .route("/api/movie", get(crate::handlers::movie::movie_handler))
        .route("/health", get(crate::handlers::health::health_handler));

    // Browser front-end if configured, JSON 404 otherwise
    let router = match &state.config.server.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router.fallback(crate::handlers::fallback::fallback_handler),
    };

    router.with_state(state)
}
