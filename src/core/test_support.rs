// Shared fixtures for tests

use crate::core::config::Config;
use crate::core::state::AppState;
use crate::engine::mock::RecordingEngine;
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn spawn_upstream(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Config with every upstream pointed at `upstream` and storage under `root`
pub fn create_test_config(upstream: &str, root: &Path) -> Config {
    let content = format!(
        r#"
        [server]
        port = 3000
        num_threads = 2

        [storage]
        downloads_dir = "{root}/downloads"
        movies_root = "{root}/movies"
        tv_shows_root = "{root}/tv"

        [engine]
        rpc_url = "{upstream}/transmission/rpc"

        [search]
        api_base = "{upstream}"
        timeout = 5

        [llm]
        api_base = "{upstream}"
        api_key = "sk-test"
        timeout = 5

        [metadata]
        api_base = "{upstream}"
        api_key = "tmdb-key"
        timeout = 5

        [progress]
        channel_capacity = 16
        "#,
        root = root.display(),
        upstream = upstream,
    );

    Config::parse(&content).unwrap()
}

pub fn create_test_state(upstream: &str, root: &Path) -> (Arc<AppState>, Arc<RecordingEngine>) {
    let engine = Arc::new(RecordingEngine::new());
    let state = AppState::new(create_test_config(upstream, root), engine.clone()).unwrap();
    (Arc::new(state), engine)
}
