use anyhow::{Context, Result};
use axum::serve;
use media_fetch::core::config::Config;
use media_fetch::core::routes::build_router;
use media_fetch::core::startup::spawn_event_pump;
use media_fetch::core::state::AppState;
use media_fetch::core::tracing_init::init_tracing;
use media_fetch::engine::transmission::TransmissionEngine;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let config_path = if args.len() > 1 {
        PathBuf::from(&args[1])
    } else {
        PathBuf::from("config.toml")
    };

    // Load and validate configuration
    let config = Config::from_file(&config_path).context(format!(
        "Failed to load configuration from '{}'. \
        Copy config.example.toml to config.toml and adjust the values.",
        config_path.display()
    ))?;

    init_tracing(&config.logging);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.num_threads)
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    runtime.block_on(async_main(config, config_path))
}

async fn async_main(config: Config, config_path: PathBuf) -> Result<()> {
    info!(
        config_path = %config_path.display(),
        port = config.server.port,
        num_threads = config.server.num_threads,
        downloads_dir = %config.storage.downloads_dir.display(),
        movies_root = %config.storage.movies_root.display(),
        tv_shows_root = %config.storage.tv_shows_root.display(),
        log_level = %config.logging.level,
        "Media fetch service starting"
    );

    tokio::fs::create_dir_all(&config.storage.downloads_dir)
        .await
        .context(format!(
            "Failed to create downloads directory {}",
            config.storage.downloads_dir.display()
        ))?;

    let engine = Arc::new(
        TransmissionEngine::new(&config.engine, config.progress.channel_capacity)
            .context("Failed to create torrent engine client")?,
    );

    let state = AppState::new(config.clone(), engine.clone())
        .context("Failed to create upstream API clients")?;

    state
        .organizer
        .ensure_roots()
        .await
        .context("Failed to create destination directories")?;

    // Subscribe before polling starts so no event is missed
    spawn_event_pump(state.clone());
    engine.spawn_poller(Duration::from_millis(config.engine.poll_interval_ms));

    info!(
        rpc_url = %config.engine.rpc_url,
        poll_interval_ms = config.engine.poll_interval_ms,
        "Torrent engine poller started"
    );

    let app = build_router(Arc::new(state)).layer(
        ServiceBuilder::new().layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        ),
    );

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind TCP listener to {}", addr))?;

    info!(address = %addr, "Server running");

    serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutting down gracefully");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
