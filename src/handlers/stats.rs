use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::{Stream, StreamExt};
use tracing::{error, info, warn};

use crate::core::state::AppState;

/// Logs when the stats stream is dropped, i.e. the client went away
struct ListenerGuard;

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        info!("Client disconnected from download stats");
    }
}

/// Server-sent progress events, one `data: <snapshot json>` per engine tick
///
/// GET /api/download-stats
pub async fn download_stats_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.broadcaster.subscribe();
    info!(
        listeners = state.broadcaster.listener_count(),
        "Client connected to download stats"
    );

    let guard = ListenerGuard;
    let stream = BroadcastStream::new(receiver).filter_map(move |item| {
        let _guard = &guard;
        match item {
            Ok(snapshot) => match Event::default().json_data(&snapshot) {
                Ok(event) => Some(Ok(event)),
                Err(e) => {
                    error!(error = %e, "Failed to encode progress snapshot");
                    None
                }
            },
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                warn!(missed = missed, "Stats listener fell behind, skipping snapshots");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
