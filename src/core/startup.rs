use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::state::AppState;
use crate::engine::EngineEvent;
use crate::models::progress::ProgressSnapshot;
use crate::models::transfer::TransferInfo;

/// Apply one engine event to the registry, the progress stream and the organizer.
///
/// Returns the organizer task spawned when a transfer completes.
pub fn handle_engine_event(state: &AppState, event: EngineEvent) -> Option<JoinHandle<()>> {
    match event {
        EngineEvent::Added(transfer) => {
            // Requested through the API but already done by the first poll
            if transfer.finished && state.registry.is_active(&transfer.info_hash) {
                return complete_and_organize(state, transfer);
            }

            let tracking_id = state.registry.adopt(&transfer.info_hash, transfer.finished);
            info!(
                info_hash = %transfer.info_hash,
                tracking_id = %tracking_id,
                name = %transfer.name,
                finished = transfer.finished,
                "Engine reported torrent"
            );
            None
        }
        EngineEvent::Progress(stats) => {
            // Finished or unknown transfers no longer emit snapshots
            if let Some(tracking_id) = state.registry.active_tracking_id(&stats.info_hash) {
                let listeners = state
                    .broadcaster
                    .publish(ProgressSnapshot::from_stats(tracking_id, &stats));
                debug!(info_hash = %stats.info_hash, listeners = listeners, "Progress published");
            }
            None
        }
        EngineEvent::Done(transfer) => complete_and_organize(state, transfer),
    }
}

fn complete_and_organize(state: &AppState, transfer: TransferInfo) -> Option<JoinHandle<()>> {
    match state.registry.complete(&transfer.info_hash) {
        Some(tracking_id) => {
            info!(
                info_hash = %transfer.info_hash,
                tracking_id = %tracking_id,
                name = %transfer.name,
                "Download completed"
            );
            Some(spawn_organize(state, transfer))
        }
        None => {
            warn!(info_hash = %transfer.info_hash, "Duplicate completion ignored");
            None
        }
    }
}

fn spawn_organize(state: &AppState, transfer: TransferInfo) -> JoinHandle<()> {
    let organizer = Arc::clone(&state.organizer);
    tokio::spawn(async move {
        if let Err(e) = organizer.organize(&transfer).await {
            error!(
                error = %e,
                info_hash = %transfer.info_hash,
                "Failed to organize completed download"
            );
        }
    })
}

/// Spawn the task that feeds engine events into the application state
pub fn spawn_event_pump(state: AppState) -> JoinHandle<()> {
    let mut events = state.engine.subscribe();

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    handle_engine_event(&state, event);
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed = missed, "Event pump fell behind the engine");
                }
                Err(RecvError::Closed) => {
                    info!("Engine event stream closed");
                    break;
                }
            }
        }
    })
}
