//! Torrent engine capability.
//!
//! The transfer itself (peers, pieces, disk I/O) is delegated to a third-party
//! engine. This module defines the seam the rest of the service talks to.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::broadcast;

use crate::core::error::EngineError;
use crate::models::transfer::{TransferInfo, TransferStats};

#[cfg(test)]
pub mod mock;
pub mod transmission;

/// Lifecycle notifications emitted by an engine
#[derive(Clone, Debug)]
pub enum EngineEvent {
    /// The engine became aware of a transfer
    Added(TransferInfo),
    /// Periodic tick while a transfer is downloading
    Progress(TransferStats),
    /// Emitted once when a transfer finishes
    Done(TransferInfo),
}

#[derive(Clone, Debug)]
pub struct AddOptions {
    /// Base directory the engine writes the transfer into
    pub download_dir: PathBuf,
}

#[async_trait]
pub trait TorrentEngine: Send + Sync {
    /// Hand a magnet link to the engine. Returns once the engine accepted or refused it.
    async fn add(&self, magnet_uri: &str, options: &AddOptions) -> Result<(), EngineError>;

    /// Subscribe to lifecycle events for every transfer the engine knows about
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;
}
