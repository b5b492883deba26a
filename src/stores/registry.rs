use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{info, warn};

use crate::core::error::EngineError;
use crate::engine::{AddOptions, TorrentEngine};
use crate::models::transfer::InfoHash;
use crate::utils::id::generate_tracking_id;

/// Where a known info hash stands. A hash is never both active and completed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadState {
    Active { tracking_id: String },
    Completed { tracking_id: String },
}

impl DownloadState {
    pub fn tracking_id(&self) -> &str {
        match self {
            DownloadState::Active { tracking_id } => tracking_id,
            DownloadState::Completed { tracking_id } => tracking_id,
        }
    }
}

/// Result of asking for a download
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadOutcome {
    Started { tracking_id: String },
    /// Already downloading or downloaded; the engine was not contacted
    AlreadyKnown,
}

/// Process-wide registry of in-flight and finished downloads.
///
/// One tracking id is minted per info hash and shared by the download
/// endpoint and the progress stream. Lives for the process lifetime only.
pub struct DownloadRegistry {
    downloads: DashMap<InfoHash, DownloadState>,
}

impl DownloadRegistry {
    pub fn new() -> Self {
        Self {
            downloads: DashMap::new(),
        }
    }

    /// Claim an unknown hash as active. Returns `None` if it is already known.
    ///
    /// The entry lock makes concurrent callers for the same hash race to a single winner.
    pub fn reserve(&self, info_hash: &InfoHash) -> Option<String> {
        match self.downloads.entry(info_hash.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                let tracking_id = generate_tracking_id();
                entry.insert(DownloadState::Active {
                    tracking_id: tracking_id.clone(),
                });
                Some(tracking_id)
            }
        }
    }

    /// Undo a reservation after the engine refused the transfer
    pub fn release(&self, info_hash: &InfoHash, tracking_id: &str) -> bool {
        self.downloads
            .remove_if(info_hash, |_, state| {
                matches!(state, DownloadState::Active { tracking_id: id } if id == tracking_id)
            })
            .is_some()
    }

    /// Start a download unless the hash is already known.
    ///
    /// The reservation is rolled back if the engine refuses the magnet, so a
    /// failed add can be retried.
    pub async fn request_download(
        &self,
        info_hash: &InfoHash,
        engine: &dyn TorrentEngine,
        options: &AddOptions,
    ) -> Result<DownloadOutcome, EngineError> {
        let Some(tracking_id) = self.reserve(info_hash) else {
            info!(info_hash = %info_hash, "Download already known, not contacting engine");
            return Ok(DownloadOutcome::AlreadyKnown);
        };

        match engine.add(&info_hash.magnet_uri(), options).await {
            Ok(()) => {
                info!(
                    info_hash = %info_hash,
                    tracking_id = %tracking_id,
                    "Download started"
                );
                Ok(DownloadOutcome::Started { tracking_id })
            }
            Err(e) => {
                self.release(info_hash, &tracking_id);
                warn!(
                    info_hash = %info_hash,
                    error = %e,
                    "Engine refused download, reservation released"
                );
                Err(e)
            }
        }
    }

    /// Record a transfer the engine surfaced, minting its tracking id if it
    /// was not started through this registry.
    pub fn adopt(&self, info_hash: &InfoHash, finished: bool) -> String {
        self.downloads
            .entry(info_hash.clone())
            .or_insert_with(|| {
                let tracking_id = generate_tracking_id();
                if finished {
                    DownloadState::Completed { tracking_id }
                } else {
                    DownloadState::Active { tracking_id }
                }
            })
            .tracking_id()
            .to_string()
    }

    /// Move a hash from active to completed.
    ///
    /// Returns the tracking id on the transition; `None` if the hash was
    /// already completed. Unknown hashes are recorded as completed.
    pub fn complete(&self, info_hash: &InfoHash) -> Option<String> {
        match self.downloads.entry(info_hash.clone()) {
            Entry::Occupied(mut entry) => match entry.get() {
                DownloadState::Active { tracking_id } => {
                    let tracking_id = tracking_id.clone();
                    entry.insert(DownloadState::Completed {
                        tracking_id: tracking_id.clone(),
                    });
                    Some(tracking_id)
                }
                DownloadState::Completed { .. } => None,
            },
            Entry::Vacant(entry) => {
                let tracking_id = generate_tracking_id();
                entry.insert(DownloadState::Completed {
                    tracking_id: tracking_id.clone(),
                });
                Some(tracking_id)
            }
        }
    }

    pub fn state(&self, info_hash: &InfoHash) -> Option<DownloadState> {
        self.downloads.get(info_hash).map(|entry| entry.value().clone())
    }

    /// Tracking id of an active transfer
    pub fn active_tracking_id(&self, info_hash: &InfoHash) -> Option<String> {
        self.downloads
            .get(info_hash)
            .and_then(|entry| match entry.value() {
                DownloadState::Active { tracking_id } => Some(tracking_id.clone()),
                DownloadState::Completed { .. } => None,
            })
    }

    pub fn is_active(&self, info_hash: &InfoHash) -> bool {
        matches!(self.state(info_hash), Some(DownloadState::Active { .. }))
    }

    pub fn is_completed(&self, info_hash: &InfoHash) -> bool {
        matches!(self.state(info_hash), Some(DownloadState::Completed { .. }))
    }

    pub fn active_count(&self) -> usize {
        self.downloads
            .iter()
            .filter(|entry| matches!(entry.value(), DownloadState::Active { .. }))
            .count()
    }

    pub fn completed_count(&self) -> usize {
        self.downloads.len() - self.active_count()
    }
}

impl Default for DownloadRegistry {
    fn default() -> Self {
        Self::new()
    }
}
