//! Transmission daemon driven over its JSON-RPC interface.
//!
//! Transmission has no push notifications, so a polling task turns
//! `torrent-get` snapshots into engine events.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{AddOptions, EngineEvent, TorrentEngine};
use crate::core::config::EngineConfig;
use crate::core::error::EngineError;
use crate::models::transfer::{InfoHash, TorrentFileDescriptor, TransferInfo, TransferStats};

const SESSION_HEADER: &str = "X-Transmission-Session-Id";
const SESSION_ATTEMPTS: usize = 3;

const TORRENT_FIELDS: &[&str] = &[
    "hashString",
    "name",
    "percentDone",
    "rateDownload",
    "uploadedEver",
    "peersConnected",
    "files",
    "downloadDir",
    "leftUntilDone",
    "metadataPercentComplete",
];

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct TorrentList {
    #[serde(default)]
    torrents: Vec<RpcTorrent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTorrent {
    pub hash_string: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub percent_done: f64,
    #[serde(default)]
    pub rate_download: i64,
    #[serde(default)]
    pub uploaded_ever: i64,
    #[serde(default)]
    pub peers_connected: i64,
    #[serde(default)]
    pub files: Vec<RpcFile>,
    #[serde(default)]
    pub download_dir: String,
    #[serde(default)]
    pub left_until_done: i64,
    #[serde(default)]
    pub metadata_percent_complete: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcFile {
    /// Path relative to the download dir, including the torrent folder for multi-file torrents
    pub name: String,
}

impl RpcTorrent {
    /// Metadata is known and nothing wanted is left to fetch
    fn is_finished(&self) -> bool {
        self.metadata_percent_complete >= 1.0 && self.left_until_done == 0 && !self.files.is_empty()
    }

    fn files(&self) -> Vec<TorrentFileDescriptor> {
        let download_dir = Path::new(&self.download_dir);

        self.files
            .iter()
            .map(|file| {
                let full = Path::new(&file.name);
                let name = full
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.name.clone());

                TorrentFileDescriptor {
                    name,
                    relative_path: relative_to_torrent(full, &self.name),
                    location: download_dir.join(full),
                }
            })
            .collect()
    }

    fn transfer_info(&self, info_hash: InfoHash) -> TransferInfo {
        TransferInfo {
            info_hash,
            name: self.name.clone(),
            files: self.files(),
            finished: self.is_finished(),
        }
    }

    fn stats(&self, info_hash: InfoHash) -> TransferStats {
        TransferStats {
            info_hash,
            name: self.name.clone(),
            progress: self.percent_done,
            download_speed: self.rate_download.max(0) as u64,
            uploaded: self.uploaded_ever.max(0) as u64,
            num_peers: self.peers_connected.clamp(0, u32::MAX as i64) as u32,
        }
    }
}

/// Strip the leading torrent folder from a multi-file entry
fn relative_to_torrent(full: &Path, torrent_name: &str) -> PathBuf {
    let mut components = full.components();
    match components.next() {
        Some(Component::Normal(first))
            if first == OsStr::new(torrent_name) && components.clone().next().is_some() =>
        {
            components.as_path().to_path_buf()
        }
        _ => full.to_path_buf(),
    }
}

/// Turns successive `torrent-get` snapshots into lifecycle events.
///
/// Tracks whether each hash has already been reported finished so `Done`
/// fires only on the unfinished to finished transition.
#[derive(Debug, Default)]
pub struct PollTracker {
    seen: HashMap<InfoHash, bool>,
}

impl PollTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diff(&mut self, torrents: &[RpcTorrent]) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        let mut present = Vec::with_capacity(torrents.len());

        for torrent in torrents {
            let Some(info_hash) = InfoHash::parse(&torrent.hash_string) else {
                warn!(hash = %torrent.hash_string, "Ignoring torrent with unparseable hash");
                continue;
            };
            present.push(info_hash.clone());

            let finished = torrent.is_finished();
            match self.seen.get(&info_hash).copied() {
                None => {
                    events.push(EngineEvent::Added(torrent.transfer_info(info_hash.clone())));
                    if !finished {
                        events.push(EngineEvent::Progress(torrent.stats(info_hash.clone())));
                    }
                    self.seen.insert(info_hash, finished);
                }
                Some(false) if finished => {
                    events.push(EngineEvent::Done(torrent.transfer_info(info_hash.clone())));
                    self.seen.insert(info_hash, true);
                }
                Some(false) => {
                    events.push(EngineEvent::Progress(torrent.stats(info_hash)));
                }
                Some(true) => {}
            }
        }

        // Removed from the daemon; report again if it comes back
        self.seen.retain(|hash, _| present.contains(hash));

        events
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

pub struct TransmissionEngine {
    client: reqwest::Client,
    rpc_url: String,
    username: String,
    password: String,
    session_id: Mutex<Option<String>>,
    events: broadcast::Sender<EngineEvent>,
}

impl TransmissionEngine {
    pub fn new(config: &EngineConfig, event_capacity: usize) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        let (events, _) = broadcast::channel(event_capacity);

        Ok(Self {
            client,
            rpc_url: config.rpc_url.clone(),
            username: config.username.trim().to_string(),
            password: config.password.clone(),
            session_id: Mutex::new(None),
            events,
        })
    }

    fn current_session(&self) -> Option<String> {
        self.session_id.lock().ok().and_then(|guard| guard.clone())
    }

    fn store_session(&self, id: Option<String>) {
        if let Ok(mut guard) = self.session_id.lock() {
            *guard = id;
        }
    }

    /// Issue one RPC call and return its `arguments` object.
    ///
    /// Transmission answers 409 with a fresh session id until the client echoes it back.
    async fn rpc(&self, method: &str, arguments: Value) -> Result<Value, EngineError> {
        let payload = json!({ "method": method, "arguments": arguments });

        for _ in 0..SESSION_ATTEMPTS {
            let mut request = self.client.post(&self.rpc_url).json(&payload);
            if let Some(id) = self.current_session() {
                request = request.header(SESSION_HEADER, id);
            }
            if !self.username.is_empty() {
                request = request.basic_auth(&self.username, Some(&self.password));
            }

            let response = request
                .send()
                .await
                .map_err(|e| EngineError::Transport(e.to_string()))?;

            if response.status() == StatusCode::CONFLICT {
                let id = response
                    .headers()
                    .get(SESSION_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                debug!(method = method, "Transmission session id refreshed");
                self.store_session(id);
                continue;
            }

            if !response.status().is_success() {
                return Err(EngineError::Status(response.status().as_u16()));
            }

            let body = response
                .json::<RpcResponse>()
                .await
                .map_err(|e| EngineError::Malformed(e.to_string()))?;

            if body.result != "success" {
                return Err(EngineError::Rejected(body.result));
            }

            return Ok(body.arguments);
        }

        Err(EngineError::Transport(
            "failed negotiating transmission session id".to_string(),
        ))
    }

    /// Fetch every torrent the daemon manages
    pub async fn list(&self) -> Result<Vec<RpcTorrent>, EngineError> {
        let arguments = self
            .rpc("torrent-get", json!({ "fields": TORRENT_FIELDS }))
            .await?;

        let list: TorrentList =
            serde_json::from_value(arguments).map_err(|e| EngineError::Malformed(e.to_string()))?;

        Ok(list.torrents)
    }

    /// Poll once and publish the resulting events
    pub async fn poll_once(&self, tracker: &mut PollTracker) -> Result<usize, EngineError> {
        let torrents = self.list().await?;
        let events = tracker.diff(&torrents);
        let count = events.len();

        for event in events {
            // No subscribers is fine; events are not buffered for late joiners
            let _ = self.events.send(event);
        }

        Ok(count)
    }

    /// Spawn the background task that polls the daemon forever
    pub fn spawn_poller(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut tracker = PollTracker::new();
            let mut healthy = true;

            loop {
                ticker.tick().await;

                match self.poll_once(&mut tracker).await {
                    Ok(count) => {
                        if !healthy {
                            info!(torrents = tracker.len(), "Torrent engine reachable again");
                            healthy = true;
                        }
                        debug!(events = count, torrents = tracker.len(), "Engine poll completed");
                    }
                    Err(e) => {
                        // Log once per outage
                        if healthy {
                            error!(error = %e, rpc_url = %self.rpc_url, "Failed to poll torrent engine");
                            healthy = false;
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl TorrentEngine for TransmissionEngine {
    async fn add(&self, magnet_uri: &str, options: &AddOptions) -> Result<(), EngineError> {
        let arguments = json!({
            "filename": magnet_uri,
            "download-dir": options.download_dir.display().to_string(),
        });

        match self.rpc("torrent-add", arguments).await {
            Ok(arguments) => {
                let duplicate = arguments.get("torrent-duplicate").is_some();
                debug!(duplicate = duplicate, "Torrent accepted by engine");
                Ok(())
            }
            // Older daemons report duplicates as a result string
            Err(EngineError::Rejected(result)) if result == "duplicate torrent" => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}
