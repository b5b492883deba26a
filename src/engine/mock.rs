use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;

use super::{AddOptions, EngineEvent, TorrentEngine};
use crate::core::error::EngineError;

/// In-process engine that records calls and lets tests inject events
pub struct RecordingEngine {
    events: broadcast::Sender<EngineEvent>,
    added: Mutex<Vec<String>>,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl RecordingEngine {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            events,
            added: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    /// Make every following `add` fail
    pub fn fail_adds(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn add_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn added_uris(&self) -> Vec<String> {
        self.added.lock().unwrap().clone()
    }

    pub fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl TorrentEngine for RecordingEngine {
    async fn add(&self, magnet_uri: &str, _options: &AddOptions) -> Result<(), EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::Rejected("invalid or corrupt torrent".to_string()));
        }

        self.added.lock().unwrap().push(magnet_uri.to_string());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}
