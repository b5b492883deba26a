use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Hex-encoded SHA-1 info hash, normalized to lowercase
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct InfoHash(String);

impl InfoHash {
    /// Parse a 40-character hex info hash
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.len() != 40 {
            return None;
        }

        match hex::decode(raw) {
            Ok(bytes) if bytes.len() == 20 => Some(Self(raw.to_ascii_lowercase())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Magnet link without trackers; peer discovery is left to the engine
    pub fn magnet_uri(&self) -> String {
        format!("magnet:?xt=urn:btih:{}", self.0)
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One file of a transfer as reported by the engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TorrentFileDescriptor {
    /// Base file name
    pub name: String,
    /// Path relative to the torrent's own folder
    pub relative_path: PathBuf,
    /// Absolute location on disk
    pub location: PathBuf,
}

#[derive(Clone, Debug)]
pub struct TransferInfo {
    pub info_hash: InfoHash,
    pub name: String,
    pub files: Vec<TorrentFileDescriptor>,
    pub finished: bool,
}

/// Per-tick transfer counters
#[derive(Clone, Debug)]
pub struct TransferStats {
    pub info_hash: InfoHash,
    pub name: String,
    /// Fraction complete in [0, 1]
    pub progress: f64,
    /// Bytes per second
    pub download_speed: u64,
    pub uploaded: u64,
    pub num_peers: u32,
}
