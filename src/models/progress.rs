use crate::models::transfer::TransferStats;
use serde::{Deserialize, Serialize};

/// Progress event pushed to stats subscribers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub tracking_id: String,
    pub name: String,
    /// Whole percent, always within 0..=100
    pub progress: u8,
    pub download_speed: u64,
    pub uploaded: u64,
    pub peers: u32,
}

impl ProgressSnapshot {
    pub fn from_stats(tracking_id: String, stats: &TransferStats) -> Self {
        Self {
            tracking_id,
            name: stats.name.clone(),
            progress: percent(stats.progress),
            download_speed: stats.download_speed,
            uploaded: stats.uploaded,
            peers: stats.num_peers,
        }
    }
}

/// Round a completion fraction to a whole percentage
pub fn percent(fraction: f64) -> u8 {
    if !fraction.is_finite() {
        return 0;
    }

    (fraction.clamp(0.0, 1.0) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transfer::InfoHash;

    #[test]
    fn test_percent_rounds() {
        assert_eq!(percent(0.0), 0);
        assert_eq!(percent(0.004), 0);
        assert_eq!(percent(0.424), 42);
        assert_eq!(percent(0.999), 100);
        assert_eq!(percent(1.0), 100);
    }

    #[test]
    fn test_percent_stays_in_range() {
        for step in 0..=1000 {
            let value = percent(step as f64 / 1000.0);
            assert!(value <= 100);
        }

        assert_eq!(percent(-0.5), 0);
        assert_eq!(percent(1.7), 100);
        assert_eq!(percent(f64::NAN), 0);
        assert_eq!(percent(f64::INFINITY), 0);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let stats = TransferStats {
            info_hash: InfoHash::parse("0101010101010101010101010101010101010101").unwrap(),
            name: "Some.Movie.2020".to_string(),
            progress: 0.5,
            download_speed: 2048,
            uploaded: 512,
            num_peers: 7,
        };

        let snapshot = ProgressSnapshot::from_stats("abc123".to_string(), &stats);
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["trackingId"], "abc123");
        assert_eq!(json["name"], "Some.Movie.2020");
        assert_eq!(json["progress"], 50);
        assert_eq!(json["downloadSpeed"], 2048);
        assert_eq!(json["uploaded"], 512);
        assert_eq!(json["peers"], 7);
    }
}
