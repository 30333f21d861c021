use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::signal::SignalLevel;
use crate::tracker::{ChangeDirection, TrackerState};
use crate::types::{current_timestamp, Reading};

/// Snapshot shared between the session and every renderer.
pub type SharedStatus = Arc<RwLock<LiveStatus>>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LiveStatus {
    pub timestamp: f64,
    pub uptime_seconds: u64,
    pub speed_kph: f64,
    pub speed_mph: f64,
    pub change: ChangeDirection,
    pub signal: SignalLevel,
    // Last accepted fix
    pub gps_accuracy: f64,
    pub gps_lat: f64,
    pub gps_lon: f64,
    // Counters
    pub readings_observed: u64,
    pub readings_accepted: u64,
    pub location_errors: u64,
    pub telemetry_sent: u64,
    pub telemetry_failed: u64,
}

impl LiveStatus {
    pub fn new() -> Self {
        Self {
            timestamp: current_timestamp(),
            uptime_seconds: 0,
            speed_kph: 0.0,
            speed_mph: 0.0,
            change: ChangeDirection::Unchanged,
            signal: SignalLevel::Strong,
            gps_accuracy: 0.0,
            gps_lat: 0.0,
            gps_lon: 0.0,
            readings_observed: 0,
            readings_accepted: 0,
            location_errors: 0,
            telemetry_sent: 0,
            telemetry_failed: 0,
        }
    }

    /// Copy the tracker output and the fix it came from.
    pub fn apply(&mut self, state: &TrackerState, reading: &Reading) {
        self.timestamp = current_timestamp();
        self.speed_kph = state.speed_kph;
        self.speed_mph = state.speed_mph();
        self.change = state.change;
        self.signal = state.signal;
        self.gps_accuracy = reading.accuracy;
        self.gps_lat = reading.latitude;
        self.gps_lon = reading.longitude;
    }

    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for LiveStatus {
    fn default() -> Self {
        Self::new()
    }
}

pub fn shared() -> SharedStatus {
    Arc::new(RwLock::new(LiveStatus::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::SpeedTracker;
    use std::time::Instant;

    #[test]
    fn test_apply_copies_tracker_output() {
        let mut tracker = SpeedTracker::default();
        let reading = Reading::new(Some(10.0), 45.0).at(37.7749, -122.4194);
        let state = tracker.observe(&reading, Instant::now()).unwrap().clone();

        let mut status = LiveStatus::new();
        status.apply(&state, &reading);

        assert_eq!(status.speed_kph, state.speed_kph);
        assert_eq!(status.signal, SignalLevel::Moderate);
        assert_eq!(status.change, ChangeDirection::Increase);
        assert_eq!(status.gps_accuracy, 45.0);
        assert_eq!(status.gps_lat, 37.7749);
    }

    #[test]
    fn test_save_writes_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("live_status.json");

        let mut status = LiveStatus::new();
        status.readings_accepted = 3;
        status.save(path.to_str().unwrap()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: LiveStatus = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.readings_accepted, 3);
        assert!(content.contains("\"change\": \"none\""));
    }
}
