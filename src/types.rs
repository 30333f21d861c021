use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// One location sample as delivered by a location provider.
///
/// `speed` is in m/s and may be missing (no fix velocity yet), `accuracy`
/// is the horizontal uncertainty radius in meters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: Option<f64>,
    pub accuracy: f64,
}

impl Reading {
    pub fn new(speed: Option<f64>, accuracy: f64) -> Self {
        Self {
            timestamp: current_timestamp(),
            latitude: 0.0,
            longitude: 0.0,
            speed,
            accuracy,
        }
    }

    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }
}

pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
