use flate2::read::GzDecoder;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::Sender;
use tokio::time::{sleep_until, Duration, Instant};

use super::{LocationError, LocationEvent, LocationProvider, Subscription, WatchOptions};
use crate::types::{current_timestamp, Reading};

/// Plays back a recorded drive from a JSON-lines file (optionally `.gz`).
///
/// Each line is `{"offset_ms": 0, "speed": 10.0, "accuracy": 15.0}` with
/// optional `latitude`/`longitude`. `offset_ms` is measured from the start of
/// playback. Blank lines and lines starting with `#` are skipped.
pub struct ReplayProvider {
    path: PathBuf,
}

#[derive(Deserialize, Debug)]
struct ReplayEntry {
    offset_ms: u64,
    #[serde(default)]
    speed: Option<f64>,
    accuracy: f64,
    #[serde(default)]
    latitude: f64,
    #[serde(default)]
    longitude: f64,
}

impl ReplayProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn load_log(path: &Path) -> std::io::Result<String> {
    let file = File::open(path)?;
    let mut content = String::new();
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        GzDecoder::new(file).read_to_string(&mut content)?;
    } else {
        let mut file = file;
        file.read_to_string(&mut content)?;
    }
    Ok(content)
}

fn parse_entries(content: &str) -> Vec<Result<ReplayEntry, String>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(idx, line)| {
            serde_json::from_str::<ReplayEntry>(line)
                .map_err(|e| format!("replay line {}: {}", idx + 1, e))
        })
        .collect()
}

impl LocationProvider for ReplayProvider {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn subscribe(
        &self,
        _options: WatchOptions,
        tx: Sender<LocationEvent>,
    ) -> Result<Subscription, LocationError> {
        let content = load_log(&self.path).map_err(|e| {
            LocationError::Unavailable(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        let entries = parse_entries(&content);
        log::info!(
            "[replay] {} entries from {}",
            entries.len(),
            self.path.display()
        );

        let task = tokio::spawn(async move {
            let start = Instant::now();

            for entry in entries {
                let event = match entry {
                    Ok(entry) => {
                        sleep_until(start + Duration::from_millis(entry.offset_ms)).await;
                        LocationEvent::Fix(Reading {
                            timestamp: current_timestamp(),
                            latitude: entry.latitude,
                            longitude: entry.longitude,
                            speed: entry.speed,
                            accuracy: entry.accuracy,
                        })
                    }
                    Err(msg) => LocationEvent::Error(LocationError::Update(msg)),
                };

                if tx.send(event).await.is_err() {
                    return;
                }
            }

            log::info!("[replay] playback finished");
        });

        Ok(Subscription::new(self.name(), task))
    }
}
