//! Fire-and-forget delivery of accepted speeds to the backend.
//!
//! Each accepted speed is posted once as `{"speed": <km/h>}`. Failures are
//! logged and counted; nothing is retried or queued.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3001/send-gps-speed";

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("endpoint returned HTTP {0}")]
    Status(u16),

    #[error("{0}")]
    Rejected(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SpeedPayload {
    pub speed: f64,
}

pub trait TelemetrySink: Send + Sync {
    fn post(&self, speed_kph: f64) -> BoxFuture<'static, Result<(), TelemetryError>>;
}

pub struct HttpTelemetrySink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTelemetrySink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("gps_speedometer/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TelemetrySink for HttpTelemetrySink {
    fn post(&self, speed_kph: f64) -> BoxFuture<'static, Result<(), TelemetryError>> {
        let request = self
            .client
            .post(&self.endpoint)
            .json(&SpeedPayload { speed: speed_kph });

        Box::pin(async move {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(TelemetryError::Status(status.as_u16()));
            }
            Ok(())
        })
    }
}

#[derive(Debug, Default)]
pub struct TelemetryStats {
    sent: AtomicU64,
    failed: AtomicU64,
}

impl TelemetryStats {
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Spawns one post per accepted speed; the caller never waits on it.
#[derive(Clone)]
pub struct TelemetryDispatcher {
    sink: Arc<dyn TelemetrySink>,
    stats: Arc<TelemetryStats>,
}

impl TelemetryDispatcher {
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            sink,
            stats: Arc::new(TelemetryStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<TelemetryStats> {
        self.stats.clone()
    }

    pub fn dispatch(&self, speed_kph: f64) -> JoinHandle<()> {
        let post = self.sink.post(speed_kph);
        let stats = self.stats.clone();

        tokio::spawn(async move {
            match post.await {
                Ok(()) => {
                    stats.sent.fetch_add(1, Ordering::Relaxed);
                    log::debug!("[telemetry] sent {:.2} km/h", speed_kph);
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    log::warn!("Error sending GPS speed to backend: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every posted speed; optionally fails every post.
    #[derive(Default)]
    pub struct RecordingSink {
        pub posted: Arc<Mutex<Vec<f64>>>,
        pub fail: bool,
    }

    impl RecordingSink {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }
    }

    impl TelemetrySink for RecordingSink {
        fn post(&self, speed_kph: f64) -> BoxFuture<'static, Result<(), TelemetryError>> {
            let posted = self.posted.clone();
            let fail = self.fail;
            Box::pin(async move {
                posted.lock().unwrap().push(speed_kph);
                if fail {
                    Err(TelemetryError::Rejected("simulated network error".to_string()))
                } else {
                    Ok(())
                }
            })
        }
    }
}
