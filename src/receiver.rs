//! Minimal backend for the telemetry endpoint, used by the `speed_sink` binary.

use axum::{extract::State, routing::get, routing::post, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::telemetry::SpeedPayload;

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct ReceiverStats {
    pub received: u64,
    pub last_speed: Option<f64>,
    pub max_speed: Option<f64>,
}

#[derive(Clone, Default)]
pub struct ReceiverState {
    stats: Arc<RwLock<ReceiverStats>>,
}

impl ReceiverState {
    pub async fn snapshot(&self) -> ReceiverStats {
        self.stats.read().await.clone()
    }
}

pub fn receiver_router(state: ReceiverState) -> Router {
    Router::new()
        .route("/send-gps-speed", post(receive_speed))
        .route("/stats", get(stats_handler))
        .with_state(state)
}

// Bodies without a numeric `speed` are rejected by the Json extractor.
async fn receive_speed(
    State(state): State<ReceiverState>,
    Json(payload): Json<SpeedPayload>,
) -> Json<serde_json::Value> {
    let mut stats = state.stats.write().await;
    stats.received += 1;
    stats.last_speed = Some(payload.speed);
    stats.max_speed = Some(stats.max_speed.map_or(payload.speed, |m| m.max(payload.speed)));

    log::info!(
        "[sink] #{} speed {:.2} km/h",
        stats.received,
        payload.speed
    );

    Json(serde_json::json!({ "status": "ok" }))
}

async fn stats_handler(State(state): State<ReceiverState>) -> Json<ReceiverStats> {
    Json(state.snapshot().await)
}
