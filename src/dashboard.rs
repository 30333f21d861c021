use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::sleep;
use tower_http::cors::CorsLayer;

use crate::gauge::GaugeAxis;
use crate::live_status::{LiveStatus, SharedStatus};
use crate::view::SpeedView;

#[derive(Clone)]
struct DashboardState {
    status: SharedStatus,
    axis: GaugeAxis,
}

#[derive(Serialize)]
struct DashboardFrame {
    #[serde(flatten)]
    status: LiveStatus,
    view: SpeedView,
    needle_angle: f64,
    gauge_min: f64,
    gauge_max: f64,
}

impl DashboardFrame {
    fn build(status: LiveStatus, axis: &GaugeAxis) -> Self {
        let view = SpeedView::from_status(&status);
        Self {
            needle_angle: axis.angle_for(view.pointer),
            gauge_min: axis.minimum,
            gauge_max: axis.maximum,
            status,
            view,
        }
    }
}

pub fn router(status: SharedStatus, axis: GaugeAxis) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/ws", get(ws_handler))
        .route("/status", get(status_handler))
        .layer(CorsLayer::permissive())
        .with_state(DashboardState { status, axis })
}

pub async fn start_dashboard(status: SharedStatus, axis: GaugeAxis, port: u16) -> anyhow::Result<()> {
    let app = router(status, axis);

    let addr = format!("0.0.0.0:{}", port);
    log::info!("[DASHBOARD] Starting embedded server at http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(include_str!("dashboard_static.html"))
}

async fn status_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    let snapshot = state.status.read().await.clone();
    Json(DashboardFrame::build(snapshot, &state.axis))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<DashboardState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: DashboardState) {
    loop {
        let snapshot = state.status.read().await.clone();
        let frame = DashboardFrame::build(snapshot, &state.axis);

        let json = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(e) => {
                log::error!("[DASHBOARD] failed to encode frame: {}", e);
                break;
            }
        };
        if socket.send(Message::Text(json)).await.is_err() {
            // Client disconnected
            break;
        }

        // 4Hz is plenty for 1Hz accepted fixes
        sleep(Duration::from_millis(250)).await;
    }
}
