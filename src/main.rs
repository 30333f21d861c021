use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

use gps_speedometer::config::Config;
use gps_speedometer::provider::LocationError;
use gps_speedometer::session::Session;
use gps_speedometer::telemetry::{HttpTelemetrySink, TelemetryDispatcher};
use gps_speedometer::{dashboard, live_status, terminal};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    config.validate()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.default_log_level()),
    )
    .init();

    log::info!("[{}] GPS Speedometer starting", ts_now());
    log::info!("  Provider: {:?}", config.provider);
    log::info!("  Duration: {} seconds (0=continuous)", config.duration);

    let provider = config.build_provider()?;
    let session_config = config.session_config();
    let status = live_status::shared();

    let dispatcher = if config.no_telemetry {
        log::info!("  Telemetry: disabled");
        None
    } else {
        let sink = HttpTelemetrySink::new(config.endpoint.clone());
        log::info!("  Telemetry: {}", sink.endpoint());
        Some(TelemetryDispatcher::new(Arc::new(sink)))
    };

    let session = Session::new(&session_config, dispatcher, status.clone());
    let active = match session.start(provider.as_ref(), &session_config) {
        Ok(active) => active,
        Err(LocationError::Unavailable(reason)) => {
            alert(&format!("Geolocation is not supported on this device.\n{}", reason));
            anyhow::bail!("location source unavailable");
        }
        Err(e) => return Err(e.into()),
    };

    let mut background = Vec::new();

    if let Some(port) = config.dashboard_port {
        let status = status.clone();
        let axis = config.gauge_axis();
        background.push(tokio::spawn(async move {
            if let Err(e) = dashboard::start_dashboard(status, axis, port).await {
                log::error!("[DASHBOARD] stopped: {}", e);
            }
        }));
    }

    if let Some(path) = config.status_file.clone() {
        let status = status.clone();
        background.push(tokio::spawn(async move {
            let path = path.to_string_lossy().to_string();
            loop {
                sleep(Duration::from_secs(2)).await;
                let snapshot = status.read().await.clone();
                if let Err(e) = snapshot.save(&path) {
                    log::warn!("Failed to write status file {}: {}", path, e);
                }
            }
        }));
    }

    let terminal_enabled = !config.no_terminal;
    if terminal_enabled {
        let status = status.clone();
        let axis = config.gauge_axis();
        background.push(tokio::spawn(async move {
            if let Err(e) = terminal::run_terminal(status, axis, Duration::from_millis(100)).await {
                log::error!("Terminal renderer stopped: {}", e);
            }
        }));
    }

    let duration = config.duration;
    let shutdown = async move {
        if duration > 0 {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sleep(Duration::from_secs(duration)) => {
                    log::info!("[{}] Duration reached, stopping...", ts_now());
                }
            }
        } else {
            let _ = tokio::signal::ctrl_c().await;
        }
    };

    let summary = active.run(shutdown).await;

    for task in background {
        task.abort();
    }
    if terminal_enabled {
        terminal::restore()?;
    }

    if let Some(path) = &config.status_file {
        let snapshot = status.read().await.clone();
        let _ = snapshot.save(&path.to_string_lossy());
    }

    println!("\n=== Final Stats ===");
    println!("Readings observed: {}", summary.readings_observed);
    println!("Readings accepted: {}", summary.readings_accepted);
    println!("Location errors: {}", summary.location_errors);
    println!("Last speed: {:.2} km/h", summary.final_speed_kph);

    Ok(())
}

fn alert(message: &str) {
    let width = message.lines().map(|l| l.chars().count()).max().unwrap_or(0) + 4;
    eprintln!("\n{}", "!".repeat(width));
    for line in message.lines() {
        eprintln!("! {:<w$} !", line, w = width - 4);
    }
    eprintln!("{}\n", "!".repeat(width));
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
