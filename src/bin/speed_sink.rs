use clap::Parser;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use gps_speedometer::receiver::{receiver_router, ReceiverState};

/// Local telemetry backend: accepts POST /send-gps-speed and logs each speed.
#[derive(Parser, Debug)]
#[command(name = "speed_sink")]
struct Args {
    /// Port to serve on
    #[arg(long, default_value = "3001")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    bind: std::net::IpAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = receiver_router(ReceiverState::default());

    let addr = SocketAddr::new(args.bind, args.port);
    log::info!("Speed sink listening on http://{}/send-gps-speed", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
