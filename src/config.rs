use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::gauge::GaugeAxis;
use crate::provider::{
    LocationProvider, ReplayProvider, SimulatedProvider, TermuxProvider, WatchOptions,
};
use crate::session::SessionConfig;
use crate::telemetry::DEFAULT_ENDPOINT;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// Termux:API `termux-location`
    Termux,
    /// Synthetic drive
    Simulated,
    /// JSON-lines recording (see --replay-file)
    Replay,
}

#[derive(Parser, Debug)]
#[command(name = "speedometer")]
#[command(about = "Live GPS speedometer with signal indicator and speed telemetry", long_about = None)]
pub struct Config {
    /// Location source
    #[arg(long, value_enum, default_value = "termux")]
    pub provider: ProviderKind,

    /// Recording to play back with --provider replay (.jsonl or .jsonl.gz)
    #[arg(long, value_name = "PATH")]
    pub replay_file: Option<PathBuf>,

    /// Interval between simulated fixes in milliseconds
    #[arg(long, default_value = "250")]
    pub simulated_interval_ms: u64,

    /// Request coarse (network) fixes instead of high-accuracy GPS
    #[arg(long)]
    pub low_accuracy: bool,

    /// Telemetry endpoint receiving {"speed": <km/h>}
    #[arg(long, env = "SPEEDOMETER_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Do not post speeds to the telemetry endpoint
    #[arg(long)]
    pub no_telemetry: bool,

    /// Minimum spacing between accepted fixes in milliseconds
    #[arg(long, default_value = "1000")]
    pub acceptance_window_ms: u64,

    /// Upper end of the gauge axis in km/h
    #[arg(long, default_value = "100")]
    pub gauge_max: f64,

    /// Serve the web dashboard on this port
    #[arg(long)]
    pub dashboard_port: Option<u16>,

    /// Disable the terminal gauge
    #[arg(long)]
    pub no_terminal: bool,

    /// Write the live status snapshot to this JSON file every 2 seconds
    #[arg(long, value_name = "PATH")]
    pub status_file: Option<PathBuf>,

    /// Duration in seconds (0 = continuous)
    #[arg(long, default_value = "0")]
    pub duration: u64,
}

impl Config {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            acceptance_window: Duration::from_millis(self.acceptance_window_ms),
            watch: WatchOptions {
                high_accuracy: !self.low_accuracy,
            },
            ..SessionConfig::default()
        }
    }

    pub fn gauge_axis(&self) -> GaugeAxis {
        GaugeAxis::with_maximum(self.gauge_max)
    }

    pub fn build_provider(&self) -> anyhow::Result<Box<dyn LocationProvider>> {
        let provider: Box<dyn LocationProvider> = match self.provider {
            ProviderKind::Termux => Box::new(TermuxProvider::new()),
            ProviderKind::Simulated => Box::new(SimulatedProvider::new(Duration::from_millis(
                self.simulated_interval_ms,
            ))),
            ProviderKind::Replay => {
                let path = self
                    .replay_file
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("--provider replay requires --replay-file"))?;
                Box::new(ReplayProvider::new(path))
            }
        };
        Ok(provider)
    }

    /// Default log filter. The terminal gauge owns the tty, so only errors
    /// are written there unless RUST_LOG asks for more.
    pub fn default_log_level(&self) -> &'static str {
        if self.no_terminal {
            "info"
        } else {
            "error"
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.gauge_max.is_nan() || self.gauge_max <= 0.0 {
            anyhow::bail!("--gauge-max must be positive, got {}", self.gauge_max);
        }
        if self.provider == ProviderKind::Simulated && self.simulated_interval_ms == 0 {
            anyhow::bail!("--simulated-interval-ms must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["speedometer"]).unwrap();
        assert_eq!(config.provider, ProviderKind::Termux);
        assert_eq!(config.acceptance_window_ms, 1000);
        assert!(!config.no_telemetry);
        assert!(config.session_config().watch.high_accuracy);
        assert_eq!(config.gauge_axis(), GaugeAxis::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_flag() {
        let config = Config::try_parse_from([
            "speedometer",
            "--endpoint",
            "http://10.0.0.2:3001/send-gps-speed",
        ])
        .unwrap();
        assert_eq!(config.endpoint, "http://10.0.0.2:3001/send-gps-speed");
    }

    #[test]
    fn test_replay_requires_file() {
        let config = Config::try_parse_from(["speedometer", "--provider", "replay"]).unwrap();
        assert!(config.build_provider().is_err());

        let config = Config::try_parse_from([
            "speedometer",
            "--provider",
            "replay",
            "--replay-file",
            "drive.jsonl",
        ])
        .unwrap();
        assert_eq!(config.build_provider().unwrap().name(), "replay");
    }

    #[test]
    fn test_low_accuracy_and_window() {
        let config = Config::try_parse_from([
            "speedometer",
            "--low-accuracy",
            "--acceptance-window-ms",
            "500",
        ])
        .unwrap();
        let session = config.session_config();
        assert!(!session.watch.high_accuracy);
        assert_eq!(session.acceptance_window, Duration::from_millis(500));
    }

    #[test]
    fn test_log_level_stays_quiet_under_terminal_gauge() {
        let config = Config::try_parse_from(["speedometer"]).unwrap();
        assert_eq!(config.default_log_level(), "error");
        // Recoverable failures log at warn, below the terminal filter.
        assert!(log::Level::Warn > log::LevelFilter::Error);

        let config = Config::try_parse_from(["speedometer", "--no-terminal"]).unwrap();
        assert_eq!(config.default_log_level(), "info");
    }

    #[test]
    fn test_rejects_non_positive_gauge_max() {
        let config = Config::try_parse_from(["speedometer", "--gauge-max", "0"]).unwrap();
        assert!(config.validate().is_err());
    }
}
