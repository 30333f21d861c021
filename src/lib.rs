//! GPS speedometer: location fixes in, throttled km/h readings out to a
//! gauge display and a telemetry endpoint.

pub mod config;
pub mod dashboard;
pub mod gauge;
pub mod live_status;
pub mod provider;
pub mod receiver;
pub mod session;
pub mod signal;
pub mod telemetry;
pub mod terminal;
pub mod tracker;
pub mod types;
pub mod view;

pub use live_status::{LiveStatus, SharedStatus};
pub use provider::{LocationError, LocationEvent, LocationProvider, Subscription, WatchOptions};
pub use session::{ActiveSession, Session, SessionConfig, SessionSummary};
pub use signal::SignalLevel;
pub use telemetry::{HttpTelemetrySink, TelemetryDispatcher, TelemetryError, TelemetrySink};
pub use tracker::{reduce, ChangeDirection, SpeedTracker, TrackerState};
pub use types::Reading;
