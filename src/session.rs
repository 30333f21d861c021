use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, Receiver};

use crate::live_status::SharedStatus;
use crate::provider::{
    LocationError, LocationEvent, LocationProvider, Subscription, WatchOptions,
};
use crate::telemetry::{TelemetryDispatcher, TelemetryStats};
use crate::tracker::{SpeedTracker, TrackerState, ACCEPTANCE_WINDOW};
use crate::types::Reading;

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub acceptance_window: Duration,
    pub watch: WatchOptions,
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            acceptance_window: ACCEPTANCE_WINDOW,
            watch: WatchOptions::default(),
            channel_capacity: 100,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    pub readings_observed: u64,
    pub readings_accepted: u64,
    pub location_errors: u64,
    pub final_speed_kph: f64,
}

/// Single owner of the tracker state. Feeds accepted readings to the
/// shared status and the telemetry dispatcher.
pub struct Session {
    tracker: SpeedTracker,
    dispatcher: Option<TelemetryDispatcher>,
    telemetry_stats: Option<Arc<TelemetryStats>>,
    status: SharedStatus,
    started: Instant,
    summary: SessionSummary,
}

impl Session {
    pub fn new(
        config: &SessionConfig,
        dispatcher: Option<TelemetryDispatcher>,
        status: SharedStatus,
    ) -> Self {
        let telemetry_stats = dispatcher.as_ref().map(|d| d.stats());
        Self {
            tracker: SpeedTracker::new(config.acceptance_window),
            dispatcher,
            telemetry_stats,
            status,
            started: Instant::now(),
            summary: SessionSummary::default(),
        }
    }

    pub fn tracker_state(&self) -> &TrackerState {
        self.tracker.state()
    }

    /// Subscribe to the provider. An unavailable source is returned to the
    /// caller before any tracking happens.
    pub fn start(
        self,
        provider: &dyn LocationProvider,
        config: &SessionConfig,
    ) -> Result<ActiveSession, LocationError> {
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let subscription = provider.subscribe(config.watch, tx)?;
        log::info!(
            "Tracking started (source: {}, window: {} ms, high accuracy: {})",
            provider.name(),
            self.tracker.window().as_millis(),
            config.watch.high_accuracy
        );

        Ok(ActiveSession {
            session: self,
            subscription,
            rx,
        })
    }

    /// Apply one reading observed at `now`. Returns whether it was accepted.
    pub async fn handle_reading(&mut self, reading: Reading, now: Instant) -> bool {
        self.summary.readings_observed += 1;

        let accepted = match self.tracker.observe(&reading, now) {
            Some(state) => state.clone(),
            None => {
                self.status.write().await.readings_observed = self.summary.readings_observed;
                return false;
            }
        };

        self.summary.readings_accepted += 1;
        self.summary.final_speed_kph = accepted.speed_kph;
        log::debug!(
            "Accepted {:.2} km/h ({:?}, {:?}, accuracy {:.1} m)",
            accepted.speed_kph,
            accepted.change,
            accepted.signal,
            reading.accuracy
        );

        if let Some(dispatcher) = &self.dispatcher {
            // Not awaited; the next reading is never delayed by the post.
            dispatcher.dispatch(accepted.speed_kph);
        }

        self.publish(Some((&accepted, &reading))).await;
        true
    }

    pub async fn handle_error(&mut self, error: LocationError) {
        self.summary.location_errors += 1;
        log::warn!("Error getting location: {}", error);
        self.publish(None).await;
    }

    async fn publish(&self, accepted: Option<(&TrackerState, &Reading)>) {
        let mut status = self.status.write().await;
        if let Some((state, reading)) = accepted {
            status.apply(state, reading);
        }
        status.uptime_seconds = self.started.elapsed().as_secs();
        status.readings_observed = self.summary.readings_observed;
        status.readings_accepted = self.summary.readings_accepted;
        status.location_errors = self.summary.location_errors;
        if let Some(stats) = &self.telemetry_stats {
            status.telemetry_sent = stats.sent();
            status.telemetry_failed = stats.failed();
        }
    }
}

pub struct ActiveSession {
    session: Session,
    subscription: Subscription,
    rx: Receiver<LocationEvent>,
}

impl ActiveSession {
    /// Process events until `shutdown` resolves or the provider ends, then
    /// stop the subscription.
    pub async fn run<F>(mut self, shutdown: F) -> SessionSummary
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutdown requested");
                    break;
                }
                event = self.rx.recv() => match event {
                    Some(LocationEvent::Fix(reading)) => {
                        self.session.handle_reading(reading, Instant::now()).await;
                    }
                    Some(LocationEvent::Error(e)) => {
                        self.session.handle_error(e).await;
                    }
                    None => {
                        log::info!("Location stream from {} ended", self.subscription.source());
                        break;
                    }
                },
            }
        }

        self.subscription.stop();
        // Final counters, including telemetry posts that finished meanwhile.
        self.session.publish(None).await;

        let summary = self.session.summary.clone();
        log::info!(
            "Tracking stopped: {} observed, {} accepted, {} location errors",
            summary.readings_observed,
            summary.readings_accepted,
            summary.location_errors
        );
        summary
    }
}
