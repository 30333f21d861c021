use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::signal::SignalLevel;
use crate::types::Reading;

/// Minimum spacing between two accepted readings.
pub const ACCEPTANCE_WINDOW: Duration = Duration::from_millis(1000);

pub const MS_TO_KPH: f64 = 3.6;
pub const KPH_TO_MPH: f64 = 0.621371;

/// Direction of the last speed change relative to the previous accepted speed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDirection {
    Increase,
    Decrease,
    #[serde(rename = "none")]
    Unchanged,
}

impl ChangeDirection {
    fn between(previous: f64, current: f64) -> Self {
        if current > previous {
            ChangeDirection::Increase
        } else if current < previous {
            ChangeDirection::Decrease
        } else {
            ChangeDirection::Unchanged
        }
    }

    pub fn arrow(&self) -> Option<char> {
        match self {
            ChangeDirection::Increase => Some('↑'),
            ChangeDirection::Decrease => Some('↓'),
            ChangeDirection::Unchanged => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackerState {
    pub speed_kph: f64,
    pub change: ChangeDirection,
    pub signal: SignalLevel,
    pub last_accepted: Option<Instant>,
}

impl Default for TrackerState {
    fn default() -> Self {
        Self {
            speed_kph: 0.0,
            change: ChangeDirection::Unchanged,
            signal: SignalLevel::Strong,
            last_accepted: None,
        }
    }
}

impl TrackerState {
    pub fn speed_mph(&self) -> f64 {
        self.speed_kph * KPH_TO_MPH
    }
}

/// Convert a raw m/s speed to km/h. Missing or non-finite speeds read as 0.
pub fn speed_to_kph(speed: Option<f64>) -> f64 {
    match speed {
        Some(v) if v.is_finite() => v * MS_TO_KPH,
        _ => 0.0,
    }
}

/// Apply one reading observed at `now` to `state`.
///
/// Returns the replacement state, or `None` when the reading falls inside
/// the acceptance window of the previous accepted reading.
pub fn reduce(
    state: &TrackerState,
    reading: &Reading,
    now: Instant,
    window: Duration,
) -> Option<TrackerState> {
    if let Some(last) = state.last_accepted {
        if now.saturating_duration_since(last) < window {
            return None;
        }
    }

    let speed_kph = speed_to_kph(reading.speed);

    Some(TrackerState {
        speed_kph,
        change: ChangeDirection::between(state.speed_kph, speed_kph),
        signal: SignalLevel::from_accuracy(reading.accuracy),
        last_accepted: Some(now),
    })
}

/// Owns the tracker state and applies readings through [`reduce`].
#[derive(Debug)]
pub struct SpeedTracker {
    state: TrackerState,
    window: Duration,
}

impl SpeedTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            state: TrackerState::default(),
            window,
        }
    }

    /// Returns the new state if the reading was accepted.
    pub fn observe(&mut self, reading: &Reading, now: Instant) -> Option<&TrackerState> {
        let next = reduce(&self.state, reading, now, self.window)?;
        self.state = next;
        Some(&self.state)
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for SpeedTracker {
    fn default() -> Self {
        Self::new(ACCEPTANCE_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_first_reading_always_accepted() {
        let mut tracker = SpeedTracker::default();
        let t0 = Instant::now();

        let state = tracker.observe(&Reading::new(Some(10.0), 15.0), t0).unwrap();

        assert_relative_eq!(state.speed_kph, 36.0, epsilon = 1e-9);
        assert_eq!(state.change, ChangeDirection::Increase);
        assert_eq!(state.signal, SignalLevel::Strong);
        assert_eq!(format!("{:.2}", state.speed_kph), "36.00");
        assert_eq!(format!("{:.2}", state.speed_mph()), "22.37");
    }

    #[test]
    fn test_readings_inside_window_are_ignored() {
        let mut tracker = SpeedTracker::default();
        let t0 = Instant::now();

        assert!(tracker.observe(&Reading::new(Some(5.0), 10.0), t0).is_some());
        let before = tracker.state().clone();

        for offset in [1, 250, 500, 999] {
            let reading = Reading::new(Some(30.0), 500.0);
            assert!(tracker.observe(&reading, t0 + ms(offset)).is_none());
        }

        assert_eq!(tracker.state(), &before);
        assert!(tracker.observe(&Reading::new(Some(30.0), 500.0), t0 + ms(1000)).is_some());
    }

    #[test]
    fn test_window_is_measured_from_last_accepted() {
        let mut tracker = SpeedTracker::default();
        let t0 = Instant::now();

        tracker.observe(&Reading::new(Some(1.0), 5.0), t0);
        // Ignored readings do not move the window start.
        assert!(tracker.observe(&Reading::new(Some(2.0), 5.0), t0 + ms(900)).is_none());
        assert!(tracker.observe(&Reading::new(Some(2.0), 5.0), t0 + ms(1100)).is_some());
        assert!(tracker.observe(&Reading::new(Some(3.0), 5.0), t0 + ms(2000)).is_none());
        assert!(tracker.observe(&Reading::new(Some(3.0), 5.0), t0 + ms(2100)).is_some());
    }

    #[test]
    fn test_null_speed_reads_as_zero() {
        let mut tracker = SpeedTracker::default();
        let state = tracker
            .observe(&Reading::new(None, 150.0), Instant::now())
            .unwrap();

        assert_eq!(state.speed_kph, 0.0);
        assert_eq!(format!("{:.2}", state.speed_kph), "0.00");
        assert_eq!(state.signal, SignalLevel::Weak);
        assert_eq!(state.change, ChangeDirection::Unchanged);
    }

    #[test]
    fn test_decrease_between_accepted_readings() {
        let mut tracker = SpeedTracker::default();
        let t0 = Instant::now();

        tracker.observe(&Reading::new(Some(40.0 / MS_TO_KPH), 10.0), t0);
        let state = tracker
            .observe(&Reading::new(Some(30.0 / MS_TO_KPH), 10.0), t0 + ms(1000))
            .unwrap();

        assert_relative_eq!(state.speed_kph, 30.0, epsilon = 1e-9);
        assert_eq!(state.change, ChangeDirection::Decrease);
    }

    #[test]
    fn test_equal_speed_is_unchanged() {
        let mut tracker = SpeedTracker::default();
        let t0 = Instant::now();

        tracker.observe(&Reading::new(Some(12.5), 10.0), t0);
        let state = tracker
            .observe(&Reading::new(Some(12.5), 10.0), t0 + ms(1500))
            .unwrap();
        assert_eq!(state.change, ChangeDirection::Unchanged);
    }

    #[test]
    fn test_non_finite_speed_reads_as_zero() {
        assert_eq!(speed_to_kph(Some(f64::NAN)), 0.0);
        assert_eq!(speed_to_kph(Some(f64::INFINITY)), 0.0);
        assert_eq!(speed_to_kph(Some(0.0)), 0.0);
    }

    #[test]
    fn test_reduce_does_not_touch_input_state() {
        let state = TrackerState::default();
        let next = reduce(&state, &Reading::new(Some(3.0), 50.0), Instant::now(), ACCEPTANCE_WINDOW)
            .unwrap();

        assert_eq!(state, TrackerState::default());
        assert_eq!(next.signal, SignalLevel::Moderate);
        assert!(next.last_accepted.is_some());
    }

    #[test]
    fn test_custom_window() {
        let mut tracker = SpeedTracker::new(ms(200));
        let t0 = Instant::now();

        tracker.observe(&Reading::new(Some(1.0), 5.0), t0);
        assert!(tracker.observe(&Reading::new(Some(1.0), 5.0), t0 + ms(199)).is_none());
        assert!(tracker.observe(&Reading::new(Some(1.0), 5.0), t0 + ms(200)).is_some());
    }
}
