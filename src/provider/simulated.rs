use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio::time::{interval, Duration};

use super::{LocationError, LocationEvent, LocationProvider, Subscription, WatchOptions};
use crate::types::Reading;

/// Synthetic drive: speed oscillates around 10 m/s, accuracy drifts through
/// all three signal bands, and every 17th fix has no velocity.
pub struct SimulatedProvider {
    cadence: Duration,
}

impl SimulatedProvider {
    pub fn new(cadence: Duration) -> Self {
        Self { cadence }
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        // Faster than the acceptance window so throttling is exercised.
        Self::new(Duration::from_millis(250))
    }
}

pub fn simulated_reading(seq: u64, high_accuracy: bool) -> Reading {
    let t = seq as f64;
    let speed = if seq % 17 == 16 {
        None
    } else {
        Some((10.0 + (t * 0.05).sin() * 8.0).max(0.0))
    };

    let base = if high_accuracy { 60.0 } else { 90.0 };
    let accuracy = (base + (t * 0.02).sin() * 70.0).max(3.0);

    Reading::new(speed, accuracy).at(37.7749 + t * 0.00001, -122.4194 + t * 0.00001)
}

impl LocationProvider for SimulatedProvider {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn subscribe(
        &self,
        options: WatchOptions,
        tx: Sender<LocationEvent>,
    ) -> Result<Subscription, LocationError> {
        let cadence = self.cadence;
        let task = tokio::spawn(async move {
            let mut ticker = interval(cadence);
            let mut seq = 0u64;

            loop {
                ticker.tick().await;

                let reading = simulated_reading(seq, options.high_accuracy);
                match tx.try_send(LocationEvent::Fix(reading)) {
                    Ok(_) => {
                        seq += 1;
                        if seq % 100 == 0 {
                            log::debug!("[simulated] {} fixes", seq);
                        }
                    }
                    Err(TrySendError::Closed(_)) => {
                        log::debug!("[simulated] channel closed after {} fixes", seq);
                        break;
                    }
                    Err(TrySendError::Full(_)) => {
                        // Consumer is behind, drop this fix
                    }
                }
            }
        });

        Ok(Subscription::new(self.name(), task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalLevel;
    use std::collections::HashSet;

    #[test]
    fn test_covers_all_signal_levels() {
        let levels: HashSet<_> = (0..400)
            .map(|seq| SignalLevel::from_accuracy(simulated_reading(seq, true).accuracy))
            .map(|level| level.label())
            .collect();
        assert_eq!(levels.len(), 3);
    }

    #[test]
    fn test_some_fixes_lack_speed() {
        assert!(simulated_reading(16, true).speed.is_none());
        assert!(simulated_reading(15, true).speed.is_some());
    }

    #[tokio::test]
    async fn test_emits_fixes_until_stopped() {
        let provider = SimulatedProvider::new(Duration::from_millis(5));
        let (tx, mut rx) = tokio::sync::mpsc::channel(16);
        let sub = provider.subscribe(WatchOptions::default(), tx).unwrap();

        for _ in 0..3 {
            match rx.recv().await {
                Some(LocationEvent::Fix(_)) => {}
                other => panic!("unexpected event: {:?}", other),
            }
        }

        sub.stop();
        // Drain whatever was buffered, then the stream must end.
        while rx.recv().await.is_some() {}
    }
}
