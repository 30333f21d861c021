use std::time::Duration;

/// Upper bound on the wait between restarts of a location watcher.
pub const MAX_RESTART_COOLDOWN: Duration = Duration::from_secs(30);

/// Restart bookkeeping for a watcher process that can exit on its own.
#[derive(Clone, Debug)]
pub struct RestartBackoff {
    name: &'static str,
    attempts: u32,
    base_cooldown: Duration,
    current_cooldown: Duration,
}

impl RestartBackoff {
    pub fn new(name: &'static str, base_cooldown: Duration) -> Self {
        let base_cooldown = base_cooldown.min(MAX_RESTART_COOLDOWN);
        Self {
            name,
            attempts: 0,
            base_cooldown,
            current_cooldown: base_cooldown,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record a failed run and return how long to wait before the next one.
    /// The wait grows by 1.5x per consecutive failure, capped at 30 seconds.
    pub fn record_failed_attempt(&mut self) -> Duration {
        self.attempts += 1;
        let wait = self.current_cooldown;
        self.current_cooldown = Duration::from_secs_f64(
            (self.current_cooldown.as_secs_f64() * 1.5).min(MAX_RESTART_COOLDOWN.as_secs_f64()),
        );

        log::warn!(
            "[{}] restart attempt {} in {:.1}s",
            self.name,
            self.attempts,
            wait.as_secs_f64()
        );
        wait
    }

    /// A run produced fixes again; start over from the base cooldown.
    pub fn record_success(&mut self) {
        if self.attempts > 0 {
            log::info!(
                "[{}] recovered after {} restart attempt(s)",
                self.name,
                self.attempts
            );
        }
        self.attempts = 0;
        self.current_cooldown = self.base_cooldown;
    }
}
