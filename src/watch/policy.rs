//! Reconnect backoff schedule.

use std::time::Duration;

use crate::config::WatchConfig;

/// Exponential backoff for reconnect attempts.
///
/// Each fault consumes the current delay and doubles it (by the configured
/// multiplier) up to the ceiling. A successful connection resets the
/// schedule to the initial delay.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    initial: Duration,
    multiplier: u32,
    max: Duration,
    current: Duration,
}

impl ReconnectPolicy {
    /// Build a policy from the watch configuration.
    pub fn new(config: &WatchConfig) -> Self {
        Self {
            initial: config.initial_backoff,
            multiplier: config.backoff_multiplier,
            max: config.max_backoff,
            current: config.initial_backoff,
        }
    }

    /// The delay to wait before the next attempt, advancing the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * self.multiplier).min(self.max);
        delay
    }

    /// Reset the schedule after a successful connection.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}
