//! Storm Detector
//!
//! Sliding-window rate limiter: short-circuits notification delivery
//! once alert volume within `window_seconds` exceeds `threshold`, and
//! holds suppression for `cooldown_seconds` after the last trip.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::models::{StormConfig, StormStatus};

struct StormState {
    timestamps: VecDeque<DateTime<Utc>>,
    in_storm: bool,
    storm_started_at: Option<DateTime<Utc>>,
    cooldown_ends_at: Option<DateTime<Utc>>,
    suppressed_count: u64,
}

impl StormState {
    fn new() -> Self {
        Self {
            timestamps: VecDeque::new(),
            in_storm: false,
            storm_started_at: None,
            cooldown_ends_at: None,
            suppressed_count: 0,
        }
    }
}

/// All public operations are safe for concurrent invocation; a single
/// mutex is sufficient since each check is O(k) in the number of
/// expiring entries and the work is short.
pub struct StormDetector {
    config: StormConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<StormState>,
}

impl StormDetector {
    pub fn new(config: StormConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            state: Mutex::new(StormState::new()),
        }
    }

    /// Records an alert occurrence and reports whether it should be
    /// allowed through to delivery.
    pub async fn record_alert(&self) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock().await;

        let window_start = now - chrono::Duration::seconds(self.config.window_seconds);
        while matches!(state.timestamps.front(), Some(ts) if *ts < window_start) {
            state.timestamps.pop_front();
        }

        if state.in_storm {
            if let Some(ends_at) = state.cooldown_ends_at {
                if now < ends_at {
                    state.suppressed_count += 1;
                    return false;
                }
            }
            state.in_storm = false;
            state.storm_started_at = None;
            state.cooldown_ends_at = None;
            state.suppressed_count = 0;
        }

        state.timestamps.push_back(now);
        if state.timestamps.len() > self.config.threshold {
            state.in_storm = true;
            state.storm_started_at = Some(now);
            state.cooldown_ends_at =
                Some(now + chrono::Duration::seconds(self.config.cooldown_seconds));
            state.suppressed_count = 0;
            return false;
        }
        true
    }

    pub async fn get_status(&self) -> StormStatus {
        let now = self.clock.now();
        let state = self.state.lock().await;
        let current_rate = if self.config.window_seconds > 0 {
            (state.timestamps.len() as i64 * 60 / self.config.window_seconds).max(0) as u64
        } else {
            0
        };
        let cooldown_remaining_seconds = state
            .cooldown_ends_at
            .map(|ends_at| (ends_at - now).num_seconds().max(0))
            .unwrap_or(0);
        StormStatus {
            in_storm: state.in_storm,
            current_rate,
            suppressed_count: state.suppressed_count,
            cooldown_remaining_seconds,
            storm_started_at: state.storm_started_at,
        }
    }

    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        *state = StormState::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;

    fn detector(threshold: usize) -> (StormDetector, Arc<TestClock>) {
        let clock = Arc::new(TestClock::new(Utc::now()));
        let config = StormConfig {
            threshold,
            window_seconds: 60,
            cooldown_seconds: 300,
        };
        (StormDetector::new(config, clock.clone()), clock)
    }

    #[tokio::test]
    async fn allows_alerts_under_threshold() {
        let (detector, _clock) = detector(3);
        for _ in 0..3 {
            assert!(detector.record_alert().await);
        }
    }

    #[tokio::test]
    async fn the_threshold_plus_one_alert_triggers_storm_mode() {
        let (detector, _clock) = detector(3);
        for _ in 0..3 {
            assert!(detector.record_alert().await);
        }
        assert!(!detector.record_alert().await);
        let status = detector.get_status().await;
        assert!(status.in_storm);
        assert!(status.storm_started_at.is_some());
    }

    #[tokio::test]
    async fn suppresses_until_window_slides_and_cooldown_elapses() {
        let (detector, clock) = detector(1);
        assert!(detector.record_alert().await);
        assert!(!detector.record_alert().await);

        // Cooldown still active: still suppressed even though the window
        // has slid past the original timestamps.
        clock.advance(chrono::Duration::seconds(200));
        assert!(!detector.record_alert().await);

        // Cooldown elapses: storm clears and the next alert is allowed.
        clock.advance(chrono::Duration::seconds(150));
        assert!(detector.record_alert().await);

        // A second alert in the same window re-trips the (threshold=1) storm.
        assert!(!detector.record_alert().await);
    }

    #[tokio::test]
    async fn reset_zeroes_all_fields() {
        let (detector, _clock) = detector(1);
        detector.record_alert().await;
        detector.record_alert().await;
        detector.reset().await;
        let status = detector.get_status().await;
        assert!(!status.in_storm);
        assert_eq!(status.suppressed_count, 0);
        assert_eq!(status.current_rate, 0);
        assert!(status.storm_started_at.is_none());
    }

    #[tokio::test]
    async fn current_rate_is_alerts_per_minute() {
        let (detector, _clock) = detector(10);
        for _ in 0..5 {
            detector.record_alert().await;
        }
        let status = detector.get_status().await;
        assert_eq!(status.current_rate, 5);
    }
}
