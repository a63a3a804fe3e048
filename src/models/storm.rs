//! Storm detector configuration and status snapshot
//!
//! `StormState` itself (the deque, cooldown bookkeeping) lives only in
//! memory inside `StormDetector` (spec §3); these are the
//! configuration and read-only status shapes that cross the detector's
//! API boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StormConfig {
    pub threshold: usize,
    pub window_seconds: i64,
    pub cooldown_seconds: i64,
}

impl Default for StormConfig {
    fn default() -> Self {
        Self {
            threshold: 100,
            window_seconds: 60,
            cooldown_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StormStatus {
    pub in_storm: bool,
    pub current_rate: u64,
    pub suppressed_count: u64,
    pub cooldown_remaining_seconds: i64,
    pub storm_started_at: Option<DateTime<Utc>>,
}
