//! Escalation models
//!
//! `EscalationConfig` is embedded in a rule; `AlertEscalation` is the
//! persistent row the Escalation Engine exclusively owns while it is
//! `PENDING` (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    pub enabled: bool,
    pub require_ack: bool,
    pub escalation_delay_seconds: u64,
    pub max_escalations: u8,
    pub additional_channels: Vec<String>,
    pub repeat_interval_seconds: Vec<u64>,
}

impl EscalationConfig {
    /// Validates the invariants in spec §3: positive delay, every
    /// repeat interval positive, at least one repeat interval,
    /// `max_escalations` in [1, 10].
    pub fn validate(&self) -> CoreResult<()> {
        if self.escalation_delay_seconds == 0 {
            return Err(CoreError::ValidationFailed(
                "escalation_delay_seconds must be greater than 0".to_string(),
            ));
        }
        if !(1..=10).contains(&self.max_escalations) {
            return Err(CoreError::ValidationFailed(
                "max_escalations must be between 1 and 10".to_string(),
            ));
        }
        if self.repeat_interval_seconds.is_empty() {
            return Err(CoreError::ValidationFailed(
                "repeat_interval_seconds must contain at least one entry".to_string(),
            ));
        }
        if self.repeat_interval_seconds.iter().any(|&s| s == 0) {
            return Err(CoreError::ValidationFailed(
                "every repeat_interval_seconds entry must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// The delay before the escalation at `level` (1-indexed), clamped
    /// to the last configured interval once `level` exceeds the list.
    pub fn delay_for_level(&self, level: u8) -> u64 {
        let idx = (level as usize).saturating_sub(1);
        self.repeat_interval_seconds
            .get(idx)
            .copied()
            .unwrap_or_else(|| *self.repeat_interval_seconds.last().unwrap_or(&60))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscalationStatus {
    Pending,
    Resolved,
    MaxReached,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEscalation {
    pub id: String,
    pub alert_id: String,
    pub rule_id: String,
    pub current_level: u8,
    pub max_level: u8,
    pub status: EscalationStatus,
    pub next_escalation_at: Option<DateTime<Utc>>,
    pub escalation_delay_seconds: u64,
    pub repeat_interval_seconds: Vec<u64>,
    pub additional_channels: Vec<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}

impl AlertEscalation {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            EscalationStatus::Resolved | EscalationStatus::MaxReached
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> EscalationConfig {
        EscalationConfig {
            enabled: true,
            require_ack: true,
            escalation_delay_seconds: 2,
            max_escalations: 3,
            additional_channels: vec!["email".to_string()],
            repeat_interval_seconds: vec![2, 4, 8],
        }
    }

    #[test]
    fn validate_accepts_well_formed_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_delay() {
        let mut cfg = base_config();
        cfg.escalation_delay_seconds = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_max_escalations() {
        let mut cfg = base_config();
        cfg.max_escalations = 0;
        assert!(cfg.validate().is_err());
        cfg.max_escalations = 11;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_repeat_interval() {
        let mut cfg = base_config();
        cfg.repeat_interval_seconds = vec![2, 0, 8];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn delay_for_level_clamps_to_last_entry() {
        let cfg = base_config();
        assert_eq!(cfg.delay_for_level(1), 2);
        assert_eq!(cfg.delay_for_level(2), 4);
        assert_eq!(cfg.delay_for_level(3), 8);
        assert_eq!(cfg.delay_for_level(4), 8);
    }
}
