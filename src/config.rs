//! Configuration
//!
//! Crate-level configuration aggregating the defaults each component
//! falls back to when a rule doesn't specify its own storm, digest, or
//! escalation settings. Mirrors the teacher's `Config`: a plain,
//! serializable struct with `Default`, `from_env`, `from_file`, and
//! `save_to_file`.

use serde::{Deserialize, Serialize};

use crate::models::StormConfig;

/// System-level identity and logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub name: String,
    pub environment: String,
    pub log_level: String,
    pub timezone: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: "Alert Delivery Control Plane".to_string(),
            environment: "production".to_string(),
            log_level: "info".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

/// Fallback digest settings applied to a channel when its rule
/// carries no `DigestConfig` of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestSchedulerDefaults {
    pub default_timezone: String,
    pub default_send_empty: bool,
    pub lookback_hours: i64,
}

impl Default for DigestSchedulerDefaults {
    fn default() -> Self {
        Self {
            default_timezone: "UTC".to_string(),
            default_send_empty: false,
            lookback_hours: 24,
        }
    }
}

/// Fallback escalation settings applied to a rule when its
/// `EscalationConfig` omits a field the engine needs a default for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationDefaults {
    pub default_escalation_delay_seconds: u64,
    pub default_max_escalations: u8,
    pub default_repeat_interval_seconds: Vec<u64>,
    pub shutdown_timeout_seconds: u64,
}

impl Default for EscalationDefaults {
    fn default() -> Self {
        Self {
            default_escalation_delay_seconds: 900,
            default_max_escalations: 3,
            default_repeat_interval_seconds: vec![900, 1800, 3600],
            shutdown_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub system: SystemConfig,
    pub storm: StormConfig,
    pub digest: DigestSchedulerDefaults,
    pub escalation: EscalationDefaults,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults for anything unset. Recognizes `ADCP_` prefixed keys.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(name) = std::env::var("ADCP_SYSTEM_NAME") {
            config.system.name = name;
        }
        if let Ok(env) = std::env::var("ADCP_ENVIRONMENT") {
            config.system.environment = env;
        }
        if let Ok(level) = std::env::var("ADCP_LOG_LEVEL") {
            config.system.log_level = level;
        }
        if let Ok(tz) = std::env::var("ADCP_TIMEZONE") {
            config.system.timezone = tz.clone();
            config.digest.default_timezone = tz;
        }
        if let Ok(threshold) = std::env::var("ADCP_STORM_THRESHOLD") {
            if let Ok(v) = threshold.parse() {
                config.storm.threshold = v;
            }
        }
        config
    }

    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate().map_err(|e| -> Box<dyn std::error::Error> { e.into() })?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.system.name.is_empty() {
            return Err("system name cannot be empty".to_string());
        }
        if self.storm.threshold == 0 {
            return Err("storm threshold must be greater than 0".to_string());
        }
        if self.storm.window_seconds <= 0 {
            return Err("storm window_seconds must be positive".to_string());
        }
        if self.storm.cooldown_seconds < 0 {
            return Err("storm cooldown_seconds cannot be negative".to_string());
        }
        if self.digest.lookback_hours <= 0 {
            return Err("digest lookback_hours must be positive".to_string());
        }
        if self.escalation.default_max_escalations == 0 {
            return Err("escalation default_max_escalations must be greater than 0".to_string());
        }
        if self.escalation.default_repeat_interval_seconds.is_empty() {
            return Err("escalation default_repeat_interval_seconds must contain at least one entry".to_string());
        }
        Ok(())
    }
}
