//! Digest models
//!
//! `DigestConfig` is embedded in a rule (or channel); `AlertDigestEntry`
//! is the persistent queue row the Digest Service owns exclusively
//! until delivered (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::quiet_hours::QuietHours;
use super::severity::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestMode {
    Immediate,
    Hourly,
    Daily,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    pub mode: DigestMode,
    /// `"MM"` for hourly, `"HH:MM"` for daily. Unused for immediate.
    pub schedule: String,
    pub timezone: String,
    pub bypass_critical: bool,
    pub send_empty: bool,
    pub quiet_hours: Option<QuietHours>,
    pub severities: Vec<Severity>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            mode: DigestMode::Immediate,
            schedule: String::new(),
            timezone: "UTC".to_string(),
            bypass_critical: false,
            send_empty: false,
            quiet_hours: None,
            severities: Vec::new(),
        }
    }
}

/// A queued alert awaiting batched delivery on a channel's digest
/// schedule. An entry with `delivered_at != None` is never
/// re-delivered (spec §3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertDigestEntry {
    pub id: String,
    pub alert_id: String,
    pub rule_id: String,
    pub channel_id: String,
    pub channel_type: String,
    pub severity: Severity,
    pub event_type: String,
    pub title: String,
    pub message: String,
    pub data: Option<HashMap<String, Value>>,
    pub bypass_sent: bool,
    pub queued_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub digest_id: Option<String>,
}

impl AlertDigestEntry {
    pub fn is_delivered(&self) -> bool {
        self.delivered_at.is_some()
    }
}

/// A fully assembled digest ready to be rendered and dispatched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestPayload {
    pub digest_id: String,
    pub channel_id: String,
    pub channel_type: String,
    pub entries: Vec<AlertDigestEntry>,
    pub severity_counts: HashMap<String, usize>,
    pub oldest: DateTime<Utc>,
    pub newest: DateTime<Utc>,
    pub total_count: usize,
}
