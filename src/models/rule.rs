//! AlertRule
//!
//! Persistent definition of what to match and how to deliver it (spec
//! §3). `enabled=false` rules never produce alerts; that invariant is
//! enforced by upstream rule evaluation, not the core, but is recorded
//! here since the template resolver and escalation engine both read
//! `enabled` when deciding whether to act on a rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::digest::DigestConfig;
use super::escalation::EscalationConfig;
use super::quiet_hours::QuietHours;
use super::severity::Severity;

/// A single condition value. Dynamic/untyped JSON in the source is
/// modeled here as a small tagged variant set rather than a raw
/// `serde_json::Value`, per the DESIGN NOTES guidance on typed shapes
/// for well-known configuration (spec §9).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ConditionValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl std::fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionValue::Int(v) => write!(f, "{v}"),
            ConditionValue::Float(v) => write!(f, "{v}"),
            ConditionValue::Bool(v) => write!(f, "{v}"),
            ConditionValue::Str(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleCondition {
    pub field: String,
    pub operator: String,
    pub value: ConditionValue,
}

/// Throttling is evaluated entirely upstream; the core only needs to
/// carry the shape through template resolution (spec §4.3, §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ThrottleConfig {
    pub max_alerts: u32,
    pub period_seconds: u32,
    pub group_by_field: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,
    pub name: String,
    pub event_type: String,
    pub severity: Severity,
    pub conditions: Vec<RuleCondition>,
    pub channels: Vec<String>,
    pub enabled: bool,
    pub throttle: Option<ThrottleConfig>,
    pub digest: Option<DigestConfig>,
    pub escalation: Option<EscalationConfig>,
    pub quiet_hours: Option<QuietHours>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
