//! AlertRuleTemplate
//!
//! A parameterized rule definition; variables are substituted to
//! materialize a concrete `AlertRule` (spec §3, §4.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rule::ThrottleConfig;
use super::severity::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TemplateCategory {
    Network,
    Security,
    Resources,
    Vpn,
    Dhcp,
    System,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    Integer,
    String,
    Duration,
    Percentage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDef {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub var_type: VarType,
    pub required: bool,
    pub default_value: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub unit: Option<String>,
}

/// A condition whose `value` may contain at most one `{{PLACEHOLDER}}`
/// (spec §4.3: "sources support one").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateCondition {
    pub field: String,
    pub operator: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRuleTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: TemplateCategory,
    pub event_type: String,
    pub severity: Severity,
    pub variables: Vec<VarDef>,
    pub conditions: Vec<TemplateCondition>,
    pub throttle: Option<ThrottleConfig>,
    pub channels: Vec<String>,
    pub is_built_in: bool,
    pub version: String,
    pub usage_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
