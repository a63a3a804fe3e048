//! Alert
//!
//! Transient within the core: created by the upstream rule-evaluation
//! engine, mutated only by acknowledgment, and destroyed by retention
//! policy outside the core (spec §3).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::severity::Severity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub rule_id: String,
    pub severity: Severity,
    pub event_type: String,
    pub title: String,
    pub message: String,
    pub data: HashMap<String, Value>,
    pub device_id: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Alert {
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged_at.is_some()
    }

    pub fn acknowledge(&mut self, at: DateTime<Utc>) {
        self.acknowledged_at = Some(at);
        self.updated_at = at;
    }
}
