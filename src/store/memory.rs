//! In-memory store
//!
//! Reference `Store` implementation backed by `HashMap`s behind
//! `tokio::sync::RwLock`, modeled on the teacher's `LocalStorage`
//! (`storage/local.rs`) but without the filesystem persistence layer —
//! suitable for tests and local development, not production durability.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::CoreResult;
use crate::models::{
    Alert, AlertDigestEntry, AlertEscalation, AlertRule, AlertRuleTemplate, EscalationStatus,
};

use super::{AlertRuleStore, AlertStore, DigestEntryStore, EscalationStore, TemplateStore};

#[derive(Default)]
pub struct MemoryStore {
    alerts: RwLock<HashMap<String, Alert>>,
    rules: RwLock<HashMap<String, AlertRule>>,
    digest_entries: RwLock<HashMap<String, AlertDigestEntry>>,
    escalations: RwLock<HashMap<String, AlertEscalation>>,
    templates: RwLock<HashMap<String, AlertRuleTemplate>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn get_alert(&self, id: &str) -> CoreResult<Option<Alert>> {
        Ok(self.alerts.read().await.get(id).cloned())
    }

    async fn get_alert_with_rule(&self, id: &str) -> CoreResult<Option<(Alert, AlertRule)>> {
        let alert = match self.alerts.read().await.get(id).cloned() {
            Some(a) => a,
            None => return Ok(None),
        };
        let rule = self.rules.read().await.get(&alert.rule_id).cloned();
        Ok(rule.map(|r| (alert, r)))
    }

    async fn upsert_alert(&self, alert: &Alert) -> CoreResult<()> {
        self.alerts
            .write()
            .await
            .insert(alert.id.clone(), alert.clone());
        Ok(())
    }
}

#[async_trait]
impl AlertRuleStore for MemoryStore {
    async fn get_rule(&self, id: &str) -> CoreResult<Option<AlertRule>> {
        Ok(self.rules.read().await.get(id).cloned())
    }

    async fn upsert_rule(&self, rule: &AlertRule) -> CoreResult<()> {
        self.rules
            .write()
            .await
            .insert(rule.id.clone(), rule.clone());
        Ok(())
    }
}

#[async_trait]
impl DigestEntryStore for MemoryStore {
    async fn create_entry(&self, entry: &AlertDigestEntry) -> CoreResult<()> {
        self.digest_entries
            .write()
            .await
            .insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn query_pending(
        &self,
        channel_id: &str,
        since: DateTime<Utc>,
    ) -> CoreResult<Vec<AlertDigestEntry>> {
        let entries = self.digest_entries.read().await;
        let mut matching: Vec<AlertDigestEntry> = entries
            .values()
            .filter(|e| e.channel_id == channel_id && e.delivered_at.is_none() && e.queued_at >= since)
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.queued_at);
        Ok(matching)
    }

    async fn mark_delivered(
        &self,
        ids: &[String],
        digest_id: &str,
        delivered_at: DateTime<Utc>,
    ) -> CoreResult<()> {
        let mut entries = self.digest_entries.write().await;
        for id in ids {
            if let Some(entry) = entries.get_mut(id) {
                entry.delivered_at = Some(delivered_at);
                entry.digest_id = Some(digest_id.to_string());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EscalationStore for MemoryStore {
    async fn create_escalation(&self, escalation: &AlertEscalation) -> CoreResult<()> {
        self.escalations
            .write()
            .await
            .insert(escalation.id.clone(), escalation.clone());
        Ok(())
    }

    async fn get_escalation(&self, id: &str) -> CoreResult<Option<AlertEscalation>> {
        Ok(self.escalations.read().await.get(id).cloned())
    }

    async fn update_escalation(&self, escalation: &AlertEscalation) -> CoreResult<()> {
        self.escalations
            .write()
            .await
            .insert(escalation.id.clone(), escalation.clone());
        Ok(())
    }

    async fn list_pending_with_rule(&self) -> CoreResult<Vec<(AlertEscalation, AlertRule)>> {
        let escalations = self.escalations.read().await;
        let rules = self.rules.read().await;
        let mut out = Vec::new();
        for escalation in escalations.values() {
            if super::status_matches_pending(&escalation.status) {
                if let Some(rule) = rules.get(&escalation.rule_id) {
                    out.push((escalation.clone(), rule.clone()));
                }
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn get_custom_template(&self, id: &str) -> CoreResult<Option<AlertRuleTemplate>> {
        Ok(self.templates.read().await.get(id).cloned())
    }

    async fn list_custom_templates(&self) -> CoreResult<Vec<AlertRuleTemplate>> {
        Ok(self.templates.read().await.values().cloned().collect())
    }

    async fn upsert_custom_template(&self, template: &AlertRuleTemplate) -> CoreResult<()> {
        self.templates
            .write()
            .await
            .insert(template.id.clone(), template.clone());
        Ok(())
    }

    async fn delete_custom_template(&self, id: &str) -> CoreResult<bool> {
        Ok(self.templates.write().await.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EscalationConfig, Severity};

    fn sample_rule() -> AlertRule {
        AlertRule {
            id: "rule-1".to_string(),
            name: "test rule".to_string(),
            event_type: "router.offline".to_string(),
            severity: Severity::Critical,
            conditions: vec![],
            channels: vec!["inapp".to_string()],
            enabled: true,
            throttle: None,
            digest: None,
            escalation: None,
            quiet_hours: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_alert(rule_id: &str) -> Alert {
        Alert {
            id: "alert-1".to_string(),
            rule_id: rule_id.to_string(),
            severity: Severity::Critical,
            event_type: "router.offline".to_string(),
            title: "Router offline".to_string(),
            message: "msg".to_string(),
            data: Default::default(),
            device_id: None,
            acknowledged_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn alert_with_rule_joins_correctly() {
        let store = MemoryStore::new();
        store.upsert_rule(&sample_rule()).await.unwrap();
        store.upsert_alert(&sample_alert("rule-1")).await.unwrap();

        let (alert, rule) = store.get_alert_with_rule("alert-1").await.unwrap().unwrap();
        assert_eq!(alert.id, "alert-1");
        assert_eq!(rule.id, "rule-1");
    }

    #[tokio::test]
    async fn query_pending_excludes_delivered_and_out_of_window() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut entry = AlertDigestEntry {
            id: "e1".to_string(),
            alert_id: "a1".to_string(),
            rule_id: "r1".to_string(),
            channel_id: "c1".to_string(),
            channel_type: "email".to_string(),
            severity: Severity::Warning,
            event_type: "x".to_string(),
            title: "t".to_string(),
            message: "m".to_string(),
            data: None,
            bypass_sent: false,
            queued_at: now,
            delivered_at: None,
            digest_id: None,
        };
        store.create_entry(&entry).await.unwrap();

        let mut delivered = entry.clone();
        delivered.id = "e2".to_string();
        delivered.delivered_at = Some(now);
        store.create_entry(&delivered).await.unwrap();

        entry.id = "e3".to_string();
        entry.queued_at = now - chrono::Duration::hours(48);
        store.create_entry(&entry).await.unwrap();

        let pending = store
            .query_pending("c1", now - chrono::Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "e1");
    }

    #[tokio::test]
    async fn list_pending_with_rule_filters_by_status() {
        let store = MemoryStore::new();
        store.upsert_rule(&sample_rule()).await.unwrap();

        let pending = AlertEscalation {
            id: "esc-1".to_string(),
            alert_id: "alert-1".to_string(),
            rule_id: "rule-1".to_string(),
            current_level: 0,
            max_level: 3,
            status: EscalationStatus::Pending,
            next_escalation_at: Some(Utc::now()),
            escalation_delay_seconds: 2,
            repeat_interval_seconds: vec![2, 4],
            additional_channels: vec![],
            resolved_at: None,
            resolved_by: None,
        };
        let mut resolved = pending.clone();
        resolved.id = "esc-2".to_string();
        resolved.status = EscalationStatus::Resolved;
        resolved.next_escalation_at = None;

        store.create_escalation(&pending).await.unwrap();
        store.create_escalation(&resolved).await.unwrap();

        let rows = store.list_pending_with_rule().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0.id, "esc-1");
        let _ = EscalationConfig {
            enabled: true,
            require_ack: true,
            escalation_delay_seconds: 2,
            max_escalations: 3,
            additional_channels: vec![],
            repeat_interval_seconds: vec![2],
        };
    }
}
