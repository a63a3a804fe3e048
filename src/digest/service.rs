//! Digest Service
//!
//! Queues non-immediate alerts and compiles/delivers batched digests
//! (spec §4.4). Delivery marks entries delivered only on at-least-one
//! channel success; a fully-failed dispatch leaves the queue intact so
//! the next scheduled fire retries the same entries.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::dispatch::Dispatcher;
use crate::error::{CoreError, CoreResult};
use crate::events::{CoreEvent, Publisher};
use crate::ids::new_id;
use crate::models::{Alert, AlertDigestEntry, DigestConfig, DigestMode, DigestPayload, Severity};
use crate::store::DigestEntryStore;

use super::render;

pub struct DigestService {
    store: Arc<dyn DigestEntryStore>,
    dispatcher: Arc<dyn Dispatcher>,
    publisher: Arc<Publisher>,
    clock: Arc<dyn Clock>,
}

impl DigestService {
    pub fn new(
        store: Arc<dyn DigestEntryStore>,
        dispatcher: Arc<dyn Dispatcher>,
        publisher: Arc<Publisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            publisher,
            clock,
        }
    }

    /// Whether an alert of `severity` should be queued for the channel
    /// rather than delivered immediately (spec §4.4).
    pub fn should_queue(&self, config: &DigestConfig, severity: Severity) -> bool {
        if config.mode == DigestMode::Immediate {
            return false;
        }
        if config.bypass_critical && severity == Severity::Critical {
            return false;
        }
        if !config.severities.is_empty() && !config.severities.contains(&severity) {
            return false;
        }
        true
    }

    pub async fn queue_alert(
        &self,
        alert: &Alert,
        channel_id: &str,
        channel_type: &str,
        bypass_sent: bool,
    ) -> CoreResult<()> {
        let entry = AlertDigestEntry {
            id: new_id(),
            alert_id: alert.id.clone(),
            rule_id: alert.rule_id.clone(),
            channel_id: channel_id.to_string(),
            channel_type: channel_type.to_string(),
            severity: alert.severity,
            event_type: alert.event_type.clone(),
            title: alert.title.clone(),
            message: alert.message.clone(),
            data: Some(alert.data.clone()),
            bypass_sent,
            queued_at: self.clock.now(),
            delivered_at: None,
            digest_id: None,
        };
        self.store.create_entry(&entry).await?;
        self.publisher
            .publish(CoreEvent::AlertDigestQueued {
                entry_id: entry.id,
                alert_id: alert.id.clone(),
                rule_id: alert.rule_id.clone(),
                channel_id: channel_id.to_string(),
                severity: alert.severity,
                bypass_sent,
                queued_at: entry.queued_at,
            })
            .await;
        Ok(())
    }

    pub async fn compile_digest(
        &self,
        channel_id: &str,
        since: DateTime<Utc>,
    ) -> CoreResult<DigestPayload> {
        let entries = self.store.query_pending(channel_id, since).await?;
        if entries.is_empty() {
            return Err(CoreError::NoPendingAlerts(channel_id.to_string()));
        }

        let mut severity_counts: HashMap<String, usize> = HashMap::new();
        for entry in &entries {
            *severity_counts.entry(entry.severity.to_string()).or_insert(0) += 1;
        }
        let oldest = entries.first().expect("checked non-empty").queued_at;
        let newest = entries.last().expect("checked non-empty").queued_at;
        let channel_type = entries.first().expect("checked non-empty").channel_type.clone();

        Ok(DigestPayload {
            digest_id: new_id(),
            channel_id: channel_id.to_string(),
            channel_type,
            total_count: entries.len(),
            entries,
            severity_counts,
            oldest,
            newest,
        })
    }

    pub async fn deliver_digest(&self, channel_id: &str) -> CoreResult<()> {
        let since = self.clock.now() - chrono::Duration::hours(24);
        let payload = self.compile_digest(channel_id, since).await?;

        let (title, message, data) = render::render(&payload.channel_type, &payload);
        let data_map: HashMap<String, serde_json::Value> = match data {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => HashMap::new(),
        };

        let results = self
            .dispatcher
            .dispatch(
                CancellationToken::new(),
                &title,
                &message,
                Severity::Info,
                &data_map,
                &[channel_id.to_string()],
            )
            .await;

        if !results.iter().any(|r| r.success) {
            return Err(CoreError::DispatchFailure(channel_id.to_string()));
        }

        let now = self.clock.now();
        let ids: Vec<String> = payload.entries.iter().map(|e| e.id.clone()).collect();
        self.store.mark_delivered(&ids, &payload.digest_id, now).await?;
        self.publisher
            .publish(CoreEvent::AlertDigestDelivered {
                digest_id: payload.digest_id,
                channel_id: channel_id.to_string(),
                entry_count: payload.total_count,
                severities: payload.severity_counts,
                delivered_at: now,
            })
            .await;
        Ok(())
    }

    pub async fn handle_empty_digest(&self, channel_id: &str, send_empty: bool) -> CoreResult<()> {
        if !send_empty {
            return Ok(());
        }
        let results = self
            .dispatcher
            .dispatch(
                CancellationToken::new(),
                "NasNet Digest: All Clear",
                "No pending alerts in this reporting period.",
                Severity::Info,
                &HashMap::new(),
                &[channel_id.to_string()],
            )
            .await;
        if !results.iter().any(|r| r.success) {
            return Err(CoreError::DispatchFailure(channel_id.to_string()));
        }
        Ok(())
    }
}
