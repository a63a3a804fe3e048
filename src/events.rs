//! Event bus
//!
//! Event emission is a best-effort side channel (spec §6, §7): a
//! publish failure never fails the operation that triggered it. The
//! core depends only on the `EventBus` trait; `Publisher` is the
//! wrapper every component actually holds, and it swallows errors
//! after logging them.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::Severity;

/// The five topics a control-plane deployment's subscribers (metrics,
/// audit log, UI push) care about (spec §6).
#[derive(Debug, Clone)]
pub enum CoreEvent {
    AlertDigestQueued {
        entry_id: String,
        alert_id: String,
        rule_id: String,
        channel_id: String,
        severity: Severity,
        bypass_sent: bool,
        queued_at: DateTime<Utc>,
    },
    AlertDigestDelivered {
        digest_id: String,
        channel_id: String,
        entry_count: usize,
        severities: HashMap<String, usize>,
        delivered_at: DateTime<Utc>,
    },
    AlertEscalated {
        escalation_id: String,
        alert_id: String,
        level: u8,
        at: DateTime<Utc>,
    },
    AlertEscalationCanceled {
        escalation_id: String,
        alert_id: String,
        reason: String,
        at: DateTime<Utc>,
    },
    AlertEscalationMaxReached {
        escalation_id: String,
        alert_id: String,
        max_level: u8,
        at: DateTime<Utc>,
    },
}

impl CoreEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            CoreEvent::AlertDigestQueued { .. } => "alert.digest.queued",
            CoreEvent::AlertDigestDelivered { .. } => "alert.digest.delivered",
            CoreEvent::AlertEscalated { .. } => "alert.escalated",
            CoreEvent::AlertEscalationCanceled { .. } => "alert.escalation.canceled",
            CoreEvent::AlertEscalationMaxReached { .. } => "alert.escalation.max_reached",
        }
    }
}

#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: CoreEvent) -> anyhow::Result<()>;
}

/// No-op reference bus: logs the topic and drops the event. Used by
/// tests and as a development default.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEventBus;

#[async_trait]
impl EventBus for LoggingEventBus {
    async fn publish(&self, event: CoreEvent) -> anyhow::Result<()> {
        log::debug!("event published: {}", event.topic());
        Ok(())
    }
}

/// Wraps any `EventBus` and makes publish failures unobservable to
/// callers beyond a log line, per the "best-effort side channel"
/// policy (spec §7).
pub struct Publisher {
    bus: std::sync::Arc<dyn EventBus>,
}

impl Publisher {
    pub fn new(bus: std::sync::Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    pub async fn publish(&self, event: CoreEvent) {
        let topic = event.topic();
        if let Err(err) = self.bus.publish(event).await {
            log::warn!("event publish failed topic={topic}: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FailingBus {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EventBus for FailingBus {
        async fn publish(&self, _event: CoreEvent) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("subscriber unreachable"))
        }
    }

    #[tokio::test]
    async fn publisher_swallows_bus_failures() {
        let bus = Arc::new(FailingBus {
            calls: AtomicUsize::new(0),
        });
        let publisher = Publisher::new(bus.clone());
        publisher
            .publish(CoreEvent::AlertEscalationCanceled {
                escalation_id: "esc-1".to_string(),
                alert_id: "alert-1".to_string(),
                reason: "alert acknowledged".to_string(),
                at: Utc::now(),
            })
            .await;
        assert_eq!(bus.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn topic_names_match_spec() {
        let at = Utc::now();
        assert_eq!(
            CoreEvent::AlertDigestQueued {
                entry_id: "e".into(),
                alert_id: "a".into(),
                rule_id: "r".into(),
                channel_id: "c".into(),
                severity: crate::models::Severity::Warning,
                bypass_sent: false,
                queued_at: at,
            }
            .topic(),
            "alert.digest.queued"
        );
        assert_eq!(
            CoreEvent::AlertEscalationMaxReached {
                escalation_id: "e".into(),
                alert_id: "a".into(),
                max_level: 3,
                at,
            }
            .topic(),
            "alert.escalation.max_reached"
        );
    }
}
