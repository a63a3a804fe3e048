//! Store
//!
//! The persistent store is an external collaborator (spec §1): the
//! core only depends on the typed CRUD surface defined here. Real
//! deployments plug in a relational or embedded key-value backend;
//! this crate ships one in-memory reference implementation
//! (`MemoryStore`) used by tests and as a development default, modeled
//! on the teacher's `LocalStorage`.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::models::{Alert, AlertDigestEntry, AlertEscalation, AlertRule, EscalationStatus};

/// Alert persistence. Alerts are written by the rule-evaluation engine
/// outside the core; the core only reads them and sets
/// `acknowledged_at`.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn get_alert(&self, id: &str) -> CoreResult<Option<Alert>>;
    /// Alert joined with its owning rule, needed by the escalation
    /// timer handler (spec §4.6 step 3).
    async fn get_alert_with_rule(&self, id: &str) -> CoreResult<Option<(Alert, AlertRule)>>;
    async fn upsert_alert(&self, alert: &Alert) -> CoreResult<()>;
}

#[async_trait]
pub trait AlertRuleStore: Send + Sync {
    async fn get_rule(&self, id: &str) -> CoreResult<Option<AlertRule>>;
    async fn upsert_rule(&self, rule: &AlertRule) -> CoreResult<()>;
}

/// Un-delivered `AlertDigestEntry` rows are exclusively owned by the
/// Digest Service (spec §3).
#[async_trait]
pub trait DigestEntryStore: Send + Sync {
    async fn create_entry(&self, entry: &AlertDigestEntry) -> CoreResult<()>;
    /// Entries for `channel_id` with `delivered_at = None` and
    /// `queued_at >= since`, ordered ascending by `queued_at` (spec
    /// §4.4, §6).
    async fn query_pending(
        &self,
        channel_id: &str,
        since: chrono::DateTime<chrono::Utc>,
    ) -> CoreResult<Vec<AlertDigestEntry>>;
    async fn mark_delivered(
        &self,
        ids: &[String],
        digest_id: &str,
        delivered_at: chrono::DateTime<chrono::Utc>,
    ) -> CoreResult<()>;
}

/// PENDING `AlertEscalation` rows are exclusively owned by the
/// Escalation Engine (spec §3).
#[async_trait]
pub trait EscalationStore: Send + Sync {
    async fn create_escalation(&self, escalation: &AlertEscalation) -> CoreResult<()>;
    async fn get_escalation(&self, id: &str) -> CoreResult<Option<AlertEscalation>>;
    async fn update_escalation(&self, escalation: &AlertEscalation) -> CoreResult<()>;
    /// All rows with `status = PENDING`, joined with their rule, for
    /// engine restart recovery (spec §4.6 `Start`).
    async fn list_pending_with_rule(&self) -> CoreResult<Vec<(AlertEscalation, AlertRule)>>;
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get_custom_template(
        &self,
        id: &str,
    ) -> CoreResult<Option<crate::models::AlertRuleTemplate>>;
    async fn list_custom_templates(&self) -> CoreResult<Vec<crate::models::AlertRuleTemplate>>;
    async fn upsert_custom_template(
        &self,
        template: &crate::models::AlertRuleTemplate,
    ) -> CoreResult<()>;
    async fn delete_custom_template(&self, id: &str) -> CoreResult<bool>;
}

/// Convenience bound combining every sub-store; the default object
/// passed around the engines is `Arc<dyn Store>`.
pub trait Store:
    AlertStore + AlertRuleStore + DigestEntryStore + EscalationStore + TemplateStore
{
}

impl<T> Store for T where
    T: AlertStore + AlertRuleStore + DigestEntryStore + EscalationStore + TemplateStore
{
}

pub(crate) fn status_matches_pending(status: &EscalationStatus) -> bool {
    matches!(status, EscalationStatus::Pending)
}
