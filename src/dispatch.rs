//! Dispatcher
//!
//! Per-channel delivery is an external collaborator (spec §1, §6): the
//! core calls `Dispatcher::dispatch` with a rendered title/message and
//! gets back one `DispatchResult` per channel, never raising on a
//! per-channel failure — callers inspect the results vector and decide
//! whether to retry or escalate.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::models::Severity;

/// Outcome of attempting delivery on a single channel.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub channel: String,
    pub success: bool,
    pub error: Option<String>,
}

impl DispatchResult {
    pub fn ok(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(channel: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Fan-out delivery to one or more channels. Implementations own their
/// own per-channel transport (SMTP, webhook, chat bot, ...); the core
/// only depends on this trait.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(
        &self,
        ctx: CancellationToken,
        title: &str,
        message: &str,
        severity: Severity,
        data: &HashMap<String, serde_json::Value>,
        channels: &[String],
    ) -> Vec<DispatchResult>;
}

/// Reference implementation: logs every delivery attempt and reports
/// success for every channel. Used by tests and as a development
/// default; never a stand-in for a real transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDispatcher;

#[async_trait]
impl Dispatcher for LoggingDispatcher {
    async fn dispatch(
        &self,
        ctx: CancellationToken,
        title: &str,
        message: &str,
        severity: Severity,
        _data: &HashMap<String, serde_json::Value>,
        channels: &[String],
    ) -> Vec<DispatchResult> {
        let mut results = Vec::with_capacity(channels.len());
        for channel in channels {
            if ctx.is_cancelled() {
                results.push(DispatchResult::failed(channel.clone(), "canceled"));
                continue;
            }
            log::info!(
                "dispatch channel={channel} severity={severity} title={title:?} message={message:?}"
            );
            results.push(DispatchResult::ok(channel.clone()));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logging_dispatcher_reports_success_for_every_channel() {
        let dispatcher = LoggingDispatcher;
        let results = dispatcher
            .dispatch(
                CancellationToken::new(),
                "Router offline",
                "edge-12 has been unreachable for 5 minutes",
                Severity::Critical,
                &HashMap::new(),
                &["email".to_string(), "webhook".to_string()],
            )
            .await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
    }

    #[tokio::test]
    async fn logging_dispatcher_fails_every_channel_once_canceled() {
        let dispatcher = LoggingDispatcher;
        let token = CancellationToken::new();
        token.cancel();
        let results = dispatcher
            .dispatch(
                token,
                "t",
                "m",
                Severity::Info,
                &HashMap::new(),
                &["email".to_string()],
            )
            .await;
        assert!(!results[0].success);
    }
}
