//! Escalation Engine
//!
//! Tracks alerts awaiting acknowledgment and re-notifies on an
//! increasing channel set until acknowledged or the level cap is hit
//! (spec §4.6). State lives in `alertId → state` under a dual-lock
//! hierarchy: a top-level RW lock guards map membership; each entry's
//! own mutex guards its timer and level, acquired only after the
//! top-level lock is released.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexSet;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::dispatch::Dispatcher;
use crate::error::{CoreError, CoreResult};
use crate::events::{CoreEvent, Publisher};
use crate::ids::new_id;
use crate::models::{Alert, AlertEscalation, AlertRule, EscalationStatus};
use crate::store::Store;

struct EscalationState {
    escalation_id: String,
    current_level: u8,
    max_escalations: u8,
    repeat_interval_seconds: Vec<u64>,
    additional_channels: Vec<String>,
    canceled: bool,
    timer: Option<JoinHandle<()>>,
}

pub struct EscalationEngine {
    store: Arc<dyn Store>,
    dispatcher: Arc<dyn Dispatcher>,
    publisher: Arc<Publisher>,
    clock: Arc<dyn Clock>,
    states: RwLock<HashMap<String, Arc<Mutex<EscalationState>>>>,
    stopped: AtomicBool,
    self_ref: Weak<EscalationEngine>,
}

impl EscalationEngine {
    pub fn new(
        store: Arc<dyn Store>,
        dispatcher: Arc<dyn Dispatcher>,
        publisher: Arc<Publisher>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            store,
            dispatcher,
            publisher,
            clock,
            states: RwLock::new(HashMap::new()),
            stopped: AtomicBool::new(false),
            self_ref: self_ref.clone(),
        })
    }

    fn arc(&self) -> Arc<Self> {
        self.self_ref.upgrade().expect("engine outlives its own handles")
    }

    /// Loads every `PENDING` escalation and re-arms its timer. Called
    /// once at startup.
    pub async fn start(&self) -> CoreResult<()> {
        let pending = self.store.list_pending_with_rule().await?;
        for (escalation, rule) in pending {
            self.recover(escalation, rule).await;
        }
        Ok(())
    }

    async fn recover(&self, escalation: AlertEscalation, rule: AlertRule) {
        let config = match &rule.escalation {
            Some(c) => c.clone(),
            None => {
                log::warn!(
                    "escalation row {} references rule {} with no escalation config, skipping",
                    escalation.id,
                    rule.id
                );
                return;
            }
        };
        if let Err(err) = config.validate() {
            log::warn!("invalid escalation config for row {}: {err}", escalation.id);
            self.resolve_with_reason(&escalation, "invalid escalation config").await;
            return;
        }

        let next_at = match escalation.next_escalation_at {
            Some(t) => t,
            None => {
                log::warn!("escalation row {} missing next_escalation_at", escalation.id);
                self.resolve_with_reason(&escalation, "missing next_escalation_at").await;
                return;
            }
        };

        let now = self.clock.now();
        let remaining = next_at - now;
        let delay = if remaining <= chrono::Duration::zero() {
            std::time::Duration::ZERO
        } else {
            remaining.to_std().unwrap_or(std::time::Duration::ZERO)
        };

        let state = Arc::new(Mutex::new(EscalationState {
            escalation_id: escalation.id.clone(),
            current_level: escalation.current_level,
            max_escalations: config.max_escalations,
            repeat_interval_seconds: config.repeat_interval_seconds.clone(),
            additional_channels: config.additional_channels.clone(),
            canceled: false,
            timer: None,
        }));
        self.states.write().await.insert(escalation.alert_id.clone(), state.clone());
        self.arm_timer(escalation.alert_id, state, delay).await;
    }

    async fn resolve_with_reason(&self, escalation: &AlertEscalation, reason: &str) {
        let mut row = escalation.clone();
        row.status = EscalationStatus::Resolved;
        row.resolved_at = Some(self.clock.now());
        row.resolved_by = Some(reason.to_string());
        row.next_escalation_at = None;
        if let Err(err) = self.store.update_escalation(&row).await {
            log::error!("failed to resolve escalation {}: {err}", escalation.id);
        }
    }

    /// Starts tracking `alert` for escalation per `rule.escalation`.
    /// A no-op if escalation is absent or disabled.
    pub async fn track_alert(&self, alert: &Alert, rule: &AlertRule) -> CoreResult<()> {
        if self.stopped.load(Ordering::SeqCst) {
            return Ok(());
        }
        let config = match &rule.escalation {
            Some(c) if c.enabled => c.clone(),
            _ => return Ok(()),
        };
        if let Err(err) = config.validate() {
            log::warn!("invalid escalation config for rule {}: {err}", rule.id);
            return Err(err);
        }

        let now = self.clock.now();
        let escalation = AlertEscalation {
            id: new_id(),
            alert_id: alert.id.clone(),
            rule_id: rule.id.clone(),
            current_level: 0,
            max_level: config.max_escalations,
            status: EscalationStatus::Pending,
            next_escalation_at: Some(now + chrono::Duration::seconds(config.escalation_delay_seconds as i64)),
            escalation_delay_seconds: config.escalation_delay_seconds,
            repeat_interval_seconds: config.repeat_interval_seconds.clone(),
            additional_channels: config.additional_channels.clone(),
            resolved_at: None,
            resolved_by: None,
        };
        self.store.create_escalation(&escalation).await?;

        let state = Arc::new(Mutex::new(EscalationState {
            escalation_id: escalation.id.clone(),
            current_level: 0,
            max_escalations: config.max_escalations,
            repeat_interval_seconds: config.repeat_interval_seconds.clone(),
            additional_channels: config.additional_channels.clone(),
            canceled: false,
            timer: None,
        }));
        self.states.write().await.insert(alert.id.clone(), state.clone());
        let delay = std::time::Duration::from_secs(config.escalation_delay_seconds);
        self.arm_timer(alert.id.clone(), state, delay).await;
        Ok(())
    }

    async fn arm_timer(&self, alert_id: String, state: Arc<Mutex<EscalationState>>, delay: std::time::Duration) {
        let engine = self.arc();
        let alert_id_for_task = alert_id.clone();
        let state_for_task = state.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.handle_timer(alert_id_for_task, state_for_task).await;
        });
        let mut guard = state.lock().await;
        guard.timer = Some(handle);
    }

    async fn handle_timer(&self, alert_id: String, state: Arc<Mutex<EscalationState>>) {
        {
            let states = self.states.read().await;
            match states.get(&alert_id) {
                Some(existing) if Arc::ptr_eq(existing, &state) => {}
                _ => {
                    log::debug!("escalation timer fired for alert {alert_id} but state is gone");
                    return;
                }
            }
        }

        let (escalation_id, current_level, max_escalations, repeat_interval_seconds, additional_channels) = {
            let guard = state.lock().await;
            if guard.canceled {
                return;
            }
            (
                guard.escalation_id.clone(),
                guard.current_level,
                guard.max_escalations,
                guard.repeat_interval_seconds.clone(),
                guard.additional_channels.clone(),
            )
        };

        let (alert, rule) = match self.store.get_alert_with_rule(&alert_id).await {
            Ok(Some(pair)) => pair,
            Ok(None) => {
                log::warn!("escalation timer fired for missing alert {alert_id}");
                return;
            }
            Err(err) => {
                log::error!("store error fetching alert {alert_id} for escalation: {err}");
                return;
            }
        };

        if alert.is_acknowledged() {
            if let Err(err) = self.cancel_escalation(&alert_id, "alert acknowledged").await {
                log::error!("failed to cancel escalation after ack alert={alert_id}: {err}");
            }
            return;
        }

        let new_level = current_level + 1;
        let channels: Vec<String> = rule
            .channels
            .iter()
            .chain(additional_channels.iter())
            .cloned()
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        let title = format!("[ESCALATED L{new_level}] {}", alert.title);
        let message = format!("This alert has escalated to level {new_level}.\n\n{}", alert.message);

        let results = self
            .dispatcher
            .dispatch(
                CancellationToken::new(),
                &title,
                &message,
                alert.severity,
                &alert.data,
                &channels,
            )
            .await;
        for result in &results {
            if !result.success {
                log::warn!(
                    "escalation dispatch failed channel={} alert={alert_id}: {:?}",
                    result.channel,
                    result.error
                );
            }
        }

        {
            let mut guard = state.lock().await;
            guard.current_level = new_level;
        }

        let now = self.clock.now();

        if new_level >= max_escalations {
            let mut row = match self.store.get_escalation(&escalation_id).await {
                Ok(Some(row)) => row,
                Ok(None) => {
                    log::error!("escalation row missing id={escalation_id}");
                    return;
                }
                Err(err) => {
                    log::error!("store error loading escalation {escalation_id}: {err}");
                    return;
                }
            };
            row.status = EscalationStatus::MaxReached;
            row.current_level = new_level;
            row.resolved_at = Some(now);
            row.resolved_by = Some("maximum escalation level reached".to_string());
            row.next_escalation_at = None;
            if let Err(err) = self.store.update_escalation(&row).await {
                log::error!(
                    "store update failed marking max_reached escalation={escalation_id}: {err}; timer will not re-arm"
                );
                return;
            }
            self.states.write().await.remove(&alert_id);
            self.publisher
                .publish(CoreEvent::AlertEscalationMaxReached {
                    escalation_id,
                    alert_id,
                    max_level: max_escalations,
                    at: now,
                })
                .await;
            return;
        }

        let idx = (new_level as usize).saturating_sub(1);
        let next_delay_seconds = repeat_interval_seconds
            .get(idx)
            .copied()
            .unwrap_or_else(|| *repeat_interval_seconds.last().unwrap_or(&60));
        let next_at = now + chrono::Duration::seconds(next_delay_seconds as i64);

        let mut row = match self.store.get_escalation(&escalation_id).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                log::error!("escalation row missing id={escalation_id}");
                return;
            }
            Err(err) => {
                log::error!("store error loading escalation {escalation_id}: {err}");
                return;
            }
        };
        row.current_level = new_level;
        row.next_escalation_at = Some(next_at);
        if let Err(err) = self.store.update_escalation(&row).await {
            log::error!(
                "store update failed escalation={escalation_id}: {err}; timer will not re-arm"
            );
            return;
        }

        self.arm_timer(alert_id.clone(), state, std::time::Duration::from_secs(next_delay_seconds))
            .await;
        self.publisher
            .publish(CoreEvent::AlertEscalated {
                escalation_id,
                alert_id,
                level: new_level,
                at: next_at,
            })
            .await;
    }

    /// Stops tracking `alert_id`, if present, and resolves its store
    /// row with `reason`. A no-op if the alert is not being tracked.
    pub async fn cancel_escalation(&self, alert_id: &str, reason: &str) -> CoreResult<()> {
        let state = { self.states.write().await.remove(alert_id) };
        let state = match state {
            Some(s) => s,
            None => return Ok(()),
        };

        let escalation_id = {
            let mut guard = state.lock().await;
            guard.canceled = true;
            if let Some(handle) = guard.timer.take() {
                handle.abort();
            }
            guard.escalation_id.clone()
        };

        let now = self.clock.now();
        let mut row = self
            .store
            .get_escalation(&escalation_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(escalation_id.clone()))?;
        row.status = EscalationStatus::Resolved;
        row.resolved_at = Some(now);
        row.resolved_by = Some(reason.to_string());
        row.next_escalation_at = None;
        self.store.update_escalation(&row).await?;

        self.publisher
            .publish(CoreEvent::AlertEscalationCanceled {
                escalation_id,
                alert_id: alert_id.to_string(),
                reason: reason.to_string(),
                at: now,
            })
            .await;
        Ok(())
    }

    /// Cancels every timer and waits (bounded) for in-flight handlers.
    /// Idempotent; further calls after the first are a no-op.
    pub async fn stop(&self) -> CoreResult<()> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let states = std::mem::take(&mut *self.states.write().await);
        let mut handles = Vec::with_capacity(states.len());
        for (_, state) in states {
            let mut guard = state.lock().await;
            guard.canceled = true;
            if let Some(handle) = guard.timer.take() {
                handle.abort();
                handles.push(handle);
            }
        }
        let wait = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        match tokio::time::timeout(std::time::Duration::from_secs(10), wait).await {
            Ok(()) => Ok(()),
            Err(_) => Err(CoreError::ShutdownTimeout),
        }
    }
}
