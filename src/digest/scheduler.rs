//! Digest Scheduler
//!
//! Arms a one-shot timer per channel that fires `DigestService::deliver_digest`
//! on a timezone-aware schedule, then re-arms itself (spec §4.5). Timers
//! are modeled as spawned tasks cancelled via an `AbortHandle`-backed
//! `JoinHandle`, with a `canceled` flag checked on wake to close the
//! race between abort and an already-fired sleep.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};
use crate::models::{DigestConfig, DigestMode};

use super::service::DigestService;

struct TimerHandle {
    join: JoinHandle<()>,
    canceled: Arc<AtomicBool>,
}

pub struct DigestScheduler {
    service: Arc<DigestService>,
    clock: Arc<dyn Clock>,
    timers: RwLock<HashMap<String, TimerHandle>>,
}

impl DigestScheduler {
    pub fn new(service: Arc<DigestService>, clock: Arc<dyn Clock>) -> Self {
        Self {
            service,
            clock,
            timers: RwLock::new(HashMap::new()),
        }
    }

    /// Cancels any existing timer for `channel_id`, computes the next
    /// delivery time, and arms a one-shot timer for it. Returns the
    /// computed fire time.
    pub async fn schedule_next(
        self: &Arc<Self>,
        channel_id: &str,
        config: DigestConfig,
    ) -> CoreResult<DateTime<Utc>> {
        self.cancel_timer(channel_id).await;

        let now = self.clock.now();
        let mut next_at = Self::get_next_delivery_time(&config, now)?;
        if next_at <= now {
            next_at = now + chrono::Duration::minutes(1);
        }
        let delay = (next_at - now).to_std().unwrap_or(std::time::Duration::from_secs(60));

        let canceled = Arc::new(AtomicBool::new(false));
        let canceled_for_task = canceled.clone();
        let scheduler = Arc::clone(self);
        let channel_id_owned = channel_id.to_string();

        let join = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if canceled_for_task.load(Ordering::SeqCst) {
                return;
            }

            match scheduler.service.deliver_digest(&channel_id_owned).await {
                Ok(()) => {}
                Err(CoreError::NoPendingAlerts(_)) if config.send_empty => {
                    if let Err(err) = scheduler
                        .service
                        .handle_empty_digest(&channel_id_owned, true)
                        .await
                    {
                        log::warn!(
                            "handle_empty_digest failed channel={channel_id_owned}: {err}"
                        );
                    }
                }
                Err(CoreError::NoPendingAlerts(_)) => {}
                Err(err) => {
                    log::warn!("deliver_digest failed channel={channel_id_owned}: {err}");
                }
            }

            if canceled_for_task.load(Ordering::SeqCst) {
                return;
            }
            if let Err(err) = scheduler.schedule_next(&channel_id_owned, config).await {
                log::warn!("reschedule failed channel={channel_id_owned}: {err}");
            }
        });

        self.timers
            .write()
            .await
            .insert(channel_id.to_string(), TimerHandle { join, canceled });
        Ok(next_at)
    }

    /// Cancels the timer for `channel_id` without re-arming; the caller
    /// must call `schedule_next` separately if rearming is desired.
    pub async fn reschedule(&self, channel_id: &str) {
        self.cancel_timer(channel_id).await;
    }

    async fn cancel_timer(&self, channel_id: &str) {
        if let Some(timer) = self.timers.write().await.remove(channel_id) {
            timer.canceled.store(true, Ordering::SeqCst);
            timer.join.abort();
        }
    }

    pub async fn get_scheduled_channels(&self) -> Vec<String> {
        self.timers.read().await.keys().cloned().collect()
    }

    /// Cancels every timer. Idempotent.
    pub async fn stop(&self) {
        let mut timers = self.timers.write().await;
        for (_, timer) in timers.drain() {
            timer.canceled.store(true, Ordering::SeqCst);
            timer.join.abort();
        }
    }

    /// Pure computation of the next delivery instant; never touches
    /// timer state (spec §4.5).
    pub fn get_next_delivery_time(config: &DigestConfig, now: DateTime<Utc>) -> CoreResult<DateTime<Utc>> {
        let tz = match Tz::from_str(&config.timezone) {
            Ok(tz) => tz,
            Err(_) => {
                log::warn!("invalid timezone {:?}, falling back to UTC", config.timezone);
                chrono_tz::UTC
            }
        };
        let now_in_tz = now.with_timezone(&tz);

        match config.mode {
            DigestMode::Immediate => Err(CoreError::InvalidSchedule(
                "immediate digests are not schedulable".to_string(),
            )),
            DigestMode::Hourly => {
                let minute = parse_minute(&config.schedule)?;
                let next_hour_start = now_in_tz
                    .date_naive()
                    .and_hms_opt(now_in_tz.hour(), 0, 0)
                    .expect("valid hms")
                    + chrono::Duration::hours(1);
                let mut next_local = next_hour_start + chrono::Duration::minutes(minute as i64);
                let mut next = local_to_utc(&tz, next_local);
                if next <= now {
                    next_local += chrono::Duration::hours(1);
                    next = local_to_utc(&tz, next_local);
                }
                Ok(apply_quiet_hours(&tz, config, next))
            }
            DigestMode::Daily => {
                let (hour, minute) = parse_hh_mm(&config.schedule)?;
                let mut next_local = now_in_tz
                    .date_naive()
                    .and_hms_opt(hour, minute, 0)
                    .expect("validated hour/minute");
                let mut next = local_to_utc(&tz, next_local);
                if next <= now {
                    next_local += chrono::Duration::days(1);
                    next = local_to_utc(&tz, next_local);
                }
                Ok(apply_quiet_hours(&tz, config, next))
            }
        }
    }
}

/// Shifts `next` (already computed, in UTC) past the configured quiet
/// window, if any, evaluated against the channel's own timezone
/// (spec §4.5: "quiet-hours may further shift `next`").
fn apply_quiet_hours(tz: &Tz, config: &DigestConfig, next: DateTime<Utc>) -> DateTime<Utc> {
    match &config.quiet_hours {
        Some(quiet_hours) => quiet_hours.shift_past(next.with_timezone(tz)).with_timezone(&Utc),
        None => next,
    }
}

fn local_to_utc(tz: &Tz, naive: chrono::NaiveDateTime) -> DateTime<Utc> {
    tz.from_local_datetime(&naive)
        .single()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
        .with_timezone(&Utc)
}

fn parse_minute(schedule: &str) -> CoreResult<u32> {
    if schedule.contains(':') || schedule.trim().is_empty() {
        return Err(CoreError::InvalidSchedule(format!(
            "invalid hourly schedule {schedule:?}, expected MM"
        )));
    }
    let minute: u32 = schedule
        .parse()
        .map_err(|_| CoreError::InvalidSchedule(format!("invalid hourly schedule {schedule:?}")))?;
    if minute > 59 {
        return Err(CoreError::InvalidSchedule(format!(
            "invalid hourly schedule {schedule:?}, minute out of range"
        )));
    }
    Ok(minute)
}

fn parse_hh_mm(schedule: &str) -> CoreResult<(u32, u32)> {
    let parts: Vec<&str> = schedule.split(':').collect();
    if parts.len() != 2 {
        return Err(CoreError::InvalidSchedule(format!(
            "invalid daily schedule {schedule:?}, expected HH:MM"
        )));
    }
    let hour: u32 = parts[0]
        .parse()
        .map_err(|_| CoreError::InvalidSchedule(format!("invalid daily schedule {schedule:?}")))?;
    let minute: u32 = parts[1]
        .parse()
        .map_err(|_| CoreError::InvalidSchedule(format!("invalid daily schedule {schedule:?}")))?;
    if hour > 23 || minute > 59 {
        return Err(CoreError::InvalidSchedule(format!(
            "invalid daily schedule {schedule:?}, out of range"
        )));
    }
    Ok((hour, minute))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: DigestMode, schedule: &str) -> DigestConfig {
        DigestConfig {
            mode,
            schedule: schedule.to_string(),
            timezone: "UTC".to_string(),
            ..DigestConfig::default()
        }
    }

    #[test]
    fn immediate_mode_is_not_schedulable() {
        let cfg = config(DigestMode::Immediate, "");
        let result = DigestScheduler::get_next_delivery_time(&cfg, Utc::now());
        assert!(matches!(result, Err(CoreError::InvalidSchedule(_))));
    }

    #[test]
    fn hourly_schedule_lands_within_the_next_hour() {
        let cfg = config(DigestMode::Hourly, "30");
        let now = Utc::now();
        let next = DigestScheduler::get_next_delivery_time(&cfg, now).unwrap();
        assert!(next > now);
        assert!(next - now <= chrono::Duration::hours(1) + chrono::Duration::minutes(1));
        assert_eq!(next.minute(), 30);
    }

    #[test]
    fn daily_schedule_rolls_to_tomorrow_if_time_has_passed() {
        let now = Utc::now();
        let past = (now - chrono::Duration::hours(1)).time();
        let cfg = config(DigestMode::Daily, &format!("{:02}:{:02}", past.hour(), past.minute()));
        let next = DigestScheduler::get_next_delivery_time(&cfg, now).unwrap();
        assert!(next > now);
    }

    #[test]
    fn rejects_invalid_schedule_strings() {
        for schedule in ["25:00", "09:99", "99", "-1", "abc"] {
            let mode = if schedule.contains(':') {
                DigestMode::Daily
            } else {
                DigestMode::Hourly
            };
            let cfg = config(mode, schedule);
            let result = DigestScheduler::get_next_delivery_time(&cfg, Utc::now());
            assert!(result.is_err(), "expected {schedule:?} to be rejected");
        }
    }

    #[test]
    fn falls_back_to_utc_on_invalid_timezone() {
        let mut cfg = config(DigestMode::Hourly, "0");
        cfg.timezone = "Not/AZone".to_string();
        let result = DigestScheduler::get_next_delivery_time(&cfg, Utc::now());
        assert!(result.is_ok());
    }

    #[test]
    fn quiet_hours_shifts_a_fire_time_that_lands_inside_the_window() {
        use crate::models::QuietHours;
        use chrono::NaiveTime;

        let mut cfg = config(DigestMode::Daily, "22:30");
        cfg.quiet_hours = Some(QuietHours {
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
        });
        let now = Utc::now().date_naive().and_hms_opt(8, 0, 0).unwrap();
        let now = Utc.from_utc_datetime(&now);

        let next = DigestScheduler::get_next_delivery_time(&cfg, now).unwrap();
        assert!(next > now);
        assert_eq!(next.time(), NaiveTime::from_hms_opt(23, 0, 0).unwrap());
    }
}
