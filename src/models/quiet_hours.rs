//! Quiet hours
//!
//! The source leaves the quiet-hours format an opaque, stringly-typed
//! blob (spec §9, Open Question). We give it a concrete shape here: a
//! wall-clock window, possibly wrapping past midnight, in the same
//! timezone as the owning digest config. The scheduler contract only
//! requires that any shift it applies still satisfies `next > now`.

use chrono::{DateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuietHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl QuietHours {
    /// Whether `local_time` falls inside the quiet window. Handles
    /// windows that wrap past midnight (e.g. 22:00-06:00).
    pub fn contains(&self, local_time: NaiveTime) -> bool {
        if self.start <= self.end {
            local_time >= self.start && local_time < self.end
        } else {
            local_time >= self.start || local_time < self.end
        }
    }

    /// Shift `at` (assumed already in the target timezone) past the end
    /// of the quiet window if it falls inside it. Guarantees the result
    /// is strictly after `at`.
    pub fn shift_past<Tz: TimeZone>(&self, at: DateTime<Tz>) -> DateTime<Tz> {
        let local_time = at.time();
        if !self.contains(local_time) {
            return at;
        }
        let mut candidate = at.date_naive().and_time(self.end);
        if self.start > self.end && local_time >= self.start {
            // window wraps past midnight and we're still in "today's" half
            candidate = (at.date_naive() + chrono::Duration::days(1)).and_time(self.end);
        }
        let shifted = at
            .timezone()
            .from_local_datetime(&candidate)
            .single()
            .unwrap_or(at);
        if shifted > at {
            shifted
        } else {
            shifted + chrono::Duration::days(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn contains_simple_window() {
        let qh = QuietHours {
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
        };
        assert!(qh.contains(NaiveTime::from_hms_opt(22, 30, 0).unwrap()));
        assert!(!qh.contains(NaiveTime::from_hms_opt(23, 30, 0).unwrap()));
    }

    #[test]
    fn contains_wrapping_window() {
        let qh = QuietHours {
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
        };
        assert!(qh.contains(NaiveTime::from_hms_opt(23, 0, 0).unwrap()));
        assert!(qh.contains(NaiveTime::from_hms_opt(2, 0, 0).unwrap()));
        assert!(!qh.contains(NaiveTime::from_hms_opt(12, 0, 0).unwrap()));
    }

    #[test]
    fn shift_past_is_always_strictly_later() {
        let qh = QuietHours {
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
        };
        let now = Utc::now();
        let inside = now.date_naive().and_hms_opt(23, 0, 0).unwrap();
        let inside = Utc.from_utc_datetime(&inside);
        let shifted = qh.shift_past(inside);
        assert!(shifted > inside);
    }
}
