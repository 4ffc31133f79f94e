//! `time_window` parsing and matching for [`basecamp_storage::IdleSchedule`].
//!
//! A window is a `"HH:MM-HH:MM"` range in UTC, restricting a schedule to
//! only fire with its clock falls inside the range. A window whose end is
//! numerically before its start wraps past midnight (e.g. `"22:00-06:00"`
//! covers overnight). No calendar/weekday selector is supported — schedules
//! needing that express it as a narrower daily window plus admin-side
//! scheduling.

use chrono::{NaiveTime, Timelike};

use crate::error::{IdleError, IdleResult};

/// A parsed, UTC daily time-of-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeWindow {
    /// Parse a `"HH:MM-HH:MM"` string.
    pub fn parse(window: &str) -> IdleResult<Self> {
        let (start_str, end_str) = window.split_once('-').ok_or_else(|| IdleError::InvalidTimeWindow {
            window: window.to_string(),
            reason: "expected HH:MM-HH:MM".to_string(),
        })?;

        let parse_time = |s: &str| {
            NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|e| IdleError::InvalidTimeWindow {
                window: window.to_string(),
                reason: e.to_string(),
            })
        };

        Ok(Self { start: parse_time(start_str)?, end: parse_time(end_str)? })
    }

    /// Whether `time` (a UTC time-of-day) falls inside this window,
    /// wrapping past midnight when `end < start`.
    #[must_use]
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            time >= self.start && time <= self.end
        } else {
            time >= self.start || time <= self.end
        }
    }
}

/// Whether an optional `time_window` string permits firing at `now`.
/// `None` always permits firing.
pub fn window_permits(window: Option<&str>, now: chrono::DateTime<chrono::Utc>) -> IdleResult<bool> {
    match window {
        None => Ok(true),
        Some(w) => Ok(TimeWindow::parse(w)?.contains(now.time().with_nanosecond(0).unwrap_or(now.time()))),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;

    #[test]
    fn parses_a_same_day_window() {
        let window = TimeWindow::parse("09:00-17:00").unwrap();
        assert!(window.contains(NaiveTime::from_hms_opt(12, 0, 0).unwrap()));
        assert!(!window.contains(NaiveTime::from_hms_opt(20, 0, 0).unwrap()));
    }

    #[test]
    fn overnight_window_wraps_midnight() {
        let window = TimeWindow::parse("22:00-06:00").unwrap();
        assert!(window.contains(NaiveTime::from_hms_opt(23, 30, 0).unwrap()));
        assert!(window.contains(NaiveTime::from_hms_opt(2, 0, 0).unwrap()));
        assert!(!window.contains(NaiveTime::from_hms_opt(12, 0, 0).unwrap()));
    }

    #[test]
    fn rejects_malformed_window() {
        assert!(TimeWindow::parse("not-a-window").is_err());
        assert!(TimeWindow::parse("9am-5pm").is_err());
    }

    #[test]
    fn no_window_always_permits() {
        assert!(window_permits(None, chrono::Utc::now()).unwrap());
    }
}
