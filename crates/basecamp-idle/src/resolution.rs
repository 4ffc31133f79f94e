//! Selects the single least-destructive matching schedule out of an idle
//! policy.

use chrono::{DateTime, Duration, Utc};

use basecamp_storage::IdleSchedule;

use crate::error::IdleResult;
use crate::window::window_permits;

/// Schedules whose `idle_minutes`, `time_window`, and `cost_threshold`
/// conditions are all satisfied right now.
pub fn matching_schedules<'a>(
    schedules: &'a [IdleSchedule],
    debounced_idle_duration: Duration,
    now: DateTime<Utc>,
    accumulated_cost: f64,
) -> IdleResult<Vec<&'a IdleSchedule>> {
    let idle_minutes = debounced_idle_duration.num_minutes().max(0);

    let mut matches = Vec::new();
    for schedule in schedules {
        if i64::from(schedule.idle_minutes) > idle_minutes {
            continue;
        }
        if !window_permits(schedule.time_window.as_deref(), now)? {
            continue;
        }
        if let Some(threshold) = schedule.cost_threshold
            && accumulated_cost < threshold
        {
            continue;
        }
        matches.push(schedule);
    }

    Ok(matches)
}

/// The single least-destructive schedule among a set of matches, per the
/// `IdleAction` lattice (`Alert < Hibernate < Stop < Terminate`).
#[must_use]
pub fn least_destructive(matches: &[&IdleSchedule]) -> Option<IdleSchedule> {
    matches.iter().min_by_key(|s| s.action).map(|s| (**s).clone())
}

#[cfg(test)]
mod tests {
    use basecamp_storage::IdleAction;

    use super::*;

    fn schedule(idle_minutes: u32, action: IdleAction) -> IdleSchedule {
        IdleSchedule { idle_minutes, action, time_window: None, cost_threshold: None }
    }

    #[test]
    fn only_elapsed_schedules_match() {
        let schedules = vec![schedule(30, IdleAction::Alert), schedule(120, IdleAction::Stop)];
        let matches = matching_schedules(&schedules, Duration::minutes(60), Utc::now(), 0.0).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].action, IdleAction::Alert);
    }

    #[test]
    fn least_destructive_wins_among_matches() {
        let schedules =
            vec![schedule(10, IdleAction::Terminate), schedule(10, IdleAction::Alert), schedule(10, IdleAction::Stop)];
        let matches = matching_schedules(&schedules, Duration::minutes(60), Utc::now(), 0.0).unwrap();
        let chosen = least_destructive(&matches).unwrap();
        assert_eq!(chosen.action, IdleAction::Alert);
    }

    #[test]
    fn no_matches_when_nothing_has_elapsed_long_enough() {
        let schedules = vec![schedule(120, IdleAction::Hibernate)];
        let matches = matching_schedules(&schedules, Duration::minutes(5), Utc::now(), 0.0).unwrap();
        assert!(matches.is_empty());
        assert!(least_destructive(&matches).is_none());
    }

    #[test]
    fn cost_threshold_gates_the_schedule() {
        let mut expensive = schedule(10, IdleAction::Stop);
        expensive.cost_threshold = Some(5.0);
        let schedules = vec![expensive];

        let below = matching_schedules(&schedules, Duration::minutes(60), Utc::now(), 1.0).unwrap();
        assert!(below.is_empty());

        let above = matching_schedules(&schedules, Duration::minutes(60), Utc::now(), 10.0).unwrap();
        assert_eq!(above.len(), 1);
    }

    #[test]
    fn time_window_gates_the_schedule() {
        let mut windowed = schedule(10, IdleAction::Hibernate);
        windowed.time_window = Some("00:00-00:01".to_string());
        let schedules = vec![windowed];

        let noon = Utc::now().date_naive().and_hms_opt(12, 0, 0).unwrap().and_utc();
        let matches = matching_schedules(&schedules, Duration::minutes(60), noon, 0.0).unwrap();
        assert!(matches.is_empty());
    }
}
