use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use cron::Schedule as CronSchedule;
use tracing::warn;

use crate::types::Schedule;

/// Compute the next UTC execution time for `schedule` starting *after* `from`.
///
/// Returns `None` when the schedule is exhausted (e.g. a `Once` job whose
/// time has already passed) or when the schedule type is not yet supported
/// (e.g. `Cron`).
pub fn compute_next_run(schedule: &Schedule, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match schedule {
        Schedule::Once { at } => {
            // Fire only if the instant is still in the future.
            if *at > from {
                Some(*at)
            } else {
                None
            }
        }

        Schedule::Interval { every_secs } => Some(from + Duration::seconds(*every_secs as i64)),

        Schedule::Daily { hour, minute } => {
            // Build today's candidate at HH:MM:00 UTC.
            let candidate = Utc
                .with_ymd_and_hms(
                    from.year(),
                    from.month(),
                    from.day(),
                    *hour as u32,
                    *minute as u32,
                    0,
                )
                .single()?;
            if candidate > from {
                Some(candidate)
            } else {
                // Today's window has passed — advance to tomorrow.
                Some(candidate + Duration::days(1))
            }
        }

        Schedule::Weekly { day, hour, minute } => {
            // `day` follows ISO weekday numbering: 0=Monday … 6=Sunday,
            // which matches chrono's `num_days_from_monday`.
            let today_dow = from.weekday().num_days_from_monday() as i64;
            let target_dow = (*day as i64).clamp(0, 6);
            let mut days_ahead = target_dow - today_dow;

            // Normalise: negative means the target day already passed this week.
            let candidate_day = if days_ahead < 0 {
                from + Duration::days(7 + days_ahead)
            } else {
                from + Duration::days(days_ahead)
            };

            let candidate = Utc
                .with_ymd_and_hms(
                    candidate_day.year(),
                    candidate_day.month(),
                    candidate_day.day(),
                    *hour as u32,
                    *minute as u32,
                    0,
                )
                .single()?;

            if candidate > from {
                Some(candidate)
            } else {
                // The time on the target weekday has already passed — push 7 days.
                days_ahead = if days_ahead <= 0 { 7 } else { 7 - days_ahead };
                Some(candidate + Duration::days(days_ahead))
            }
        }

        Schedule::Cron { expression } => match CronSchedule::from_str(expression) {
            Ok(cron) => cron.after(&from).next(),
            Err(e) => {
                warn!(expression, "invalid cron expression: {e}");
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cron_fires_at_the_expected_next_minute() {
        let from = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        // every minute
        let schedule = Schedule::Cron { expression: "0 * * * * *".to_string() };
        let next = compute_next_run(&schedule, from).unwrap();
        assert_eq!(next, from + Duration::minutes(1));
    }

    #[test]
    fn invalid_cron_expression_yields_no_next_run() {
        let from = Utc::now();
        let schedule = Schedule::Cron { expression: "not a cron expr".to_string() };
        assert!(compute_next_run(&schedule, from).is_none());
    }

    #[test]
    fn daily_rolls_to_tomorrow_once_today_has_passed() {
        let from = Utc.with_ymd_and_hms(2026, 1, 1, 20, 0, 0).unwrap();
        let schedule = Schedule::Daily { hour: 7, minute: 0 };
        let next = compute_next_run(&schedule, from).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 2, 7, 0, 0).unwrap());
    }
}
