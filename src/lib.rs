pub mod calendar;
pub mod config;
pub mod engine;
pub mod error;
pub mod expander;
pub mod ir;
pub mod parser;
pub mod telemetry;
pub mod validator;

use chrono::{NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

pub use config::EngineConfig;
pub use error::{ScheduleError, ScheduleResult};
pub use ir::{Rule, Schedule};
pub use parser::{parse_rule, parse_schedule};

fn resolve_timezone(name: &str) -> ScheduleResult<Tz> {
    name.parse::<Tz>()
        .map_err(|_| ScheduleError::invalid_time_zone(name))
}

fn default_now(tz: &Tz) -> NaiveDateTime {
    Utc::now().with_timezone(tz).naive_local()
}

/// Computes the next firing instant for `text`, in the schedule's own time
/// zone (or `default_tz` when `text` doesn't declare one, or UTC failing
/// that). Localizes through `chrono_tz`'s earliest-valid disambiguation
/// across DST transitions.
pub fn next_occurrence(
    text: &str,
    now: Option<NaiveDateTime>,
    default_tz: Option<&str>,
    config: Option<&EngineConfig>,
) -> ScheduleResult<chrono::DateTime<Tz>> {
    let schedule = parse_schedule(text, default_tz)?;
    let tz = resolve_timezone(&schedule.timezone)?;
    let default_config = EngineConfig::default();
    let config = config.unwrap_or(&default_config);
    let now = now.unwrap_or_else(|| default_now(&tz));

    let candidate = engine::next_occurrence(&schedule, now, config, None)?;
    tz.from_local_datetime(&candidate)
        .earliest()
        .ok_or_else(ScheduleError::no_occurrence)
}

/// Replays the engine under a bounded horizon to confirm `text` produces at
/// least one occurrence. See `validator::validate_schedule` for the clamping
/// rule applied to open-ended windows.
pub fn validate(
    text: &str,
    now: Option<NaiveDateTime>,
    default_tz: Option<&str>,
    config: Option<&EngineConfig>,
) -> ScheduleResult<()> {
    let schedule = parse_schedule(text, default_tz)?;
    let tz = resolve_timezone(&schedule.timezone)?;
    let default_config = EngineConfig::default();
    let config = config.unwrap_or(&default_config);
    let now = now.unwrap_or_else(|| default_now(&tz));

    validator::validate_schedule(&schedule, now, config, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, 0).unwrap()
    }

    #[test]
    fn rejects_unknown_time_zone() {
        let err = next_occurrence(
            "every sunday at 10am in Not/AZone",
            Some(dt(2026, 3, 12, 12, 0)),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidTimeZone { .. }));
    }

    #[test]
    fn reference_scenario_one_through_the_public_api() {
        let result = next_occurrence(
            "every sunday at 10AM in Europe/Paris",
            Some(dt(2026, 3, 12, 12, 0)),
            None,
            None,
        )
        .unwrap();
        assert_eq!(result.naive_local(), dt(2026, 3, 15, 10, 0));
    }

    #[test]
    fn invalid_rule_scenario_through_the_public_api() {
        let result = validate(
            "every day at 10:00 until 2026-03-13 except 2026-03-13",
            Some(dt(2026, 3, 12, 12, 0)),
            Some("Europe/Paris"),
            None,
        );
        assert!(result.is_err());
    }
}
