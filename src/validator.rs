//! Replays the engine under a bounded horizon to classify a schedule as
//! "produces at least one occurrence" or empty, reusing the same evaluation
//! machinery the runtime path uses rather than a parallel static analysis.

use chrono::NaiveDateTime;

use crate::config::EngineConfig;
use crate::engine::{self, HolidayProvider};
use crate::error::{ScheduleError, ScheduleResult};
use crate::ir::{DateWindow, RecurringRule, Rule, Schedule};

/// `Ok(())` iff at least one rule in `schedule` produces an occurrence after
/// `now` within its window (recurring rules with no declared window end are
/// clamped to `now + config.default_horizon_days`). Schedule-level validity
/// is OR across rules, matching the engine's own composition semantics.
pub fn validate_schedule(
    schedule: &Schedule,
    now: NaiveDateTime,
    config: &EngineConfig,
    holidays: Option<&dyn HolidayProvider>,
) -> ScheduleResult<()> {
    let mut last_err: Option<ScheduleError> = None;
    for rule in &schedule.rules {
        match rule_is_valid(rule, now, config, holidays) {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(err) => last_err = Some(err),
        }
    }
    match last_err {
        Some(err) => Err(err),
        None => Err(ScheduleError::invalid_rule(
            "no rule in the schedule produces an occurrence within its horizon",
        )),
    }
}

fn rule_is_valid(
    rule: &Rule,
    now: NaiveDateTime,
    config: &EngineConfig,
    holidays: Option<&dyn HolidayProvider>,
) -> ScheduleResult<bool> {
    match rule {
        Rule::OneShot(one_shot) => Ok(validate_one_shot(one_shot.at, now)),
        Rule::Recurring(recurring) => validate_recurring(recurring, now, config, holidays),
    }
}

fn validate_one_shot(at: NaiveDateTime, now: NaiveDateTime) -> bool {
    at > now
}

/// Clamps `rule`'s window to `now + config.default_horizon_days` when it
/// declares no end, then delegates to the engine's own recurring-rule probe.
/// A clamp that never fires within the horizon is indistinguishable, from the
/// caller's perspective, from a rule that can never fire at all.
fn validate_recurring(
    rule: &RecurringRule,
    now: NaiveDateTime,
    config: &EngineConfig,
    holidays: Option<&dyn HolidayProvider>,
) -> ScheduleResult<bool> {
    rule.validate()?;

    let mut clamped = rule.clone();
    let horizon_end = now.date() + chrono::Duration::days(config.default_horizon_days);
    clamped.window_date = Some(match &rule.window_date {
        Some(window) => DateWindow {
            start: window.start,
            end: Some(window.effective_end().unwrap_or(horizon_end)),
            until: None,
        },
        None => DateWindow {
            start: None,
            end: Some(horizon_end),
            until: None,
        },
    });

    Ok(engine::next_for_rule(&Rule::Recurring(clamped), now, config, holidays)?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Exceptions, Freq, TimeOfDay};
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn only_reachable_firing_excluded_is_invalid() {
        let mut rule = RecurringRule::new(Freq::Daily);
        rule.times = vec![TimeOfDay::new(10, 0).unwrap()];
        rule.window_date = Some(DateWindow {
            start: None,
            end: None,
            until: NaiveDate::from_ymd_opt(2026, 3, 13),
        });
        rule.except_ = Exceptions {
            dates: BTreeSet::from([NaiveDate::from_ymd_opt(2026, 3, 13).unwrap()]),
            ..Default::default()
        };
        let schedule = Schedule {
            timezone: "Europe/Paris".to_string(),
            rules: vec![Rule::Recurring(rule)],
        };
        let now = dt(2026, 3, 12, 12, 0);
        let result = validate_schedule(&schedule, now, &EngineConfig::default(), None);
        assert!(result.is_err());
    }

    #[test]
    fn single_day_window_fully_excluded_is_invalid() {
        let mut rule = RecurringRule::new(Freq::Daily);
        rule.times = vec![TimeOfDay::new(18, 0).unwrap()];
        rule.window_date = Some(DateWindow {
            start: NaiveDate::from_ymd_opt(2026, 3, 12),
            end: NaiveDate::from_ymd_opt(2026, 3, 12),
            until: None,
        });
        rule.except_ = Exceptions {
            dates: BTreeSet::from([NaiveDate::from_ymd_opt(2026, 3, 12).unwrap()]),
            ..Default::default()
        };
        let schedule = Schedule {
            timezone: "Europe/Paris".to_string(),
            rules: vec![Rule::Recurring(rule)],
        };
        let now = dt(2026, 3, 12, 12, 0);
        let result = validate_schedule(&schedule, now, &EngineConfig::default(), None);
        assert!(result.is_err());
    }

    #[test]
    fn ordinary_rule_is_valid() {
        let mut rule = RecurringRule::new(Freq::Weekly);
        rule.byweekday = Some(BTreeSet::from([6]));
        rule.times = vec![TimeOfDay::new(10, 0).unwrap()];
        let schedule = Schedule {
            timezone: "Europe/Paris".to_string(),
            rules: vec![Rule::Recurring(rule)],
        };
        let now = dt(2026, 3, 12, 12, 0);
        assert!(validate_schedule(&schedule, now, &EngineConfig::default(), None).is_ok());
    }

    #[test]
    fn one_shot_in_the_past_is_invalid() {
        let schedule = Schedule {
            timezone: "Europe/Paris".to_string(),
            rules: vec![Rule::OneShot(crate::ir::OneShotRule {
                at: dt(2020, 1, 1, 0, 0),
            })],
        };
        let now = dt(2026, 3, 12, 12, 0);
        assert!(validate_schedule(&schedule, now, &EngineConfig::default(), None).is_err());
    }
}
