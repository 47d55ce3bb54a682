//! Drives the expander for each rule in a schedule, applies windows,
//! exclusions, weekend-shift and step-within-day expansion, and composes
//! candidates across rules by taking the minimum. Operates entirely in the
//! schedule's naive local time; the crate root resolves the IANA zone and
//! localizes the single winning candidate (see design note on DST).

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::calendar;
use crate::config::EngineConfig;
use crate::error::{ScheduleError, ScheduleResult};
use crate::expander;
use crate::ir::{
    DateWindow, Freq, OneShotRule, RecurringRule, Rule, Schedule, Step, TimeWindow, WeekendShift,
};

/// A caller-supplied source of truth for "is this date a public holiday".
/// Public-holiday data is declared out of scope for this crate (§1); this
/// trait is the seam a host plugs a real provider into.
pub trait HolidayProvider {
    fn is_holiday(&self, date: NaiveDate, country: Option<&str>) -> bool;
}

/// Returns the smallest instant strictly after `now` that satisfies any rule
/// in `schedule`, or `ScheduleError::NoOccurrence` if none does.
pub fn next_occurrence(
    schedule: &Schedule,
    now: NaiveDateTime,
    config: &EngineConfig,
    holidays: Option<&dyn HolidayProvider>,
) -> ScheduleResult<NaiveDateTime> {
    let mut best: Option<NaiveDateTime> = None;
    for rule in &schedule.rules {
        if let Some(candidate) = next_for_rule(rule, now, config, holidays)? {
            best = Some(match best {
                Some(current) => current.min(candidate),
                None => candidate,
            });
        }
    }
    best.ok_or_else(ScheduleError::no_occurrence)
}

pub(crate) fn next_for_rule(
    rule: &Rule,
    now: NaiveDateTime,
    config: &EngineConfig,
    holidays: Option<&dyn HolidayProvider>,
) -> ScheduleResult<Option<NaiveDateTime>> {
    match rule {
        Rule::OneShot(one_shot) => Ok(next_one_shot(one_shot, now)),
        Rule::Recurring(recurring) => next_recurring(recurring, now, config, holidays),
    }
}

fn next_one_shot(rule: &OneShotRule, now: NaiveDateTime) -> Option<NaiveDateTime> {
    if rule.at > now {
        Some(rule.at)
    } else {
        None
    }
}

pub(crate) fn next_recurring(
    rule: &RecurringRule,
    now: NaiveDateTime,
    config: &EngineConfig,
    holidays: Option<&dyn HolidayProvider>,
) -> ScheduleResult<Option<NaiveDateTime>> {
    rule.validate()?;

    let (w_start, w_end) = window_bounds(rule.window_date.as_ref());
    let anchor = compute_anchor(rule, now, w_start);
    let mut probe = now;

    for _ in 0..config.probe_budget {
        let mut candidate = match next_raw_candidate(rule, anchor, probe) {
            RawCandidate::Found(c) => c,
            RawCandidate::TodayExhausted => {
                let next_day = probe.date() + Duration::days(1);
                probe = next_day.and_hms_opt(0, 0, 0).expect("midnight is valid") - Duration::seconds(1);
                continue;
            }
            RawCandidate::None => return Ok(None),
        };

        candidate = apply_weekend_shift(rule.weekend_shift, candidate);

        if let Some(start) = w_start {
            if candidate < start {
                probe = start - Duration::seconds(1);
                continue;
            }
        }
        if let Some(end) = w_end {
            if candidate > end {
                return Ok(None);
            }
        }

        if is_excluded(rule, candidate, holidays)? {
            probe = candidate;
            continue;
        }

        return Ok(Some(candidate));
    }

    Ok(None)
}

enum RawCandidate {
    Found(NaiveDateTime),
    /// Only meaningful for step+between_time rules: today's stride is spent,
    /// advance the probe to the next day and retry.
    TodayExhausted,
    None,
}

fn next_raw_candidate(rule: &RecurringRule, anchor: NaiveDateTime, probe: NaiveDateTime) -> RawCandidate {
    match (rule.step, rule.between_time) {
        (Some(step), Some(between)) => match step_within_day(rule, anchor, probe, step, between) {
            Some(c) => RawCandidate::Found(c),
            None => RawCandidate::TodayExhausted,
        },
        _ => match expander::next_after(rule, anchor, probe, false) {
            Some(c) => RawCandidate::Found(c),
            None => RawCandidate::None,
        },
    }
}

/// Implements the "step-within-day vs. cross-day rollover" design note: ask
/// whether `probe`'s own calendar day qualifies under the rule's date-level
/// selectors; if so, stride within that day from `between_time.start` to
/// `between_time.end`. If the day doesn't qualify, stride within whichever
/// later day the expander finds instead (every stride position there is
/// necessarily after `probe`, so the first one always qualifies).
fn step_within_day(
    rule: &RecurringRule,
    anchor: NaiveDateTime,
    probe: NaiveDateTime,
    step: Step,
    between: TimeWindow,
) -> Option<NaiveDateTime> {
    let probe_day_start = probe
        .date()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is valid");
    let day_before = probe_day_start - Duration::seconds(1);

    let qualifying = expander::next_after(rule, anchor, day_before, true)?;
    let fire_date = qualifying.date();

    let stride_minutes = step.as_minutes().max(1);
    let start_dt = fire_date.and_hms_opt(between.start.hour as u32, between.start.minute as u32, 0)?;
    let end_dt = fire_date.and_hms_opt(between.end.hour as u32, between.end.minute as u32, 0)?;

    let mut t = start_dt;
    while t <= end_dt {
        if t > probe {
            return Some(t);
        }
        t += Duration::minutes(stride_minutes);
    }
    None
}

fn apply_weekend_shift(mode: WeekendShift, candidate: NaiveDateTime) -> NaiveDateTime {
    if !calendar::is_weekend(candidate.date()) {
        return candidate;
    }
    let shifted_date = match mode {
        WeekendShift::None => return candidate,
        WeekendShift::NextMonday => {
            let mut d = candidate.date();
            while calendar::weekday(d) != 0 {
                d += Duration::days(1);
            }
            d
        }
        WeekendShift::NextBusinessDay => calendar::next_business_day(candidate.date()),
    };
    shifted_date.and_time(candidate.time())
}

fn is_excluded(
    rule: &RecurringRule,
    candidate: NaiveDateTime,
    holidays: Option<&dyn HolidayProvider>,
) -> ScheduleResult<bool> {
    if matches!(rule.freq, Freq::Hourly) && rule.step.is_none() {
        if let Some(between) = rule.between_time {
            let minutes = candidate.time().hour() as i64 * 60 + candidate.time().minute() as i64;
            if minutes < between.start.minutes_from_midnight()
                || minutes > between.end.minutes_from_midnight()
            {
                return Ok(true);
            }
        }
    }

    let wd = calendar::weekday(candidate.date());
    if rule.except_.weekdays.contains(&wd) {
        return Ok(true);
    }
    if rule.except_.dates.contains(&candidate.date()) {
        return Ok(true);
    }
    if rule.except_.holidays.enabled {
        match holidays {
            Some(provider) => {
                if provider.is_holiday(candidate.date(), rule.except_.holidays.country.as_deref()) {
                    return Ok(true);
                }
            }
            None => return Err(ScheduleError::unsupported_feature("public_holidays")),
        }
    }
    Ok(false)
}

fn window_bounds(window: Option<&DateWindow>) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
    match window {
        None => (None, None),
        Some(w) => {
            let start = w.start.map(|d| d.and_hms_opt(0, 0, 0).expect("midnight is valid"));
            let end = w
                .effective_end()
                .map(|d| d.and_hms_opt(23, 59, 0).expect("23:59 is valid"));
            (start, end)
        }
    }
}

/// Anchors the expander at `max(w_start, now)`, truncated to the minute; for
/// monthly/yearly positional rules (`bysetpos` + `byweekday`), snaps further
/// back to the start of the enclosing period (see design note "Positional
/// anchor bug avoidance").
fn compute_anchor(rule: &RecurringRule, now: NaiveDateTime, w_start: Option<NaiveDateTime>) -> NaiveDateTime {
    let mut anchor = match w_start {
        Some(start) => start.max(now),
        None => now,
    };
    anchor = anchor
        .date()
        .and_hms_opt(anchor.time().hour(), anchor.time().minute(), 0)
        .expect("truncating seconds keeps a valid time");

    if rule.needs_period_anchor() {
        anchor = match rule.freq {
            Freq::Monthly => NaiveDate::from_ymd_opt(anchor.year(), anchor.month(), 1)
                .expect("first of month is valid")
                .and_hms_opt(0, 0, 0)
                .expect("midnight is valid"),
            Freq::Yearly => NaiveDate::from_ymd_opt(anchor.year(), 1, 1)
                .expect("Jan 1 is valid")
                .and_hms_opt(0, 0, 0)
                .expect("midnight is valid"),
            _ => anchor,
        };
    }

    anchor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Exceptions, TimeOfDay};
    use std::collections::BTreeSet;

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    fn schedule_of(rule: RecurringRule) -> Schedule {
        Schedule {
            timezone: "Europe/Paris".to_string(),
            rules: vec![Rule::Recurring(rule)],
        }
    }

    #[test]
    fn every_sunday_at_10am() {
        let mut rule = RecurringRule::new(Freq::Weekly);
        rule.byweekday = Some(BTreeSet::from([6]));
        rule.times = vec![TimeOfDay::new(10, 0).unwrap()];
        let schedule = schedule_of(rule);
        let now = dt(2026, 3, 12, 12, 0);
        let result = next_occurrence(&schedule, now, &EngineConfig::default(), None).unwrap();
        assert_eq!(result, dt(2026, 3, 15, 10, 0));
    }

    #[test]
    fn daily_stride_between_hours() {
        let mut rule = RecurringRule::new(Freq::Daily);
        rule.step = Some(Step::Hours(2));
        rule.between_time = Some(TimeWindow {
            start: TimeOfDay::new(9, 0).unwrap(),
            end: TimeOfDay::new(17, 0).unwrap(),
        });
        let schedule = schedule_of(rule);
        let now = dt(2026, 3, 12, 12, 0);
        let result = next_occurrence(&schedule, now, &EngineConfig::default(), None).unwrap();
        assert_eq!(result, dt(2026, 3, 12, 13, 0));
    }

    #[test]
    fn hourly_filter_excludes_out_of_window_candidates() {
        let mut rule = RecurringRule::new(Freq::Hourly);
        rule.interval = 3;
        rule.between_time = Some(TimeWindow {
            start: TimeOfDay::new(9, 0).unwrap(),
            end: TimeOfDay::new(17, 0).unwrap(),
        });
        let schedule = schedule_of(rule);
        // Stepping by 3h from 15:00 hits 18:00, 21:00, 00:00, 03:00, 06:00 —
        // all outside 9:00-17:00 — before landing on 09:00 the next day.
        let now = dt(2026, 3, 12, 15, 0);
        let result = next_occurrence(&schedule, now, &EngineConfig::default(), None).unwrap();
        assert_eq!(result, dt(2026, 3, 13, 9, 0));
    }

    #[test]
    fn monthly_first_monday_with_exception_skips_to_next_month() {
        let mut rule = RecurringRule::new(Freq::Monthly);
        rule.byweekday = Some(BTreeSet::from([0]));
        rule.bysetpos = Some(BTreeSet::from([1]));
        rule.times = vec![TimeOfDay::new(9, 0).unwrap()];
        rule.except_ = Exceptions {
            dates: BTreeSet::from([NaiveDate::from_ymd_opt(2026, 4, 6).unwrap()]),
            ..Default::default()
        };
        let schedule = schedule_of(rule);
        let now = dt(2026, 3, 12, 12, 0);
        let result = next_occurrence(&schedule, now, &EngineConfig::default(), None).unwrap();
        assert_eq!(result, dt(2026, 5, 4, 9, 0));
    }

    #[test]
    fn weekend_shift_to_next_monday_inside_window() {
        let mut rule = RecurringRule::new(Freq::Monthly);
        rule.bymonthday = Some(BTreeSet::from([1]));
        rule.times = vec![TimeOfDay::new(9, 0).unwrap()];
        rule.weekend_shift = WeekendShift::NextMonday;
        rule.window_date = Some(DateWindow {
            start: NaiveDate::from_ymd_opt(2026, 8, 1),
            end: NaiveDate::from_ymd_opt(2026, 8, 31),
            until: None,
        });
        let schedule = schedule_of(rule);
        let now = dt(2026, 3, 12, 12, 0);
        let result = next_occurrence(&schedule, now, &EngineConfig::default(), None).unwrap();
        assert_eq!(result, dt(2026, 8, 3, 9, 0));
    }

    #[test]
    fn yearly_last_sunday_of_october() {
        let mut rule = RecurringRule::new(Freq::Yearly);
        rule.bymonth = Some(BTreeSet::from([10]));
        rule.byweekday = Some(BTreeSet::from([6]));
        rule.bysetpos = Some(BTreeSet::from([-1]));
        rule.times = vec![TimeOfDay::new(23, 0).unwrap()];
        let schedule = schedule_of(rule);
        let now = dt(2026, 3, 12, 12, 0);
        let result = next_occurrence(&schedule, now, &EngineConfig::default(), None).unwrap();
        assert_eq!(result, dt(2026, 10, 25, 23, 0));
    }

    #[test]
    fn holiday_exclusion_without_provider_is_unsupported() {
        let mut rule = RecurringRule::new(Freq::Daily);
        rule.times = vec![TimeOfDay::new(9, 0).unwrap()];
        rule.except_.holidays.enabled = true;
        let schedule = schedule_of(rule);
        let now = dt(2026, 3, 12, 12, 0);
        let err = next_occurrence(&schedule, now, &EngineConfig::default(), None).unwrap_err();
        assert!(matches!(err, ScheduleError::UnsupportedFeature { .. }));
    }

    #[test]
    fn composition_returns_minimum_and_exceptions_stay_local() {
        let mut daily = RecurringRule::new(Freq::Daily);
        daily.times = vec![TimeOfDay::new(20, 0).unwrap()];
        daily.except_ = Exceptions {
            dates: BTreeSet::from([NaiveDate::from_ymd_opt(2026, 3, 13).unwrap()]),
            ..Default::default()
        };

        let mut weekly = RecurringRule::new(Freq::Weekly);
        weekly.byweekday = Some(BTreeSet::from([4])); // Friday
        weekly.times = vec![TimeOfDay::new(8, 0).unwrap()];

        let schedule = Schedule {
            timezone: "Europe/Paris".to_string(),
            rules: vec![Rule::Recurring(daily), Rule::Recurring(weekly)],
        };
        let now = dt(2026, 3, 12, 12, 0);
        let result = next_occurrence(&schedule, now, &EngineConfig::default(), None).unwrap();
        // The daily rule's own exception does not touch the weekly rule, and
        // the minimum across both rules wins.
        assert_eq!(result, dt(2026, 3, 12, 20, 0));
    }
}
