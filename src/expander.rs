//! Produces the smallest instant after a cursor that satisfies a single IR
//! rule's frequency/interval/by-* selectors, ignoring windows, exceptions,
//! weekend-shift, and step-within-day stride (those are the engine's job —
//! see `engine.rs` and design note "Step-within-day vs. cross-day rollover").

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::calendar;
use crate::ir::{Freq, RecurringRule, TimeOfDay};

/// Bound on how many periods (days/weeks/months/years, depending on
/// frequency) the date-based search scans before giving up. Generous enough
/// for any schedule a human would write; prevents a pathological rule (e.g.
/// `bymonth` restricted to a month that never satisfies `bymonthday=31`) from
/// looping forever.
pub const DEFAULT_MAX_PERIODS: u32 = 2000;

/// Bound on how many interval-steps a minutely/hourly rule's `byweekday`
/// filter will advance through before giving up.
const MAX_WEEKDAY_ADVANCE: u32 = 20_000;

/// Returns the smallest instant that is strictly after `after` (or `>= after`
/// when `inclusive`) and satisfies `rule`, searched from `anchor` onward.
pub fn next_after(
    rule: &RecurringRule,
    anchor: NaiveDateTime,
    after: NaiveDateTime,
    inclusive: bool,
) -> Option<NaiveDateTime> {
    next_after_bounded(rule, anchor, after, inclusive, DEFAULT_MAX_PERIODS)
}

pub fn next_after_bounded(
    rule: &RecurringRule,
    anchor: NaiveDateTime,
    after: NaiveDateTime,
    inclusive: bool,
    max_periods: u32,
) -> Option<NaiveDateTime> {
    match rule.freq {
        Freq::Minutely => step_based(rule, anchor, after, inclusive, 1),
        Freq::Hourly => step_based(rule, anchor, after, inclusive, 60),
        Freq::Daily | Freq::Weekly | Freq::Monthly | Freq::Yearly => {
            date_based(rule, anchor, after, inclusive, max_periods)
        }
    }
}

fn minimal_k(diff_minutes: i64, step_minutes: i64, inclusive: bool) -> i64 {
    if diff_minutes < 0 {
        return 0;
    }
    let k = diff_minutes / step_minutes;
    let rem = diff_minutes % step_minutes;
    if rem == 0 {
        if inclusive {
            k
        } else {
            k + 1
        }
    } else {
        k + 1
    }
}

fn step_based(
    rule: &RecurringRule,
    anchor: NaiveDateTime,
    after: NaiveDateTime,
    inclusive: bool,
    unit_minutes: i64,
) -> Option<NaiveDateTime> {
    let step = rule.interval as i64 * unit_minutes;
    if step <= 0 {
        return None;
    }
    let diff = after.signed_duration_since(anchor).num_minutes();
    let mut k = minimal_k(diff, step, inclusive);
    let mut candidate = anchor + Duration::minutes(k * step);

    if let Some(weekdays) = &rule.byweekday {
        let mut advanced = 0u32;
        while !weekdays.contains(&calendar::weekday(candidate.date())) {
            k += 1;
            candidate = anchor + Duration::minutes(k * step);
            advanced += 1;
            if advanced > MAX_WEEKDAY_ADVANCE {
                return None;
            }
        }
    }

    Some(candidate)
}

fn date_based(
    rule: &RecurringRule,
    anchor: NaiveDateTime,
    after: NaiveDateTime,
    inclusive: bool,
    max_periods: u32,
) -> Option<NaiveDateTime> {
    let anchor_date = anchor.date();
    let times = effective_times(rule, anchor);

    match rule.freq {
        Freq::Daily => {
            for k in 0..max_periods {
                let date = anchor_date + Duration::days(rule.interval as i64 * k as i64);
                if !month_allowed(rule, date) {
                    continue;
                }
                if let Some(weekdays) = &rule.byweekday {
                    if !weekdays.contains(&calendar::weekday(date)) {
                        continue;
                    }
                }
                if let Some(dt) = first_time_after(date, &times, after, inclusive) {
                    return Some(dt);
                }
            }
            None
        }
        Freq::Weekly => {
            let week0 = calendar::week_start(anchor_date);
            let weekdays: Vec<u8> = rule
                .byweekday
                .clone()
                .unwrap_or_else(|| BTreeSet::from([calendar::weekday(anchor_date)]))
                .into_iter()
                .collect();
            for k in 0..max_periods {
                let week_start = week0 + Duration::days(7 * rule.interval as i64 * k as i64);
                let mut dates: Vec<NaiveDate> = weekdays
                    .iter()
                    .map(|&wd| week_start + Duration::days(wd as i64))
                    .collect();
                dates.sort();
                for date in dates {
                    if date < anchor_date || !month_allowed(rule, date) {
                        continue;
                    }
                    if let Some(dt) = first_time_after(date, &times, after, inclusive) {
                        return Some(dt);
                    }
                }
            }
            None
        }
        Freq::Monthly => {
            for k in 0..max_periods {
                let (y, m) = calendar::add_months(
                    anchor_date.year(),
                    anchor_date.month(),
                    rule.interval as i64 * k as i64,
                );
                if let Some(bymonth) = &rule.bymonth {
                    if !bymonth.contains(&(m as u8)) {
                        continue;
                    }
                }
                let mut dates = month_candidate_dates(rule, anchor_date, y, m);
                dates.sort();
                for date in dates {
                    if date < anchor_date {
                        continue;
                    }
                    if let Some(dt) = first_time_after(date, &times, after, inclusive) {
                        return Some(dt);
                    }
                }
            }
            None
        }
        Freq::Yearly => {
            for k in 0..max_periods {
                let year = anchor_date.year() + rule.interval as i32 * k as i32;
                let months: Vec<u32> = match &rule.bymonth {
                    Some(months) => months.iter().map(|&m| m as u32).collect(),
                    None => vec![anchor_date.month()],
                };
                let mut all_dates = Vec::new();
                for m in months {
                    all_dates.extend(month_candidate_dates(rule, anchor_date, year, m));
                }
                all_dates.sort();
                for date in all_dates {
                    if date < anchor_date {
                        continue;
                    }
                    if let Some(dt) = first_time_after(date, &times, after, inclusive) {
                        return Some(dt);
                    }
                }
            }
            None
        }
        Freq::Minutely | Freq::Hourly => unreachable!("handled by step_based"),
    }
}

fn month_allowed(rule: &RecurringRule, date: NaiveDate) -> bool {
    match &rule.bymonth {
        Some(months) => months.contains(&(date.month() as u8)),
        None => true,
    }
}

/// One month's worth of candidate dates, honoring `bysetpos`+`byweekday`,
/// else `bymonthday`, else the anchor's day-of-month (never clamped: if the
/// anchor's day doesn't exist in this month, it contributes no candidate).
fn month_candidate_dates(
    rule: &RecurringRule,
    anchor_date: NaiveDate,
    year: i32,
    month: u32,
) -> Vec<NaiveDate> {
    if let (Some(positions), Some(weekdays)) = (&rule.bysetpos, &rule.byweekday) {
        let last = calendar::last_day_of_month(year, month);
        let matches: Vec<NaiveDate> = (1..=last)
            .filter_map(|d| NaiveDate::from_ymd_opt(year, month, d))
            .filter(|date| weekdays.contains(&calendar::weekday(*date)))
            .collect();
        positions
            .iter()
            .filter_map(|&pos| select_by_position(&matches, pos))
            .collect()
    } else if let Some(days) = &rule.bymonthday {
        let last = calendar::last_day_of_month(year, month);
        days.iter()
            .filter_map(|&d| {
                let day = if d == -1 {
                    last
                } else if d > 0 {
                    d as u32
                } else {
                    return None;
                };
                NaiveDate::from_ymd_opt(year, month, day)
            })
            .collect()
    } else {
        NaiveDate::from_ymd_opt(year, month, anchor_date.day())
            .into_iter()
            .collect()
    }
}

fn select_by_position(items: &[NaiveDate], pos: i8) -> Option<NaiveDate> {
    if pos == 0 {
        return None;
    }
    if pos > 0 {
        items.get((pos - 1) as usize).copied()
    } else {
        let idx = items.len().checked_sub((-pos) as usize)?;
        items.get(idx).copied()
    }
}

/// The ordered set of times-of-day a qualifying calendar day fires at:
/// `rule.times` if non-empty (sorted), else the anchor's own time-of-day.
fn effective_times(rule: &RecurringRule, anchor: NaiveDateTime) -> Vec<TimeOfDay> {
    if rule.times.is_empty() {
        vec![TimeOfDay {
            hour: anchor.time().hour() as u8,
            minute: anchor.time().minute() as u8,
        }]
    } else {
        let mut times = rule.times.clone();
        times.sort();
        times
    }
}

fn first_time_after(
    date: NaiveDate,
    times: &[TimeOfDay],
    after: NaiveDateTime,
    inclusive: bool,
) -> Option<NaiveDateTime> {
    for t in times {
        let dt = date.and_hms_opt(t.hour as u32, t.minute as u32, 0)?;
        if dt > after || (inclusive && dt == after) {
            return Some(dt);
        }
    }
    None
}
