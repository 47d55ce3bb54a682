//! Normalizes English rule text into the IR. Consumes EN grammar directly;
//! the FR path rewrites its surface tokens into this same grammar and
//! delegates here (see `parser::fr`).

use std::collections::BTreeSet;

use chrono::NaiveTime;
use once_cell::sync::Lazy;
use regex::Regex;

use super::common::{
    month_index, ordinal_position, parse_date, parse_time, parse_time_list, parse_weekday_list,
    weekday_index,
};
use crate::error::{ScheduleError, ScheduleResult};
use crate::ir::{
    DateWindow, Exceptions, Freq, HolidayRule, OneShotRule, RecurringRule, Rule, Step, TimeWindow,
    WeekendShift,
};

static TIMEZONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.*?)\s+in\s+([A-Za-z_]+/[A-Za-z_]+)$").expect("tz regex"));

static WEEKEND_SHIFT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.*?)\s+if weekend then (next monday|next business day)$")
        .expect("weekend shift regex")
});
static WINDOW_BETWEEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.*?)\s+between\s+(\d{4}-\d{2}-\d{2})\s+and\s+(\d{4}-\d{2}-\d{2})$")
        .expect("window between regex")
});
static UNTIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.*?)\s+until\s+(\d{4}-\d{2}-\d{2})$").expect("until regex"));
static MID_EXCEPT_AT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.*?)\s+except\s+(.+?)\s+at\s+(.+)$").expect("mid except regex")
});
static TRAILING_EXCEPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.*?)\s+except\s+(.+)$").expect("trailing except regex"));

static ONE_SHOT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d{4}-\d{2}-\d{2})\s+at\s+(.+)$").expect("one-shot regex"));
static YEARLY_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^every year on (\d{2})-(\d{2}) at (.+)$").expect("yearly date regex")
});
static YEARLY_NTH_WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^every year on the ([a-z0-9]+) ([a-z]+) of ([a-z]+) at (.+)$",
    )
    .expect("yearly nth weekday regex")
});
static STEP_WITHIN_DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^every (day|weekday) every (\d+) (hours?|minutes?) between (.+) and (.+)$")
        .expect("step within day regex")
});
static HOURLY_FILTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^every(?: (\d+))? hours? between (.+) and (.+)$").expect("hourly filter regex")
});
static PERIODIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^every (\d+) (minutes?|hours?|days?|weeks?)(?: on (.+?))?(?: at (.+))?$")
        .expect("periodic regex")
});
static WEEKDAY_SET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^every ([^,]+(?:,\s*[^,]+)*) at (.+)$").expect("weekday set regex"));
static DAILY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^every (day|weekday) at (.+)$").expect("daily regex"));
static MONTHLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^every month on the (.+?) at (.+)$").expect("monthly regex"));
static DAY_NUMERAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d{1,2})(?:st|nd|rd|th)?$").expect("day numeral regex"));

/// Strips a trailing `in <Area/Zone>`, returning the remaining text and the
/// zone name if present.
pub fn strip_timezone(text: &str) -> (String, Option<String>) {
    let trimmed = text.trim();
    match TIMEZONE_RE.captures(trimmed) {
        Some(caps) => (caps[1].trim().to_string(), Some(caps[2].to_string())),
        None => (trimmed.to_string(), None),
    }
}

/// Splits only on `", and "` so weekday lists joined by `and` survive intact.
pub fn split_rules(text: &str) -> Vec<String> {
    text.split(", and ").map(|s| s.trim().to_string()).collect()
}

struct StrippedModifiers {
    weekend_shift: WeekendShift,
    window_date: Option<DateWindow>,
    except_: Exceptions,
}

/// Repeatedly strips trailing `if weekend then ...`, `between <date> and
/// <date>`, `until <date>`, and `except <list>[ at <time>]` clauses until the
/// text stabilizes, per the "applied repeatedly in any order" grammar rule.
fn strip_suffixes(rule_text: &str) -> ScheduleResult<(String, StrippedModifiers)> {
    let mut core = rule_text.trim().to_string();
    let mut weekend_shift = WeekendShift::None;
    let mut window_start = None;
    let mut window_end = None;
    let mut window_until = None;
    let mut except_ = Exceptions::default();

    loop {
        if let Some(caps) = WEEKEND_SHIFT_RE.captures(&core) {
            weekend_shift = match caps[2].to_ascii_lowercase().as_str() {
                "next monday" => WeekendShift::NextMonday,
                _ => WeekendShift::NextBusinessDay,
            };
            core = caps[1].trim().to_string();
            continue;
        }
        if let Some(caps) = WINDOW_BETWEEN_RE.captures(&core) {
            window_start = Some(parse_date(&caps[2])?);
            window_end = Some(parse_date(&caps[3])?);
            core = caps[1].trim().to_string();
            continue;
        }
        if let Some(caps) = UNTIL_RE.captures(&core) {
            window_until = Some(parse_date(&caps[2])?);
            core = caps[1].trim().to_string();
            continue;
        }
        if let Some(caps) = MID_EXCEPT_AT_RE.captures(&core) {
            merge_exceptions(&mut except_, &caps[2])?;
            core = format!("{} at {}", caps[1].trim(), caps[3].trim());
            continue;
        }
        if let Some(caps) = TRAILING_EXCEPT_RE.captures(&core) {
            merge_exceptions(&mut except_, &caps[2])?;
            core = caps[1].trim().to_string();
            continue;
        }
        break;
    }

    let window_date = if window_start.is_some() || window_end.is_some() || window_until.is_some() {
        Some(DateWindow {
            start: window_start,
            end: window_end,
            until: window_until,
        })
    } else {
        None
    };

    Ok((
        core,
        StrippedModifiers {
            weekend_shift,
            window_date,
            except_,
        },
    ))
}

fn merge_exceptions(except_: &mut Exceptions, list: &str) -> ScheduleResult<()> {
    let normalized = list.replace(" and ", ",");
    for token in normalized.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if token.eq_ignore_ascii_case("public holidays") {
            except_.holidays = HolidayRule {
                enabled: true,
                country: None,
            };
        } else if let Ok(date) = parse_date(token) {
            except_.dates.insert(date);
        } else if let Some(wd) = weekday_index(token) {
            except_.weekdays.insert(wd);
        } else {
            return Err(ScheduleError::parse(token));
        }
    }
    Ok(())
}

/// Parses one rule's text (after any schedule-level timezone stripping) into
/// a single `Rule`.
pub fn parse_rule_text(rule_text: &str) -> ScheduleResult<Rule> {
    let (core, modifiers) = strip_suffixes(rule_text)?;

    if let Some(caps) = ONE_SHOT_RE.captures(&core) {
        let date = parse_date(&caps[1])?;
        let time = parse_time(&caps[2])?;
        let naive_time = NaiveTime::from_hms_opt(time.hour as u32, time.minute as u32, 0)
            .ok_or_else(|| ScheduleError::parse(&core))?;
        return Ok(Rule::OneShot(OneShotRule {
            at: date.and_time(naive_time),
        }));
    }

    let mut rule = match_recurring_core(&core)?;
    rule.weekend_shift = modifiers.weekend_shift;
    rule.window_date = modifiers.window_date;
    rule.except_ = modifiers.except_;
    rule.validate()?;
    Ok(Rule::Recurring(rule))
}

fn match_recurring_core(core: &str) -> ScheduleResult<RecurringRule> {
    if let Some(caps) = YEARLY_DATE_RE.captures(core) {
        let month: u32 = caps[1].parse().map_err(|_| ScheduleError::parse(core))?;
        let day: i8 = caps[2].parse().map_err(|_| ScheduleError::parse(core))?;
        let time = parse_time(&caps[3])?;
        let mut rule = RecurringRule::new(Freq::Yearly);
        rule.bymonth = Some(BTreeSet::from([month as u8]));
        rule.bymonthday = Some(BTreeSet::from([day]));
        rule.times = vec![time];
        return Ok(rule);
    }

    if let Some(caps) = YEARLY_NTH_WEEKDAY_RE.captures(core) {
        let position = ordinal_position(&caps[1]).ok_or_else(|| ScheduleError::parse(core))?;
        let weekday = weekday_index(&caps[2]).ok_or_else(|| ScheduleError::parse(core))?;
        let month = month_index(&caps[3]).ok_or_else(|| ScheduleError::parse(core))?;
        let time = parse_time(&caps[4])?;
        let mut rule = RecurringRule::new(Freq::Yearly);
        rule.bymonth = Some(BTreeSet::from([month as u8]));
        rule.byweekday = Some(BTreeSet::from([weekday]));
        rule.bysetpos = Some(BTreeSet::from([position]));
        rule.times = vec![time];
        return Ok(rule);
    }

    if let Some(caps) = STEP_WITHIN_DAY_RE.captures(core) {
        let mut rule = RecurringRule::new(Freq::Daily);
        if caps[1].eq_ignore_ascii_case("weekday") {
            rule.byweekday = Some(BTreeSet::from([0, 1, 2, 3, 4]));
        }
        let amount: u32 = caps[2].parse().map_err(|_| ScheduleError::parse(core))?;
        rule.step = Some(if caps[3].to_ascii_lowercase().starts_with("hour") {
            Step::Hours(amount)
        } else {
            Step::Minutes(amount)
        });
        rule.between_time = Some(TimeWindow {
            start: parse_time(&caps[4])?,
            end: parse_time(&caps[5])?,
        });
        return Ok(rule);
    }

    if let Some(caps) = HOURLY_FILTER_RE.captures(core) {
        let mut rule = RecurringRule::new(Freq::Hourly);
        if let Some(n) = caps.get(1) {
            rule.interval = n.as_str().parse().map_err(|_| ScheduleError::parse(core))?;
        }
        rule.between_time = Some(TimeWindow {
            start: parse_time(&caps[2])?,
            end: parse_time(&caps[3])?,
        });
        return Ok(rule);
    }

    if let Some(caps) = PERIODIC_RE.captures(core) {
        let amount: u32 = caps[1].parse().map_err(|_| ScheduleError::parse(core))?;
        let unit = caps[2].to_ascii_lowercase();
        let freq = if unit.starts_with("minute") {
            Freq::Minutely
        } else if unit.starts_with("hour") {
            Freq::Hourly
        } else if unit.starts_with("day") {
            Freq::Daily
        } else {
            Freq::Weekly
        };
        let mut rule = RecurringRule::new(freq).with_interval(amount)?;
        if let Some(weekdays) = caps.get(3) {
            rule.byweekday = Some(parse_weekday_list(weekdays.as_str())?);
        }
        if let Some(times) = caps.get(4) {
            rule.times = parse_time_list(times.as_str())?;
        }
        return Ok(rule);
    }

    if let Some(caps) = WEEKDAY_SET_RE.captures(core) {
        if let Ok(weekdays) = parse_weekday_list(&caps[1]) {
            let mut rule = RecurringRule::new(Freq::Weekly);
            rule.byweekday = Some(weekdays);
            rule.times = parse_time_list(&caps[2])?;
            return Ok(rule);
        }
    }

    if let Some(caps) = DAILY_RE.captures(core) {
        let mut rule = RecurringRule::new(Freq::Daily);
        if caps[1].eq_ignore_ascii_case("weekday") {
            rule.byweekday = Some(BTreeSet::from([0, 1, 2, 3, 4]));
        }
        rule.times = parse_time_list(&caps[2])?;
        return Ok(rule);
    }

    if let Some(caps) = MONTHLY_RE.captures(core) {
        let (bymonthday, byweekday, bysetpos) = parse_monthly_spec(&caps[1])?;
        let time = parse_time(&caps[2])?;
        let mut rule = RecurringRule::new(Freq::Monthly);
        rule.bymonthday = bymonthday;
        rule.byweekday = byweekday;
        rule.bysetpos = bysetpos;
        rule.times = vec![time];
        return Ok(rule);
    }

    Err(ScheduleError::parse(core))
}

type MonthlySpec = (Option<BTreeSet<i8>>, Option<BTreeSet<u8>>, Option<BTreeSet<i8>>);

fn parse_monthly_spec(spec: &str) -> ScheduleResult<MonthlySpec> {
    let trimmed = spec.trim();
    if trimmed.eq_ignore_ascii_case("last day") {
        return Ok((Some(BTreeSet::from([-1])), None, None));
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    if words.len() == 2 {
        if let (Some(pos), Some(wd)) = (ordinal_position(words[0]), weekday_index(words[1])) {
            return Ok((None, Some(BTreeSet::from([wd])), Some(BTreeSet::from([pos]))));
        }
    }

    let mut days = BTreeSet::new();
    for token in trimmed.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let caps = DAY_NUMERAL_RE
            .captures(token)
            .ok_or_else(|| ScheduleError::parse(token))?;
        let day: i8 = caps[1].parse().map_err(|_| ScheduleError::parse(token))?;
        days.insert(day);
    }
    if days.is_empty() {
        return Err(ScheduleError::parse(spec));
    }
    Ok((Some(days), None, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::TimeOfDay;

    #[test]
    fn strips_trailing_timezone() {
        let (body, tz) = strip_timezone("every sunday at 10:00 in Europe/Paris");
        assert_eq!(body, "every sunday at 10:00");
        assert_eq!(tz, Some("Europe/Paris".to_string()));
    }

    #[test]
    fn splits_composition_preserving_and_within_weekday_list() {
        let parts = split_rules("monday and thursday at 9:00, and every sunday at 10:00");
        assert_eq!(parts, vec!["monday and thursday at 9:00", "every sunday at 10:00"]);
    }

    #[test]
    fn parses_reference_scenario_one() {
        let rule = parse_rule_text("every sunday at 10AM").unwrap();
        match rule {
            Rule::Recurring(r) => {
                assert_eq!(r.freq, Freq::Weekly);
                assert_eq!(r.byweekday, Some(BTreeSet::from([6])));
                assert_eq!(r.times, vec![TimeOfDay::new(10, 0).unwrap()]);
            }
            _ => panic!("expected recurring rule"),
        }
    }

    #[test]
    fn parses_reference_scenario_two_step_within_day() {
        let rule = parse_rule_text("every day every 2 hours between 09:00 and 17:00").unwrap();
        match rule {
            Rule::Recurring(r) => {
                assert_eq!(r.freq, Freq::Daily);
                assert_eq!(r.step, Some(Step::Hours(2)));
                assert_eq!(
                    r.between_time,
                    Some(TimeWindow {
                        start: TimeOfDay::new(9, 0).unwrap(),
                        end: TimeOfDay::new(17, 0).unwrap(),
                    })
                );
            }
            _ => panic!("expected recurring rule"),
        }
    }

    #[test]
    fn parses_reference_scenario_three_hourly_filter() {
        let rule = parse_rule_text("every 2 hours between 09:00 and 17:00").unwrap();
        match rule {
            Rule::Recurring(r) => {
                assert_eq!(r.freq, Freq::Hourly);
                assert_eq!(r.interval, 2);
                assert!(r.step.is_none());
            }
            _ => panic!("expected recurring rule"),
        }
    }

    #[test]
    fn parses_reference_scenario_four_monthly_first_monday_with_exception() {
        let rule = parse_rule_text("every month on the first monday at 09:00 except 2026-04-06").unwrap();
        match rule {
            Rule::Recurring(r) => {
                assert_eq!(r.freq, Freq::Monthly);
                assert_eq!(r.byweekday, Some(BTreeSet::from([0])));
                assert_eq!(r.bysetpos, Some(BTreeSet::from([1])));
                assert!(r.except_.dates.contains(&chrono::NaiveDate::from_ymd_opt(2026, 4, 6).unwrap()));
            }
            _ => panic!("expected recurring rule"),
        }
    }

    #[test]
    fn parses_reference_scenario_five_monthly_with_window_and_weekend_shift() {
        let rule = parse_rule_text(
            "every month on the 1st at 09:00 between 2026-08-01 and 2026-08-31 if weekend then next monday",
        )
        .unwrap();
        match rule {
            Rule::Recurring(r) => {
                assert_eq!(r.bymonthday, Some(BTreeSet::from([1])));
                assert_eq!(r.weekend_shift, WeekendShift::NextMonday);
                assert!(r.window_date.is_some());
            }
            _ => panic!("expected recurring rule"),
        }
    }

    #[test]
    fn parses_reference_scenario_six_yearly_nth_weekday() {
        let rule = parse_rule_text("every year on the last sunday of october at 23:00").unwrap();
        match rule {
            Rule::Recurring(r) => {
                assert_eq!(r.freq, Freq::Yearly);
                assert_eq!(r.bymonth, Some(BTreeSet::from([10])));
                assert_eq!(r.byweekday, Some(BTreeSet::from([6])));
                assert_eq!(r.bysetpos, Some(BTreeSet::from([-1])));
            }
            _ => panic!("expected recurring rule"),
        }
    }

    #[test]
    fn parses_one_shot() {
        let rule = parse_rule_text("2026-03-12 at 14:00").unwrap();
        assert!(matches!(rule, Rule::OneShot(_)));
    }

    #[test]
    fn mid_rule_exception_lifts_out_and_preserves_time_clause() {
        let rule = parse_rule_text("every day except monday at 10:00").unwrap();
        match rule {
            Rule::Recurring(r) => {
                assert_eq!(r.times, vec![TimeOfDay::new(10, 0).unwrap()]);
                assert!(r.except_.weekdays.contains(&0));
            }
            _ => panic!("expected recurring rule"),
        }
    }

    #[test]
    fn unrecognized_shape_is_a_parse_error() {
        assert!(parse_rule_text("somesuch gibberish").is_err());
    }
}
