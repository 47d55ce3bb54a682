//! The language-neutral intermediate representation. Produced by the parsers
//! (`parser::en`, `parser::fr`), consumed read-only by the occurrence engine.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ScheduleResult};

/// A set of rules sharing a time zone. The engine's result is the minimum
/// candidate across all rules; rule order has no semantic effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub timezone: String,
    pub rules: Vec<Rule>,
}

impl Schedule {
    pub fn new(timezone: impl Into<String>, rules: Vec<Rule>) -> ScheduleResult<Self> {
        if rules.is_empty() {
            return Err(ScheduleError::invalid_rule("a schedule must contain at least one rule"));
        }
        Ok(Self {
            timezone: timezone.into(),
            rules,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Rule {
    OneShot(OneShotRule),
    Recurring(RecurringRule),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneShotRule {
    pub at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Freq {
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeekendShift {
    #[default]
    None,
    NextMonday,
    NextBusinessDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> ScheduleResult<Self> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::parse(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn minutes_from_midnight(self) -> i64 {
        self.hour as i64 * 60 + self.minute as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    Minutes(u32),
    Hours(u32),
}

impl Step {
    pub fn as_minutes(self) -> i64 {
        match self {
            Step::Minutes(m) => m as i64,
            Step::Hours(h) => h as i64 * 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

impl DateWindow {
    /// `until` is coalesced into `end` as `min(end, until)`.
    pub fn effective_end(&self) -> Option<NaiveDate> {
        match (self.end, self.until) {
            (Some(e), Some(u)) => Some(e.min(u)),
            (Some(e), None) => Some(e),
            (None, Some(u)) => Some(u),
            (None, None) => None,
        }
    }

    pub fn validate(&self) -> ScheduleResult<()> {
        if let (Some(start), Some(end)) = (self.start, self.effective_end()) {
            if end < start {
                return Err(ScheduleError::invalid_rule(
                    "window end is before window start",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HolidayRule {
    pub enabled: bool,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Exceptions {
    /// 0..6, Monday = 0.
    pub weekdays: BTreeSet<u8>,
    pub dates: BTreeSet<NaiveDate>,
    pub holidays: HolidayRule,
}

impl Exceptions {
    pub fn is_empty(&self) -> bool {
        self.weekdays.is_empty() && self.dates.is_empty() && !self.holidays.enabled
    }
}

/// Everything a recurring rule might select on. Missing selectors (`None`)
/// mean "no constraint on this dimension" — the universal set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringRule {
    pub freq: Freq,
    pub interval: u32,
    pub bymonth: Option<BTreeSet<u8>>,
    /// 0..6, Monday = 0.
    pub byweekday: Option<BTreeSet<u8>>,
    /// 1..31, or -1 for "last day of month".
    pub bymonthday: Option<BTreeSet<i8>>,
    /// 1..5, or -1 for "last"; only meaningful alongside `byweekday`.
    pub bysetpos: Option<BTreeSet<i8>>,
    pub times: Vec<TimeOfDay>,
    pub between_time: Option<TimeWindow>,
    pub step: Option<Step>,
    pub window_date: Option<DateWindow>,
    pub except_: Exceptions,
    pub weekend_shift: WeekendShift,
}

impl RecurringRule {
    pub fn new(freq: Freq) -> Self {
        Self {
            freq,
            interval: 1,
            bymonth: None,
            byweekday: None,
            bymonthday: None,
            bysetpos: None,
            times: Vec::new(),
            between_time: None,
            step: None,
            window_date: None,
            except_: Exceptions::default(),
            weekend_shift: WeekendShift::None,
        }
    }

    pub fn with_interval(mut self, interval: u32) -> ScheduleResult<Self> {
        if interval == 0 {
            return Err(ScheduleError::invalid_rule("interval must be at least 1"));
        }
        self.interval = interval;
        Ok(self)
    }

    /// Validates the cross-field invariants from §3: `step` implies
    /// `between_time` and `freq = daily`; `bysetpos` is only meaningful with
    /// `byweekday`; the date window, if present, must not be inverted.
    pub fn validate(&self) -> ScheduleResult<()> {
        if self.step.is_some() {
            if self.between_time.is_none() {
                return Err(ScheduleError::invalid_rule("`step` requires `between_time`"));
            }
            if !matches!(self.freq, Freq::Daily) {
                return Err(ScheduleError::invalid_rule("`step` is only valid with a daily frequency"));
            }
        }

        if let Some(between) = self.between_time {
            if between.end.minutes_from_midnight() < between.start.minutes_from_midnight() {
                return Err(ScheduleError::invalid_rule(
                    "between_time end is before between_time start",
                ));
            }
        }

        if self.bysetpos.is_some() && self.byweekday.is_none() {
            return Err(ScheduleError::invalid_rule(
                "bysetpos requires byweekday to be set",
            ));
        }

        if let Some(positions) = &self.bysetpos {
            if positions.iter().any(|&p| p == 0) {
                return Err(ScheduleError::invalid_rule("bysetpos cannot contain 0"));
            }
        }

        if let Some(days) = &self.bymonthday {
            if days.iter().any(|&d| d == 0) {
                return Err(ScheduleError::invalid_rule("bymonthday cannot contain 0"));
            }
        }

        if let Some(window) = &self.window_date {
            window.validate()?;
        }

        Ok(())
    }

    /// `true` for monthly/yearly rules that need positional (bysetpos +
    /// byweekday) anchoring to the start of their enclosing period — see §9.
    pub fn needs_period_anchor(&self) -> bool {
        matches!(self.freq, Freq::Monthly | Freq::Yearly)
            && self.byweekday.is_some()
            && self.bysetpos.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_requires_between_time() {
        let mut rule = RecurringRule::new(Freq::Daily);
        rule.step = Some(Step::Minutes(15));
        assert!(rule.validate().is_err());
    }

    #[test]
    fn step_requires_daily_freq() {
        let mut rule = RecurringRule::new(Freq::Hourly);
        rule.between_time = Some(TimeWindow {
            start: TimeOfDay::new(9, 0).unwrap(),
            end: TimeOfDay::new(17, 0).unwrap(),
        });
        rule.step = Some(Step::Minutes(15));
        assert!(rule.validate().is_err());
    }

    #[test]
    fn date_window_rejects_inverted_range() {
        let window = DateWindow {
            start: NaiveDate::from_ymd_opt(2026, 3, 12),
            end: NaiveDate::from_ymd_opt(2026, 3, 1),
            until: None,
        };
        assert!(window.validate().is_err());
    }

    #[test]
    fn until_coalesces_into_end_as_min() {
        let window = DateWindow {
            start: None,
            end: NaiveDate::from_ymd_opt(2026, 8, 31),
            until: NaiveDate::from_ymd_opt(2026, 8, 20),
        };
        assert_eq!(window.effective_end(), NaiveDate::from_ymd_opt(2026, 8, 20));
    }

    #[test]
    fn bysetpos_without_byweekday_is_invalid() {
        let mut rule = RecurringRule::new(Freq::Monthly);
        rule.bysetpos = Some(BTreeSet::from([1]));
        assert!(rule.validate().is_err());
    }
}
