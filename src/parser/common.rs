//! Token-level parsers shared by the EN grammar and the exception-list
//! parsing that both the EN and FR paths funnel through.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ScheduleError, ScheduleResult};
use crate::ir::TimeOfDay;

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d{1,2})(?::(\d{2}))?\s*(am|pm)?$").expect("time regex"));

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("date regex"));

/// `HH`, `HH:MM`, or `H[am|pm]` (12-hour: 12 ⇒ 0; add 12 for pm).
pub fn parse_time(raw: &str) -> ScheduleResult<TimeOfDay> {
    let trimmed = raw.trim();
    let caps = TIME_RE
        .captures(trimmed)
        .ok_or_else(|| ScheduleError::parse(trimmed))?;

    let mut hour: u32 = caps[1].parse().map_err(|_| ScheduleError::parse(trimmed))?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().map_err(|_| ScheduleError::parse(trimmed))?,
        None => 0,
    };
    if let Some(ampm) = caps.get(3) {
        match ampm.as_str().to_ascii_lowercase().as_str() {
            "am" => {
                if hour == 12 {
                    hour = 0;
                }
            }
            "pm" => {
                if hour != 12 {
                    hour += 12;
                }
            }
            _ => {}
        }
    }
    TimeOfDay::new(hour as u8, minute as u8)
}

/// A comma/`and`-separated list of times, e.g. `9:00, 14:00 and 18:00`.
pub fn parse_time_list(raw: &str) -> ScheduleResult<Vec<TimeOfDay>> {
    let normalized = raw.replace(" and ", ",");
    let mut times = Vec::new();
    for token in normalized.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        times.push(parse_time(token)?);
    }
    if times.is_empty() {
        return Err(ScheduleError::parse(raw));
    }
    times.sort();
    Ok(times)
}

pub fn parse_date(raw: &str) -> ScheduleResult<NaiveDate> {
    let trimmed = raw.trim();
    let caps = DATE_RE
        .captures(trimmed)
        .ok_or_else(|| ScheduleError::parse(trimmed))?;
    let year: i32 = caps[1].parse().map_err(|_| ScheduleError::parse(trimmed))?;
    let month: u32 = caps[2].parse().map_err(|_| ScheduleError::parse(trimmed))?;
    let day: u32 = caps[3].parse().map_err(|_| ScheduleError::parse(trimmed))?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| ScheduleError::parse(trimmed))
}

/// Monday = 0 .. Sunday = 6, or `None` if `token` isn't an English weekday name.
pub fn weekday_index(token: &str) -> Option<u8> {
    match token.trim().to_ascii_lowercase().as_str() {
        "monday" => Some(0),
        "tuesday" => Some(1),
        "wednesday" => Some(2),
        "thursday" => Some(3),
        "friday" => Some(4),
        "saturday" => Some(5),
        "sunday" => Some(6),
        _ => None,
    }
}

pub fn month_index(token: &str) -> Option<u32> {
    match token.trim().to_ascii_lowercase().as_str() {
        "january" => Some(1),
        "february" => Some(2),
        "march" => Some(3),
        "april" => Some(4),
        "may" => Some(5),
        "june" => Some(6),
        "july" => Some(7),
        "august" => Some(8),
        "september" => Some(9),
        "october" => Some(10),
        "november" => Some(11),
        "december" => Some(12),
        _ => None,
    }
}

/// `first`/`1st` .. `fifth`/`5th`, or `last`/-1.
pub fn ordinal_position(token: &str) -> Option<i8> {
    match token.trim().to_ascii_lowercase().as_str() {
        "first" | "1st" => Some(1),
        "second" | "2nd" => Some(2),
        "third" | "3rd" => Some(3),
        "fourth" | "4th" => Some(4),
        "fifth" | "5th" => Some(5),
        "last" => Some(-1),
        _ => None,
    }
}

/// Weekday words separated by `,` and/or `and`, e.g. `monday, tuesday and thursday`.
pub fn parse_weekday_list(raw: &str) -> ScheduleResult<BTreeSet<u8>> {
    let normalized = raw.replace(" and ", ",");
    let mut days = BTreeSet::new();
    for token in normalized.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        days.insert(weekday_index(token).ok_or_else(|| ScheduleError::parse(token))?);
    }
    if days.is_empty() {
        return Err(ScheduleError::parse(raw));
    }
    Ok(days)
}
