//! Turns rule text (English or French, single clause or comma-joined
//! composition) into the IR. `en` holds the EN grammar, `fr` rewrites French
//! surface forms into it, `dispatch` picks between them per clause, and
//! `common` holds token parsers both grammars share.

pub mod common;
pub mod dispatch;
pub mod en;
pub mod fr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ScheduleResult;
use crate::ir::{Rule, Schedule};

static PAREN_TIMEZONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.*?)\s*\(([A-Za-z_]+/[A-Za-z_]+)\)$").expect("paren tz regex"));

const DEFAULT_TIMEZONE: &str = "Europe/Paris";

/// Strips a schedule-level timezone, in either the EN `in <Area/Zone>` form
/// or the French-originated parenthesized `(<Area/Zone>)` form left behind
/// once `fr::transliterate` has run on a clause that carried one.
fn strip_schedule_timezone(text: &str) -> (String, Option<String>) {
    let trimmed = text.trim();
    if let Some(caps) = PAREN_TIMEZONE_RE.captures(trimmed) {
        return (caps[1].trim().to_string(), Some(caps[2].to_string()));
    }
    en::strip_timezone(trimmed)
}

/// Parses a full schedule: an optional trailing timezone, followed by one or
/// more `", and"`-joined rule clauses, each independently language-detected.
pub fn parse_schedule(text: &str, default_tz: Option<&str>) -> ScheduleResult<Schedule> {
    let (body, explicit_tz) = strip_schedule_timezone(text);
    let rules = en::split_rules(&body)
        .iter()
        .map(|clause| dispatch::parse_rule_clause(clause))
        .collect::<ScheduleResult<Vec<Rule>>>()?;

    let timezone = explicit_tz
        .or_else(|| default_tz.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
    Schedule::new(timezone, rules)
}

/// Parses a single rule clause, ignoring (and discarding) any trailing
/// schedule-level timezone.
pub fn parse_rule(text: &str) -> ScheduleResult<Rule> {
    let (body, _tz) = strip_schedule_timezone(text);
    dispatch::parse_rule_clause(&body)
}
