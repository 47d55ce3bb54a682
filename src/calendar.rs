//! Pure calendar arithmetic, no I/O. Thin wrappers over `chrono::NaiveDate` so the
//! rest of the crate never has to reason about leap years or month lengths directly.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Weekday index with Monday = 0, matching the IR's `byweekday` numbering.
pub fn weekday(d: NaiveDate) -> u8 {
    d.weekday().num_days_from_monday() as u8
}

pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("valid first-of-month")
        .pred_opt()
        .expect("day before first-of-month exists")
        .day()
}

/// Adds `k` months to `(year, month)`, wrapping the month and carrying the year.
/// Day clamping is the caller's responsibility.
pub fn add_months(year: i32, month: u32, k: i64) -> (i32, u32) {
    let zero_based = (year as i64) * 12 + (month as i64 - 1) + k;
    let y = zero_based.div_euclid(12);
    let m = zero_based.rem_euclid(12) + 1;
    (y as i32, m as u32)
}

/// The Monday that starts `d`'s ISO week.
pub fn week_start(d: NaiveDate) -> NaiveDate {
    d - Duration::days(weekday(d) as i64)
}

pub fn is_weekend(d: NaiveDate) -> bool {
    matches!(d.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Advances `d` (never going backwards) until it lands on a weekday.
pub fn next_business_day(mut d: NaiveDate) -> NaiveDate {
    while is_weekend(d) {
        d += Duration::days(1);
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_monday_is_zero() {
        // 2026-03-09 is a Monday.
        assert_eq!(weekday(NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()), 0);
        assert_eq!(weekday(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()), 6);
    }

    #[test]
    fn last_day_handles_february_leap_year() {
        assert_eq!(last_day_of_month(2024, 2), 29);
        assert_eq!(last_day_of_month(2023, 2), 28);
        assert_eq!(last_day_of_month(2026, 4), 30);
    }

    #[test]
    fn add_months_wraps_year() {
        assert_eq!(add_months(2026, 11, 3), (2027, 2));
        assert_eq!(add_months(2026, 1, -1), (2025, 12));
    }

    #[test]
    fn week_start_is_monday() {
        let d = NaiveDate::from_ymd_opt(2026, 3, 12).unwrap(); // Thursday
        assert_eq!(week_start(d), NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
    }

    #[test]
    fn weekend_detection_and_shift() {
        let sat = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        assert!(is_weekend(sat));
        assert_eq!(
            next_business_day(sat),
            NaiveDate::from_ymd_opt(2026, 3, 16).unwrap()
        );
    }
}
