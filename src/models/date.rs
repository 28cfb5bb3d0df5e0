//! Calendar arithmetic on `NaiveDate`
//!
//! Month and year steps clamp the day-of-month to the end of the target month:
//! 2025-01-31 plus one month is 2025-02-28, and 2024-02-29 plus one year is
//! 2025-02-28. Every component uses this one policy.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Date helpers used by the recurrence engine and projections
pub trait CalendarDate: Sized + Copy {
    fn add_days(self, days: i64) -> Self;
    fn add_weeks(self, weeks: i64) -> Self;
    fn add_months(self, months: i64) -> Self;
    fn add_years(self, years: i64) -> Self;
    fn day_of_week(self) -> Weekday;
    fn is_same_day(self, other: Self) -> bool;
    fn is_after(self, other: Self) -> bool;
    fn is_before(self, other: Self) -> bool;
    fn is_after_or_equal(self, other: Self) -> bool;
    fn is_before_or_equal(self, other: Self) -> bool;
    /// Signed number of days from `self` to `other`
    fn diff_in_days(self, other: Self) -> i64;
    fn start_of_month(self) -> Self;
    fn end_of_month(self) -> Self;
}

impl CalendarDate for NaiveDate {
    fn add_days(self, days: i64) -> Self {
        Duration::try_days(days)
            .and_then(|d| self.checked_add_signed(d))
            .unwrap_or(if days >= 0 {
                NaiveDate::MAX
            } else {
                NaiveDate::MIN
            })
    }

    fn add_weeks(self, weeks: i64) -> Self {
        self.add_days(weeks.saturating_mul(7))
    }

    fn add_months(self, months: i64) -> Self {
        shift_months(self, months)
    }

    fn add_years(self, years: i64) -> Self {
        shift_months(self, years.saturating_mul(12))
    }

    fn day_of_week(self) -> Weekday {
        self.weekday()
    }

    fn is_same_day(self, other: Self) -> bool {
        self == other
    }

    fn is_after(self, other: Self) -> bool {
        self > other
    }

    fn is_before(self, other: Self) -> bool {
        self < other
    }

    fn is_after_or_equal(self, other: Self) -> bool {
        self >= other
    }

    fn is_before_or_equal(self, other: Self) -> bool {
        self <= other
    }

    fn diff_in_days(self, other: Self) -> i64 {
        (other - self).num_days()
    }

    fn start_of_month(self) -> Self {
        self.with_day(1).unwrap_or(self)
    }

    fn end_of_month(self) -> Self {
        let last = days_in_month(self.year(), self.month());
        self.with_day(last).unwrap_or(self)
    }
}

/// Number of days in the given month
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ if is_leap_year(year) => 29,
        _ => 28,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn shift_months(date: NaiveDate, months: i64) -> NaiveDate {
    let index = date.year() as i64 * 12 + date.month0() as i64 + months;
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;

    let saturated = if months >= 0 {
        NaiveDate::MAX
    } else {
        NaiveDate::MIN
    };
    let Ok(year) = i32::try_from(year) else {
        return saturated;
    };

    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(saturated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_add_months_clamps_to_month_end() {
        assert_eq!(d(2025, 1, 31).add_months(1), d(2025, 2, 28));
        assert_eq!(d(2024, 1, 31).add_months(1), d(2024, 2, 29));
        assert_eq!(d(2025, 1, 31).add_months(2), d(2025, 3, 31));
        assert_eq!(d(2025, 3, 31).add_months(-1), d(2025, 2, 28));
        assert_eq!(d(2025, 11, 15).add_months(3), d(2026, 2, 15));
    }

    #[test]
    fn test_add_years_leap_day() {
        assert_eq!(d(2024, 2, 29).add_years(1), d(2025, 2, 28));
        assert_eq!(d(2024, 2, 29).add_years(4), d(2028, 2, 29));
    }

    #[test]
    fn test_add_days_and_weeks() {
        assert_eq!(d(2025, 1, 6).add_weeks(2), d(2025, 1, 20));
        assert_eq!(d(2025, 2, 28).add_days(1), d(2025, 3, 1));
        assert_eq!(d(2025, 1, 1).add_days(-1), d(2024, 12, 31));
    }

    #[test]
    fn test_add_days_saturates() {
        assert_eq!(NaiveDate::MAX.add_days(10), NaiveDate::MAX);
        assert_eq!(d(2025, 1, 1).add_days(i64::MAX), NaiveDate::MAX);
    }

    #[test]
    fn test_comparisons() {
        let a = d(2025, 1, 1);
        let b = d(2025, 1, 3);
        assert!(a.is_before(b));
        assert!(b.is_after(a));
        assert!(a.is_before_or_equal(a));
        assert!(a.is_after_or_equal(a));
        assert!(a.is_same_day(d(2025, 1, 1)));
        assert_eq!(a.diff_in_days(b), 2);
        assert_eq!(b.diff_in_days(a), -2);
        assert_eq!(d(2025, 1, 6).day_of_week(), Weekday::Mon);
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(d(2025, 2, 14).start_of_month(), d(2025, 2, 1));
        assert_eq!(d(2025, 2, 14).end_of_month(), d(2025, 2, 28));
        assert_eq!(d(2024, 2, 1).end_of_month(), d(2024, 2, 29));
    }
}
