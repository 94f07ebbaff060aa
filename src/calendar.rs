//! Calendar math shared by the schedule advancer and the monthly reports.

use time::{Date, Month};

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// The first date in the range.
    pub start: Date,
    /// The last date in the range.
    pub end: Date,
}

impl DateRange {
    /// Whether `date` falls within the range, boundaries included.
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The first and last day of a calendar month.
pub fn month_bounds(year: i32, month: Month) -> DateRange {
    let start =
        Date::from_calendar_date(year, month, 1).expect("day one is valid in every month");
    let end = Date::from_calendar_date(year, month, last_day_of_month(year, month))
        .expect("the month's last day is always a valid date");

    DateRange { start, end }
}

/// The calendar month immediately before the given one.
pub fn previous_month(year: i32, month: Month) -> (i32, Month) {
    match month {
        Month::January => (year - 1, Month::December),
        other => (year, other.previous()),
    }
}

/// The number of days in a calendar month.
pub fn last_day_of_month(year: i32, month: Month) -> u8 {
    match month {
        Month::January
        | Month::March
        | Month::May
        | Month::July
        | Month::August
        | Month::October
        | Month::December => 31,
        Month::April | Month::June | Month::September | Month::November => 30,
        Month::February => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
    }
}

/// Whether a year has a 29th of February.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

#[cfg(test)]
mod tests {
    use time::{Month, macros::date};

    use super::{is_leap_year, last_day_of_month, month_bounds, previous_month};

    #[test]
    fn leap_years_follow_century_rules() {
        assert!(is_leap_year(2024));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(2023));
        assert!(!is_leap_year(1900));
    }

    #[test]
    fn february_length_depends_on_leap_year() {
        assert_eq!(last_day_of_month(2024, Month::February), 29);
        assert_eq!(last_day_of_month(2025, Month::February), 28);
    }

    #[test]
    fn month_lengths_are_correct() {
        assert_eq!(last_day_of_month(2024, Month::January), 31);
        assert_eq!(last_day_of_month(2024, Month::April), 30);
        assert_eq!(last_day_of_month(2024, Month::December), 31);
    }

    #[test]
    fn month_bounds_cover_whole_month() {
        let range = month_bounds(2024, Month::February);

        assert_eq!(range.start, date!(2024 - 02 - 01));
        assert_eq!(range.end, date!(2024 - 02 - 29));
    }

    #[test]
    fn month_bounds_contains_is_inclusive() {
        let range = month_bounds(2024, Month::April);

        assert!(range.contains(date!(2024 - 04 - 01)));
        assert!(range.contains(date!(2024 - 04 - 30)));
        assert!(!range.contains(date!(2024 - 03 - 31)));
        assert!(!range.contains(date!(2024 - 05 - 01)));
    }

    #[test]
    fn previous_month_wraps_january_to_december() {
        assert_eq!(previous_month(2024, Month::January), (2023, Month::December));
        assert_eq!(previous_month(2024, Month::March), (2024, Month::February));
    }
}
