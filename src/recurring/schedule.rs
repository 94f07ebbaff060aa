//! Schedule arithmetic for recurring rules.

use time::{Date, Duration, Month};

use crate::calendar::last_day_of_month;

use super::models::Frequency;

/// The occurrence date one period after `date`.
///
/// Monthly steps keep the day of the month where possible and clamp to the
/// last day of shorter months, so a rule anchored on the 31st lands on
/// April 30 and on February 28 or 29. Yearly steps clamp February 29 the same
/// way. Once clamped, later steps keep the clamped day; the anchor does not
/// spring back to the 31st.
///
/// The result is always strictly after `date`, which is what guarantees the
/// due-date walk in [super::resolve] terminates.
pub fn advance(date: Date, frequency: Frequency) -> Date {
    match frequency {
        Frequency::Daily => date + Duration::days(1),
        Frequency::Weekly => date + Duration::weeks(1),
        Frequency::Monthly => {
            let year = match date.month() {
                Month::December => date.year() + 1,
                _ => date.year(),
            };
            let month = date.month().next();
            let day = date.day().min(last_day_of_month(year, month));

            Date::from_calendar_date(year, month, day)
                .expect("clamped day is always valid for the target month")
        }
        Frequency::Yearly => {
            let year = date.year() + 1;
            let day = date.day().min(last_day_of_month(year, date.month()));

            Date::from_calendar_date(year, date.month(), day)
                .expect("clamped day is always valid for the target month")
        }
    }
}
