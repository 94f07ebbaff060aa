//! Time sources for resolving "today".
//!
//! Rule due dates are compared against a calendar date, so the boundary where
//! one day becomes the next depends on the timezone the household lives in.
//! The clock is injected rather than read ambiently so tests can pin it.

use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::Error;

/// A source of the current date and time.
pub trait Clock {
    /// The current instant in UTC, used for audit timestamps.
    fn now_utc(&self) -> OffsetDateTime;

    /// The current calendar date in the clock's timezone.
    fn today(&self) -> Date;
}

/// A clock backed by the system time, adjusted to a canonical timezone.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    /// A clock whose days roll over at UTC midnight.
    pub fn utc() -> Self {
        Self {
            offset: UtcOffset::UTC,
        }
    }

    /// A clock for a canonical timezone name such as "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezone] if the name is not a canonical
    /// timezone string.
    pub fn with_timezone(canonical_timezone: &str) -> Result<Self, Error> {
        let offset = get_local_offset(canonical_timezone)
            .ok_or_else(|| Error::InvalidTimezone(canonical_timezone.to_string()))?;

        Ok(Self { offset })
    }
}

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn today(&self) -> Date {
        OffsetDateTime::now_utc().to_offset(self.offset).date()
    }
}

fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// A clock pinned to a fixed date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    /// The date reported as today.
    pub today: Date,
}

impl Clock for FixedClock {
    fn now_utc(&self) -> OffsetDateTime {
        self.today.midnight().assume_utc()
    }

    fn today(&self) -> Date {
        self.today
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::Error;

    use super::{Clock, FixedClock, SystemClock};

    #[test]
    fn fixed_clock_reports_pinned_date() {
        let clock = FixedClock {
            today: date!(2024 - 04 - 15),
        };

        assert_eq!(clock.today(), date!(2024 - 04 - 15));
        assert_eq!(clock.now_utc().date(), date!(2024 - 04 - 15));
    }

    #[test]
    fn system_clock_accepts_canonical_timezone() {
        assert!(SystemClock::with_timezone("Pacific/Auckland").is_ok());
        assert!(SystemClock::with_timezone("UTC").is_ok());
    }

    #[test]
    fn system_clock_rejects_unknown_timezone() {
        let result = SystemClock::with_timezone("Middle/Nowhere");

        assert_eq!(
            result.unwrap_err(),
            Error::InvalidTimezone("Middle/Nowhere".to_string())
        );
    }
}
