//! Delivery periods.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Date, Granularity};
use crate::error::{CoreError, CoreResult};

/// 1970-01-01, the origin of daily and intraday ordinals.
fn epoch() -> NaiveDate {
    NaiveDate::default()
}

/// A delivery period of fixed granularity.
///
/// Stored as a granularity tag plus an integer ordinal so that offsets and
/// differences are plain integer arithmetic:
///
/// | Granularity | Ordinal |
/// |-------------|---------|
/// | intraday | minutes since 1970-01-01 00:00 divided by period length |
/// | daily | days since 1970-01-01 |
/// | monthly | `year * 12 + month - 1` |
/// | quarterly | `year * 4 + quarter - 1` |
///
/// Ordering is only meaningful between periods of the same granularity.
///
/// # Example
///
/// ```rust
/// use cavern_core::types::{Granularity, Period};
///
/// let start = Period::day(2019, 8, 28).unwrap();
/// let end = Period::day(2019, 9, 25).unwrap();
/// assert_eq!(end.offset_from(&start).unwrap(), 28);
/// assert_eq!(start.offset(28), end);
/// assert_eq!(start.granularity(), Granularity::Daily);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    granularity: Granularity,
    ordinal: i64,
}

impl Period {
    /// Creates a period directly from its ordinal.
    #[must_use]
    pub fn from_ordinal(granularity: Granularity, ordinal: i64) -> Self {
        Self {
            granularity,
            ordinal,
        }
    }

    /// Returns the period of the given granularity containing `datetime`.
    #[must_use]
    pub fn containing(granularity: Granularity, datetime: NaiveDateTime) -> Self {
        let date = datetime.date();
        let ordinal = match granularity {
            Granularity::Daily => (date - epoch()).num_days(),
            Granularity::Monthly => i64::from(date.year()) * 12 + i64::from(date.month0()),
            Granularity::Quarterly => i64::from(date.year()) * 4 + i64::from(date.month0() / 3),
            intraday => {
                let minutes = intraday.minutes().unwrap_or(60);
                let seconds = (datetime - epoch().and_time(chrono::NaiveTime::MIN)).num_seconds();
                seconds.div_euclid(minutes * 60)
            }
        };
        Self::from_ordinal(granularity, ordinal)
    }

    /// Returns the period of the given granularity containing the start of `date`.
    #[must_use]
    pub fn from_date(granularity: Granularity, date: Date) -> Self {
        Self::containing(
            granularity,
            date.as_naive_date().and_time(chrono::NaiveTime::MIN),
        )
    }

    /// Creates a daily period.
    pub fn day(year: i32, month: u32, day: u32) -> CoreResult<Self> {
        Ok(Self::from_date(
            Granularity::Daily,
            Date::from_ymd(year, month, day)?,
        ))
    }

    /// Creates a monthly period.
    pub fn month(year: i32, month: u32) -> CoreResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::invalid_date(format!("month {month} of {year}")));
        }
        Ok(Self::from_ordinal(
            Granularity::Monthly,
            i64::from(year) * 12 + i64::from(month) - 1,
        ))
    }

    /// Creates a quarterly period (quarter in 1..=4).
    pub fn quarter(year: i32, quarter: u32) -> CoreResult<Self> {
        if !(1..=4).contains(&quarter) {
            return Err(CoreError::invalid_date(format!("quarter {quarter} of {year}")));
        }
        Ok(Self::from_ordinal(
            Granularity::Quarterly,
            i64::from(year) * 4 + i64::from(quarter) - 1,
        ))
    }

    /// Returns the granularity.
    #[must_use]
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Returns the ordinal.
    #[must_use]
    pub fn ordinal(&self) -> i64 {
        self.ordinal
    }

    /// Returns the first instant of the period.
    ///
    /// Saturates at the chrono limits for ordinals far outside any
    /// representable calendar.
    #[must_use]
    pub fn start(&self) -> NaiveDateTime {
        let first_day = |year: i64, month0: i64| {
            i32::try_from(year)
                .ok()
                .and_then(|y| NaiveDate::from_ymd_opt(y, month0 as u32 + 1, 1))
                .map_or(NaiveDateTime::MAX, |d| d.and_time(chrono::NaiveTime::MIN))
        };
        match self.granularity {
            Granularity::Daily => epoch()
                .checked_add_signed(Duration::days(self.ordinal))
                .map_or(NaiveDateTime::MAX, |d| d.and_time(chrono::NaiveTime::MIN)),
            Granularity::Monthly => {
                first_day(self.ordinal.div_euclid(12), self.ordinal.rem_euclid(12))
            }
            Granularity::Quarterly => {
                first_day(self.ordinal.div_euclid(4), self.ordinal.rem_euclid(4) * 3)
            }
            intraday => {
                let minutes = intraday.minutes().unwrap_or(60);
                epoch()
                    .and_time(chrono::NaiveTime::MIN)
                    .checked_add_signed(Duration::minutes(self.ordinal * minutes))
                    .unwrap_or(NaiveDateTime::MAX)
            }
        }
    }

    /// Returns the date on which the period starts.
    #[must_use]
    pub fn start_date(&self) -> Date {
        Date::from(self.start().date())
    }

    /// Returns the period `n` steps away.
    #[must_use]
    pub fn offset(&self, n: i64) -> Self {
        Self::from_ordinal(self.granularity, self.ordinal + n)
    }

    /// Returns the following period.
    #[must_use]
    pub fn next(&self) -> Self {
        self.offset(1)
    }

    /// Returns the preceding period.
    #[must_use]
    pub fn prev(&self) -> Self {
        self.offset(-1)
    }

    /// Number of periods from `other` to `self`.
    ///
    /// # Errors
    ///
    /// `CoreError::FrequencyMismatch` if the granularities differ.
    pub fn offset_from(&self, other: &Period) -> CoreResult<i64> {
        self.ensure_granularity(other.granularity)?;
        Ok(self.ordinal - other.ordinal)
    }

    /// Fails unless this period has the given granularity.
    pub fn ensure_granularity(&self, expected: Granularity) -> CoreResult<()> {
        if self.granularity == expected {
            Ok(())
        } else {
            Err(CoreError::frequency_mismatch(expected, self.granularity))
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = self.start();
        match self.granularity {
            Granularity::Daily => write!(f, "{}", start.format("%Y-%m-%d")),
            Granularity::Monthly => write!(f, "{}", start.format("%Y-%m")),
            Granularity::Quarterly => {
                write!(f, "{}-Q{}", start.year(), start.month0() / 3 + 1)
            }
            _ => write!(f, "{}", start.format("%Y-%m-%d %H:%M")),
        }
    }
}
