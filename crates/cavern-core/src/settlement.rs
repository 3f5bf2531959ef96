//! Settlement rules.
//!
//! A settlement rule maps a delivery period to the date on which the
//! commodity delivered in that period is paid for.

use chrono::{Datelike, NaiveDate};

use crate::types::date::days_in_month;
use crate::types::{Date, Period};

/// Maps a delivery period to its payment date.
///
/// Any `Fn(&Period) -> Date + Send + Sync` closure is a settlement rule.
///
/// ```rust
/// use cavern_core::settlement::SettlementRule;
/// use cavern_core::types::{Date, Period};
///
/// let two_days_later = |p: &Period| p.start_date().add_days(2);
/// let day = Period::day(2019, 9, 2).unwrap();
/// assert_eq!(two_days_later.settlement_date(&day), Date::from_ymd(2019, 9, 4).unwrap());
/// ```
pub trait SettlementRule: Send + Sync {
    /// Returns the payment date for `period`.
    fn settlement_date(&self, period: &Period) -> Date;
}

impl<F> SettlementRule for F
where
    F: Fn(&Period) -> Date + Send + Sync,
{
    fn settlement_date(&self, period: &Period) -> Date {
        self(period)
    }
}

/// Settles on the first day of the delivery period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodStart;

impl SettlementRule for PeriodStart {
    fn settlement_date(&self, period: &Period) -> Date {
        period.start_date()
    }
}

/// Settles on a fixed day of the month following the start of delivery.
///
/// Typical of monthly-settled gas and power: everything delivered in
/// September pays on the 20th of October. Days past the end of the month
/// roll back to the month end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextMonthOnDay {
    day: u32,
}

impl NextMonthOnDay {
    /// Creates the rule for the given day of month (clamped to 1..=31).
    #[must_use]
    pub fn new(day: u32) -> Self {
        Self {
            day: day.clamp(1, 31),
        }
    }
}

impl SettlementRule for NextMonthOnDay {
    fn settlement_date(&self, period: &Period) -> Date {
        let start = period.start().date();
        let (year, month) = if start.month() == 12 {
            (start.year() + 1, 1)
        } else {
            (start.year(), start.month() + 1)
        };
        let day = self.day.min(days_in_month(year, month));
        NaiveDate::from_ymd_opt(year, month, day).map_or(period.start_date(), Date::from)
    }
}
