//! Period granularity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a delivery period.
///
/// Every [`Period`](crate::types::Period) carries one of these tags, and
/// values from different granularities are never combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Granularity {
    /// Quarter-hour delivery
    FifteenMinute,
    /// Half-hour delivery
    ThirtyMinute,
    /// Hourly delivery
    Hourly,
    /// Daily delivery (gas day, power baseload day)
    Daily,
    /// Monthly delivery
    Monthly,
    /// Quarterly delivery
    Quarterly,
}

impl Granularity {
    /// Returns the period length in minutes for intraday granularities.
    #[must_use]
    pub fn minutes(&self) -> Option<i64> {
        match self {
            Granularity::FifteenMinute => Some(15),
            Granularity::ThirtyMinute => Some(30),
            Granularity::Hourly => Some(60),
            Granularity::Daily | Granularity::Monthly | Granularity::Quarterly => None,
        }
    }

    /// Returns the nominal period length in years.
    ///
    /// Days are counted on a 365 day year; months and quarters are taken
    /// as fractions of a year.
    #[must_use]
    pub fn year_fraction(&self) -> f64 {
        match self {
            Granularity::FifteenMinute => 1.0 / (365.0 * 96.0),
            Granularity::ThirtyMinute => 1.0 / (365.0 * 48.0),
            Granularity::Hourly => 1.0 / (365.0 * 24.0),
            Granularity::Daily => 1.0 / 365.0,
            Granularity::Monthly => 1.0 / 12.0,
            Granularity::Quarterly => 0.25,
        }
    }

    /// Returns true for sub-daily granularities.
    #[must_use]
    pub fn is_intraday(&self) -> bool {
        self.minutes().is_some()
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Granularity::FifteenMinute => "15-Minute",
            Granularity::ThirtyMinute => "30-Minute",
            Granularity::Hourly => "Hourly",
            Granularity::Daily => "Daily",
            Granularity::Monthly => "Monthly",
            Granularity::Quarterly => "Quarterly",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_minutes() {
        assert_eq!(Granularity::FifteenMinute.minutes(), Some(15));
        assert_eq!(Granularity::Hourly.minutes(), Some(60));
        assert_eq!(Granularity::Daily.minutes(), None);
        assert!(!Granularity::Quarterly.is_intraday());
    }

    #[test]
    fn test_year_fraction() {
        assert_relative_eq!(Granularity::Daily.year_fraction(), 1.0 / 365.0);
        assert_relative_eq!(
            Granularity::Hourly.year_fraction() * 24.0,
            Granularity::Daily.year_fraction(),
            epsilon = 1e-15
        );
    }
}
