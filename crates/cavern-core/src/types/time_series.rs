//! Contiguous period-indexed series.

use serde::{Deserialize, Serialize};

use super::{Granularity, Period};
use crate::error::{CoreError, CoreResult};

/// Values indexed by consecutive periods.
///
/// A series starts at `start` and holds one value per period with no gaps.
/// Forward curves, volatility curves, daily interest rates and time-varying
/// storage parameters are all represented this way.
///
/// # Example
///
/// ```rust
/// use cavern_core::types::{Period, TimeSeries};
///
/// let start = Period::day(2019, 9, 1).unwrap();
/// let curve = TimeSeries::new(start, vec![58.89, 61.41, 59.89]);
/// assert_eq!(curve.get(&start.next()), Some(&61.41));
/// assert_eq!(curve.end(), Some(start.offset(2)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries<V> {
    start: Period,
    values: Vec<V>,
}

impl<V> TimeSeries<V> {
    /// Creates a series from a start period and consecutive values.
    #[must_use]
    pub fn new(start: Period, values: Vec<V>) -> Self {
        Self { start, values }
    }

    /// Builds a series over `[start, end]` from a generator.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::FrequencyMismatch` if the bounds differ in
    /// granularity.
    pub fn from_fn<F>(start: Period, end: Period, mut f: F) -> CoreResult<Self>
    where
        F: FnMut(Period) -> V,
    {
        let count = end.offset_from(&start)? + 1;
        let values = (0..count.max(0)).map(|i| f(start.offset(i))).collect();
        Ok(Self { start, values })
    }

    /// Builds a series from `(period, value)` pairs.
    ///
    /// Pairs must be in order, contiguous and share a granularity.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Period, V)>) -> CoreResult<Self> {
        let mut iter = pairs.into_iter();
        let Some((start, first)) = iter.next() else {
            return Err(CoreError::invalid_series("no values supplied"));
        };
        let mut values = vec![first];
        let mut expected = start.next();
        for (period, value) in iter {
            period.ensure_granularity(start.granularity())?;
            if period != expected {
                return Err(CoreError::invalid_series(format!(
                    "expected {expected} but found {period}"
                )));
            }
            values.push(value);
            expected = expected.next();
        }
        Ok(Self { start, values })
    }

    /// Returns the first period.
    #[must_use]
    pub fn start(&self) -> Period {
        self.start
    }

    /// Returns the last period, or `None` for an empty series.
    #[must_use]
    pub fn end(&self) -> Option<Period> {
        self.values
            .len()
            .checked_sub(1)
            .map(|last| self.start.offset(last as i64))
    }

    /// Returns the series granularity.
    #[must_use]
    pub fn granularity(&self) -> Granularity {
        self.start.granularity()
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the series holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn index_of(&self, period: &Period) -> Option<usize> {
        if period.granularity() != self.granularity() {
            return None;
        }
        usize::try_from(period.ordinal() - self.start.ordinal())
            .ok()
            .filter(|&i| i < self.values.len())
    }

    /// Returns the value for `period`, if covered.
    #[must_use]
    pub fn get(&self, period: &Period) -> Option<&V> {
        self.index_of(period).map(|i| &self.values[i])
    }

    /// Returns the value for `period`.
    ///
    /// # Errors
    ///
    /// `FrequencyMismatch` for a period of a different granularity,
    /// `PeriodOutOfRange` for a period the series does not cover.
    pub fn value(&self, period: &Period) -> CoreResult<&V> {
        period.ensure_granularity(self.granularity())?;
        self.get(period).ok_or_else(|| self.out_of_range(period))
    }

    fn out_of_range(&self, period: &Period) -> CoreError {
        match self.end() {
            Some(end) => CoreError::out_of_range(period, self.start, end),
            None => CoreError::out_of_range(period, self.start, "(empty)"),
        }
    }

    /// Returns true if every period in `[from, to]` has a value.
    #[must_use]
    pub fn covers(&self, from: &Period, to: &Period) -> bool {
        from > to || (self.get(from).is_some() && self.get(to).is_some())
    }

    /// Iterates over `(period, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Period, &V)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(i, v)| (self.start.offset(i as i64), v))
    }

    /// Returns the raw values.
    #[must_use]
    pub fn values(&self) -> &[V] {
        &self.values
    }

    /// Applies `f` to every value.
    #[must_use]
    pub fn map<U, F>(&self, f: F) -> TimeSeries<U>
    where
        F: FnMut(&V) -> U,
    {
        TimeSeries::new(self.start, self.values.iter().map(f).collect())
    }
}
