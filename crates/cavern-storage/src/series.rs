//! Parameters given either as a constant or as a period-indexed series.

use serde::{Deserialize, Serialize};

use cavern_core::{Period, TimeSeries};

use crate::error::{StorageError, StorageResult};

/// A storage parameter that is either constant or varies by period.
///
/// Resolved once when the model is built, so valuation code never branches
/// on the representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarOrSeries {
    /// Same value in every period.
    Constant(f64),
    /// One value per period.
    TimeVarying(TimeSeries<f64>),
}

impl Default for ScalarOrSeries {
    fn default() -> Self {
        Self::Constant(0.0)
    }
}

impl From<f64> for ScalarOrSeries {
    fn from(value: f64) -> Self {
        Self::Constant(value)
    }
}

impl From<TimeSeries<f64>> for ScalarOrSeries {
    fn from(series: TimeSeries<f64>) -> Self {
        Self::TimeVarying(series)
    }
}

impl ScalarOrSeries {
    /// Resolves the parameter over `[start, end]`.
    ///
    /// A series must cover `[start, end)`. The value at `end` is taken from
    /// the series when present and otherwise repeats the last active period.
    pub(crate) fn resolve(&self, name: &str, start: Period, end: Period) -> StorageResult<PeriodValues> {
        let count = end.offset_from(&start)?;
        let values = match self {
            Self::Constant(value) => vec![*value; count as usize + 1],
            Self::TimeVarying(series) => {
                if series.granularity() != start.granularity() {
                    return Err(StorageError::frequency_mismatch(
                        name,
                        start.granularity(),
                        series.granularity(),
                    ));
                }
                let last_active = end.prev();
                if !series.covers(&start, &last_active) {
                    return Err(StorageError::configuration(format!(
                        "{name} series does not cover {start} to {last_active}"
                    )));
                }
                let mut values: Vec<f64> = (0..count)
                    .filter_map(|i| series.get(&start.offset(i)).copied())
                    .collect();
                let at_end = series.get(&end).copied().or_else(|| values.last().copied());
                values.extend(at_end);
                values
            }
        };

        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(StorageError::configuration(format!(
                "{name} must be finite, got {bad}"
            )));
        }
        Ok(PeriodValues { start, values })
    }
}

/// Per-period values of a resolved parameter.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PeriodValues {
    start: Period,
    values: Vec<f64>,
}

impl PeriodValues {
    /// Value in `period`; callers have already range-checked the period.
    pub(crate) fn at(&self, period: &Period) -> f64 {
        let last = self.values.len().saturating_sub(1);
        let index = (period.ordinal() - self.start.ordinal()).clamp(0, last as i64) as usize;
        self.values.get(index).copied().unwrap_or_default()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (Period, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(i, &v)| (self.start.offset(i as i64), v))
    }
}
