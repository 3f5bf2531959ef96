//! Cost components and terminal value.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use cavern_core::settlement::SettlementRule;
use cavern_core::types::{Date, Period};

use crate::series::{PeriodValues, ScalarOrSeries};

/// A single cash amount paid on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostComponent {
    /// Amount paid (positive is a cost).
    pub amount: f64,
    /// Payment date.
    pub date: Date,
}

/// A cost linear in volume, optionally paid on its own settlement schedule.
///
/// Without a settlement rule the cost is paid on the first day of the
/// period in which it is incurred.
#[derive(Clone)]
pub struct PerUnitCost {
    /// Cost per unit of volume.
    pub rate: ScalarOrSeries,
    /// Payment date rule.
    pub settlement: Option<Arc<dyn SettlementRule>>,
}

impl PerUnitCost {
    /// Creates a cost paid at the start of each period.
    #[must_use]
    pub fn new(rate: impl Into<ScalarOrSeries>) -> Self {
        Self {
            rate: rate.into(),
            settlement: None,
        }
    }

    /// Pays the cost according to `rule`.
    #[must_use]
    pub fn with_settlement(mut self, rule: impl SettlementRule + 'static) -> Self {
        self.settlement = Some(Arc::new(rule));
        self
    }
}

impl fmt::Debug for PerUnitCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerUnitCost")
            .field("rate", &self.rate)
            .field("settlement", &self.settlement.as_ref().map(|_| "custom"))
            .finish()
    }
}

/// A per-unit cost resolved over the storage horizon.
#[derive(Clone)]
pub(crate) struct ResolvedCost {
    pub(crate) rates: PeriodValues,
    pub(crate) settlement: Option<Arc<dyn SettlementRule>>,
}

impl ResolvedCost {
    pub(crate) fn component(&self, period: &Period, volume: f64) -> CostComponent {
        CostComponent {
            amount: self.rates.at(period) * volume,
            date: self.payment_date(period),
        }
    }

    pub(crate) fn rate(&self, period: &Period) -> f64 {
        self.rates.at(period)
    }

    pub(crate) fn payment_date(&self, period: &Period) -> Date {
        self.settlement
            .as_ref()
            .map_or_else(|| period.start_date(), |rule| rule.settlement_date(period))
    }
}

/// Value of the storage at the end of its horizon.
#[derive(Clone, Default)]
pub enum TerminalValue {
    /// Inventory must be zero at the end; the residual value is zero.
    #[default]
    MustBeEmpty,
    /// Present value as a function of `(price, inventory)` at the end period.
    Function(Arc<dyn Fn(f64, f64) -> f64 + Send + Sync>),
}

impl TerminalValue {
    /// Wraps a terminal value function.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
    {
        Self::Function(Arc::new(f))
    }

    /// Returns true for the must-be-empty rule.
    #[must_use]
    pub fn is_must_be_empty(&self) -> bool {
        matches!(self, Self::MustBeEmpty)
    }
}

impl fmt::Debug for TerminalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MustBeEmpty => write!(f, "MustBeEmpty"),
            Self::Function(_) => write!(f, "Function(..)"),
        }
    }
}
