//! Discount curves.
//!
//! Storage cash flows are discounted from their payment date back to the
//! valuation date. Rates are continuously compounded and looked up on the
//! cash-flow day itself, so a [`RateCurve`] is simply a daily series of
//! zero rates.

use crate::daycounts::{Act365Fixed, DayCount};
use crate::error::{CoreError, CoreResult};
use crate::types::{Date, Granularity, Period, TimeSeries};

/// Trait for discount curves.
pub trait DiscountCurve: Send + Sync {
    /// Discount factor from `cash_flow_date` back to `present`.
    ///
    /// Cash flows on or before `present` are not discounted.
    fn discount_factor(&self, present: Date, cash_flow_date: Date) -> CoreResult<f64>;
}

/// Zero rates keyed by calendar day.
///
/// DF = exp(-r(d) * τ(present, d)) with τ the ACT/365F year fraction.
#[derive(Debug, Clone)]
pub struct RateCurve {
    rates: TimeSeries<f64>,
}

impl RateCurve {
    /// Creates a curve from daily continuously-compounded rates.
    ///
    /// # Errors
    ///
    /// `FrequencyMismatch` unless the series is daily.
    pub fn new(rates: TimeSeries<f64>) -> CoreResult<Self> {
        if rates.granularity() != Granularity::Daily {
            return Err(CoreError::frequency_mismatch(
                Granularity::Daily,
                rates.granularity(),
            ));
        }
        Ok(Self { rates })
    }

    /// Returns the underlying daily rates.
    #[must_use]
    pub fn rates(&self) -> &TimeSeries<f64> {
        &self.rates
    }
}

impl DiscountCurve for RateCurve {
    fn discount_factor(&self, present: Date, cash_flow_date: Date) -> CoreResult<f64> {
        if cash_flow_date <= present {
            return Ok(1.0);
        }
        let day = Period::from_date(Granularity::Daily, cash_flow_date);
        let rate = *self.rates.value(&day)?;
        let tau = Act365Fixed.year_fraction(present, cash_flow_date);
        Ok((-rate * tau).exp())
    }
}

/// A single continuously-compounded rate for every maturity, ACT/365F.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatRateCurve {
    rate: f64,
}

impl FlatRateCurve {
    /// Creates a flat curve.
    #[must_use]
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

impl DiscountCurve for FlatRateCurve {
    fn discount_factor(&self, present: Date, cash_flow_date: Date) -> CoreResult<f64> {
        if cash_flow_date <= present {
            return Ok(1.0);
        }
        Ok((-self.rate * Act365Fixed.year_fraction(present, cash_flow_date)).exp())
    }
}
