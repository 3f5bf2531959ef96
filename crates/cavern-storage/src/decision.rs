//! Per-period cash-flow terms and the optimal decision search.
//!
//! The value of a decision `d` at inventory `v` is its discounted cash flow
//! plus the continuation value at `v * (1 - loss) + d`. The cash flow is
//! linear in `d` on each side of zero and the continuation value is
//! piecewise linear between next-period grid points, so the maximum lies at
//! an end of the feasible interval, at zero, or at a grid point of the next
//! period. Only those candidates are evaluated.

use cavern_core::discount::DiscountCurve;
use cavern_core::settlement::SettlementRule;
use cavern_core::{Date, Period};
use cavern_math::interpolation::interpolate_sorted;

use crate::constraint::InjectWithdrawConstraint;
use crate::costs::ResolvedCost;
use crate::error::{StorageError, StorageResult};
use crate::model::StorageModel;

/// Cash-flow coefficients of one period, independent of price.
#[derive(Debug, Clone)]
pub(crate) struct PeriodTerms<'a> {
    pub(crate) period: Period,
    pub(crate) constraint: &'a InjectWithdrawConstraint,
    /// Discount factor of the commodity settlement date.
    pub(crate) cmdty_df: f64,
    /// Undiscounted and discounted cost per unit injected.
    pub(crate) injection_cost: (f64, f64),
    /// Undiscounted and discounted cost per unit withdrawn.
    pub(crate) withdrawal_cost: (f64, f64),
    /// Undiscounted and discounted cost per unit of inventory held.
    pub(crate) inventory_cost: (f64, f64),
    pub(crate) consumed_on_inject: f64,
    pub(crate) consumed_on_withdraw: f64,
    pub(crate) loss_pct: f64,
}

impl<'a> PeriodTerms<'a> {
    pub(crate) fn new(
        model: &'a StorageModel,
        period: Period,
        valuation_date: Date,
        discount_curve: &dyn DiscountCurve,
        settlement: &dyn SettlementRule,
    ) -> StorageResult<Self> {
        let cmdty_df =
            discount_curve.discount_factor(valuation_date, settlement.settlement_date(&period))?;
        let per_unit = |costs: &[ResolvedCost]| -> StorageResult<(f64, f64)> {
            costs.iter().try_fold((0.0, 0.0), |(raw, pv), cost| {
                let rate = cost.rate(&period);
                let df = discount_curve.discount_factor(valuation_date, cost.payment_date(&period))?;
                Ok((raw + rate, pv + rate * df))
            })
        };
        let (consumed_on_inject, consumed_on_withdraw) = model.consumed_pcts(&period);

        Ok(Self {
            period,
            constraint: model.constraint_at(&period),
            cmdty_df,
            injection_cost: per_unit(model.injection_cost_terms())?,
            withdrawal_cost: per_unit(model.withdrawal_cost_terms())?,
            inventory_cost: per_unit(model.inventory_cost_terms())?,
            consumed_on_inject,
            consumed_on_withdraw,
            loss_pct: model.loss_pct(&period),
        })
    }

    /// Commodity consumed by decision `volume`.
    pub(crate) fn consumed(&self, volume: f64) -> f64 {
        if volume >= 0.0 {
            volume * self.consumed_on_inject
        } else {
            -volume * self.consumed_on_withdraw
        }
    }

    /// Undiscounted cash flow of `volume` at `inventory`, including the
    /// holding cost.
    pub(crate) fn cash_flow(&self, price: f64, inventory: f64, volume: f64) -> f64 {
        self.flow(price, inventory, volume, false)
    }

    /// Discounted cash flow of `volume` at `inventory`, including the
    /// holding cost.
    pub(crate) fn present_value(&self, price: f64, inventory: f64, volume: f64) -> f64 {
        self.flow(price, inventory, volume, true)
    }

    fn flow(&self, price: f64, inventory: f64, volume: f64, discounted: bool) -> f64 {
        let pick = |(raw, pv): (f64, f64)| if discounted { pv } else { raw };
        let df = if discounted { self.cmdty_df } else { 1.0 };
        let cmdty = -(volume + self.consumed(volume)) * price * df;
        let operating = if volume >= 0.0 {
            volume * pick(self.injection_cost)
        } else {
            -volume * pick(self.withdrawal_cost)
        };
        cmdty - operating - inventory * pick(self.inventory_cost)
    }
}

/// An optimal decision and the value it achieves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Decision {
    /// Volume injected (positive) or withdrawn (negative).
    pub(crate) volume: f64,
    /// Discounted cash flow plus continuation value.
    pub(crate) value: f64,
}

/// Finds the value-maximising decision at `inventory`.
///
/// `next_grid` and `next_values` describe the continuation value in the
/// next period. Candidates within `tolerance` of the best value are broken
/// toward the smallest absolute volume.
pub(crate) fn optimal_decision(
    terms: &PeriodTerms<'_>,
    price: f64,
    inventory: f64,
    next_grid: &[f64],
    next_values: &[f64],
    tolerance: f64,
) -> StorageResult<Decision> {
    let range = terms.constraint.bounds(inventory, tolerance)?;
    let retained = inventory * (1.0 - terms.loss_pct);
    let (next_lo, next_hi) = match (next_grid.first(), next_grid.last()) {
        (Some(&lo), Some(&hi)) => (lo, hi),
        _ => {
            return Err(StorageError::infeasible(
                terms.period,
                "next period has no inventory grid",
            ))
        }
    };

    let d_lo = range.min_rate.max(next_lo - retained);
    let d_hi = range.max_rate.min(next_hi - retained);
    if d_lo > d_hi + tolerance {
        return Err(StorageError::infeasible(
            terms.period,
            format!(
                "no permitted decision at inventory {inventory} reaches [{next_lo}, {next_hi}]"
            ),
        ));
    }
    let d_hi = d_hi.max(d_lo);

    let mut candidates = Vec::with_capacity(next_grid.len() + 3);
    candidates.push(d_lo);
    candidates.push(d_hi);
    if d_lo < 0.0 && d_hi > 0.0 {
        candidates.push(0.0);
    }
    candidates.extend(
        next_grid
            .iter()
            .map(|&g| g - retained)
            .filter(|&d| d > d_lo && d < d_hi),
    );

    let mut best: Option<Decision> = None;
    for volume in candidates {
        let continuation = interpolate_sorted(next_grid, next_values, retained + volume, tolerance)?;
        let value = terms.present_value(price, inventory, volume) + continuation;
        let better = match best {
            None => true,
            Some(b) => {
                value > b.value + tolerance
                    || (value >= b.value - tolerance && volume.abs() < b.volume.abs())
            }
        };
        if better {
            best = Some(Decision { volume, value });
        }
    }

    best.ok_or_else(|| StorageError::infeasible(terms.period, "no candidate decisions"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costs::PerUnitCost;
    use crate::model::{ConstraintSpec, StorageSpec};
    use approx::assert_relative_eq;
    use cavern_core::prelude::*;

    fn setup(spec: StorageSpec) -> (StorageModel, Period) {
        let start = spec.start;
        (StorageModel::new(spec).unwrap(), start)
    }

    fn spec() -> StorageSpec {
        let start = Period::day(2019, 9, 1).unwrap();
        StorageSpec::new(
            Granularity::Daily,
            start,
            start.offset(10),
            ConstraintSpec::independent(0.0, 1000.0, 100.0, 100.0),
        )
    }

    #[test]
    fn test_buys_when_continuation_pays() {
        let (model, start) = setup(spec().with_injection_cost(PerUnitCost::new(0.5)));
        let date = start.start_date();
        let terms = PeriodTerms::new(&model, start, date, &FlatRateCurve::new(0.0), &PeriodStart).unwrap();

        // Holding one more unit is worth 12 next period.
        let grid = [0.0, 1000.0];
        let values = [0.0, 12_000.0];
        let d = optimal_decision(&terms, 10.0, 500.0, &grid, &values, 1e-10).unwrap();
        assert_relative_eq!(d.volume, 100.0);
        assert_relative_eq!(d.value, 600.0 * 12.0 - 100.0 * 10.5);
    }

    #[test]
    fn test_holds_when_spread_too_small() {
        let (model, start) = setup(spec().with_injection_cost(PerUnitCost::new(0.5)));
        let date = start.start_date();
        let terms = PeriodTerms::new(&model, start, date, &FlatRateCurve::new(0.0), &PeriodStart).unwrap();

        let grid = [0.0, 1000.0];
        let values = [0.0, 10_200.0];
        let d = optimal_decision(&terms, 10.0, 500.0, &grid, &values, 1e-10).unwrap();
        assert_eq!(d.volume, 0.0);
        assert_relative_eq!(d.value, 5100.0);
    }

    #[test]
    fn test_tie_prefers_smallest_volume() {
        let (model, start) = setup(spec());
        let date = start.start_date();
        let terms = PeriodTerms::new(&model, start, date, &FlatRateCurve::new(0.0), &PeriodStart).unwrap();

        // Continuation equals the price: every decision is worth the same.
        let grid = [0.0, 1000.0];
        let values = [0.0, 10_000.0];
        let d = optimal_decision(&terms, 10.0, 500.0, &grid, &values, 1e-9).unwrap();
        assert_eq!(d.volume, 0.0);
    }

    #[test]
    fn test_forced_withdrawal() {
        let (model, start) = setup(spec());
        let date = start.start_date();
        let terms = PeriodTerms::new(&model, start, date, &FlatRateCurve::new(0.0), &PeriodStart).unwrap();

        // Next period only admits inventories in [0, 400].
        let grid = [0.0, 400.0];
        let values = [0.0, 0.0];
        let d = optimal_decision(&terms, 10.0, 500.0, &grid, &values, 1e-10).unwrap();
        assert_relative_eq!(d.volume, -100.0);

        let err = optimal_decision(&terms, 10.0, 700.0, &grid, &values, 1e-10).unwrap_err();
        assert!(matches!(err, StorageError::InfeasibleState { .. }));
    }

    #[test]
    fn test_cash_flow_terms() {
        let spec = spec()
            .with_injection_cost(PerUnitCost::new(0.015))
            .with_withdrawal_cost(PerUnitCost::new(0.02))
            .with_cmdty_consumed_on_inject(0.0001)
            .with_cmdty_consumed_on_withdraw(0.000088)
            .with_inventory_cost(PerUnitCost::new(0.002));
        let (model, start) = setup(spec);
        let date = start.start_date();
        let curve = FlatRateCurve::new(0.03);
        let settle = NextMonthOnDay::new(20);
        let terms = PeriodTerms::new(&model, start, date, &curve, &settle).unwrap();

        let df = curve
            .discount_factor(date, Date::from_ymd(2019, 10, 20).unwrap())
            .unwrap();
        assert_relative_eq!(terms.cmdty_df, df);

        let flow = terms.cash_flow(60.0, 500.0, -100.0);
        let expected = (100.0 - 100.0 * 0.000088) * 60.0 - 100.0 * 0.02 - 500.0 * 0.002;
        assert_relative_eq!(flow, expected, epsilon = 1e-10);

        let pv = terms.present_value(60.0, 500.0, 50.0);
        let expected = -(50.0 + 50.0 * 0.0001) * 60.0 * df - 50.0 * 0.015 - 500.0 * 0.002;
        assert_relative_eq!(pv, expected, epsilon = 1e-10);
    }
}
