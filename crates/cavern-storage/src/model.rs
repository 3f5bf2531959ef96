//! The storage model: physical limits and economics of a storage facility.
//!
//! A [`StorageSpec`] collects the user-supplied parameters. [`StorageModel::new`]
//! validates it in one pass and resolves every scalar-or-series parameter
//! into a per-period lookup, after which the model is immutable and all
//! queries are pure functions of `(period, inventory[, volume])`.

use std::sync::Arc;

use tracing::debug;

use cavern_core::{Granularity, Period};
use cavern_math::grid::linspace;

use crate::constraint::{
    InjectWithdrawConstraint, InjectWithdrawRange, InventoryPillar, PillarInterpolation,
};
use crate::costs::{CostComponent, PerUnitCost, ResolvedCost, TerminalValue};
use crate::error::{StorageError, StorageResult};
use crate::series::{PeriodValues, ScalarOrSeries};

/// Tolerance applied to inventory range checks on direct model queries.
const QUERY_TOLERANCE: f64 = 1e-10;

/// One row of a pillar table, in force from `period` until the next row.
#[derive(Debug, Clone, PartialEq)]
pub struct PillarRow {
    /// First period the row applies to.
    pub period: Period,
    /// Rate bounds at declared inventories.
    pub pillars: Vec<InventoryPillar>,
}

impl PillarRow {
    /// Creates a row.
    #[must_use]
    pub fn new(period: Period, pillars: Vec<InventoryPillar>) -> Self {
        Self { period, pillars }
    }
}

/// The two mutually exclusive ways of declaring operational constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintSpec {
    /// Rate bounds interpolated between inventory pillars, by period.
    PillarTable {
        /// Rows sorted by period; the first must be at or before the start.
        rows: Vec<PillarRow>,
        /// Interpolation between pillars.
        interpolation: PillarInterpolation,
    },
    /// Inventory bounds and maximum rates independent of inventory.
    IndependentBounds {
        /// Lowest permitted inventory.
        min_inventory: ScalarOrSeries,
        /// Highest permitted inventory.
        max_inventory: ScalarOrSeries,
        /// Largest injection per period (non-negative).
        max_injection_rate: ScalarOrSeries,
        /// Largest withdrawal per period (non-negative).
        max_withdrawal_rate: ScalarOrSeries,
    },
}

impl ConstraintSpec {
    /// Piecewise-linear pillar table.
    #[must_use]
    pub fn pillar_table(rows: Vec<PillarRow>) -> Self {
        Self::PillarTable {
            rows,
            interpolation: PillarInterpolation::PiecewiseLinear,
        }
    }

    /// Independent constant or time-varying bounds.
    #[must_use]
    pub fn independent(
        min_inventory: impl Into<ScalarOrSeries>,
        max_inventory: impl Into<ScalarOrSeries>,
        max_injection_rate: impl Into<ScalarOrSeries>,
        max_withdrawal_rate: impl Into<ScalarOrSeries>,
    ) -> Self {
        Self::IndependentBounds {
            min_inventory: min_inventory.into(),
            max_inventory: max_inventory.into(),
            max_injection_rate: max_injection_rate.into(),
            max_withdrawal_rate: max_withdrawal_rate.into(),
        }
    }
}

/// User-supplied description of a storage facility.
///
/// # Example
///
/// ```rust
/// use cavern_core::{Granularity, Period};
/// use cavern_storage::prelude::*;
///
/// let start = Period::day(2019, 9, 1).unwrap();
/// let end = Period::day(2019, 10, 1).unwrap();
/// let spec = StorageSpec::new(
///     Granularity::Daily,
///     start,
///     end,
///     ConstraintSpec::independent(0.0, 1000.0, 50.0, 100.0),
/// )
/// .with_injection_cost(PerUnitCost::new(0.01))
/// .with_inventory_loss(0.001);
///
/// let model = StorageModel::new(spec).unwrap();
/// assert_eq!(model.max_inventory(&start).unwrap(), 1000.0);
/// ```
#[derive(Debug, Clone)]
pub struct StorageSpec {
    /// Granularity of every period-indexed input.
    pub granularity: Granularity,
    /// First active period.
    pub start: Period,
    /// End of the horizon (exclusive); the terminal condition applies here.
    pub end: Period,
    /// Operational constraints.
    pub constraints: ConstraintSpec,
    /// Costs per unit injected.
    pub injection_costs: Vec<PerUnitCost>,
    /// Costs per unit withdrawn.
    pub withdrawal_costs: Vec<PerUnitCost>,
    /// Fraction of injected volume consumed.
    pub cmdty_consumed_on_inject: ScalarOrSeries,
    /// Fraction of withdrawn volume consumed.
    pub cmdty_consumed_on_withdraw: ScalarOrSeries,
    /// Fraction of held inventory lost each period.
    pub inventory_loss: ScalarOrSeries,
    /// Costs per unit of inventory held at the start of a period.
    pub inventory_costs: Vec<PerUnitCost>,
    /// Terminal condition.
    pub terminal: TerminalValue,
}

impl StorageSpec {
    /// Creates a spec with no costs, consumption or loss, which must be
    /// empty at the end.
    #[must_use]
    pub fn new(granularity: Granularity, start: Period, end: Period, constraints: ConstraintSpec) -> Self {
        Self {
            granularity,
            start,
            end,
            constraints,
            injection_costs: Vec::new(),
            withdrawal_costs: Vec::new(),
            cmdty_consumed_on_inject: ScalarOrSeries::default(),
            cmdty_consumed_on_withdraw: ScalarOrSeries::default(),
            inventory_loss: ScalarOrSeries::default(),
            inventory_costs: Vec::new(),
            terminal: TerminalValue::MustBeEmpty,
        }
    }

    /// Adds a cost per unit injected.
    #[must_use]
    pub fn with_injection_cost(mut self, cost: PerUnitCost) -> Self {
        self.injection_costs.push(cost);
        self
    }

    /// Adds a cost per unit withdrawn.
    #[must_use]
    pub fn with_withdrawal_cost(mut self, cost: PerUnitCost) -> Self {
        self.withdrawal_costs.push(cost);
        self
    }

    /// Sets the fraction of injected volume consumed.
    #[must_use]
    pub fn with_cmdty_consumed_on_inject(mut self, pct: impl Into<ScalarOrSeries>) -> Self {
        self.cmdty_consumed_on_inject = pct.into();
        self
    }

    /// Sets the fraction of withdrawn volume consumed.
    #[must_use]
    pub fn with_cmdty_consumed_on_withdraw(mut self, pct: impl Into<ScalarOrSeries>) -> Self {
        self.cmdty_consumed_on_withdraw = pct.into();
        self
    }

    /// Sets the fraction of inventory lost per period.
    #[must_use]
    pub fn with_inventory_loss(mut self, pct: impl Into<ScalarOrSeries>) -> Self {
        self.inventory_loss = pct.into();
        self
    }

    /// Adds a cost per unit of inventory held.
    #[must_use]
    pub fn with_inventory_cost(mut self, cost: PerUnitCost) -> Self {
        self.inventory_costs.push(cost);
        self
    }

    /// Sets the terminal condition.
    #[must_use]
    pub fn with_terminal_value(mut self, terminal: TerminalValue) -> Self {
        self.terminal = terminal;
        self
    }
}

/// A validated, immutable storage facility.
#[derive(Clone)]
pub struct StorageModel {
    granularity: Granularity,
    start: Period,
    end: Period,
    // One entry per period in [start, end].
    constraints: Vec<Arc<InjectWithdrawConstraint>>,
    injection_costs: Vec<ResolvedCost>,
    withdrawal_costs: Vec<ResolvedCost>,
    consumed_on_inject: PeriodValues,
    consumed_on_withdraw: PeriodValues,
    inventory_loss: PeriodValues,
    inventory_costs: Vec<ResolvedCost>,
    terminal: TerminalValue,
}

impl std::fmt::Debug for StorageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageModel")
            .field("granularity", &self.granularity)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("terminal", &self.terminal)
            .finish_non_exhaustive()
    }
}

impl StorageModel {
    /// Validates `spec` and resolves it into a model.
    ///
    /// # Errors
    ///
    /// `FrequencyMismatch` if a period or series has another granularity,
    /// `Configuration` for any missing or invalid parameter.
    pub fn new(spec: StorageSpec) -> StorageResult<Self> {
        let StorageSpec {
            granularity,
            start,
            end,
            constraints,
            injection_costs,
            withdrawal_costs,
            cmdty_consumed_on_inject,
            cmdty_consumed_on_withdraw,
            inventory_loss,
            inventory_costs,
            terminal,
        } = spec;

        for (name, period) in [("storage start", start), ("storage end", end)] {
            if period.granularity() != granularity {
                return Err(StorageError::frequency_mismatch(
                    name,
                    granularity,
                    period.granularity(),
                ));
            }
        }
        if start >= end {
            return Err(StorageError::configuration(format!(
                "storage start {start} must be before end {end}"
            )));
        }

        let constraints = resolve_constraints(&constraints, start, end)?;

        let consumed_on_inject =
            resolve_fraction(&cmdty_consumed_on_inject, "cmdty consumed on inject", start, end)?;
        let consumed_on_withdraw = resolve_fraction(
            &cmdty_consumed_on_withdraw,
            "cmdty consumed on withdraw",
            start,
            end,
        )?;
        let inventory_loss = resolve_fraction(&inventory_loss, "inventory loss", start, end)?;

        let model = Self {
            granularity,
            start,
            end,
            constraints,
            injection_costs: resolve_costs(&injection_costs, "injection cost", start, end)?,
            withdrawal_costs: resolve_costs(&withdrawal_costs, "withdrawal cost", start, end)?,
            consumed_on_inject,
            consumed_on_withdraw,
            inventory_loss,
            inventory_costs: resolve_costs(&inventory_costs, "inventory cost", start, end)?,
            terminal,
        };

        if model.terminal.is_must_be_empty() {
            let min_at_end = model.constraint_at(&end).min_inventory();
            if min_at_end > QUERY_TOLERANCE {
                return Err(StorageError::infeasible(
                    end,
                    format!("storage must be empty at end but min inventory is {min_at_end}"),
                ));
            }
        }

        debug!(
            granularity = %granularity,
            start = %start,
            end = %end,
            periods = model.num_periods(),
            "storage model built"
        );
        Ok(model)
    }

    /// Granularity of the model's periods.
    #[must_use]
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// First active period.
    #[must_use]
    pub fn start(&self) -> Period {
        self.start
    }

    /// End of the horizon (exclusive).
    #[must_use]
    pub fn end(&self) -> Period {
        self.end
    }

    /// Number of active periods.
    #[must_use]
    pub fn num_periods(&self) -> usize {
        (self.end.ordinal() - self.start.ordinal()) as usize
    }

    /// Returns true if inventory must be zero at the end.
    #[must_use]
    pub fn must_be_empty_at_end(&self) -> bool {
        self.terminal.is_must_be_empty()
    }

    /// Rate bounds at `(period, inventory)`.
    ///
    /// # Errors
    ///
    /// `OutOfRange` outside `[start, end)` or outside the inventory bounds.
    pub fn inject_withdraw_bounds(
        &self,
        period: &Period,
        inventory: f64,
    ) -> StorageResult<InjectWithdrawRange> {
        self.check_active(period)?;
        self.constraint_at(period).bounds(inventory, QUERY_TOLERANCE)
    }

    /// Lowest permitted inventory at `period`, which may be the end period.
    pub fn min_inventory(&self, period: &Period) -> StorageResult<f64> {
        self.check_horizon(period)?;
        Ok(self.constraint_at(period).min_inventory())
    }

    /// Highest permitted inventory at `period`, which may be the end period.
    pub fn max_inventory(&self, period: &Period) -> StorageResult<f64> {
        self.check_horizon(period)?;
        Ok(self.constraint_at(period).max_inventory())
    }

    /// Cost components of injecting `injected_volume` (non-negative).
    pub fn injection_cost(
        &self,
        period: &Period,
        inventory: f64,
        injected_volume: f64,
    ) -> StorageResult<Vec<CostComponent>> {
        self.check_state(period, inventory)?;
        Ok(self
            .injection_costs
            .iter()
            .map(|c| c.component(period, injected_volume))
            .collect())
    }

    /// Cost components of withdrawing `withdrawn_volume` (non-negative).
    pub fn withdrawal_cost(
        &self,
        period: &Period,
        inventory: f64,
        withdrawn_volume: f64,
    ) -> StorageResult<Vec<CostComponent>> {
        self.check_state(period, inventory)?;
        Ok(self
            .withdrawal_costs
            .iter()
            .map(|c| c.component(period, withdrawn_volume))
            .collect())
    }

    /// Volume of commodity consumed when injecting `volume`.
    pub fn cmdty_consumed_on_inject(
        &self,
        period: &Period,
        inventory: f64,
        volume: f64,
    ) -> StorageResult<f64> {
        self.check_state(period, inventory)?;
        Ok(self.consumed_on_inject.at(period) * volume)
    }

    /// Volume of commodity consumed when withdrawing `volume`.
    pub fn cmdty_consumed_on_withdraw(
        &self,
        period: &Period,
        inventory: f64,
        volume: f64,
    ) -> StorageResult<f64> {
        self.check_state(period, inventory)?;
        Ok(self.consumed_on_withdraw.at(period) * volume)
    }

    /// Fraction of inventory lost over `period`.
    pub fn inventory_loss_pct(&self, period: &Period) -> StorageResult<f64> {
        self.check_active(period)?;
        Ok(self.inventory_loss.at(period))
    }

    /// Cost components of holding `inventory` during `period`.
    pub fn inventory_cost(&self, period: &Period, inventory: f64) -> StorageResult<Vec<CostComponent>> {
        self.check_state(period, inventory)?;
        Ok(self
            .inventory_costs
            .iter()
            .map(|c| c.component(period, inventory))
            .collect())
    }

    /// Value of holding `inventory` at the end when the price is `price`.
    ///
    /// # Errors
    ///
    /// `InfeasibleState` if the storage must be empty and `|inventory|`
    /// exceeds `tolerance`.
    pub fn terminal_value(&self, price: f64, inventory: f64, tolerance: f64) -> StorageResult<f64> {
        match &self.terminal {
            TerminalValue::MustBeEmpty => {
                if inventory.abs() > tolerance {
                    Err(StorageError::infeasible(
                        self.end,
                        format!("storage must be empty at end, inventory is {inventory}"),
                    ))
                } else {
                    Ok(0.0)
                }
            }
            TerminalValue::Function(f) => Ok(f(price, inventory)),
        }
    }

    /// `num_points` evenly spaced inventories over `[min_inventory, max_inventory]`.
    pub fn build_grid(&self, period: &Period, num_points: usize) -> StorageResult<Vec<f64>> {
        self.check_horizon(period)?;
        if num_points == 0 {
            return Err(StorageError::configuration("grid needs at least one point"));
        }
        let constraint = self.constraint_at(period);
        Ok(linspace(
            constraint.min_inventory(),
            constraint.max_inventory(),
            num_points,
        )?)
    }

    pub(crate) fn constraint_at(&self, period: &Period) -> &InjectWithdrawConstraint {
        let last = self.constraints.len() - 1;
        let index = (period.ordinal() - self.start.ordinal()).clamp(0, last as i64) as usize;
        &self.constraints[index]
    }

    pub(crate) fn consumed_pcts(&self, period: &Period) -> (f64, f64) {
        (
            self.consumed_on_inject.at(period),
            self.consumed_on_withdraw.at(period),
        )
    }

    pub(crate) fn loss_pct(&self, period: &Period) -> f64 {
        self.inventory_loss.at(period)
    }

    pub(crate) fn injection_cost_terms(&self) -> &[ResolvedCost] {
        &self.injection_costs
    }

    pub(crate) fn withdrawal_cost_terms(&self) -> &[ResolvedCost] {
        &self.withdrawal_costs
    }

    pub(crate) fn inventory_cost_terms(&self) -> &[ResolvedCost] {
        &self.inventory_costs
    }

    fn check_granularity(&self, period: &Period) -> StorageResult<()> {
        if period.granularity() == self.granularity {
            Ok(())
        } else {
            Err(StorageError::frequency_mismatch(
                "storage query",
                self.granularity,
                period.granularity(),
            ))
        }
    }

    fn check_active(&self, period: &Period) -> StorageResult<()> {
        self.check_granularity(period)?;
        if *period < self.start || *period >= self.end {
            return Err(StorageError::out_of_range(format!(
                "period {period} outside active horizon {} to {}",
                self.start,
                self.end.prev()
            )));
        }
        Ok(())
    }

    fn check_horizon(&self, period: &Period) -> StorageResult<()> {
        self.check_granularity(period)?;
        if *period < self.start || *period > self.end {
            return Err(StorageError::out_of_range(format!(
                "period {period} outside storage horizon {} to {}",
                self.start, self.end
            )));
        }
        Ok(())
    }

    fn check_state(&self, period: &Period, inventory: f64) -> StorageResult<()> {
        self.check_active(period)?;
        let constraint = self.constraint_at(period);
        let (lo, hi) = (constraint.min_inventory(), constraint.max_inventory());
        if inventory < lo - QUERY_TOLERANCE || inventory > hi + QUERY_TOLERANCE || inventory.is_nan() {
            return Err(StorageError::out_of_range(format!(
                "inventory {inventory} outside [{lo}, {hi}] in period {period}"
            )));
        }
        Ok(())
    }
}

fn resolve_constraints(
    spec: &ConstraintSpec,
    start: Period,
    end: Period,
) -> StorageResult<Vec<Arc<InjectWithdrawConstraint>>> {
    let count = (end.ordinal() - start.ordinal()) as usize + 1;
    match spec {
        ConstraintSpec::PillarTable {
            rows,
            interpolation,
        } => {
            let Some(first) = rows.first() else {
                return Err(StorageError::configuration("pillar table has no rows"));
            };
            for row in rows {
                if row.period.granularity() != start.granularity() {
                    return Err(StorageError::frequency_mismatch(
                        "pillar table",
                        start.granularity(),
                        row.period.granularity(),
                    ));
                }
            }
            if first.period > start {
                return Err(StorageError::configuration(format!(
                    "first pillar row {} is after storage start {start}",
                    first.period
                )));
            }
            if rows.windows(2).any(|w| w[1].period <= w[0].period) {
                return Err(StorageError::configuration(
                    "pillar rows must be strictly increasing by period",
                ));
            }

            let resolved = rows
                .iter()
                .map(|row| {
                    InjectWithdrawConstraint::from_pillars(&row.pillars, *interpolation)
                        .map(Arc::new)
                        .map_err(|err| {
                            StorageError::configuration(format!("pillar row {}: {err}", row.period))
                        })
                })
                .collect::<StorageResult<Vec<_>>>()?;

            let mut row = 0;
            Ok((0..count)
                .map(|i| {
                    let period = start.offset(i as i64);
                    while row + 1 < rows.len() && rows[row + 1].period <= period {
                        row += 1;
                    }
                    Arc::clone(&resolved[row])
                })
                .collect())
        }
        ConstraintSpec::IndependentBounds {
            min_inventory,
            max_inventory,
            max_injection_rate,
            max_withdrawal_rate,
        } => {
            let min_inv = min_inventory.resolve("min inventory", start, end)?;
            let max_inv = max_inventory.resolve("max inventory", start, end)?;
            let injection = max_injection_rate.resolve("max injection rate", start, end)?;
            let withdrawal = max_withdrawal_rate.resolve("max withdrawal rate", start, end)?;

            min_inv
                .iter()
                .map(|(period, lo)| {
                    let (inject, withdraw) = (injection.at(&period), withdrawal.at(&period));
                    if inject < 0.0 || withdraw < 0.0 {
                        return Err(StorageError::configuration(format!(
                            "max injection and withdrawal rates must be non-negative in {period}"
                        )));
                    }
                    InjectWithdrawConstraint::constant(
                        InjectWithdrawRange::new(-withdraw, inject),
                        lo,
                        max_inv.at(&period),
                    )
                    .map(Arc::new)
                    .map_err(|err| StorageError::configuration(format!("{period}: {err}")))
                })
                .collect()
        }
    }
}

fn resolve_fraction(
    value: &ScalarOrSeries,
    name: &str,
    start: Period,
    end: Period,
) -> StorageResult<PeriodValues> {
    let values = value.resolve(name, start, end)?;
    if let Some((period, bad)) = values.iter().find(|(_, v)| !(0.0..1.0).contains(v)) {
        return Err(StorageError::configuration(format!(
            "{name} must be in [0, 1), got {bad} in {period}"
        )));
    }
    Ok(values)
}

fn resolve_costs(
    costs: &[PerUnitCost],
    name: &str,
    start: Period,
    end: Period,
) -> StorageResult<Vec<ResolvedCost>> {
    costs
        .iter()
        .map(|cost| {
            Ok(ResolvedCost {
                rates: cost.rate.resolve(name, start, end)?,
                settlement: cost.settlement.clone(),
            })
        })
        .collect()
}
