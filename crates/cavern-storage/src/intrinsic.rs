//! Intrinsic valuation: optimal operation against the forward curve.
//!
//! Backward induction over the inventory grid of every period, followed by
//! a forward pass that replays the optimal decisions from the starting
//! inventory to produce the decision profile.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use cavern_core::Period;

use crate::config::ValuationConfig;
use crate::decision::optimal_decision;
use crate::error::StorageResult;
use crate::market::{MarketInputs, ValuationSetup};
use crate::model::StorageModel;
use crate::parallel::maybe_parallel_map;

/// Realised operation in one period of the optimal intrinsic path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    /// The period.
    pub period: Period,
    /// Inventory held at the start of the period.
    pub inventory_at_start: f64,
    /// Volume injected (positive) or withdrawn (negative).
    pub inject_withdraw_volume: f64,
    /// Commodity consumed by the injection or withdrawal.
    pub cmdty_consumed: f64,
    /// Inventory lost over the period.
    pub inventory_loss: f64,
    /// Volume bought (positive) or sold (negative) on the market.
    pub net_volume: f64,
    /// Undiscounted cash flow of the period, net of all costs.
    pub net_cash_position: f64,
    /// Discounted cash flow of the period.
    pub period_pv: f64,
}

/// Result of an intrinsic valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicResult {
    /// Net present value at the valuation date.
    pub npv: f64,
    /// One row per period from the first active period to the end.
    pub profile: Vec<ProfileRow>,
    /// Inventory reached at the end of the horizon.
    pub terminal_inventory: f64,
    /// Terminal value of that inventory.
    pub terminal_value: f64,
}

impl IntrinsicResult {
    fn expired() -> Self {
        Self {
            npv: 0.0,
            profile: Vec::new(),
            terminal_inventory: 0.0,
            terminal_value: 0.0,
        }
    }
}

/// Values `model` holding `inventory` at the valuation date against a
/// deterministic forward curve.
///
/// A valuation date at or after the storage end yields a zero NPV and an
/// empty profile, whatever the other inputs.
///
/// # Errors
///
/// - `FrequencyMismatch` if the forward curve granularity differs
/// - `OutOfRange` if the starting inventory is outside the inventory
///   bounds or the forward curve does not cover the horizon
/// - `InfeasibleState` if the terminal condition cannot be met
///
/// # Example
///
/// ```rust
/// use cavern_core::prelude::*;
/// use cavern_storage::prelude::*;
///
/// let start = Period::day(2019, 9, 1).unwrap();
/// let end = start.offset(2);
/// let model = StorageModel::new(StorageSpec::new(
///     Granularity::Daily,
///     start,
///     end,
///     ConstraintSpec::independent(0.0, 100.0, 100.0, 100.0),
/// ))
/// .unwrap();
///
/// // Buy at 10 and sell at 12 the next day.
/// let forward = TimeSeries::new(start, vec![10.0, 12.0]);
/// let curve = FlatRateCurve::new(0.0);
/// let market = MarketInputs::new(start.start_date(), &forward, &curve, &PeriodStart);
///
/// let result = intrinsic_value(&model, &market, 0.0, &ValuationConfig::default()).unwrap();
/// assert!((result.npv - 200.0).abs() < 1e-9);
/// assert_eq!(result.profile[0].inject_withdraw_volume, 100.0);
/// ```
pub fn intrinsic_value(
    model: &StorageModel,
    market: &MarketInputs<'_>,
    inventory: f64,
    config: &ValuationConfig,
) -> StorageResult<IntrinsicResult> {
    let Some(setup) = ValuationSetup::prepare(model, market, inventory, config)? else {
        return Ok(IntrinsicResult::expired());
    };
    let tolerance = config.numerical_tolerance;
    let periods = setup.num_periods();

    let end_grid = &setup.grids[periods];
    let end_price = setup.prices.get(periods).copied().unwrap_or(0.0);
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); periods + 1];
    values[periods] = end_grid
        .iter()
        .map(|&v| model.terminal_value(end_price, v, tolerance))
        .collect::<StorageResult<_>>()?;

    for i in (0..periods).rev() {
        let terms = &setup.terms[i];
        let price = setup.prices[i];
        let (next_grid, next_values) = (&setup.grids[i + 1], &values[i + 1]);
        let period_values = maybe_parallel_map(&setup.grids[i], config, |&v| {
            optimal_decision(terms, price, v, next_grid, next_values, tolerance).map(|d| d.value)
        })
        .into_iter()
        .collect::<StorageResult<Vec<f64>>>()?;
        values[i] = period_values;

        debug!(
            period = %terms.period,
            grid_points = setup.grids[i].len(),
            "intrinsic period valued"
        );
    }

    let npv = values[0][0];

    let mut profile = Vec::with_capacity(periods);
    let mut current = inventory;
    for i in 0..periods {
        let terms = &setup.terms[i];
        let price = setup.prices[i];
        let decision = optimal_decision(
            terms,
            price,
            current,
            &setup.grids[i + 1],
            &values[i + 1],
            tolerance,
        )?;
        let volume = decision.volume;
        let consumed = terms.consumed(volume);
        let loss = current * terms.loss_pct;

        profile.push(ProfileRow {
            period: terms.period,
            inventory_at_start: current,
            inject_withdraw_volume: volume,
            cmdty_consumed: consumed,
            inventory_loss: loss,
            net_volume: -(volume + consumed),
            net_cash_position: terms.cash_flow(price, current, volume),
            period_pv: terms.present_value(price, current, volume),
        });
        current = current * (1.0 - terms.loss_pct) + volume;
    }

    let terminal_value = model.terminal_value(end_price, current, tolerance)?;

    info!(
        npv,
        periods,
        start = %setup.current,
        terminal_inventory = current,
        "intrinsic valuation complete"
    );

    Ok(IntrinsicResult {
        npv,
        profile,
        terminal_inventory: current,
        terminal_value,
    })
}
