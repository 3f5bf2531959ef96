//! Market inputs and the preparation shared by both valuation engines.

use tracing::debug;

use cavern_core::discount::DiscountCurve;
use cavern_core::settlement::SettlementRule;
use cavern_core::{Date, Period, TimeSeries};

use crate::config::ValuationConfig;
use crate::decision::PeriodTerms;
use crate::error::{StorageError, StorageResult};
use crate::model::StorageModel;
use crate::space::InventorySpace;

/// Market data a valuation is run against.
#[derive(Clone, Copy)]
pub struct MarketInputs<'a> {
    /// Date cash flows are discounted to.
    pub valuation_date: Date,
    /// Forward price per period.
    pub forward_curve: &'a TimeSeries<f64>,
    /// Discounting from payment dates to the valuation date.
    pub discount_curve: &'a dyn DiscountCurve,
    /// Payment date of commodity delivered in each period.
    pub settlement: &'a dyn SettlementRule,
}

impl<'a> MarketInputs<'a> {
    /// Bundles market inputs.
    #[must_use]
    pub fn new(
        valuation_date: Date,
        forward_curve: &'a TimeSeries<f64>,
        discount_curve: &'a dyn DiscountCurve,
        settlement: &'a dyn SettlementRule,
    ) -> Self {
        Self {
            valuation_date,
            forward_curve,
            discount_curve,
            settlement,
        }
    }
}

impl std::fmt::Debug for MarketInputs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketInputs")
            .field("valuation_date", &self.valuation_date)
            .field("forward_curve", &self.forward_curve)
            .finish_non_exhaustive()
    }
}

/// Everything a backward sweep needs, validated up front.
pub(crate) struct ValuationSetup<'a> {
    pub(crate) current: Period,
    /// Terms of each active period from `current`.
    pub(crate) terms: Vec<PeriodTerms<'a>>,
    /// Forward prices from `current`, including the end period when the
    /// terminal value needs it.
    pub(crate) prices: Vec<f64>,
    /// Inventory grid of each period from `current` through the end.
    pub(crate) grids: Vec<Vec<f64>>,
}

impl<'a> ValuationSetup<'a> {
    /// Checks inputs and builds per-period terms and grids.
    ///
    /// Returns `None` when the storage has expired at the valuation date,
    /// before any other input is looked at.
    pub(crate) fn prepare(
        model: &'a StorageModel,
        market: &MarketInputs<'_>,
        inventory: f64,
        config: &ValuationConfig,
    ) -> StorageResult<Option<Self>> {
        let granularity = model.granularity();
        let valuation_period = Period::from_date(granularity, market.valuation_date);
        if valuation_period >= model.end() {
            debug!(
                valuation_date = %market.valuation_date,
                end = %model.end(),
                "storage expired"
            );
            return Ok(None);
        }
        config.validate()?;

        let forward = market.forward_curve;
        if forward.granularity() != granularity {
            return Err(StorageError::frequency_mismatch(
                "forward curve",
                granularity,
                forward.granularity(),
            ));
        }

        let tolerance = config.numerical_tolerance;
        let current = valuation_period.max(model.start());
        let (min_inv, max_inv) = (model.min_inventory(&current)?, model.max_inventory(&current)?);
        if !(inventory >= min_inv - tolerance && inventory <= max_inv + tolerance) {
            return Err(StorageError::out_of_range(format!(
                "starting inventory {inventory} outside [{min_inv}, {max_inv}] in {current}"
            )));
        }

        let last_priced = if model.must_be_empty_at_end() {
            model.end().prev()
        } else {
            model.end()
        };
        if !forward.covers(&current, &last_priced) {
            return Err(StorageError::out_of_range(format!(
                "forward curve does not cover {current} to {last_priced}"
            )));
        }
        let count = last_priced.offset_from(&current)? + 1;
        let prices = (0..count)
            .map(|i| forward.value(&current.offset(i)).copied())
            .collect::<Result<Vec<_>, _>>()?;

        let space = InventorySpace::compute(model, current, inventory, tolerance)?;

        let periods = model.end().offset_from(&current)? as usize;
        let terms = (0..periods)
            .map(|i| {
                PeriodTerms::new(
                    model,
                    current.offset(i as i64),
                    market.valuation_date,
                    market.discount_curve,
                    market.settlement,
                )
            })
            .collect::<StorageResult<Vec<_>>>()?;

        let mut grids = Vec::with_capacity(periods + 1);
        grids.push(vec![inventory]);
        for i in 1..=periods {
            let (lo, hi) = space.bounds(i).ok_or_else(|| {
                StorageError::infeasible(current.offset(i as i64), "missing inventory space")
            })?;
            grids.push(config.grid.build(lo, hi, tolerance)?);
        }

        debug!(
            current = %current,
            periods,
            max_grid_points = grids.iter().map(Vec::len).max().unwrap_or(0),
            "valuation prepared"
        );
        Ok(Some(Self {
            current,
            terms,
            prices,
            grids,
        }))
    }

    pub(crate) fn num_periods(&self) -> usize {
        self.terms.len()
    }
}
