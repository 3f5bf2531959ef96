//! Backward induction over inventory grids at every tree node.

use std::borrow::Cow;

use ndarray::Array2;
use tracing::{debug, info};

use cavern_core::{Period, TimeSeries};

use crate::config::{TrinomialParams, ValuationConfig};
use crate::decision::optimal_decision;
use crate::error::{StorageError, StorageResult, ToleranceWarning};
use crate::market::{MarketInputs, ValuationSetup};
use crate::model::StorageModel;
use crate::parallel::maybe_parallel_map;
use crate::tree::TrinomialTree;

/// Result of a tree valuation.
#[derive(Debug, Clone)]
pub struct TreeResult {
    /// Net present value at the valuation date.
    pub npv: f64,
    /// The spot price tree used.
    pub tree: TrinomialTree,
    /// Inventory grid of each period from the first active one to the end.
    pub grids: Vec<Vec<f64>>,
    /// Storage value per period, indexed by `[node, grid point]`.
    pub values: Vec<Array2<f64>>,
    /// Probabilities clipped while building the tree.
    pub diagnostics: Vec<ToleranceWarning>,
}

impl TreeResult {
    fn expired(start: Period) -> Self {
        Self {
            npv: 0.0,
            tree: TrinomialTree::deterministic(start, &[]),
            grids: Vec::new(),
            values: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}

/// Values `model` with the spot price following a one-factor mean-reverting
/// process.
///
/// `spot_volatility` gives the annualised volatility applying over each
/// period. The tree is fitted to the forward curve in `market`.
///
/// # Errors
///
/// As [`intrinsic_value`](crate::intrinsic::intrinsic_value), plus
/// `FrequencyMismatch` for a volatility curve of another granularity and
/// `Configuration` when the volatility or mean reversion gives a degenerate
/// tree step.
pub fn trinomial_value(
    model: &StorageModel,
    market: &MarketInputs<'_>,
    inventory: f64,
    spot_volatility: &TimeSeries<f64>,
    params: &TrinomialParams,
    config: &ValuationConfig,
) -> StorageResult<TreeResult> {
    let Some(setup) = ValuationSetup::prepare(model, market, inventory, config)? else {
        return Ok(TreeResult::expired(model.start()));
    };
    params.validate()?;

    if spot_volatility.granularity() != model.granularity() {
        return Err(StorageError::frequency_mismatch(
            "spot volatility curve",
            model.granularity(),
            spot_volatility.granularity(),
        ));
    }
    let transitions = setup.prices.len() - 1;
    let volatility = (0..transitions)
        .map(|i| {
            let period = setup.current.offset(i as i64);
            spot_volatility.get(&period).copied().ok_or_else(|| {
                StorageError::out_of_range(format!("spot volatility curve does not cover {period}"))
            })
        })
        .collect::<StorageResult<Vec<f64>>>()?;

    let tree = TrinomialTree::build(setup.current, &setup.prices, &volatility, params)?;
    value_on_tree(model, &setup, tree, config)
}

/// Values `model` on a prebuilt tree whose root is the first active period.
///
/// The tree must have a layer for every active period, plus the end period
/// when the terminal value is a function of price.
pub fn tree_value(
    model: &StorageModel,
    market: &MarketInputs<'_>,
    inventory: f64,
    tree: TrinomialTree,
    config: &ValuationConfig,
) -> StorageResult<TreeResult> {
    let Some(setup) = ValuationSetup::prepare(model, market, inventory, config)? else {
        return Ok(TreeResult::expired(model.start()));
    };
    if tree.start() != Some(setup.current) || tree.num_layers() < setup.prices.len() {
        return Err(StorageError::configuration(format!(
            "tree must start at {} with at least {} layers",
            setup.current,
            setup.prices.len()
        )));
    }
    value_on_tree(model, &setup, tree, config)
}

fn value_on_tree(
    model: &StorageModel,
    setup: &ValuationSetup<'_>,
    tree: TrinomialTree,
    config: &ValuationConfig,
) -> StorageResult<TreeResult> {
    let tolerance = config.numerical_tolerance;
    let periods = setup.num_periods();
    let end_grid = &setup.grids[periods];

    // Without a price-dependent terminal value the end has a single state.
    let terminal = match tree.layer(periods).filter(|_| !model.must_be_empty_at_end()) {
        Some(layer) => {
            let cells = layer
                .prices
                .iter()
                .flat_map(|&price| end_grid.iter().map(move |&v| (price, v)))
                .map(|(price, v)| model.terminal_value(price, v, tolerance))
                .collect::<StorageResult<Vec<f64>>>()?;
            shape(layer.len(), end_grid.len(), cells)?
        }
        None => {
            let cells = end_grid
                .iter()
                .map(|&v| model.terminal_value(0.0, v, tolerance))
                .collect::<StorageResult<Vec<f64>>>()?;
            shape(1, end_grid.len(), cells)?
        }
    };

    let mut values: Vec<Array2<f64>> = vec![Array2::zeros((0, 0)); periods + 1];
    values[periods] = terminal;

    for i in (0..periods).rev() {
        let layer = tree.layer(i).ok_or_else(|| {
            StorageError::configuration(format!("tree has no layer for period {i}"))
        })?;
        let next = &values[i + 1];
        let next_grid = &setup.grids[i + 1];
        let grid = &setup.grids[i];

        let mut expected = Array2::<f64>::zeros((layer.len(), next_grid.len()));
        if next.nrows() == 1 {
            for mut row in expected.rows_mut() {
                row.assign(&next.row(0));
            }
        } else {
            for (node, transition) in layer.transitions.iter().enumerate() {
                let mut row = expected.row_mut(node);
                for (child, p) in transition.children() {
                    row.scaled_add(p, &next.row(child));
                }
            }
        }

        let terms = &setup.terms[i];
        let cells: Vec<(usize, f64)> = (0..layer.len())
            .flat_map(|node| grid.iter().map(move |&v| (node, v)))
            .collect();
        let cell_values = maybe_parallel_map(&cells, config, |&(node, v)| {
            let row = expected.row(node);
            let continuation: Cow<'_, [f64]> =
                row.to_slice().map_or_else(|| Cow::Owned(row.to_vec()), Cow::Borrowed);
            optimal_decision(
                terms,
                layer.prices[node],
                v,
                next_grid,
                &continuation,
                tolerance,
            )
            .map(|d| d.value)
        })
        .into_iter()
        .collect::<StorageResult<Vec<f64>>>()?;

        values[i] = shape(layer.len(), grid.len(), cell_values)?;
        debug!(
            period = %terms.period,
            nodes = layer.len(),
            grid_points = grid.len(),
            "tree period valued"
        );
    }

    let npv = values[0][[0, 0]];
    let diagnostics = tree.diagnostics().to_vec();
    info!(
        npv,
        periods,
        start = %setup.current,
        clipped_probabilities = diagnostics.len(),
        "tree valuation complete"
    );

    Ok(TreeResult {
        npv,
        tree,
        grids: setup.grids.clone(),
        values,
        diagnostics,
    })
}

fn shape(rows: usize, cols: usize, cells: Vec<f64>) -> StorageResult<Array2<f64>> {
    Array2::from_shape_vec((rows, cols), cells)
        .map_err(|e| StorageError::configuration(format!("value grid shape: {e}")))
}
