//! Inventory space: the inventories that can actually occur in each period.
//!
//! The space is the intersection of what is reachable going forward from the
//! starting inventory and what can still reach the terminal condition going
//! backward. Restricting the grids to it keeps every grid point feasible,
//! so a backward sweep never meets an empty decision interval on a valid
//! model.

use tracing::debug;

use cavern_core::Period;

use crate::error::{StorageError, StorageResult};
use crate::model::StorageModel;

/// Inclusive inventory bounds per period from the current period to the end.
#[derive(Debug, Clone, PartialEq)]
pub struct InventorySpace {
    start: Period,
    bounds: Vec<(f64, f64)>,
}

impl InventorySpace {
    /// Computes the space from `current` (holding `inventory`) to the model end.
    ///
    /// # Errors
    ///
    /// `InfeasibleState` if some period has no inventory that is both
    /// reachable and able to meet the terminal condition.
    pub fn compute(
        model: &StorageModel,
        current: Period,
        inventory: f64,
        tolerance: f64,
    ) -> StorageResult<Self> {
        let end = model.end();
        let periods = end.offset_from(&current)? as usize;

        let mut backward = vec![(0.0, 0.0); periods + 1];
        backward[periods] = if model.must_be_empty_at_end() {
            (0.0, 0.0)
        } else {
            let terminal = model.constraint_at(&end);
            (terminal.min_inventory(), terminal.max_inventory())
        };

        for i in (0..periods).rev() {
            let period = current.offset(i as i64);
            let constraint = model.constraint_at(&period);
            let loss = model.loss_pct(&period);
            let (next_lo, next_hi) = backward[i + 1];

            let hi = constraint.max_feasible_inventory(next_hi, loss, tolerance)?;
            let lo = constraint.min_feasible_inventory(next_lo, loss, tolerance)?;
            match (lo, hi) {
                (Some(lo), Some(hi)) if lo <= hi + tolerance => backward[i] = (lo, hi.max(lo)),
                _ => {
                    return Err(StorageError::infeasible(
                        period,
                        format!(
                            "no inventory can reach [{next_lo}, {next_hi}] in {}",
                            period.next()
                        ),
                    ))
                }
            }
        }

        let (lo, hi) = backward[0];
        if inventory < lo - tolerance || inventory > hi + tolerance {
            return Err(StorageError::infeasible(
                current,
                format!("starting inventory {inventory} cannot meet the terminal condition, feasible range is [{lo}, {hi}]"),
            ));
        }

        let mut bounds = Vec::with_capacity(periods + 1);
        bounds.push((inventory, inventory));
        for i in 0..periods {
            let period = current.offset(i as i64);
            let constraint = model.constraint_at(&period);
            let retained = 1.0 - model.loss_pct(&period);
            let (lo, hi) = bounds[i];

            let reach_lo = lo * retained + constraint.bounds(lo, tolerance)?.min_rate;
            let reach_hi = hi * retained + constraint.bounds(hi, tolerance)?.max_rate;
            let (back_lo, back_hi) = backward[i + 1];

            let next_lo = reach_lo.max(back_lo);
            let next_hi = reach_hi.min(back_hi);
            if next_lo > next_hi + tolerance {
                return Err(StorageError::infeasible(
                    period.next(),
                    format!("reachable inventories [{reach_lo}, {reach_hi}] miss feasible range [{back_lo}, {back_hi}]"),
                ));
            }
            bounds.push((next_lo, next_hi.max(next_lo)));
        }

        debug!(
            current = %current,
            periods,
            "inventory space computed"
        );
        Ok(Self {
            start: current,
            bounds,
        })
    }

    /// First period of the space.
    #[must_use]
    pub fn start(&self) -> Period {
        self.start
    }

    /// Number of periods covered, including the end period.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    /// Returns true if no periods are covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Bounds of the `index`-th period after the start.
    #[must_use]
    pub fn bounds(&self, index: usize) -> Option<(f64, f64)> {
        self.bounds.get(index).copied()
    }

    /// Bounds at `period`.
    #[must_use]
    pub fn at(&self, period: &Period) -> Option<(f64, f64)> {
        usize::try_from(period.ordinal() - self.start.ordinal())
            .ok()
            .and_then(|i| self.bounds(i))
    }
}
