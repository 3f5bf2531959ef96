//! Injection and withdrawal rate constraints as functions of inventory.
//!
//! Rates are signed: withdrawal negative, injection positive. Within a period
//! the feasible range depends on the inventory held at the start of the
//! period, either constant or interpolated between declared pillars.

use serde::{Deserialize, Serialize};

use cavern_math::interpolation::interpolate_sorted;
use cavern_math::polynomial::Polynomial;
use cavern_math::solvers::{brent, SolverConfig};

use crate::error::{StorageError, StorageResult};

/// Signed bounds on the volume injected (positive) or withdrawn (negative)
/// in one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InjectWithdrawRange {
    /// Largest withdrawal, usually negative.
    pub min_rate: f64,
    /// Largest injection, usually positive.
    pub max_rate: f64,
}

impl InjectWithdrawRange {
    /// Creates a rate range.
    #[must_use]
    pub fn new(min_rate: f64, max_rate: f64) -> Self {
        Self { min_rate, max_rate }
    }

    /// Returns true if `rate` lies in the range, allowing `tolerance`.
    #[must_use]
    pub fn contains(&self, rate: f64, tolerance: f64) -> bool {
        rate >= self.min_rate - tolerance && rate <= self.max_rate + tolerance
    }
}

/// Rate bounds declared at one inventory level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InventoryPillar {
    /// Inventory level.
    pub inventory: f64,
    /// Largest withdrawal at this inventory.
    pub min_rate: f64,
    /// Largest injection at this inventory.
    pub max_rate: f64,
}

impl InventoryPillar {
    /// Creates a pillar.
    #[must_use]
    pub fn new(inventory: f64, min_rate: f64, max_rate: f64) -> Self {
        Self {
            inventory,
            min_rate,
            max_rate,
        }
    }
}

/// How rate bounds between pillars are obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PillarInterpolation {
    /// Linear between neighbouring pillars.
    #[default]
    PiecewiseLinear,
    /// Exact polynomial through all pillars of a row.
    Polynomial,
}

/// Rate constraint in force during one period.
#[derive(Debug, Clone)]
pub enum InjectWithdrawConstraint {
    /// Same range at every inventory in `[min_inventory, max_inventory]`.
    Constant {
        /// The rate range.
        range: InjectWithdrawRange,
        /// Lowest permitted inventory.
        min_inventory: f64,
        /// Highest permitted inventory.
        max_inventory: f64,
    },
    /// Linear interpolation between pillars sorted by inventory.
    PiecewiseLinear {
        /// Pillar inventories.
        inventories: Vec<f64>,
        /// Withdrawal bound at each pillar.
        min_rates: Vec<f64>,
        /// Injection bound at each pillar.
        max_rates: Vec<f64>,
    },
    /// Polynomials through the pillars.
    Polynomial {
        /// Lowest pillar inventory.
        min_inventory: f64,
        /// Highest pillar inventory.
        max_inventory: f64,
        /// Withdrawal bound as a function of inventory.
        min_rate: Polynomial,
        /// Injection bound as a function of inventory.
        max_rate: Polynomial,
    },
}

impl InjectWithdrawConstraint {
    /// Constant range between two inventory bounds.
    pub fn constant(
        range: InjectWithdrawRange,
        min_inventory: f64,
        max_inventory: f64,
    ) -> StorageResult<Self> {
        if !(min_inventory.is_finite() && max_inventory.is_finite()) {
            return Err(StorageError::configuration("inventory bounds must be finite"));
        }
        if min_inventory > max_inventory {
            return Err(StorageError::configuration(format!(
                "min inventory {min_inventory} exceeds max inventory {max_inventory}"
            )));
        }
        validate_range(range.min_rate, range.max_rate)?;
        Ok(Self::Constant {
            range,
            min_inventory,
            max_inventory,
        })
    }

    /// Interpolated constraint from a row of pillars.
    ///
    /// Pillars may be given in any order. At least two pillars with distinct
    /// inventories are required.
    pub fn from_pillars(
        pillars: &[InventoryPillar],
        interpolation: PillarInterpolation,
    ) -> StorageResult<Self> {
        if pillars.len() < 2 {
            return Err(StorageError::configuration(format!(
                "at least 2 inventory pillars are required, got {}",
                pillars.len()
            )));
        }
        let mut sorted = pillars.to_vec();
        sorted.sort_by(|a, b| a.inventory.total_cmp(&b.inventory));
        if sorted.windows(2).any(|w| w[1].inventory <= w[0].inventory) {
            return Err(StorageError::configuration(
                "pillar inventories must be distinct",
            ));
        }
        for pillar in &sorted {
            if !pillar.inventory.is_finite() {
                return Err(StorageError::configuration("pillar inventory must be finite"));
            }
            validate_range(pillar.min_rate, pillar.max_rate)?;
        }

        let inventories: Vec<f64> = sorted.iter().map(|p| p.inventory).collect();
        let min_rates: Vec<f64> = sorted.iter().map(|p| p.min_rate).collect();
        let max_rates: Vec<f64> = sorted.iter().map(|p| p.max_rate).collect();

        match interpolation {
            PillarInterpolation::PiecewiseLinear => Ok(Self::PiecewiseLinear {
                inventories,
                min_rates,
                max_rates,
            }),
            PillarInterpolation::Polynomial => Ok(Self::Polynomial {
                min_inventory: inventories[0],
                max_inventory: inventories[inventories.len() - 1],
                min_rate: Polynomial::interpolate_points(&inventories, &min_rates)?,
                max_rate: Polynomial::interpolate_points(&inventories, &max_rates)?,
            }),
        }
    }

    /// Lowest permitted inventory.
    #[must_use]
    pub fn min_inventory(&self) -> f64 {
        match self {
            Self::Constant { min_inventory, .. } | Self::Polynomial { min_inventory, .. } => {
                *min_inventory
            }
            Self::PiecewiseLinear { inventories, .. } => inventories[0],
        }
    }

    /// Highest permitted inventory.
    #[must_use]
    pub fn max_inventory(&self) -> f64 {
        match self {
            Self::Constant { max_inventory, .. } | Self::Polynomial { max_inventory, .. } => {
                *max_inventory
            }
            Self::PiecewiseLinear { inventories, .. } => inventories[inventories.len() - 1],
        }
    }

    /// Rate range at `inventory`.
    ///
    /// # Errors
    ///
    /// `OutOfRange` if `inventory` is more than `tolerance` outside the
    /// permitted inventory range.
    pub fn bounds(&self, inventory: f64, tolerance: f64) -> StorageResult<InjectWithdrawRange> {
        let (lo, hi) = (self.min_inventory(), self.max_inventory());
        if !(inventory >= lo - tolerance && inventory <= hi + tolerance) {
            return Err(StorageError::out_of_range(format!(
                "inventory {inventory} outside [{lo}, {hi}]"
            )));
        }
        let inventory = inventory.clamp(lo, hi);
        Ok(match self {
            Self::Constant { range, .. } => *range,
            Self::PiecewiseLinear {
                inventories,
                min_rates,
                max_rates,
            } => InjectWithdrawRange::new(
                interpolate_sorted(inventories, min_rates, inventory, 0.0)?,
                interpolate_sorted(inventories, max_rates, inventory, 0.0)?,
            ),
            Self::Polynomial {
                min_rate, max_rate, ..
            } => InjectWithdrawRange::new(min_rate.evaluate(inventory), max_rate.evaluate(inventory)),
        })
    }

    /// Highest inventory from which some permitted decision ends the period
    /// at or below `next_max`, or `None` if even the lowest inventory cannot.
    ///
    /// Assumes `v * (1 - loss) + min_rate(v)` is non-decreasing in `v`.
    pub fn max_feasible_inventory(
        &self,
        next_max: f64,
        loss_pct: f64,
        tolerance: f64,
    ) -> StorageResult<Option<f64>> {
        let (lo, hi) = (self.min_inventory(), self.max_inventory());
        let retained = 1.0 - loss_pct;
        let lowest_next = |v: f64| -> StorageResult<f64> {
            Ok(v * retained + self.bounds(v, 0.0)?.min_rate)
        };

        if lowest_next(hi)? <= next_max + tolerance {
            return Ok(Some(hi));
        }
        if lowest_next(lo)? > next_max + tolerance {
            return Ok(None);
        }
        if let Self::Constant { range, .. } = self {
            return Ok(Some(((next_max - range.min_rate) / retained).clamp(lo, hi)));
        }
        self.solve_boundary(lo, hi, next_max, tolerance, |r| r.min_rate, retained)
            .map(Some)
    }

    /// Lowest inventory from which some permitted decision ends the period
    /// at or above `next_min`, or `None` if even the highest inventory cannot.
    ///
    /// Assumes `v * (1 - loss) + max_rate(v)` is non-decreasing in `v`.
    pub fn min_feasible_inventory(
        &self,
        next_min: f64,
        loss_pct: f64,
        tolerance: f64,
    ) -> StorageResult<Option<f64>> {
        let (lo, hi) = (self.min_inventory(), self.max_inventory());
        let retained = 1.0 - loss_pct;
        let highest_next = |v: f64| -> StorageResult<f64> {
            Ok(v * retained + self.bounds(v, 0.0)?.max_rate)
        };

        if highest_next(lo)? >= next_min - tolerance {
            return Ok(Some(lo));
        }
        if highest_next(hi)? < next_min - tolerance {
            return Ok(None);
        }
        if let Self::Constant { range, .. } = self {
            return Ok(Some(((next_min - range.max_rate) / retained).clamp(lo, hi)));
        }
        self.solve_boundary(lo, hi, next_min, tolerance, |r| r.max_rate, retained)
            .map(Some)
    }

    fn solve_boundary(
        &self,
        lo: f64,
        hi: f64,
        target: f64,
        tolerance: f64,
        rate: impl Fn(&InjectWithdrawRange) -> f64,
        retained: f64,
    ) -> StorageResult<f64> {
        let f = |v: f64| {
            self.bounds(v, 0.0)
                .map_or(f64::NAN, |r| v * retained + rate(&r) - target)
        };
        let config = SolverConfig::default().with_tolerance(tolerance.max(1e-12));
        let result = brent(f, lo, hi, &config)?;
        Ok(result.root.clamp(lo, hi))
    }
}

fn validate_range(min_rate: f64, max_rate: f64) -> StorageResult<()> {
    if !(min_rate.is_finite() && max_rate.is_finite()) {
        return Err(StorageError::configuration("rates must be finite"));
    }
    if min_rate > max_rate {
        return Err(StorageError::configuration(format!(
            "min rate {min_rate} exceeds max rate {max_rate}"
        )));
    }
    Ok(())
}
