//! Inventory grids over the per-period inventory space.

use serde::{Deserialize, Serialize};

use cavern_math::grid::{fixed_spacing, linspace};

use crate::error::{StorageError, StorageResult};

/// How each period's inventory range is discretised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridSpec {
    /// A fixed number of evenly spaced points.
    NumPoints(usize),
    /// Points a fixed inventory distance apart, upper bound included.
    Spacing(f64),
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::NumPoints(100)
    }
}

impl GridSpec {
    /// Checks the parameter is usable.
    pub fn validate(&self) -> StorageResult<()> {
        match *self {
            Self::NumPoints(0) => Err(StorageError::configuration(
                "grid must have at least one point",
            )),
            Self::Spacing(s) if !(s > 0.0 && s.is_finite()) => Err(StorageError::configuration(
                format!("grid spacing must be positive, got {s}"),
            )),
            _ => Ok(()),
        }
    }

    /// Grid over `[lo, hi]`; a range narrower than `tolerance` collapses to
    /// the single point `lo`.
    pub fn build(&self, lo: f64, hi: f64, tolerance: f64) -> StorageResult<Vec<f64>> {
        if hi - lo <= tolerance {
            return Ok(vec![lo]);
        }
        let points = match *self {
            Self::NumPoints(n) => linspace(lo, hi, n)?,
            Self::Spacing(s) => fixed_spacing(lo, hi, s, tolerance)?,
        };
        Ok(points)
    }
}
