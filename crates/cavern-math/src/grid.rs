//! One-dimensional point grids.

use crate::error::{MathError, MathResult};

/// Returns `n` evenly spaced points from `lo` to `hi` inclusive.
///
/// `n == 1` or `lo == hi` degenerates to the single point `lo`.
///
/// # Errors
///
/// `InvalidInput` when `n` is zero, `hi < lo` or a bound is not finite.
pub fn linspace(lo: f64, hi: f64, n: usize) -> MathResult<Vec<f64>> {
    validate_bounds(lo, hi)?;
    if n == 0 {
        return Err(MathError::invalid_input("number of points must be positive"));
    }
    if n == 1 || hi == lo {
        return Ok(vec![lo]);
    }

    let step = (hi - lo) / (n - 1) as f64;
    let mut points: Vec<f64> = (0..n - 1).map(|i| lo + step * i as f64).collect();
    points.push(hi);
    Ok(points)
}

/// Returns `lo, lo + spacing, ...` up to `hi`, with `hi` appended unless the
/// last point already lies within `tolerance` of it.
///
/// # Errors
///
/// `InvalidInput` when `spacing` is not positive, `hi < lo` or a bound is
/// not finite.
pub fn fixed_spacing(lo: f64, hi: f64, spacing: f64, tolerance: f64) -> MathResult<Vec<f64>> {
    validate_bounds(lo, hi)?;
    if !(spacing > 0.0 && spacing.is_finite()) {
        return Err(MathError::invalid_input(format!(
            "grid spacing must be positive, got {spacing}"
        )));
    }

    let steps = ((hi - lo) / spacing + tolerance).floor() as usize;
    let mut points: Vec<f64> = (0..=steps).map(|i| lo + spacing * i as f64).collect();
    match points.last_mut() {
        Some(last) if (hi - *last).abs() <= tolerance => *last = hi,
        _ => points.push(hi),
    }
    Ok(points)
}

fn validate_bounds(lo: f64, hi: f64) -> MathResult<()> {
    if !lo.is_finite() || !hi.is_finite() {
        return Err(MathError::invalid_input("grid bounds must be finite"));
    }
    if hi < lo {
        return Err(MathError::invalid_input(format!(
            "grid upper bound {hi} is below lower bound {lo}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linspace() {
        let points = linspace(0.0, 2000.0, 5).unwrap();
        assert_eq!(points, vec![0.0, 500.0, 1000.0, 1500.0, 2000.0]);

        assert_eq!(linspace(10.0, 20.0, 1).unwrap(), vec![10.0]);
        assert_eq!(linspace(10.0, 10.0, 7).unwrap(), vec![10.0]);
        assert!(linspace(0.0, 1.0, 0).is_err());
        assert!(linspace(1.0, 0.0, 3).is_err());
    }

    #[test]
    fn test_fixed_spacing_appends_upper_bound() {
        let points = fixed_spacing(0.0, 250.0, 100.0, 1e-10).unwrap();
        assert_eq!(points, vec![0.0, 100.0, 200.0, 250.0]);
    }

    #[test]
    fn test_fixed_spacing_exact_multiple() {
        let points = fixed_spacing(0.0, 0.3, 0.1, 1e-10).unwrap();
        assert_eq!(points.len(), 4);
        assert_relative_eq!(points[3], 0.3);
    }

    #[test]
    fn test_fixed_spacing_degenerate() {
        assert_eq!(fixed_spacing(5.0, 5.0, 1.0, 1e-10).unwrap(), vec![5.0]);
        assert!(fixed_spacing(0.0, 1.0, 0.0, 1e-10).is_err());
    }
}
