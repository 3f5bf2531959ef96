//! Linear interpolation.

use crate::error::{MathError, MathResult};

/// Index `i` such that `xs[i] <= x <= xs[i + 1]`, for `xs.len() >= 2`.
fn find_segment(xs: &[f64], x: f64) -> usize {
    let upper = xs.partition_point(|&probe| probe <= x);
    upper.saturating_sub(1).min(xs.len() - 2)
}

fn clamp_to_range(xs: &[f64], x: f64, tolerance: f64) -> MathResult<f64> {
    let min = xs[0];
    let max = xs[xs.len() - 1];
    if x < min - tolerance || x > max + tolerance || x.is_nan() {
        return Err(MathError::ExtrapolationNotAllowed { x, min, max });
    }
    Ok(x.clamp(min, max))
}

/// Linearly interpolates borrowed, strictly increasing data.
///
/// Queries up to `tolerance` outside the data return the end value. Value
/// functions on an inventory grid are queried at inventories that can
/// overshoot the grid by rounding error, which is what the tolerance absorbs.
/// A single data point is accepted: the function is then constant and only
/// defined within `tolerance` of that point. Sortedness is not re-checked on
/// each call.
///
/// # Errors
///
/// `InsufficientData` for empty or mismatched input, `ExtrapolationNotAllowed`
/// for a query further than `tolerance` outside the data.
///
/// # Example
///
/// ```rust
/// use cavern_math::interpolation::interpolate_sorted;
///
/// let xs = [0.0, 2000.0];
/// let ys = [255.2, 175.0];
/// assert!((interpolate_sorted(&xs, &ys, 1000.0, 0.0).unwrap() - 215.1).abs() < 1e-12);
/// assert!(interpolate_sorted(&xs, &ys, 2000.5, 1e-6).is_err());
/// ```
pub fn interpolate_sorted(xs: &[f64], ys: &[f64], x: f64, tolerance: f64) -> MathResult<f64> {
    if xs.is_empty() || xs.len() != ys.len() {
        return Err(MathError::insufficient_data(1, xs.len().min(ys.len())));
    }
    let x = clamp_to_range(xs, x, tolerance)?;
    if xs.len() == 1 {
        return Ok(ys[0]);
    }

    let i = find_segment(xs, x);
    let (x0, x1) = (xs[i], xs[i + 1]);
    let (y0, y1) = (ys[i], ys[i + 1]);

    let t = (x - x0) / (x1 - x0);
    Ok(y0 + t * (y1 - y0))
}
