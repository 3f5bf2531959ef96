//! Polynomials in monomial form.

use nalgebra::{DMatrix, DVector};

use crate::error::{MathError, MathResult};

/// A real polynomial `c0 + c1 x + c2 x^2 + ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coefficients: Vec<f64>,
}

impl Polynomial {
    /// Creates a polynomial from coefficients in ascending order of power.
    #[must_use]
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    /// Fits the polynomial of degree `xs.len() - 1` passing through every point.
    ///
    /// The Vandermonde system is solved with an LU decomposition on
    /// abscissae rescaled to `[-1, 1]`, which keeps the system well
    /// conditioned for inventories in the thousands.
    ///
    /// # Errors
    ///
    /// `InsufficientData` for an empty input, `InvalidInput` for mismatched
    /// lengths and `SingularMatrix` for repeated abscissae.
    pub fn interpolate_points(xs: &[f64], ys: &[f64]) -> MathResult<Self> {
        if xs.is_empty() {
            return Err(MathError::insufficient_data(1, 0));
        }
        if xs.len() != ys.len() {
            return Err(MathError::invalid_input(format!(
                "xs and ys must have same length: {} vs {}",
                xs.len(),
                ys.len()
            )));
        }

        let n = xs.len();
        let lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let centre = 0.5 * (hi + lo);
        let half_width = if hi > lo { 0.5 * (hi - lo) } else { 1.0 };

        let vandermonde = DMatrix::from_fn(n, n, |i, j| {
            ((xs[i] - centre) / half_width).powi(j as i32)
        });
        let rhs = DVector::from_column_slice(ys);
        let scaled = vandermonde
            .lu()
            .solve(&rhs)
            .ok_or(MathError::SingularMatrix)?;

        if scaled.iter().any(|c| !c.is_finite()) {
            return Err(MathError::SingularMatrix);
        }

        Ok(Self::new(expand_shifted(
            scaled.as_slice(),
            centre,
            half_width,
        )))
    }

    /// Returns the coefficients, lowest power first.
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Returns the degree (zero for the empty polynomial).
    #[must_use]
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Evaluates at `x` with Horner's scheme.
    #[must_use]
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * x + c)
    }
}

/// Converts coefficients of `p((x - centre) / scale)` into plain monomial
/// coefficients of `x`.
fn expand_shifted(scaled: &[f64], centre: f64, scale: f64) -> Vec<f64> {
    let n = scaled.len();
    let mut out = vec![0.0; n];
    // (x - centre)^k expanded incrementally.
    let mut power = vec![0.0; n];
    power[0] = 1.0;
    for (k, &coeff) in scaled.iter().enumerate() {
        let factor = coeff / scale.powi(k as i32);
        for (o, p) in out.iter_mut().zip(power.iter()) {
            *o += factor * p;
        }
        if k + 1 < n {
            for i in (0..=k + 1).rev() {
                let shifted = if i > 0 { power[i - 1] } else { 0.0 };
                power[i] = shifted - centre * power[i];
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_evaluate() {
        // 1 + 2x + 3x^2
        let p = Polynomial::new(vec![1.0, 2.0, 3.0]);
        assert_relative_eq!(p.evaluate(2.0), 17.0);
        assert_eq!(p.degree(), 2);
        assert_eq!(p.coefficients(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_passes_through_pillars() {
        let xs = [0.0, 700.0, 1800.0];
        let ys = [235.8, 200.77, 174.45];
        let p = Polynomial::interpolate_points(&xs, &ys).unwrap();

        assert_eq!(p.degree(), 2);
        for (x, y) in xs.iter().zip(ys.iter()) {
            assert_relative_eq!(p.evaluate(*x), *y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_two_points_is_a_line() {
        let p = Polynomial::interpolate_points(&[0.0, 2000.0], &[-150.0, -200.0]).unwrap();
        assert_relative_eq!(p.evaluate(1000.0), -175.0, epsilon = 1e-10);
        assert_relative_eq!(p.coefficients()[1], -0.025, epsilon = 1e-14);
    }

    #[test]
    fn test_single_point_is_constant() {
        let p = Polynomial::interpolate_points(&[5.0], &[3.0]).unwrap();
        assert_relative_eq!(p.evaluate(-100.0), 3.0);
    }

    #[test]
    fn test_repeated_abscissa_is_singular() {
        let result = Polynomial::interpolate_points(&[1.0, 1.0], &[2.0, 3.0]);
        assert!(matches!(result, Err(MathError::SingularMatrix)));
    }
}
