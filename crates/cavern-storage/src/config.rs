//! Valuation configuration.
//!
//! Both engines take a [`ValuationConfig`]; the tree engine additionally
//! takes [`TrinomialParams`]. Both load from and save to JSON with
//! defaults for omitted fields.

use serde::{Deserialize, Serialize};

use cavern_core::Granularity;

use crate::error::{StorageError, StorageResult};
use crate::grid::GridSpec;

/// Numerical settings shared by the valuation engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationConfig {
    /// Inventory discretisation per period.
    #[serde(default)]
    pub grid: GridSpec,

    /// Tolerance for inventory bound checks and decision ties.
    #[serde(default = "default_numerical_tolerance")]
    pub numerical_tolerance: f64,

    /// Enable parallel processing (requires 'parallel' feature).
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    /// Minimum number of grid points (times tree nodes) in a period to
    /// trigger parallel processing.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

fn default_numerical_tolerance() -> f64 {
    1e-10
}

fn default_parallel() -> bool {
    true
}

fn default_parallel_threshold() -> usize {
    32
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            grid: GridSpec::default(),
            numerical_tolerance: default_numerical_tolerance(),
            parallel: default_parallel(),
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

impl ValuationConfig {
    /// Creates a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config that always uses sequential processing.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Sets the inventory grid.
    #[must_use]
    pub fn with_grid(mut self, grid: GridSpec) -> Self {
        self.grid = grid;
        self
    }

    /// Sets the number of evenly spaced grid points.
    #[must_use]
    pub fn with_num_grid_points(mut self, n: usize) -> Self {
        self.grid = GridSpec::NumPoints(n);
        self
    }

    /// Sets the numerical tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.numerical_tolerance = tolerance;
        self
    }

    /// Sets whether to use parallel processing.
    #[must_use]
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Sets the threshold for parallel processing.
    #[must_use]
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Returns true if parallel processing should be used for the given count.
    #[must_use]
    pub fn should_parallelize(&self, count: usize) -> bool {
        cfg!(feature = "parallel") && self.parallel && count >= self.parallel_threshold
    }

    /// Checks every field.
    pub fn validate(&self) -> StorageResult<()> {
        self.grid.validate()?;
        if !(self.numerical_tolerance >= 0.0 && self.numerical_tolerance.is_finite()) {
            return Err(StorageError::configuration(format!(
                "numerical tolerance must be non-negative, got {}",
                self.numerical_tolerance
            )));
        }
        Ok(())
    }

    /// Parses and validates a config from JSON.
    pub fn from_json(json: &str) -> StorageResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| StorageError::configuration(format!("invalid valuation config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the config to pretty JSON.
    pub fn to_json(&self) -> StorageResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StorageError::configuration(format!("cannot serialize config: {e}")))
    }
}

/// Parameters of the one-factor mean-reverting spot price process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrinomialParams {
    /// Mean reversion rate (per year).
    pub mean_reversion: f64,

    /// Tree steps per storage period.
    #[serde(default = "default_steps_per_period")]
    pub steps_per_period: usize,

    /// Tree step length in years; derived from the granularity if omitted.
    #[serde(default)]
    pub time_step: Option<f64>,
}

fn default_steps_per_period() -> usize {
    1
}

impl TrinomialParams {
    /// One tree step per period, step length from the granularity.
    #[must_use]
    pub fn new(mean_reversion: f64) -> Self {
        Self {
            mean_reversion,
            steps_per_period: default_steps_per_period(),
            time_step: None,
        }
    }

    /// Splits each storage period into `steps` tree steps.
    #[must_use]
    pub fn with_steps_per_period(mut self, steps: usize) -> Self {
        self.steps_per_period = steps;
        self
    }

    /// Overrides the tree step length (years).
    #[must_use]
    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = Some(time_step);
        self
    }

    /// Tree step length in years for the given storage granularity.
    #[must_use]
    pub fn step_length(&self, granularity: Granularity) -> f64 {
        self.time_step
            .unwrap_or_else(|| granularity.year_fraction() / self.steps_per_period.max(1) as f64)
    }

    /// Checks every field.
    pub fn validate(&self) -> StorageResult<()> {
        if !(self.mean_reversion >= 0.0 && self.mean_reversion.is_finite()) {
            return Err(StorageError::configuration(format!(
                "mean reversion must be non-negative, got {}",
                self.mean_reversion
            )));
        }
        if self.steps_per_period == 0 {
            return Err(StorageError::configuration(
                "steps per period must be at least 1",
            ));
        }
        if let Some(dt) = self.time_step {
            if !(dt > 0.0 && dt.is_finite()) {
                return Err(StorageError::configuration(format!(
                    "tree time step must be positive, got {dt}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = ValuationConfig::from_json("{}").unwrap();
        assert_eq!(config, ValuationConfig::default());
        assert_eq!(config.grid, GridSpec::NumPoints(100));
        assert_relative_eq!(config.numerical_tolerance, 1e-10);
    }

    #[test]
    fn test_json_round_trip() {
        let config = ValuationConfig::sequential()
            .with_grid(GridSpec::Spacing(25.0))
            .with_tolerance(1e-8);
        let json = config.to_json().unwrap();
        assert!(json.contains("\"spacing\": 25.0"));
        assert_eq!(ValuationConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_config() {
        assert!(ValuationConfig::from_json(r#"{"grid": {"num_points": 0}}"#).is_err());
        assert!(ValuationConfig::from_json(r#"{"numerical_tolerance": -1.0}"#).is_err());
        assert!(ValuationConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_should_parallelize() {
        let config = ValuationConfig::new().with_threshold(100);

        #[cfg(feature = "parallel")]
        {
            assert!(!config.should_parallelize(50));
            assert!(config.should_parallelize(100));
        }

        #[cfg(not(feature = "parallel"))]
        {
            assert!(!config.should_parallelize(50));
            assert!(!config.should_parallelize(100));
        }

        assert!(!ValuationConfig::sequential().should_parallelize(1_000_000));
    }

    #[test]
    fn test_trinomial_params() {
        let params: TrinomialParams = serde_json::from_str(r#"{"mean_reversion": 14.5}"#).unwrap();
        assert_eq!(params, TrinomialParams::new(14.5));
        assert_relative_eq!(params.step_length(Granularity::Daily), 1.0 / 365.0);

        let sub = params.clone().with_steps_per_period(4);
        assert_relative_eq!(sub.step_length(Granularity::Daily), 1.0 / 1460.0);

        assert!(TrinomialParams::new(-1.0).validate().is_err());
        assert!(TrinomialParams::new(1.0).with_steps_per_period(0).validate().is_err());
        assert!(TrinomialParams::new(1.0).with_time_step(0.0).validate().is_err());
    }
}
