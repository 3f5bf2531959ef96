//! Recombining trinomial tree for a mean-reverting log spot price.
//!
//! The log price is `ln S(t) = alpha(t) + x(t)` with
//! `dx = -kappa * x dt + sigma(t) dW`. The `x` lattice is built with the
//! Hull-White procedure: uniform spacing `dx = sqrt(3 V)` for the largest
//! one-step variance `V`, branching to the nodes around the conditional
//! mean, and truncation at `j_max = ceil(0.184 / (kappa dt))` where the
//! branching bends inward. Probabilities match the conditional mean and
//! variance. `alpha` is then fitted layer by layer so the expected spot
//! price equals the forward price.

use tracing::warn;

use cavern_core::Period;

use crate::config::TrinomialParams;
use crate::error::{StorageError, StorageResult, ToleranceWarning};

/// Branching from one node to a contiguous block of next-layer nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Index of the first child in the next layer.
    pub first_child: usize,
    /// Probability of each child from `first_child` on.
    pub probabilities: Vec<f64>,
}

impl Transition {
    /// Iterates `(child index, probability)`.
    pub fn children(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.probabilities
            .iter()
            .enumerate()
            .map(move |(i, &p)| (self.first_child + i, p))
    }
}

/// Nodes of the tree in one storage period.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeLayer {
    /// The storage period.
    pub period: Period,
    /// Spot price at each node, lowest first.
    pub prices: Vec<f64>,
    /// Probability of reaching each node from the root.
    pub node_probabilities: Vec<f64>,
    /// Branching to the next layer (empty on the last layer).
    pub transitions: Vec<Transition>,
}

impl TreeLayer {
    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Returns true if the layer has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Expected spot price over the layer.
    #[must_use]
    pub fn expected_price(&self) -> f64 {
        self.prices
            .iter()
            .zip(&self.node_probabilities)
            .map(|(s, q)| s * q)
            .sum()
    }
}

/// A spot price lattice with one layer per storage period.
#[derive(Debug, Clone, PartialEq)]
pub struct TrinomialTree {
    layers: Vec<TreeLayer>,
    diagnostics: Vec<ToleranceWarning>,
}

/// One tree step: three-way branching of every node.
struct StepKernel {
    half_width: usize,
    next_half_width: usize,
    // (index of the down child in the next step, [p_down, p_mid, p_up])
    branches: Vec<(usize, [f64; 3])>,
}

impl TrinomialTree {
    /// Builds the tree for periods `start, start + 1, ...` with one forward
    /// price per layer.
    ///
    /// `volatility[k]` is the annualised spot volatility applying from
    /// layer `k` to layer `k + 1`.
    ///
    /// # Errors
    ///
    /// `Configuration` for an empty or non-positive forward curve, too few
    /// or non-positive volatilities, or invalid `params`.
    pub fn build(
        start: Period,
        forward: &[f64],
        volatility: &[f64],
        params: &TrinomialParams,
    ) -> StorageResult<Self> {
        params.validate()?;
        if forward.is_empty() {
            return Err(StorageError::configuration("tree needs at least one forward price"));
        }
        if let Some(bad) = forward.iter().find(|f| !(**f > 0.0 && f.is_finite())) {
            return Err(StorageError::configuration(format!(
                "forward prices must be positive for a log-price tree, got {bad}"
            )));
        }
        let transitions = forward.len() - 1;
        if volatility.len() < transitions {
            return Err(StorageError::configuration(format!(
                "{transitions} volatilities required, got {}",
                volatility.len()
            )));
        }

        let kappa = params.mean_reversion;
        let dt = params.step_length(start.granularity());
        let steps_per_period = params.steps_per_period;

        let variances = volatility[..transitions]
            .iter()
            .map(|&sigma| {
                let v = step_variance(sigma, kappa, dt);
                if sigma > 0.0 && v > 0.0 && v.is_finite() {
                    Ok(v)
                } else {
                    Err(StorageError::configuration(format!(
                        "volatility {sigma} with mean reversion {kappa} gives a degenerate tree step"
                    )))
                }
            })
            .collect::<StorageResult<Vec<f64>>>()?;

        let Some(v_max) = variances.iter().copied().reduce(f64::max) else {
            return Ok(Self::deterministic(start, forward));
        };
        let dx = (3.0 * v_max).sqrt();
        let decay = (-kappa * dt).exp();
        let j_max = if kappa > 0.0 {
            ((0.184 / (kappa * dt)).ceil() as usize).max(1)
        } else {
            usize::MAX
        };
        let half_width = |step: usize| step.min(j_max);

        let mut diagnostics = Vec::new();
        let total_steps = transitions * steps_per_period;
        let kernels: Vec<StepKernel> = (0..total_steps)
            .map(|step| {
                step_kernel(
                    step,
                    half_width(step),
                    half_width(step + 1),
                    variances[step / steps_per_period],
                    dx,
                    decay,
                    &mut diagnostics,
                )
            })
            .collect();

        let mut layers = Vec::with_capacity(forward.len());
        let mut marginals = vec![1.0];
        for (k, &fwd) in forward.iter().enumerate() {
            let w = half_width(k * steps_per_period);
            let period = start.offset(k as i64);
            let prices = fitted_prices(fwd, &marginals, w, dx);

            let layer_transitions = if k < transitions {
                let block = &kernels[k * steps_per_period..(k + 1) * steps_per_period];
                (0..=2 * w).map(|node| compose(node, block)).collect()
            } else {
                Vec::new()
            };

            let next_marginals = if k < transitions {
                let next_width = 2 * half_width((k + 1) * steps_per_period) + 1;
                let mut next = vec![0.0; next_width];
                for (q, t) in marginals.iter().zip(&layer_transitions) {
                    for (child, p) in Transition::children(t) {
                        next[child] += q * p;
                    }
                }
                next
            } else {
                Vec::new()
            };

            layers.push(TreeLayer {
                period,
                prices,
                node_probabilities: std::mem::replace(&mut marginals, next_marginals),
                transitions: layer_transitions,
            });
        }

        if !diagnostics.is_empty() {
            let worst = diagnostics
                .iter()
                .map(|w: &ToleranceWarning| w.min_probability)
                .fold(0.0, f64::min);
            warn!(
                clipped = diagnostics.len(),
                min_probability = worst,
                "negative transition probabilities clipped"
            );
        }

        Ok(Self {
            layers,
            diagnostics,
        })
    }

    /// A tree with a single node per layer priced at the forward.
    ///
    /// Valuing storage on it reproduces the intrinsic value.
    #[must_use]
    pub fn deterministic(start: Period, forward: &[f64]) -> Self {
        let last = forward.len().saturating_sub(1);
        let layers = forward
            .iter()
            .enumerate()
            .map(|(k, &price)| TreeLayer {
                period: start.offset(k as i64),
                prices: vec![price],
                node_probabilities: vec![1.0],
                transitions: if k < last {
                    vec![Transition {
                        first_child: 0,
                        probabilities: vec![1.0],
                    }]
                } else {
                    Vec::new()
                },
            })
            .collect();
        Self {
            layers,
            diagnostics: Vec::new(),
        }
    }

    /// All layers, first period first.
    #[must_use]
    pub fn layers(&self) -> &[TreeLayer] {
        &self.layers
    }

    /// The `k`-th layer.
    #[must_use]
    pub fn layer(&self, k: usize) -> Option<&TreeLayer> {
        self.layers.get(k)
    }

    /// Number of layers.
    #[must_use]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Period of the root layer.
    #[must_use]
    pub fn start(&self) -> Option<Period> {
        self.layers.first().map(|l| l.period)
    }

    /// Nodes whose probabilities had to be clipped.
    #[must_use]
    pub fn diagnostics(&self) -> &[ToleranceWarning] {
        &self.diagnostics
    }
}

/// Variance of `x(t + dt)` given `x(t)`.
fn step_variance(sigma: f64, kappa: f64, dt: f64) -> f64 {
    if kappa > 0.0 {
        sigma * sigma * (1.0 - (-2.0 * kappa * dt).exp()) / (2.0 * kappa)
    } else {
        sigma * sigma * dt
    }
}

fn step_kernel(
    step: usize,
    half_width: usize,
    next_half_width: usize,
    variance: f64,
    dx: f64,
    decay: f64,
    diagnostics: &mut Vec<ToleranceWarning>,
) -> StepKernel {
    let w = half_width as i64;
    let wn = next_half_width as i64;
    let dx2 = dx * dx;

    let branches = (-w..=w)
        .map(|j| {
            let mean = j as f64 * dx * decay;
            let k = ((mean / dx).round() as i64).clamp(1 - wn, wn - 1);
            let eta = mean - k as f64 * dx;

            let second = variance + eta * eta;
            let mut p = [
                (second - eta * dx) / (2.0 * dx2),
                1.0 - second / dx2,
                (second + eta * dx) / (2.0 * dx2),
            ];
            let min_probability = p.iter().copied().fold(f64::INFINITY, f64::min);
            if min_probability < 0.0 {
                diagnostics.push(ToleranceWarning {
                    step,
                    node: j,
                    min_probability,
                });
                for q in &mut p {
                    *q = q.max(0.0);
                }
                let total: f64 = p.iter().sum();
                for q in &mut p {
                    *q /= total;
                }
            }
            ((k - 1 + wn) as usize, p)
        })
        .collect();

    StepKernel {
        half_width,
        next_half_width,
        branches,
    }
}

/// Chains the step kernels of one period into a period-to-period transition.
fn compose(node: usize, kernels: &[StepKernel]) -> Transition {
    let Some(first) = kernels.first() else {
        return Transition {
            first_child: node,
            probabilities: vec![1.0],
        };
    };

    let mut dist = vec![0.0; 2 * first.half_width + 1];
    dist[node] = 1.0;
    for kernel in kernels {
        let mut next = vec![0.0; 2 * kernel.next_half_width + 1];
        for (q, (down, p)) in dist.iter().zip(&kernel.branches) {
            if *q == 0.0 {
                continue;
            }
            for (offset, pk) in p.iter().enumerate() {
                next[down + offset] += q * pk;
            }
        }
        dist = next;
    }

    let first_child = dist.iter().position(|&p| p > 0.0).unwrap_or(0);
    let last_child = dist.iter().rposition(|&p| p > 0.0).unwrap_or(first_child);
    Transition {
        first_child,
        probabilities: dist[first_child..=last_child].to_vec(),
    }
}

/// Spot prices of a layer of half width `w` whose expectation under
/// `marginals` equals `forward`.
fn fitted_prices(forward: f64, marginals: &[f64], w: usize, dx: f64) -> Vec<f64> {
    let shape: Vec<f64> = (0..=2 * w)
        .map(|i| ((i as f64 - w as f64) * dx).exp())
        .collect();
    let mean: f64 = shape.iter().zip(marginals).map(|(s, q)| s * q).sum();
    shape.iter().map(|s| forward * s / mean).collect()
}
