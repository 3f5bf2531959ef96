//! Stochastic valuation on a trinomial spot price tree.

mod trinomial;
mod valuation;

pub use trinomial::{Transition, TreeLayer, TrinomialTree};
pub use valuation::{tree_value, trinomial_value, TreeResult};
