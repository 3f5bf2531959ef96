//! Conditional parallel iteration.
//!
//! Within one period the values at distinct grid points (and tree nodes)
//! are independent, so they can be computed in parallel. Periods are
//! always processed in sequence.

use crate::config::ValuationConfig;

/// Maps a function over items, conditionally using parallel iteration.
///
/// Uses parallel iteration when:
/// - The `parallel` feature is enabled
/// - `config.parallel` is true
/// - The collection size reaches `config.parallel_threshold`
#[allow(unused_variables)]
pub fn maybe_parallel_map<T, U, F>(items: &[T], config: &ValuationConfig, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        if config.should_parallelize(items.len()) {
            return items.par_iter().map(f).collect();
        }
    }

    items.iter().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maybe_parallel_map() {
        let items: Vec<usize> = (0..100).collect();
        let sequential = maybe_parallel_map(&items, &ValuationConfig::sequential(), |x| x * 2);
        let parallel = maybe_parallel_map(&items, &ValuationConfig::new().with_threshold(1), |x| x * 2);
        assert_eq!(sequential, parallel);
        assert_eq!(sequential[99], 198);
    }
}
