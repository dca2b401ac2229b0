//! Parallel executor for per-architecture work
//!
//! Uses Rayon for work-stealing parallelism with configurable limits.

use crate::error::{Error, Result};
use rayon::prelude::*;

/// Configuration for parallel execution
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Maximum number of worker threads (default: num_cpus)
    pub max_parallelism: usize,
    /// Stop at the first failing item instead of reporting the first in input order
    pub fail_fast: bool,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_parallelism: num_cpus::get(),
            fail_fast: false,
        }
    }
}

/// Run `compile` over every item on a thread pool
///
/// Results keep the order of `items`. Without `fail_fast` every item runs to
/// completion and the error of the earliest failing item is returned, so the
/// reported error does not depend on scheduling.
pub fn compile_parallel<T, R, F>(items: &[T], compile: F, config: &ParallelConfig) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R> + Send + Sync,
{
    // Single item - no parallelism needed
    if items.len() <= 1 {
        return items.iter().map(&compile).collect();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.max_parallelism.clamp(1, items.len()))
        .build()
        .map_err(|e| Error::ThreadPool(e.to_string()))?;

    pool.install(|| {
        if config.fail_fast {
            items.par_iter().map(|item| compile(item)).collect()
        } else {
            let results: Vec<Result<R>> = items.par_iter().map(|item| compile(item)).collect();
            results.into_iter().collect()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_preserved() {
        let items: Vec<u64> = (0..16).collect();
        let results =
            compile_parallel(&items, |n| Ok(n * 2), &ParallelConfig::default()).unwrap();
        assert_eq!(results, (0..16).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty() {
        let items: Vec<u64> = vec![];
        let results = compile_parallel(&items, |n| Ok(*n), &ParallelConfig::default()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_first_error_in_input_order() {
        let items = vec!["amd64", "bad1", "arm64", "bad2"];
        let config = ParallelConfig {
            max_parallelism: 4,
            fail_fast: false,
        };
        let err = compile_parallel(
            &items,
            |name| {
                if name.starts_with("bad") {
                    Err(Error::BadDirection(name.to_string()))
                } else {
                    Ok(name.len())
                }
            },
            &config,
        )
        .unwrap_err();
        assert_eq!(err, Error::BadDirection("bad1".to_string()));
    }

    #[test]
    fn test_fail_fast_reports_an_error() {
        let items = vec![1u64, 2, 3];
        let config = ParallelConfig {
            fail_fast: true,
            ..Default::default()
        };
        let result = compile_parallel(
            &items,
            |n| {
                if *n == 2 {
                    Err(Error::InvalidLiteral(n.to_string()))
                } else {
                    Ok(*n)
                }
            },
            &config,
        );
        assert!(result.is_err());
    }
}
