//! Fixed-size worker pool over independent units of work.
//!
//! Every unit's outcome is collected, in unit order, before the failure
//! policy decides whether the run succeeded. Units write disjoint outputs, so
//! no state is shared between workers.

use crate::Result;
use crate::config::{FailurePolicy, Workers};
use crate::error::TrendifyError;

use anyhow::{Context, anyhow};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error};

/// Apply `work` to every unit and return the results in unit order.
///
/// With one worker the units run on the calling thread and the first error is
/// returned with its full context. With more workers a rayon pool is used;
/// under [`FailurePolicy::Abort`] units not yet started are skipped once any
/// unit fails, and the earliest failure in unit order is returned. Under
/// [`FailurePolicy::Continue`] every unit runs and all failures are returned
/// together as [`TrendifyError::WorkerFailures`].
pub fn run_units<T, R, L, F>(
    units: &[T],
    workers: Workers,
    policy: FailurePolicy,
    label: L,
    work: F,
) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    L: Fn(&T) -> PathBuf + Sync,
    F: Fn(&T) -> Result<R> + Sync,
{
    let outcomes: Vec<Option<Result<R>>> = if workers.is_sequential() {
        let mut out = Vec::with_capacity(units.len());
        for unit in units {
            let result = work(unit);
            let failed = result.is_err();
            out.push(Some(result));
            if failed && policy == FailurePolicy::Abort {
                break;
            }
        }
        out
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.get())
            .build()
            .context("build worker pool")?;
        debug!(workers = workers.get(), units = units.len(), "dispatching to pool");

        let stop = AtomicBool::new(false);
        pool.install(|| {
            units
                .par_iter()
                .map(|unit| {
                    if stop.load(Ordering::Relaxed) {
                        return None;
                    }
                    let result = work(unit);
                    if result.is_err() && policy == FailurePolicy::Abort {
                        stop.store(true, Ordering::Relaxed);
                    }
                    Some(result)
                })
                .collect()
        })
    };

    let mut results = Vec::with_capacity(units.len());
    let mut failures = Vec::new();
    for (unit, outcome) in units.iter().zip(outcomes) {
        match outcome {
            Some(Ok(r)) => results.push(r),
            Some(Err(e)) => {
                let unit = label(unit);
                if policy == FailurePolicy::Abort {
                    return Err(e.context(format!("work unit {} failed", unit.display())));
                }
                error!(unit = %unit.display(), error = %format!("{:#}", e), "work unit failed");
                failures.push((unit, format!("{:#}", e)));
            }
            // Skipped after an abort; the failing unit is reported above.
            None => {}
        }
    }

    if !failures.is_empty() {
        return Err(TrendifyError::WorkerFailures { failures }.into());
    }
    if results.len() != units.len() {
        return Err(anyhow!("worker pool dropped {} units", units.len() - results.len()));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;

    fn label(n: &u32) -> PathBuf {
        PathBuf::from(n.to_string())
    }

    #[test]
    fn results_keep_unit_order() {
        let units: Vec<u32> = (0..64).collect();
        for workers in [Workers::SEQUENTIAL, Workers::new(4)] {
            let out =
                run_units(&units, workers, FailurePolicy::Abort, label, |n| Ok(n * 2)).unwrap();
            assert_eq!(out, units.iter().map(|n| n * 2).collect::<Vec<_>>());
        }
    }

    #[test]
    fn sequential_abort_stops_at_first_failure() {
        let calls = AtomicUsize::new(0);
        let units = vec![1u32, 2, 3, 4];
        let err = run_units(&units, Workers::SEQUENTIAL, FailurePolicy::Abort, label, |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            if *n == 2 {
                bail!("boom on {}", n);
            }
            Ok(())
        })
        .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let text = format!("{:#}", err);
        assert!(text.contains("work unit 2 failed"), "{text}");
        assert!(text.contains("boom on 2"), "{text}");
    }

    #[test]
    fn continue_reports_every_failure() {
        let units: Vec<u32> = (0..10).collect();
        let completed = AtomicUsize::new(0);
        let err = run_units(&units, Workers::new(3), FailurePolicy::Continue, label, |n| {
            if n % 3 == 0 {
                bail!("bad unit");
            }
            completed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap_err();
        assert_eq!(completed.load(Ordering::SeqCst), 6);
        match err.downcast_ref::<TrendifyError>() {
            Some(TrendifyError::WorkerFailures { failures }) => {
                let failed: Vec<PathBuf> = failures.iter().map(|(u, _)| u.clone()).collect();
                assert_eq!(failed, vec![label(&0), label(&3), label(&6), label(&9)]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn parallel_abort_reports_the_failing_unit() {
        let units: Vec<u32> = (0..32).collect();
        let err = run_units(&units, Workers::new(4), FailurePolicy::Abort, label, |n| {
            if *n == 5 {
                bail!("boom on {}", n);
            }
            Ok(())
        })
        .unwrap_err();
        let text = format!("{:#}", err);
        assert!(text.contains("work unit 5 failed"), "{text}");
        assert!(text.contains("boom on 5"), "{text}");
        assert!(err.downcast_ref::<TrendifyError>().is_none());
    }
}
