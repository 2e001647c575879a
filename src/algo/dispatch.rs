//! Parallel per-node dispatch.
//!
//! The node range `0..n` is split into one contiguous chunk per worker and
//! the chunks run on a dedicated rayon pool of exactly `num_workers`
//! threads. Each worker owns a scratch state created by the caller's `init`
//! closure, produces `(index, value)` pairs for its chunk, and the pairs are
//! written into a pre-sized array by index. Results therefore do not depend
//! on the number of workers or on scheduling.
//!
//! An error returned by the task, or a panic inside it, fails the whole
//! dispatch with a single [`VvError::WorkerFailure`]; partial results are
//! dropped.

use std::any::Any;
use std::ops::Range;
use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, error};

use super::progress::{Progress, Stage, StageCounter};
use crate::error::{Result, VvError};
use crate::mesh::NodeId;

/// A fixed-size worker pool for per-node tasks.
pub struct Dispatcher {
    pool: ThreadPool,
    num_workers: usize,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("num_workers", &self.num_workers)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a pool with `num_workers` threads.
    pub fn new(num_workers: usize) -> Result<Self> {
        if num_workers == 0 {
            return Err(VvError::invalid_param(
                "num_workers",
                num_workers,
                "must be at least 1",
            ));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .thread_name(|i| format!("vv-worker-{i}"))
            .build()
            .map_err(|e| VvError::PoolCreation(e.to_string()))?;
        Ok(Self { pool, num_workers })
    }

    /// Number of workers.
    #[inline]
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Run `task` for every node in `0..n` and collect the results by index.
    ///
    /// `init` is called once per worker to create its scratch state.
    pub fn run<S, T, I, F>(
        &self,
        n: usize,
        progress: &Progress,
        stage: Stage<'_>,
        init: I,
        task: F,
    ) -> Result<Vec<T>>
    where
        T: Send,
        I: Fn() -> S + Sync,
        F: Fn(&mut S, NodeId) -> Result<T> + Sync,
    {
        let chunks = partition(n, self.num_workers);
        let counter = StageCounter::new(progress, stage, n);

        let outcomes: Vec<Result<Vec<(usize, T)>>> = self.pool.install(|| {
            chunks
                .par_iter()
                .enumerate()
                .map(|(worker, range)| {
                    let work = || -> Result<Vec<(usize, T)>> {
                        let mut state = init();
                        let mut out = Vec::with_capacity(range.len());
                        for i in range.clone() {
                            out.push((i, task(&mut state, NodeId::new(i))?));
                            counter.tick();
                        }
                        Ok(out)
                    };
                    let failure = match catch_unwind(AssertUnwindSafe(work)) {
                        Ok(Ok(pairs)) => return Ok(pairs),
                        Ok(Err(e)) => e,
                        Err(payload) => VvError::Panicked(panic_message(payload)),
                    };
                    error!(worker, start = range.start, end = range.end, %failure, "worker failed");
                    Err(VvError::WorkerFailure {
                        worker,
                        range: range.clone(),
                        source: Box::new(failure),
                    })
                })
                .collect()
        });

        let mut slots: Vec<Option<T>> = Vec::with_capacity(n);
        slots.resize_with(n, || None);
        for outcome in outcomes {
            for (i, value) in outcome? {
                slots[i] = Some(value);
            }
        }

        debug!(
            stage = stage.label,
            nodes = counter.done(),
            workers = self.num_workers,
            "dispatch finished"
        );

        let got = slots.iter().filter(|s| s.is_some()).count();
        slots
            .into_iter()
            .collect::<Option<Vec<T>>>()
            .ok_or(VvError::LengthMismatch { expected: n, got })
    }
}

/// Split `0..n` into at most `workers` contiguous, non-empty ranges of
/// nearly equal length.
pub fn partition(n: usize, workers: usize) -> Vec<Range<usize>> {
    if n == 0 || workers == 0 {
        return Vec::new();
    }
    let workers = workers.min(n);
    let base = n / workers;
    let extra = n % workers;

    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0;
    for w in 0..workers {
        let len = base + usize::from(w < extra);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_partition() {
        assert_eq!(partition(10, 3), vec![0..4, 4..7, 7..10]);
        assert_eq!(partition(2, 6), vec![0..1, 1..2]);
        assert_eq!(partition(5, 1), vec![0..5]);
        assert!(partition(0, 4).is_empty());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = Dispatcher::new(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_results_by_index() {
        let progress = Progress::none();
        for workers in [1, 3, 8] {
            let dispatcher = Dispatcher::new(workers).unwrap();
            let out = dispatcher
                .run(
                    37,
                    &progress,
                    Stage::single("square"),
                    || (),
                    |_, n| Ok(n.index() * n.index()),
                )
                .unwrap();
            assert_eq!(out, (0..37).map(|i| i * i).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_worker_state_is_reused() {
        let dispatcher = Dispatcher::new(2).unwrap();
        let out = dispatcher
            .run(
                6,
                &Progress::none(),
                Stage::single("count"),
                || 0usize,
                |seen, _| {
                    *seen += 1;
                    Ok(*seen)
                },
            )
            .unwrap();
        assert_eq!(out, vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn test_error_becomes_worker_failure() {
        let dispatcher = Dispatcher::new(3).unwrap();
        let err = dispatcher
            .run(
                9,
                &Progress::none(),
                Stage::single("fail"),
                || (),
                |_, n| {
                    if n.index() == 5 {
                        Err(VvError::NumericFailure {
                            vertex: 5,
                            reason: "test".into(),
                        })
                    } else {
                        Ok(n.index())
                    }
                },
            )
            .unwrap_err();

        match err {
            VvError::WorkerFailure {
                worker,
                range,
                source,
            } => {
                assert_eq!(worker, 1);
                assert_eq!(range, 3..6);
                assert!(matches!(*source, VvError::NumericFailure { vertex: 5, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_panic_becomes_worker_failure() {
        let dispatcher = Dispatcher::new(2).unwrap();
        let err = dispatcher
            .run(
                4,
                &Progress::none(),
                Stage::single("panic"),
                || (),
                |_, n| -> Result<usize> {
                    if n.index() == 0 {
                        panic!("boom");
                    }
                    Ok(n.index())
                },
            )
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Worker);
        match err {
            VvError::WorkerFailure { worker, source, .. } => {
                assert_eq!(worker, 0);
                assert!(matches!(*source, VvError::Panicked(ref m) if m == "boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
