//! Progress reporting for the voting passes.
//!
//! A run consists of several stages (normal voting, curvature voting and,
//! for RVV, every refinement round). Each stage processes all graph nodes in
//! parallel; workers bump a shared atomic counter and the counter forwards
//! throttled updates to a caller-supplied [`Progress`] callback.
//!
//! # Example
//!
//! ```
//! use vvcurv::algo::Progress;
//!
//! let progress = Progress::new(|current, total, message| {
//!     eprintln!("[{current}/{total}] {message}");
//! });
//! progress.report(1, 2, "normal voting");
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

/// A progress callback that receives updates during long-running operations.
///
/// The callback receives:
/// - `current`: Current step
/// - `total`: Total number of steps
/// - `message`: Description of the current stage
///
/// It is called concurrently from worker threads and must be cheap.
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report progress.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        (self.callback)(current, total, message);
    }

    /// Report progress within one stage of a multi-stage run.
    ///
    /// Maps `[0, sub_total]` onto `[stage, stage + 1]` out of `stages`, in
    /// thousandths, so the callback always sees one monotone scale for the
    /// whole run.
    #[inline]
    pub fn report_sub(
        &self,
        sub_current: usize,
        sub_total: usize,
        stage: usize,
        stages: usize,
        message: &str,
    ) {
        if sub_total == 0 || stages == 0 {
            return;
        }
        let sub_fraction = (sub_current.min(sub_total) * 1000) / sub_total;
        let effective = stage * 1000 + sub_fraction;
        (self.callback)(effective, stages * 1000, message);
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

/// Position of a pass within a run.
#[derive(Debug, Clone, Copy)]
pub struct Stage<'a> {
    /// Zero-based stage index.
    pub index: usize,
    /// Total number of stages in the run.
    pub count: usize,
    /// Label passed to the callback.
    pub label: &'a str,
}

impl<'a> Stage<'a> {
    /// A run consisting of this single stage.
    pub fn single(label: &'a str) -> Self {
        Self {
            index: 0,
            count: 1,
            label,
        }
    }
}

/// Number of updates forwarded per stage.
const UPDATES_PER_STAGE: usize = 100;

/// Shared node counter for one parallel stage.
pub(crate) struct StageCounter<'a> {
    progress: &'a Progress,
    stage: Stage<'a>,
    done: AtomicUsize,
    total: usize,
    stride: usize,
}

impl<'a> StageCounter<'a> {
    pub(crate) fn new(progress: &'a Progress, stage: Stage<'a>, total: usize) -> Self {
        Self {
            progress,
            stage,
            done: AtomicUsize::new(0),
            total,
            stride: (total / UPDATES_PER_STAGE).max(1),
        }
    }

    /// Record one finished node.
    #[inline]
    pub(crate) fn tick(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if done % self.stride == 0 || done == self.total {
            self.progress.report_sub(
                done,
                self.total,
                self.stage.index,
                self.stage.count,
                self.stage.label,
            );
        }
    }

    /// Number of nodes finished so far.
    pub(crate) fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }
}
