//! Progress observation.
//!
//! The coordinator calls its observer from its own thread each time the
//! progress interval elapses. Implementations must not block for long: the
//! coordinator does not poll cancellation while an observer runs.

use std::time::Duration;

use crate::context::ProgressSnapshot;

/// Receives periodic progress reports from a running search.
pub trait ProgressObserver {
    fn on_progress(&self, snapshot: &ProgressSnapshot, elapsed: Duration);
}

/// Observer that ignores every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl ProgressObserver for NoOpObserver {
    #[inline]
    fn on_progress(&self, _snapshot: &ProgressSnapshot, _elapsed: Duration) {}
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressSnapshot, Duration),
{
    fn on_progress(&self, snapshot: &ProgressSnapshot, elapsed: Duration) {
        self(snapshot, elapsed);
    }
}

/// Attempts per second over `elapsed`, in millions.
#[must_use]
pub fn mega_hashes_per_second(attempts: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    attempts as f64 / secs / 1_000_000.0
}
