//! State shared between the coordinator and its workers.
//!
//! Progress (attempt count, best digest so far) is best-effort. The attempt
//! count and best bit count are relaxed atomics. The best digest is 20 bytes
//! and must stay paired with its bit count, so it sits behind a small lock;
//! workers only take it on a strict improvement, which happens a few dozen
//! times per search, and the unlocked `best_bits` check filters the rest.
//! Winner selection is
//! exact: the first worker to enter [`SharedSearchContext::try_accept`] while
//! the search is unfinished wins, everyone after it is discarded.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use commitpow_types::ObjectId;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;

/// Point-in-time view of a running search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    /// Attempts published so far; lags the true count by at most one batch
    /// per worker.
    pub attempts: u64,
    /// Leading zero bits of the best digest seen.
    pub best_bits: u32,
    /// Best digest seen, [`ObjectId::ZERO`] before the first report.
    pub best_digest: ObjectId,
}

/// Record bytes and digest of the accepted attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner {
    pub worker: usize,
    pub record: Vec<u8>,
    pub digest: ObjectId,
}

#[derive(Debug)]
enum Phase {
    Running,
    Won(Winner),
    Cancelled,
    Taken,
}

/// Why [`SharedSearchContext::wait`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// A winner was accepted or the search was cancelled.
    Finished,
    /// Every worker ran out of states.
    Exhausted,
    /// The interval elapsed with nothing to report.
    TimedOut,
}

/// Shared by the coordinator, every worker, and an attached cancellation
/// token.
#[derive(Debug)]
pub struct SharedSearchContext {
    target_bits: u32,
    workers: usize,
    finished: AtomicBool,
    attempts: AtomicU64,
    best_bits: AtomicU32,
    best: Mutex<(u32, ObjectId)>,
    exhausted: AtomicUsize,
    phase: Mutex<Phase>,
    wake: Condvar,
}

impl SharedSearchContext {
    #[must_use]
    pub fn new(target_bits: u32, workers: usize) -> Self {
        Self {
            target_bits,
            workers,
            finished: AtomicBool::new(false),
            attempts: AtomicU64::new(0),
            best_bits: AtomicU32::new(0),
            best: Mutex::new((0, ObjectId::ZERO)),
            exhausted: AtomicUsize::new(0),
            phase: Mutex::new(Phase::Running),
            wake: Condvar::new(),
        }
    }

    #[must_use]
    pub const fn target_bits(&self) -> u32 {
        self.target_bits
    }

    /// Checked by workers at the top of every iteration. Monotonic.
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Progress
    // -----------------------------------------------------------------------

    #[inline]
    pub fn add_attempts(&self, n: u64) {
        if n > 0 {
            self.attempts.fetch_add(n, Ordering::Relaxed);
        }
    }

    /// Publish `digest` if it beats the best seen so far.
    ///
    /// Concurrent publishers may race; the only permitted anomaly is a
    /// losing publisher's better value being dropped.
    pub fn publish_best(&self, bits: u32, digest: ObjectId) {
        if bits <= self.best_bits.load(Ordering::Relaxed) {
            return;
        }
        let mut best = self.best.lock();
        if bits > best.0 {
            *best = (bits, digest);
            self.best_bits.store(bits, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        let (best_bits, best_digest) = *self.best.lock();
        ProgressSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            best_bits,
            best_digest,
        }
    }

    // -----------------------------------------------------------------------
    // Termination
    // -----------------------------------------------------------------------

    /// Offer a qualifying record. Returns `true` for the single winner.
    pub fn try_accept(&self, worker: usize, record: &[u8], digest: ObjectId) -> bool {
        let mut phase = self.phase.lock();
        if self.finished.load(Ordering::Acquire) {
            return false;
        }
        *phase = Phase::Won(Winner {
            worker,
            record: record.to_vec(),
            digest,
        });
        self.finished.store(true, Ordering::Release);
        self.wake.notify_all();
        true
    }

    /// Stop the search without a winner. Returns `false` if it had already
    /// finished.
    pub fn cancel(&self) -> bool {
        let mut phase = self.phase.lock();
        if self.finished.load(Ordering::Acquire) {
            return false;
        }
        *phase = Phase::Cancelled;
        self.finished.store(true, Ordering::Release);
        self.wake.notify_all();
        true
    }

    /// Called by a worker that has enumerated its whole share.
    pub fn mark_exhausted(&self) {
        let _phase = self.phase.lock();
        self.exhausted.fetch_add(1, Ordering::AcqRel);
        self.wake.notify_all();
    }

    /// Whether every worker has reported exhaustion.
    #[must_use]
    pub fn all_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Acquire) >= self.workers
    }

    /// Whether the search ended through [`Self::cancel`].
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        matches!(*self.phase.lock(), Phase::Cancelled)
    }

    /// Block until the search finishes, every worker is exhausted, or
    /// `interval` elapses.
    pub fn wait(&self, interval: Duration) -> WaitStatus {
        let mut phase = self.phase.lock();
        if !self.is_finished() && !self.all_exhausted() {
            self.wake.wait_for(&mut phase, interval);
        }
        if self.is_finished() {
            WaitStatus::Finished
        } else if self.all_exhausted() {
            WaitStatus::Exhausted
        } else {
            WaitStatus::TimedOut
        }
    }

    /// Take the accepted winner, if any. Subsequent calls return `None`.
    pub fn take_winner(&self) -> Option<Winner> {
        let mut phase = self.phase.lock();
        match std::mem::replace(&mut *phase, Phase::Taken) {
            Phase::Won(winner) => Some(winner),
            other => {
                *phase = other;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn id(first: u8) -> ObjectId {
        let mut bytes = [0xff_u8; 20];
        bytes[0] = first;
        ObjectId::from_bytes(bytes)
    }

    #[test]
    fn test_only_first_acceptance_wins() {
        let ctx = SharedSearchContext::new(8, 2);
        assert!(ctx.try_accept(0, b"first", id(0)));
        assert!(!ctx.try_accept(1, b"second", id(0)));
        assert!(!ctx.cancel(), "cancel after a win is a no-op");
        let winner = ctx.take_winner().expect("winner recorded");
        assert_eq!(winner.worker, 0);
        assert_eq!(winner.record, b"first");
        assert!(ctx.take_winner().is_none());
    }

    #[test]
    fn test_cancel_blocks_later_acceptance() {
        let ctx = SharedSearchContext::new(8, 1);
        assert!(ctx.cancel());
        assert!(ctx.is_finished());
        assert!(ctx.was_cancelled());
        assert!(!ctx.try_accept(0, b"late", id(0)));
        assert!(ctx.take_winner().is_none());
    }

    #[test]
    fn test_publish_best_keeps_strict_improvements() {
        let ctx = SharedSearchContext::new(32, 1);
        ctx.publish_best(3, id(0x10));
        ctx.publish_best(2, id(0x20));
        ctx.publish_best(3, id(0x11));
        let snap = ctx.snapshot();
        assert_eq!(snap.best_bits, 3);
        assert_eq!(snap.best_digest, id(0x10));
        ctx.add_attempts(7);
        ctx.add_attempts(0);
        assert_eq!(ctx.snapshot().attempts, 7);
    }

    #[test]
    fn test_wait_times_out_then_sees_winner() {
        let ctx = Arc::new(SharedSearchContext::new(1, 1));
        assert_eq!(ctx.wait(Duration::from_millis(5)), WaitStatus::TimedOut);
        let worker = {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || ctx.try_accept(0, b"r", id(0)))
        };
        assert!(worker.join().expect("worker thread"));
        assert_eq!(ctx.wait(Duration::from_secs(5)), WaitStatus::Finished);
    }

    #[test]
    fn test_wait_reports_exhaustion() {
        let ctx = SharedSearchContext::new(1, 2);
        ctx.mark_exhausted();
        assert!(!ctx.all_exhausted());
        ctx.mark_exhausted();
        assert_eq!(ctx.wait(Duration::from_secs(5)), WaitStatus::Exhausted);
    }

    #[test]
    fn test_concurrent_publishers_keep_the_maximum() {
        let ctx = Arc::new(SharedSearchContext::new(160, 8));
        let handles: Vec<_> = (0..8_u8)
            .map(|worker| {
                let ctx = Arc::clone(&ctx);
                thread::spawn(move || {
                    for bits in 0..=u32::from(worker) * 4 {
                        ctx.publish_best(bits, id(worker));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("publisher thread");
        }
        let snap = ctx.snapshot();
        assert_eq!(snap.best_bits, 28);
        assert_eq!(snap.best_digest, id(7));
    }

    #[test]
    fn test_racing_acceptors_have_one_winner() {
        let ctx = Arc::new(SharedSearchContext::new(0, 8));
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let ctx = Arc::clone(&ctx);
                thread::spawn(move || ctx.try_accept(worker, b"r", id(0)))
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }
}
