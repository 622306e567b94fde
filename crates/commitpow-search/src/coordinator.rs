//! Search coordinator.
//!
//! Spawns one worker per thread, each seeded with `(worker_index, threads)`
//! so their states are disjoint, then sleeps on the shared context until a
//! worker wins, the token cancels, or every worker runs dry. Progress is
//! reported to the observer on each interval wake. The winner is verified
//! from a cold start before it is returned.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use commitpow_digest::DigestEngine;
use commitpow_error::{PowError, Result};
use commitpow_record::RecordTemplate;
use commitpow_types::{OBJECT_ID_BITS, ObjectId};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::config::SearchConfig;
use crate::context::{SharedSearchContext, WaitStatus};
use crate::observer::{NoOpObserver, ProgressObserver};
use crate::verifier::verify;
use crate::worker::{self, WorkerExit};

/// Result of a search that neither failed nor exhausted its space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SearchOutcome {
    Found {
        #[serde(skip)]
        record_bytes: Vec<u8>,
        digest: ObjectId,
        attempts: u64,
        elapsed: Duration,
    },
    Cancelled {
        attempts: u64,
        elapsed: Duration,
    },
}

impl SearchOutcome {
    #[must_use]
    pub const fn attempts(&self) -> u64 {
        match self {
            Self::Found { attempts, .. } | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        match self {
            Self::Found { elapsed, .. } | Self::Cancelled { elapsed, .. } => *elapsed,
        }
    }

    #[must_use]
    pub const fn digest(&self) -> Option<ObjectId> {
        match self {
            Self::Found { digest, .. } => Some(*digest),
            Self::Cancelled { .. } => None,
        }
    }
}

/// Search with default batching and no progress reporting.
pub fn search(
    template: &RecordTemplate,
    target_bits: u32,
    threads: usize,
    token: &CancellationToken,
) -> Result<SearchOutcome> {
    Searcher::new(target_bits, threads).run(template, token)
}

/// A configured search, reusable across templates.
#[derive(Debug, Clone)]
pub struct Searcher<O = NoOpObserver> {
    target_bits: u32,
    threads: usize,
    attempt_batch: u64,
    progress_interval: Duration,
    observer: O,
}

impl Searcher<NoOpObserver> {
    #[must_use]
    pub fn new(target_bits: u32, threads: usize) -> Self {
        let defaults = SearchConfig::default();
        Self {
            target_bits,
            threads,
            attempt_batch: defaults.attempt_batch,
            progress_interval: defaults.progress_interval(),
            observer: NoOpObserver,
        }
    }

    /// Build from a validated config.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.target_bits, config.threads)
            .with_attempt_batch(config.attempt_batch)
            .with_progress_interval(config.progress_interval()))
    }
}

impl<O: ProgressObserver> Searcher<O> {
    #[must_use]
    pub fn with_observer<P: ProgressObserver>(self, observer: P) -> Searcher<P> {
        Searcher {
            target_bits: self.target_bits,
            threads: self.threads,
            attempt_batch: self.attempt_batch,
            progress_interval: self.progress_interval,
            observer,
        }
    }

    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    #[must_use]
    pub fn with_attempt_batch(mut self, batch: u64) -> Self {
        self.attempt_batch = batch.max(1);
        self
    }

    /// Search `template` until a digest with `target_bits` leading zero
    /// bits is found or `token` is cancelled.
    ///
    /// # Errors
    ///
    /// Structural errors before any worker starts; `VerificationFailed` if
    /// the winner does not survive a cold recheck; `WorkerPanicked`;
    /// `SearchSpaceExhausted` if every worker runs out of states.
    pub fn run(
        &self,
        template: &RecordTemplate,
        token: &CancellationToken,
    ) -> Result<SearchOutcome> {
        if self.target_bits > OBJECT_ID_BITS {
            return Err(PowError::InvalidTarget {
                bits: self.target_bits,
                max: OBJECT_ID_BITS,
            });
        }
        if self.threads == 0 {
            return Err(PowError::InvalidThreadCount);
        }
        // Surface strategy errors before spawning anything.
        template.strategy_for(self.threads - 1, self.threads)?;

        let ctx = Arc::new(SharedSearchContext::new(self.target_bits, self.threads));
        token.attach(&ctx);
        let start = Instant::now();
        info!(
            target_bits = self.target_bits,
            threads = self.threads,
            strategy = template.strategy().name(),
            record_len = template.bytes().len(),
            "search started"
        );

        let joined = self.drive(template, &ctx, start);
        token.detach();
        let exits = joined?;

        let elapsed = start.elapsed();
        let attempts = ctx.snapshot().attempts;
        debug!(?exits, attempts, "workers joined");

        if let Some(winner) = ctx.take_winner() {
            let engine = DigestEngine::new(template.kind());
            let digest = verify(&engine, &winner.record, winner.digest, self.target_bits)?;
            info!(
                %digest,
                worker = winner.worker,
                attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                "search succeeded"
            );
            return Ok(SearchOutcome::Found {
                record_bytes: winner.record,
                digest,
                attempts,
                elapsed,
            });
        }
        if ctx.was_cancelled() {
            info!(attempts, "search cancelled");
            return Ok(SearchOutcome::Cancelled { attempts, elapsed });
        }
        warn!(attempts, "search space exhausted");
        Err(PowError::SearchSpaceExhausted { attempts })
    }

    fn drive(
        &self,
        template: &RecordTemplate,
        ctx: &SharedSearchContext,
        start: Instant,
    ) -> Result<Vec<WorkerExit>> {
        let (threads, batch) = (self.threads, self.attempt_batch);
        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(threads);
            for index in 0..threads {
                let spawned = thread::Builder::new()
                    .name(format!("commitpow-worker-{index}"))
                    .spawn_scoped(scope, move || worker::run(index, threads, template, ctx, batch));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(err) => {
                        ctx.cancel();
                        return Err(PowError::Io(err));
                    }
                }
            }

            loop {
                match ctx.wait(self.progress_interval) {
                    WaitStatus::Finished | WaitStatus::Exhausted => break,
                    WaitStatus::TimedOut => {
                        self.observer.on_progress(&ctx.snapshot(), start.elapsed());
                    }
                }
            }

            let mut exits = Vec::with_capacity(handles.len());
            let mut first_error = None;
            for (index, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(Ok(exit)) => exits.push(exit),
                    Ok(Err(err)) => {
                        first_error.get_or_insert(err);
                    }
                    Err(_) => {
                        first_error.get_or_insert(PowError::WorkerPanicked { worker: index });
                    }
                }
            }
            first_error.map_or(Ok(exits), Err)
        })
    }
}
