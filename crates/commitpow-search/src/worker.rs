//! Search worker loop.

use commitpow_digest::DigestEngine;
use commitpow_error::Result;
use commitpow_record::{MutationStrategy, RecordTemplate, Step};
use tracing::{debug, info, trace};

use crate::context::SharedSearchContext;

/// How a worker's loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// This worker's record was accepted.
    Won,
    /// Found a qualifying record after another worker had already won.
    Lost,
    /// Observed `finished` at the top of the loop.
    Stopped,
    /// Enumerated its whole share without a match.
    Exhausted,
}

/// Stops the search if the worker unwinds, so the coordinator never waits
/// on a worker that will not report.
struct PanicGuard<'a> {
    worker: usize,
    ctx: &'a SharedSearchContext,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            debug!(worker = self.worker, "worker unwinding, stopping search");
            self.ctx.cancel();
        }
    }
}

/// Run worker `index` of `stride` until the search finishes or this
/// worker's share of the state space runs out.
pub fn run(
    index: usize,
    stride: usize,
    template: &RecordTemplate,
    ctx: &SharedSearchContext,
    batch: u64,
) -> Result<WorkerExit> {
    let _guard = PanicGuard { worker: index, ctx };
    let target = ctx.target_bits();
    let engine = DigestEngine::new(template.kind());
    let mut strategy = template.strategy_for(index, stride)?;
    let mut record = template.bytes().to_vec();
    let prefix_len = strategy.prefix_len();
    let mut state = engine.precompute(record.len(), &record[..prefix_len]);

    debug!(worker = index, stride, prefix_len, "worker started");

    let mut local_best = 0_u32;
    let mut pending = 0_u64;
    let exit = loop {
        if ctx.is_finished() {
            break WorkerExit::Stopped;
        }
        match strategy.advance(&mut record) {
            Step::InPlace => {}
            Step::Resized => {
                state = engine.precompute(record.len(), &record[..prefix_len]);
                debug!(worker = index, record_len = record.len(), "record resized");
            }
            Step::Exhausted => {
                ctx.add_attempts(pending);
                pending = 0;
                ctx.mark_exhausted();
                break WorkerExit::Exhausted;
            }
        }

        let digest = engine.finish_from(&state, &record[prefix_len..]);
        let bits = digest.leading_zero_bits(target);
        pending += 1;

        if bits > local_best {
            local_best = bits;
            ctx.publish_best(bits, digest);
            trace!(worker = index, bits, %digest, "new local best");
        }

        if bits >= target {
            ctx.add_attempts(pending);
            pending = 0;
            if ctx.try_accept(index, &record, digest) {
                info!(worker = index, %digest, position = ?strategy.position(), "found winner");
                break WorkerExit::Won;
            }
            break WorkerExit::Lost;
        }

        if pending >= batch {
            ctx.add_attempts(pending);
            pending = 0;
        }
    };
    ctx.add_attempts(pending);

    debug!(worker = index, exit = ?exit, "worker exited");
    Ok(exit)
}
