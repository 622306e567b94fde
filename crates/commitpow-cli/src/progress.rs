//! Console rendering of search progress and results.

use std::io::{self, Write};
use std::time::Duration;

use commitpow::{
    MineReport, ProgressObserver, ProgressSnapshot, SearchOutcome, mega_hashes_per_second,
};

/// Rewrites one status line on stderr each interval.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConsoleProgress {
    target_bits: u32,
}

impl ConsoleProgress {
    pub(crate) const fn new(target_bits: u32) -> Self {
        Self { target_bits }
    }
}

impl ProgressObserver for ConsoleProgress {
    fn on_progress(&self, snapshot: &ProgressSnapshot, elapsed: Duration) {
        let mut err = io::stderr().lock();
        // Progress is advisory; a closed stderr must not stop the search.
        let _ = write!(err, "\r{}", progress_line(snapshot, self.target_bits, elapsed));
        let _ = err.flush();
    }
}

/// `<secs>.<micros>` with six fractional digits.
pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    format!("{}.{:06}", elapsed.as_secs(), elapsed.subsec_micros())
}

pub(crate) fn progress_line(
    snapshot: &ProgressSnapshot,
    target_bits: u32,
    elapsed: Duration,
) -> String {
    format!(
        "Runs: {:>12} Best found: {} ({}/{} bits) Time: {} ~{:.6}MH/s",
        snapshot.attempts,
        snapshot.best_digest,
        snapshot.best_bits,
        target_bits,
        format_elapsed(elapsed),
        mega_hashes_per_second(snapshot.attempts, elapsed),
    )
}

/// Human-readable result lines, as printed on stdout.
pub(crate) fn summary_lines(report: &MineReport) -> Vec<String> {
    let mut lines = Vec::with_capacity(2);
    match &report.outcome {
        SearchOutcome::Found { digest, .. } => {
            let suffix = if report.written.is_some() { "" } else { " (dry run)" };
            lines.push(format!("Found commit hash {digest}{suffix}"));
        }
        SearchOutcome::Cancelled { .. } => lines.push("User cancelled".to_owned()),
    }
    lines.push(format!(
        "Stats: {} attempts in {}",
        report.outcome.attempts(),
        format_elapsed(report.outcome.elapsed())
    ));
    lines
}
