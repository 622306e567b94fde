//! Search configuration.

use std::num::NonZeroUsize;
use std::thread;
use std::time::Duration;

use commitpow_error::{PowError, Result};
use commitpow_record::StrategyChoice;
use commitpow_types::OBJECT_ID_BITS;
use serde::{Deserialize, Serialize};

/// Default number of leading zero bits requested.
pub const DEFAULT_TARGET_BITS: u32 = 32;

/// Tunables for one search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Leading zero bits the winning digest must have.
    pub target_bits: u32,
    /// Worker threads; also the stride between a worker's states.
    pub threads: usize,
    /// Mutation family.
    pub strategy: StrategyChoice,
    /// How often the coordinator wakes to report progress.
    pub progress_interval_ms: u64,
    /// Attempts a worker counts locally before publishing them.
    pub attempt_batch: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            target_bits: DEFAULT_TARGET_BITS,
            threads: default_threads(),
            strategy: StrategyChoice::Auto,
            progress_interval_ms: 1000,
            attempt_batch: 256,
        }
    }
}

impl SearchConfig {
    /// Reject values no search can run with.
    pub fn validate(&self) -> Result<()> {
        if self.target_bits > OBJECT_ID_BITS {
            return Err(PowError::InvalidTarget {
                bits: self.target_bits,
                max: OBJECT_ID_BITS,
            });
        }
        if self.threads == 0 {
            return Err(PowError::InvalidThreadCount);
        }
        if self.progress_interval_ms == 0 {
            return Err(PowError::config("progress_interval_ms must be positive"));
        }
        if self.attempt_batch == 0 {
            return Err(PowError::config("attempt_batch must be positive"));
        }
        Ok(())
    }

    #[must_use]
    pub const fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

/// Available parallelism, or 1 when it cannot be queried.
#[must_use]
pub fn default_threads() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}
