//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::info;

use crate::context::SharedSearchContext;

/// Cloneable handle that stops a running search.
///
/// Cancellation is sticky: a token cancelled before a search starts makes
/// that search return `Cancelled` without attempting anything. Workers
/// observe it at their next loop-top check.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

#[derive(Debug, Default)]
struct TokenInner {
    requested: AtomicBool,
    search: Mutex<Option<Weak<SharedSearchContext>>>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        if !self.inner.requested.swap(true, Ordering::AcqRel) {
            info!("cancellation requested");
        }
        let search = self.inner.search.lock().as_ref().and_then(Weak::upgrade);
        if let Some(ctx) = search {
            ctx.cancel();
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.requested.load(Ordering::Acquire)
    }

    /// Route cancellation to `ctx` for the duration of a search.
    pub(crate) fn attach(&self, ctx: &Arc<SharedSearchContext>) {
        *self.inner.search.lock() = Some(Arc::downgrade(ctx));
        if self.is_cancelled() {
            ctx.cancel();
        }
    }

    pub(crate) fn detach(&self) {
        *self.inner.search.lock() = None;
    }
}
