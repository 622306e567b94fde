//! SIGINT handling.
//!
//! SIGINT is blocked in the calling thread, and so in every thread spawned
//! after it, and a dedicated thread waits for it synchronously and cancels
//! the token. Must run before any worker thread is spawned.

use commitpow::{CancellationToken, Result};

#[cfg(unix)]
pub(crate) fn route_interrupt(token: CancellationToken) -> Result<()> {
    use std::thread;

    use commitpow::PowError;
    use nix::sys::signal::{SigSet, Signal};
    use tracing::{debug, warn};

    let mut mask = SigSet::empty();
    mask.add(Signal::SIGINT);
    mask.thread_block()
        .map_err(|err| PowError::internal(format!("cannot block SIGINT: {err}")))?;

    thread::Builder::new()
        .name("commitpow-sigint".to_owned())
        .spawn(move || match mask.wait() {
            Ok(signal) => {
                debug!(?signal, "received signal");
                token.cancel();
            }
            Err(err) => warn!(%err, "waiting for SIGINT failed"),
        })?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn route_interrupt(_token: CancellationToken) -> Result<()> {
    Ok(())
}
