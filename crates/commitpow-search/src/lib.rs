//! Multi-threaded search for a commit digest with leading zero bits.
//!
//! [`search`] / [`Searcher::run`] drive the whole thing: workers enumerate
//! disjoint strides of a template's state space, the first qualifying
//! record wins, and the winner is rechecked from a cold start before it is
//! returned. A [`CancellationToken`] stops the search cooperatively; that is
//! an outcome, not an error.

pub mod cancel;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod observer;
pub mod verifier;
pub mod worker;

pub use cancel::CancellationToken;
pub use config::{DEFAULT_TARGET_BITS, SearchConfig, default_threads};
pub use context::{ProgressSnapshot, SharedSearchContext};
pub use coordinator::{SearchOutcome, Searcher, search};
pub use observer::{NoOpObserver, ProgressObserver, mega_hashes_per_second};
pub use verifier::verify;
