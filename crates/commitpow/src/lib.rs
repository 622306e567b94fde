//! Rewrite the current commit until its object id starts with a requested
//! number of zero bits.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use commitpow::{CancellationToken, GitRepository, MineOptions, NoOpObserver, mine_head};
//!
//! # fn main() -> commitpow::Result<()> {
//! let repo = GitRepository::discover(Path::new("."))?;
//! let token = CancellationToken::new();
//! let report = mine_head(&repo, &MineOptions::default(), &token, NoOpObserver)?;
//! println!("{:?}", report.outcome.digest());
//! # Ok(())
//! # }
//! ```

use commitpow_digest::DigestEngine;
use serde::Serialize;
use tracing::{debug, info};

pub use commitpow_error::{ErrorClass, PowError, Result};
pub use commitpow_record::{RecordTemplate, StrategyChoice, StrategyKind};
pub use commitpow_repo::{CommitStore, GitRepository, MemoryStore, RecordDescription};
pub use commitpow_search::{
    CancellationToken, NoOpObserver, ProgressObserver, ProgressSnapshot, SearchConfig,
    SearchOutcome, Searcher, mega_hashes_per_second, search,
};
pub use commitpow_types::{OBJECT_ID_BITS, ObjectId, ObjectKind};

/// What [`mine_head`] should do besides searching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MineOptions {
    pub config: SearchConfig,
    /// Search only; leave the object store and branch untouched.
    pub dry_run: bool,
}

/// Summary of one [`mine_head`] run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MineReport {
    /// Commit the branch pointed at before the search.
    pub previous: ObjectId,
    pub strategy: StrategyKind,
    pub target_bits: u32,
    pub threads: usize,
    pub outcome: SearchOutcome,
    /// Set once the winner has been stored and the branch moved to it.
    pub written: Option<ObjectId>,
}

/// Read HEAD from `store`, search for a variant meeting the configured
/// target, and on success store it and move the branch to it.
///
/// A cancelled search leaves the store untouched.
pub fn mine_head<S, O>(
    store: &S,
    options: &MineOptions,
    token: &CancellationToken,
    observer: O,
) -> Result<MineReport>
where
    S: CommitStore + ?Sized,
    O: ProgressObserver,
{
    let config = &options.config;
    config.validate()?;

    let head = store.read_head_commit()?;
    debug!(
        id = %head.id,
        body = %String::from_utf8_lossy(&head.raw),
        "original commit"
    );
    let template = RecordTemplate::build(&head.raw, config.strategy)?;
    let searcher = Searcher::from_config(config)?.with_observer(observer);
    let outcome = searcher.run(&template, token)?;

    let written = match &outcome {
        SearchOutcome::Found {
            record_bytes,
            digest,
            ..
        } => {
            debug!(
                id = %digest,
                body = %String::from_utf8_lossy(record_bytes),
                "mined commit"
            );
            if options.dry_run {
                info!(%digest, "dry run, not writing");
                None
            } else {
                Some(commit_winner(store, template.kind(), record_bytes, *digest)?)
            }
        }
        SearchOutcome::Cancelled { .. } => None,
    };

    Ok(MineReport {
        previous: head.id,
        strategy: template.strategy(),
        target_bits: config.target_bits,
        threads: config.threads,
        outcome,
        written,
    })
}

fn commit_winner<S: CommitStore + ?Sized>(
    store: &S,
    kind: ObjectKind,
    record: &[u8],
    digest: ObjectId,
) -> Result<ObjectId> {
    let stored = store.write_object(kind, record)?;
    if stored != digest {
        return Err(PowError::object_store(format!(
            "store assigned {stored} to the winner, expected {digest}"
        )));
    }
    store.move_branch_head(stored)?;
    Ok(stored)
}

/// Object id `record` would get as a stored object of `kind`.
#[must_use]
pub fn object_id_of(kind: ObjectKind, record: &[u8]) -> ObjectId {
    DigestEngine::new(kind).hash_whole(record)
}
