//! Object digest engine.
//!
//! The object id of a record is `SHA-1("<kind> <len>\0" || record)`. Search
//! attempts only ever change bytes at or after a fixed offset, so the engine
//! splits the computation in two: [`DigestEngine::precompute`] absorbs the
//! store header and the unchanging prefix once, and
//! [`DigestEngine::finish_from`] resumes from that state for each attempt.
//!
//! Resuming relies on `sha1::Sha1` being `Clone`: a clone copies the five
//! chaining words plus the partially filled 64-byte block, so the per-attempt
//! cost is the suffix length rather than the whole record. Without a cloneable
//! state the fallback is [`DigestEngine::hash_whole`] on every attempt, which
//! re-absorbs the prefix each time; the `digest_throughput` bench measures
//! the gap.

use commitpow_types::{OBJECT_ID_LEN, ObjectId, ObjectKind};
use sha1::{Digest, Sha1};

/// Hash state that has absorbed the store header and a record prefix.
#[derive(Clone)]
pub struct PrefixState {
    hasher: Sha1,
    prefix_len: usize,
    record_len: usize,
}

impl PrefixState {
    /// Record bytes covered by this state.
    #[must_use]
    pub const fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    /// Record length the store header was written for.
    #[must_use]
    pub const fn record_len(&self) -> usize {
        self.record_len
    }
}

impl std::fmt::Debug for PrefixState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefixState")
            .field("prefix_len", &self.prefix_len)
            .field("record_len", &self.record_len)
            .finish_non_exhaustive()
    }
}

/// Computes object ids for records of one object kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestEngine {
    kind: ObjectKind,
}

impl DigestEngine {
    #[must_use]
    pub const fn new(kind: ObjectKind) -> Self {
        Self { kind }
    }

    #[must_use]
    pub const fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Absorb the store header for a `record_len`-byte record followed by
    /// `prefix`.
    ///
    /// The state stays valid only while the record length and the prefix
    /// bytes are unchanged; a length change must rebuild it.
    #[must_use]
    pub fn precompute(&self, record_len: usize, prefix: &[u8]) -> PrefixState {
        debug_assert!(prefix.len() <= record_len);
        let mut hasher = Sha1::new();
        hasher.update(self.kind.store_header(record_len));
        hasher.update(prefix);
        PrefixState {
            hasher,
            prefix_len: prefix.len(),
            record_len,
        }
    }

    /// Resume from `state` and absorb the remaining `suffix`.
    #[inline]
    #[must_use]
    pub fn finish_from(&self, state: &PrefixState, suffix: &[u8]) -> ObjectId {
        debug_assert_eq!(state.prefix_len + suffix.len(), state.record_len);
        let mut hasher = state.hasher.clone();
        hasher.update(suffix);
        to_object_id(&hasher.finalize())
    }

    /// Digest of the whole record from a cold start.
    #[must_use]
    pub fn hash_whole(&self, record: &[u8]) -> ObjectId {
        let mut hasher = Sha1::new();
        hasher.update(self.kind.store_header(record.len()));
        hasher.update(record);
        to_object_id(&hasher.finalize())
    }
}

fn to_object_id(digest: &[u8]) -> ObjectId {
    let mut bytes = [0_u8; OBJECT_ID_LEN];
    bytes.copy_from_slice(digest);
    ObjectId::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_blob_matches_git() {
        let engine = DigestEngine::new(ObjectKind::Blob);
        assert_eq!(
            engine.hash_whole(b"").to_hex(),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
    }

    #[test]
    fn test_hello_blob_matches_git() {
        // `printf 'hello world\n' | git hash-object --stdin`
        let engine = DigestEngine::new(ObjectKind::Blob);
        assert_eq!(
            engine.hash_whole(b"hello world\n").to_hex(),
            "3b18e512dba79e4c8300dd08aeb37f8e728b8dad"
        );
    }

    #[test]
    fn test_empty_tree_matches_git() {
        let engine = DigestEngine::new(ObjectKind::Tree);
        assert_eq!(
            engine.hash_whole(b"").to_hex(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
    }

    #[test]
    fn test_resumed_state_is_reusable() {
        let engine = DigestEngine::new(ObjectKind::Commit);
        let mut record = b"tree t\nnonce AAAA\n\nmessage\n".to_vec();
        let state = engine.precompute(record.len(), &record[..13]);
        assert_eq!(state.prefix_len(), 13);
        for symbol in [b'B', b'C', b'D'] {
            record[13] = symbol;
            assert_eq!(
                engine.finish_from(&state, &record[13..]),
                engine.hash_whole(&record)
            );
        }
    }

    proptest! {
        #[test]
        fn prop_resumed_digest_equals_whole_digest(
            record in proptest::collection::vec(any::<u8>(), 0..300),
            split in any::<proptest::sample::Index>(),
        ) {
            let engine = DigestEngine::new(ObjectKind::Commit);
            let at = split.index(record.len() + 1);
            let state = engine.precompute(record.len(), &record[..at]);
            prop_assert_eq!(engine.finish_from(&state, &record[at..]), engine.hash_whole(&record));
        }
    }
}
