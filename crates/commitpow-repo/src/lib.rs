//! Repository collaborator.
//!
//! The search core only needs three things from a repository: the serialized
//! HEAD commit, a way to store a new object, and a way to point the current
//! branch at it. [`CommitStore`] names that seam; [`GitRepository`] backs it
//! with an on-disk repository and [`MemoryStore`] with a map.

mod git;
mod memory;

use commitpow_error::Result;
use commitpow_record::CommitFields;
use commitpow_types::{ObjectId, ObjectKind};

pub use git::GitRepository;
pub use memory::MemoryStore;

/// The HEAD commit as stored, plus its decoded headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDescription {
    /// Object id of the commit.
    pub id: ObjectId,
    /// Serialized commit body, without the store header.
    pub raw: Vec<u8>,
    /// Tree, parents, identities, signature, message.
    pub fields: CommitFields,
}

/// Object store and branch operations used around a search.
pub trait CommitStore {
    /// Read the commit the current branch points at.
    fn read_head_commit(&self) -> Result<RecordDescription>;

    /// Store `bytes` as an object of `kind` and return its id.
    fn write_object(&self, kind: ObjectKind, bytes: &[u8]) -> Result<ObjectId>;

    /// Point the current branch at commit `id`, leaving index and working
    /// tree untouched.
    fn move_branch_head(&self, id: ObjectId) -> Result<()>;
}

impl<S: CommitStore + ?Sized> CommitStore for &S {
    fn read_head_commit(&self) -> Result<RecordDescription> {
        (**self).read_head_commit()
    }

    fn write_object(&self, kind: ObjectKind, bytes: &[u8]) -> Result<ObjectId> {
        (**self).write_object(kind, bytes)
    }

    fn move_branch_head(&self, id: ObjectId) -> Result<()> {
        (**self).move_branch_head(id)
    }
}
