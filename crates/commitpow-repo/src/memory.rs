use std::collections::HashMap;

use commitpow_digest::DigestEngine;
use commitpow_error::{PowError, Result};
use commitpow_record::CommitFields;
use commitpow_types::{ObjectId, ObjectKind};
use parking_lot::Mutex;

use crate::{CommitStore, RecordDescription};

/// In-memory [`CommitStore`] with a single branch.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    objects: HashMap<ObjectId, (ObjectKind, Vec<u8>)>,
    head: Option<ObjectId>,
}

impl MemoryStore {
    /// Store holding one commit that the branch points at.
    pub fn with_head_commit(raw: &[u8]) -> Result<Self> {
        let store = Self::default();
        let id = store.write_object(ObjectKind::Commit, raw)?;
        store.move_branch_head(id)?;
        Ok(store)
    }

    #[must_use]
    pub fn head(&self) -> Option<ObjectId> {
        self.inner.lock().head
    }

    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<(ObjectKind, Vec<u8>)> {
        self.inner.lock().objects.get(&id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CommitStore for MemoryStore {
    fn read_head_commit(&self) -> Result<RecordDescription> {
        let inner = self.inner.lock();
        let id = inner.head.ok_or(PowError::NoCommit)?;
        let Some((ObjectKind::Commit, raw)) = inner.objects.get(&id) else {
            return Err(PowError::NoCommit);
        };
        Ok(RecordDescription {
            id,
            fields: CommitFields::parse(raw)?,
            raw: raw.clone(),
        })
    }

    fn write_object(&self, kind: ObjectKind, bytes: &[u8]) -> Result<ObjectId> {
        let id = DigestEngine::new(kind).hash_whole(bytes);
        self.inner
            .lock()
            .objects
            .insert(id, (kind, bytes.to_vec()));
        Ok(id)
    }

    fn move_branch_head(&self, id: ObjectId) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.objects.get(&id) {
            Some((ObjectKind::Commit, _)) => {
                inner.head = Some(id);
                Ok(())
            }
            _ => Err(PowError::object_store(format!("{id} is not a stored commit"))),
        }
    }
}
