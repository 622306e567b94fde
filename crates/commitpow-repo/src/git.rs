use std::path::Path;

use commitpow_error::{PowError, Result};
use commitpow_record::CommitFields;
use commitpow_types::{ObjectId, ObjectKind};
use git2::{ErrorCode, ObjectType, Oid, Repository, ResetType};
use tracing::{debug, info};

use crate::{CommitStore, RecordDescription};

/// [`CommitStore`] over an on-disk git repository.
pub struct GitRepository {
    repo: Repository,
}

impl std::fmt::Debug for GitRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepository")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl GitRepository {
    /// Open the repository containing `path`, searching parent directories.
    pub fn discover(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|err| {
            debug!(path = %path.display(), error = %err, "repository discovery failed");
            PowError::NotARepository {
                path: path.to_path_buf(),
            }
        })?;
        debug!(git_dir = %repo.path().display(), "opened repository");
        Ok(Self::from_repository(repo))
    }

    #[must_use]
    pub const fn from_repository(repo: Repository) -> Self {
        Self { repo }
    }

    #[must_use]
    pub const fn inner(&self) -> &Repository {
        &self.repo
    }
}

impl CommitStore for GitRepository {
    fn read_head_commit(&self) -> Result<RecordDescription> {
        let head = self.repo.head().map_err(|err| match err.code() {
            ErrorCode::UnbornBranch => PowError::NoCommit,
            ErrorCode::NotFound => PowError::NoHead,
            _ => store_error(&err),
        })?;
        let commit = head.peel_to_commit().map_err(|_| PowError::NoCommit)?;
        let odb = self.repo.odb().map_err(|err| store_error(&err))?;
        let object = odb.read(commit.id()).map_err(|err| store_error(&err))?;
        let raw = object.data().to_vec();
        let fields = CommitFields::parse(&raw)?;
        let id = to_object_id(commit.id())?;
        debug!(%id, len = raw.len(), signed = fields.is_signed(), "read head commit");
        Ok(RecordDescription { id, raw, fields })
    }

    fn write_object(&self, kind: ObjectKind, bytes: &[u8]) -> Result<ObjectId> {
        let odb = self.repo.odb().map_err(|err| store_error(&err))?;
        let oid = odb
            .write(object_type(kind), bytes)
            .map_err(|err| store_error(&err))?;
        let id = to_object_id(oid)?;
        debug!(%id, %kind, len = bytes.len(), "wrote object");
        Ok(id)
    }

    fn move_branch_head(&self, id: ObjectId) -> Result<()> {
        let oid = Oid::from_bytes(id.as_bytes()).map_err(|err| store_error(&err))?;
        let target = self
            .repo
            .find_object(oid, Some(ObjectType::Commit))
            .map_err(|err| store_error(&err))?;
        self.repo
            .reset(&target, ResetType::Soft, None)
            .map_err(|err| store_error(&err))?;
        info!(%id, "moved branch head");
        Ok(())
    }
}

const fn object_type(kind: ObjectKind) -> ObjectType {
    match kind {
        ObjectKind::Commit => ObjectType::Commit,
        ObjectKind::Tree => ObjectType::Tree,
        ObjectKind::Blob => ObjectType::Blob,
        ObjectKind::Tag => ObjectType::Tag,
    }
}

fn to_object_id(oid: Oid) -> Result<ObjectId> {
    ObjectId::from_slice(oid.as_bytes())
        .ok_or_else(|| PowError::object_store(format!("object id {oid} is not 20 bytes")))
}

fn store_error(err: &git2::Error) -> PowError {
    PowError::object_store(err.message())
}
