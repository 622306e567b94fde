use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for the commit proof-of-work search.
///
/// Variants are grouped by where the failure originates: building the
/// record template, verifying a winner, the repository collaborator, or an
/// internal invariant of the engine. Cancellation is not an error and has
/// no variant here.
#[derive(Error, Debug)]
pub enum PowError {
    // === Structural Errors ===
    /// The serialized record does not follow the commit object layout.
    #[error("malformed record at offset {offset}: {detail}")]
    MalformedRecord { offset: usize, detail: String },

    /// The mutable region could not be located inside the record.
    #[error("mutable region not found: {detail}")]
    RegionNotFound { detail: String },

    /// The requested strategy would rewrite bytes covered by a signature.
    #[error("record is signed; {strategy} would invalidate the signature")]
    SignedRecordImmutable { strategy: &'static str },

    /// Target bit count exceeds the digest width.
    #[error("target of {bits} bits exceeds the {max}-bit digest")]
    InvalidTarget { bits: u32, max: u32 },

    /// A search needs at least one worker.
    #[error("thread count must be at least 1")]
    InvalidThreadCount,

    /// A configuration value is out of range or unparsable.
    #[error("invalid configuration: {detail}")]
    Config { detail: String },

    // === Verification Errors ===
    /// Cold recomputation of the winning record disagreed with the worker.
    #[error(
        "verification failed: worker reported {reported}, recomputed {recomputed} \
         ({zero_bits}/{target_bits} leading zero bits)"
    )]
    VerificationFailed {
        reported: String,
        recomputed: String,
        zero_bits: u32,
        target_bits: u32,
    },

    // === External Errors ===
    /// The working directory is not inside a repository.
    #[error("not a git repository: '{path}'")]
    NotARepository { path: PathBuf },

    /// The repository has no HEAD reference.
    #[error("repository does not have a HEAD")]
    NoHead,

    /// HEAD does not resolve to a commit.
    #[error("no commit on current branch")]
    NoCommit,

    /// The object store rejected a read, write, or reference update.
    #[error("object store error: {detail}")]
    ObjectStore { detail: String },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Internal Errors ===
    /// A search worker panicked before reporting.
    #[error("search worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    /// Every worker enumerated its full state space without a match.
    #[error("search space exhausted after {attempts} attempts")]
    SearchSpaceExhausted { attempts: u64 },

    /// Internal logic error (should never happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`PowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The record template could not be built; reported before any worker starts.
    Structural,
    /// The verifier rejected a winner; indicates an engine defect.
    Verification,
    /// Raised by the repository collaborator and passed through unchanged.
    External,
    /// Broken engine invariant.
    Internal,
}

impl PowError {
    /// Classify this error.
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::MalformedRecord { .. }
            | Self::RegionNotFound { .. }
            | Self::SignedRecordImmutable { .. }
            | Self::InvalidTarget { .. }
            | Self::InvalidThreadCount
            | Self::Config { .. } => ErrorClass::Structural,
            Self::VerificationFailed { .. } => ErrorClass::Verification,
            Self::NotARepository { .. }
            | Self::NoHead
            | Self::NoCommit
            | Self::ObjectStore { .. }
            | Self::Io(_) => ErrorClass::External,
            Self::WorkerPanicked { .. }
            | Self::SearchSpaceExhausted { .. }
            | Self::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Whether the core may retry the failed operation. Always false for
    /// structural and verification errors: a retry cannot fix a logic defect.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::ObjectStore { .. })
    }

    /// Human-friendly suggestion for fixing this error.
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotARepository { .. } => Some("Run from inside a git working tree"),
            Self::NoHead | Self::NoCommit => Some("Create a commit on the current branch first"),
            Self::SignedRecordImmutable { .. } => {
                Some("Use the default strategy, which hides the field inside the signature block")
            }
            Self::InvalidTarget { .. } => Some("Request at most 160 bits"),
            Self::VerificationFailed { .. } => Some("This is a bug; please report it"),
            _ => None,
        }
    }

    /// Get the process exit code for this error (for CLI use).
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::NotARepository { .. } => 2,
            Self::NoHead => 3,
            Self::NoCommit => 4,
            Self::VerificationFailed { .. } => 70,
            _ => match self.class() {
                ErrorClass::Structural => 5,
                _ => 1,
            },
        }
    }

    /// Create a malformed-record error.
    pub fn malformed(offset: usize, detail: impl Into<String>) -> Self {
        Self::MalformedRecord {
            offset,
            detail: detail.into(),
        }
    }

    /// Create a region-not-found error.
    pub fn region_not_found(detail: impl Into<String>) -> Self {
        Self::RegionNotFound {
            detail: detail.into(),
        }
    }

    /// Create an object store error.
    pub fn object_store(detail: impl Into<String>) -> Self {
        Self::ObjectStore {
            detail: detail.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using `PowError`.
pub type Result<T> = std::result::Result<T, PowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_malformed() {
        let err = PowError::malformed(17, "header line without a key");
        assert_eq!(
            err.to_string(),
            "malformed record at offset 17: header line without a key"
        );
    }

    #[test]
    fn test_error_display_verification() {
        let err = PowError::VerificationFailed {
            reported: "00ab".to_owned(),
            recomputed: "ffab".to_owned(),
            zero_bits: 0,
            target_bits: 8,
        };
        assert_eq!(
            err.to_string(),
            "verification failed: worker reported 00ab, recomputed ffab (0/8 leading zero bits)"
        );
    }

    #[test]
    fn test_error_class_mapping() {
        assert_eq!(PowError::malformed(0, "x").class(), ErrorClass::Structural);
        assert_eq!(PowError::InvalidThreadCount.class(), ErrorClass::Structural);
        assert_eq!(PowError::NoHead.class(), ErrorClass::External);
        assert_eq!(
            PowError::object_store("write failed").class(),
            ErrorClass::External
        );
        assert_eq!(
            PowError::WorkerPanicked { worker: 3 }.class(),
            ErrorClass::Internal
        );
        assert_eq!(
            PowError::VerificationFailed {
                reported: String::new(),
                recomputed: String::new(),
                zero_bits: 0,
                target_bits: 1,
            }
            .class(),
            ErrorClass::Verification
        );
    }

    #[test]
    fn test_structural_and_verification_never_retryable() {
        assert!(!PowError::malformed(0, "x").is_retryable());
        assert!(!PowError::region_not_found("x").is_retryable());
        assert!(
            !PowError::VerificationFailed {
                reported: String::new(),
                recomputed: String::new(),
                zero_bits: 0,
                target_bits: 1,
            }
            .is_retryable()
        );
        assert!(PowError::object_store("busy").is_retryable());
    }

    #[test]
    fn test_exit_codes() {
        let not_repo = PowError::NotARepository {
            path: PathBuf::from("/tmp"),
        };
        assert_eq!(not_repo.exit_code(), 2);
        assert_eq!(PowError::NoHead.exit_code(), 3);
        assert_eq!(PowError::NoCommit.exit_code(), 4);
        assert_eq!(PowError::InvalidThreadCount.exit_code(), 5);
        assert_eq!(PowError::internal("bug").exit_code(), 1);
    }

    #[test]
    fn test_suggestions() {
        assert!(PowError::NoHead.suggestion().is_some());
        assert!(
            PowError::SignedRecordImmutable {
                strategy: "timestamp rotation"
            }
            .suggestion()
            .is_some()
        );
        assert!(PowError::internal("x").suggestion().is_none());
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PowError = io_err.into();
        assert!(matches!(err, PowError::Io(_)));
        assert_eq!(err.class(), ErrorClass::External);
    }
}
