//! Cold recheck of a winning record.

use commitpow_digest::DigestEngine;
use commitpow_error::{PowError, Result};
use commitpow_types::ObjectId;
use tracing::error;

/// Recompute the digest of `record` without any cached state and confirm it
/// equals `reported` and has at least `target_bits` leading zero bits.
///
/// A failure means the incremental path and the cold path disagree. It is
/// never retried.
pub fn verify(
    engine: &DigestEngine,
    record: &[u8],
    reported: ObjectId,
    target_bits: u32,
) -> Result<ObjectId> {
    let recomputed = engine.hash_whole(record);
    let zero_bits = recomputed.leading_zero_bits(target_bits);
    if recomputed != reported || zero_bits < target_bits {
        error!(
            %reported,
            %recomputed,
            zero_bits,
            target_bits,
            "winning record failed verification"
        );
        return Err(PowError::VerificationFailed {
            reported: reported.to_hex(),
            recomputed: recomputed.to_hex(),
            zero_bits,
            target_bits,
        });
    }
    Ok(recomputed)
}

#[cfg(test)]
mod tests {
    use commitpow_error::ErrorClass;
    use commitpow_types::ObjectKind;

    use super::*;

    #[test]
    fn test_verify_accepts_matching_digest() {
        let engine = DigestEngine::new(ObjectKind::Blob);
        let digest = engine.hash_whole(b"");
        // e69de29b... has no leading zero bits.
        assert_eq!(verify(&engine, b"", digest, 0).expect("verifies"), digest);
    }

    #[test]
    fn test_verify_rejects_digest_mismatch() {
        let engine = DigestEngine::new(ObjectKind::Blob);
        let err = verify(&engine, b"", ObjectId::ZERO, 0).expect_err("mismatch");
        assert_eq!(err.class(), ErrorClass::Verification);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_verify_rejects_insufficient_bits() {
        let engine = DigestEngine::new(ObjectKind::Blob);
        let digest = engine.hash_whole(b"");
        let err = verify(&engine, b"", digest, 1).expect_err("0xe6 has no zero bits");
        assert!(matches!(
            err,
            PowError::VerificationFailed {
                zero_bits: 0,
                target_bits: 1,
                ..
            }
        ));
    }
}
