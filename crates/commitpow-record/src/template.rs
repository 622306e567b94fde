//! Mutable record templates.
//!
//! [`RecordTemplate::build`] takes the serialized commit, decides how it can
//! be varied, and produces the byte layout every worker starts from:
//!
//! - unsigned record: a `nonce <field>` header is placed as the last header
//! - signed record: a ` Nonce: <field>` continuation line is placed at the
//!   end of the signature header, after the armor footer
//! - timestamp rotation: nothing is added; the committer/author offsets and
//!   the committer timestamp are rewritten
//!
//! A template built from a record that already carries the field reuses it,
//! whatever its old value, so repeated searches never stack duplicate fields.

use std::ops::Range;

use commitpow_error::{PowError, Result};
use commitpow_types::ObjectKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::encoding::{FIELD_WIDTH, OFFSET_SPACE, encode_field};
use crate::fields::{CommitFields, identity_layout, signature_field};
use crate::strategy::{
    FieldCursor, MutationStrategy, RotationLayout, StatePosition, Step, TimestampCursor,
};
use crate::tokenizer::{CommitLayout, HeaderField, tokenize};

/// Header key of the injected field on unsigned records.
pub const PLAIN_FIELD_KEY: &[u8] = b"nonce";

/// Line prefix of the injected field inside a signature block.
pub const SIGNED_FIELD_PREFIX: &[u8] = b" Nonce: ";

/// Which mutation family the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyChoice {
    /// Field injection, plain or inside the signature as the record requires.
    #[default]
    Auto,
    /// Rotate timezone offsets and the committer timestamp.
    Timestamp,
}

/// Mutation family a template was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    PlainField,
    SignedField,
    TimestampRotation,
}

impl StrategyKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PlainField => "plain field",
            Self::SignedField => "signed field",
            Self::TimestampRotation => "timestamp rotation",
        }
    }
}

/// Contiguous bytes of the template that the search may rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MutableRegion {
    pub offset: usize,
    pub len: usize,
}

impl MutableRegion {
    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// A commit record prepared for searching.
#[derive(Debug, Clone)]
pub struct RecordTemplate {
    kind: ObjectKind,
    bytes: Vec<u8>,
    region: MutableRegion,
    strategy: StrategyKind,
    reused_field: bool,
    rotation: Option<RotationLayout>,
}

impl RecordTemplate {
    /// Build a template from a serialized commit body.
    ///
    /// # Errors
    ///
    /// `MalformedRecord` when the body does not tokenize or lacks a tree or
    /// committer; `RegionNotFound` when the requested strategy has nothing to
    /// rewrite; `SignedRecordImmutable` when timestamp rotation is requested
    /// for a signed record.
    pub fn build(raw: &[u8], choice: StrategyChoice) -> Result<Self> {
        let layout = tokenize(raw)?;
        // Validates tree/committer presence and identity syntax.
        CommitFields::from_layout(raw, &layout)?;

        let template = match (choice, signature_field(raw, &layout)) {
            (StrategyChoice::Timestamp, Some(_)) => {
                return Err(PowError::SignedRecordImmutable {
                    strategy: StrategyKind::TimestampRotation.name(),
                });
            }
            (StrategyChoice::Timestamp, None) => Self::rotation(raw, &layout)?,
            (StrategyChoice::Auto, Some(signature)) => Self::signed(raw, signature)?,
            (StrategyChoice::Auto, None) => Self::plain(raw, &layout)?,
        };

        debug!(
            strategy = template.strategy.name(),
            region_offset = template.region.offset,
            region_len = template.region.len,
            reused = template.reused_field,
            record_len = template.bytes.len(),
            "built record template"
        );
        Ok(template)
    }

    fn plain(raw: &[u8], layout: &CommitLayout) -> Result<Self> {
        let (bytes, offset, reused) = match reusable_plain_field(raw, layout) {
            Some(value) => (with_fresh_field(raw, value.clone()), value.start, true),
            None => {
                let mut line = PLAIN_FIELD_KEY.to_vec();
                line.push(b' ');
                let offset = layout.separator + line.len();
                line.extend_from_slice(&placeholder());
                line.push(b'\n');
                (splice(raw, layout.separator..layout.separator, &line), offset, false)
            }
        };
        Self::field(bytes, offset, StrategyKind::PlainField, reused)
    }

    fn signed(raw: &[u8], signature: &HeaderField) -> Result<Self> {
        let (bytes, offset, reused) = match reusable_signed_field(raw, signature) {
            Some(value) => (with_fresh_field(raw, value.clone()), value.start, true),
            None => {
                let at = signature.span.end;
                let mut line = SIGNED_FIELD_PREFIX.to_vec();
                let offset = at + line.len();
                line.extend_from_slice(&placeholder());
                line.push(b'\n');
                (splice(raw, at..at, &line), offset, false)
            }
        };
        Self::field(bytes, offset, StrategyKind::SignedField, reused)
    }

    fn field(bytes: Vec<u8>, offset: usize, strategy: StrategyKind, reused: bool) -> Result<Self> {
        let region = MutableRegion {
            offset,
            len: FIELD_WIDTH,
        };
        // The region must sit strictly inside one header line.
        match bytes.get(region.offset + region.len) {
            Some(b'\n') if !bytes[region.range()].contains(&b'\n') => {}
            _ => {
                return Err(PowError::internal(format!(
                    "{} region at {offset} does not end a header line",
                    strategy.name()
                )));
            }
        }
        Ok(Self {
            kind: ObjectKind::Commit,
            bytes,
            region,
            strategy,
            reused_field: reused,
            rotation: None,
        })
    }

    fn rotation(raw: &[u8], layout: &CommitLayout) -> Result<Self> {
        let author = layout.find(raw, b"author").ok_or_else(|| {
            PowError::region_not_found("timestamp rotation needs an author line")
        })?;
        let committer = layout.find(raw, b"committer").ok_or_else(|| {
            PowError::region_not_found("timestamp rotation needs a committer line")
        })?;
        if author.span.start > committer.span.start {
            return Err(PowError::region_not_found(
                "timestamp rotation needs the author line before the committer line",
            ));
        }
        let author = identity_layout(raw, author)?;
        let committer = identity_layout(raw, committer)?;
        let base_timestamp = std::str::from_utf8(&raw[committer.timestamp.clone()])
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| PowError::malformed(committer.timestamp.start, "timestamp overflows"))?;

        let rotation = RotationLayout {
            author_offset: author.offset.start,
            committer_timestamp: committer.timestamp,
            committer_offset: committer.offset.start,
            base_timestamp,
        };
        let region = MutableRegion {
            offset: author.offset.start,
            len: committer.offset.end - author.offset.start,
        };
        Ok(Self {
            kind: ObjectKind::Commit,
            bytes: raw.to_vec(),
            region,
            strategy: StrategyKind::TimestampRotation,
            reused_field: false,
            rotation: Some(rotation),
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Object kind named in the store header.
    #[must_use]
    pub const fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Template bytes with the mutable region at its initial state.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub const fn region(&self) -> MutableRegion {
        self.region
    }

    #[must_use]
    pub const fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    /// Whether an existing field was found and reused.
    #[must_use]
    pub const fn reused_field(&self) -> bool {
        self.reused_field
    }

    /// Bytes before the mutable region; identical across every attempt.
    #[must_use]
    pub const fn digest_prefix_len(&self) -> usize {
        self.region.offset
    }

    /// Worker-private state for worker `worker_index` out of `stride`.
    ///
    /// # Errors
    ///
    /// `InvalidThreadCount` for a zero stride; `Config` when timestamp
    /// rotation is asked to partition its offset space more finely than it
    /// has values.
    pub fn strategy_for(&self, worker_index: usize, stride: usize) -> Result<WorkerStrategy> {
        if stride == 0 {
            return Err(PowError::InvalidThreadCount);
        }
        if worker_index >= stride {
            return Err(PowError::internal(format!(
                "worker {worker_index} outside stride {stride}"
            )));
        }
        match &self.rotation {
            None => Ok(WorkerStrategy::Field(FieldCursor::new(
                self.region.offset,
                worker_index as u64,
                stride as u64,
            ))),
            Some(layout) => {
                let (Ok(start), Ok(step)) = (u32::try_from(worker_index), u32::try_from(stride))
                else {
                    return Err(too_many_rotation_workers(stride));
                };
                if step > OFFSET_SPACE {
                    return Err(too_many_rotation_workers(stride));
                }
                Ok(WorkerStrategy::Rotation(TimestampCursor::new(
                    layout.clone(),
                    start,
                    step,
                )))
            }
        }
    }
}

fn too_many_rotation_workers(stride: usize) -> PowError {
    PowError::config(format!(
        "timestamp rotation supports at most {OFFSET_SPACE} threads, got {stride}"
    ))
}

fn placeholder() -> [u8; FIELD_WIDTH] {
    let mut field = [0_u8; FIELD_WIDTH];
    encode_field(0, &mut field);
    field
}

fn splice(raw: &[u8], range: Range<usize>, replacement: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() - range.len() + replacement.len());
    out.extend_from_slice(&raw[..range.start]);
    out.extend_from_slice(replacement);
    out.extend_from_slice(&raw[range.end..]);
    out
}

fn with_fresh_field(raw: &[u8], value: Range<usize>) -> Vec<u8> {
    splice(raw, value, &placeholder())
}

/// Bytes of an existing `nonce` header to overwrite: its first-line value
/// and any continuation lines, up to the final newline.
fn reusable_plain_field(raw: &[u8], layout: &CommitLayout) -> Option<Range<usize>> {
    layout
        .find(raw, PLAIN_FIELD_KEY)
        .map(|h| h.value.start..h.span.end - 1)
}

/// Value range of an existing ` Nonce: ` line inside the signature block.
fn reusable_signed_field(raw: &[u8], signature: &HeaderField) -> Option<Range<usize>> {
    signature
        .continuations
        .iter()
        .find(|line| raw[(*line).clone()].starts_with(SIGNED_FIELD_PREFIX))
        .map(|line| line.start + SIGNED_FIELD_PREFIX.len()..line.end)
}

// ---------------------------------------------------------------------------
// Worker strategy
// ---------------------------------------------------------------------------

/// Concrete per-worker strategy, dispatched without boxing.
#[derive(Debug, Clone)]
pub enum WorkerStrategy {
    Field(FieldCursor),
    Rotation(TimestampCursor),
}

impl MutationStrategy for WorkerStrategy {
    fn prefix_len(&self) -> usize {
        match self {
            Self::Field(c) => c.prefix_len(),
            Self::Rotation(c) => c.prefix_len(),
        }
    }

    #[inline]
    fn advance(&mut self, record: &mut Vec<u8>) -> Step {
        match self {
            Self::Field(c) => c.advance(record),
            Self::Rotation(c) => c.advance(record),
        }
    }

    fn position(&self) -> Option<StatePosition> {
        match self {
            Self::Field(c) => c.position(),
            Self::Rotation(c) => c.position(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::encoding::decode_field;
    use crate::fixtures::{PLAIN, SIGNED};

    fn text(bytes: &[u8]) -> &str {
        std::str::from_utf8(bytes).expect("fixture is ascii")
    }

    #[test]
    fn test_plain_template_appends_last_header() {
        let t = RecordTemplate::build(PLAIN, StrategyChoice::Auto).expect("build");
        assert_eq!(t.strategy(), StrategyKind::PlainField);
        assert!(!t.reused_field());
        assert!(text(t.bytes()).contains("-0302\nnonce ...........\n\nTest\n"));
        assert_eq!(&t.bytes()[t.region().range()], b"...........");
        assert_eq!(t.digest_prefix_len(), t.region().offset);
        assert_eq!(t.bytes().len(), PLAIN.len() + 6 + FIELD_WIDTH + 1);
    }

    #[test]
    fn test_signed_template_extends_signature_block() {
        let t = RecordTemplate::build(SIGNED, StrategyChoice::Auto).expect("build");
        assert_eq!(t.strategy(), StrategyKind::SignedField);
        assert!(text(t.bytes()).contains(
            " -----END PGP SIGNATURE-----\n Nonce: ...........\n\nI should not be allowed"
        ));
        // Still one gpgsig header, now with one more continuation line.
        let layout = tokenize(t.bytes()).expect("tokenize");
        let sig = signature_field(t.bytes(), &layout).expect("signature");
        assert_eq!(sig.continuations.len(), 7);
        assert!(layout.find(t.bytes(), PLAIN_FIELD_KEY).is_none());
    }

    #[test]
    fn test_reentry_reuses_existing_field() {
        for raw in [PLAIN, SIGNED] {
            let first = RecordTemplate::build(raw, StrategyChoice::Auto).expect("build");
            let mut mined = first.bytes().to_vec();
            encode_field(123_456, &mut mined[first.region().range()]);

            let again = RecordTemplate::build(&mined, StrategyChoice::Auto).expect("rebuild");
            assert!(again.reused_field());
            assert_eq!(again.bytes(), first.bytes());
            assert_eq!(again.region(), first.region());
            let needle: &[u8] = match again.strategy() {
                StrategyKind::PlainField => b"\nnonce ",
                _ => SIGNED_FIELD_PREFIX,
            };
            let hits = again
                .bytes()
                .windows(needle.len())
                .filter(|w| *w == needle)
                .count();
            assert_eq!(hits, 1);
        }
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    #[test]
    fn test_reentry_replaces_foreign_plain_value() {
        let record = b"tree t\n\
author a <a> 1 +0000\n\
committer c <c> 1 +0000\n\
nonce 01AA!#%AAAAAAA\n \
[ carried over\n\
\n\
msg\n";
        let t = RecordTemplate::build(record, StrategyChoice::Auto).expect("build");
        assert!(t.reused_field());
        assert_eq!(count(t.bytes(), b"\nnonce "), 1);
        assert_eq!(
            text(t.bytes()),
            "tree t\nauthor a <a> 1 +0000\ncommitter c <c> 1 +0000\nnonce ...........\n\nmsg\n"
        );
        assert_eq!(&t.bytes()[t.region().range()], b"...........");
    }

    #[test]
    fn test_reentry_replaces_foreign_signed_value() {
        let first = RecordTemplate::build(SIGNED, StrategyChoice::Auto).expect("build");
        let region = first.region();
        let mut foreign = first.bytes()[..region.offset].to_vec();
        foreign.extend_from_slice(b"01AA AAAA");
        foreign.extend_from_slice(&first.bytes()[region.offset + region.len..]);

        let again = RecordTemplate::build(&foreign, StrategyChoice::Auto).expect("rebuild");
        assert!(again.reused_field());
        assert_eq!(count(again.bytes(), SIGNED_FIELD_PREFIX), 1);
        assert_eq!(again.bytes(), first.bytes());
        assert_eq!(again.region(), region);
    }

    #[test]
    fn test_timestamp_choice_rejects_signed_record() {
        let err = RecordTemplate::build(SIGNED, StrategyChoice::Timestamp).expect_err("signed");
        assert!(matches!(err, PowError::SignedRecordImmutable { .. }));
    }

    #[test]
    fn test_timestamp_template_region_spans_offsets() {
        let t = RecordTemplate::build(PLAIN, StrategyChoice::Timestamp).expect("build");
        assert_eq!(t.strategy(), StrategyKind::TimestampRotation);
        assert_eq!(t.bytes(), PLAIN);
        let region = &t.bytes()[t.region().range()];
        assert!(region.starts_with(b"+0613\n"));
        assert!(region.ends_with(b"1624473924 -0302"));
    }

    #[test]
    fn test_timestamp_requires_author() {
        let record = b"tree t\ncommitter c <c> 1 +0000\n\nm\n";
        let err = RecordTemplate::build(record, StrategyChoice::Timestamp).expect_err("no author");
        assert!(matches!(err, PowError::RegionNotFound { .. }));
    }

    #[test]
    fn test_malformed_record_is_rejected() {
        let err = RecordTemplate::build(b"garbage", StrategyChoice::Auto).expect_err("garbage");
        assert!(matches!(err, PowError::MalformedRecord { .. }));
    }

    #[test]
    fn test_strategy_for_validates_stride() {
        let t = RecordTemplate::build(PLAIN, StrategyChoice::Auto).expect("build");
        assert!(matches!(t.strategy_for(0, 0), Err(PowError::InvalidThreadCount)));
        assert!(t.strategy_for(4, 4).is_err());

        let r = RecordTemplate::build(PLAIN, StrategyChoice::Timestamp).expect("build");
        assert!(r.strategy_for(0, OFFSET_SPACE as usize).is_ok());
        let err = r
            .strategy_for(0, OFFSET_SPACE as usize + 1)
            .expect_err("too many workers");
        assert!(matches!(err, PowError::Config { .. }));
    }

    #[test]
    fn test_field_workers_enumerate_disjoint_values() {
        let t = RecordTemplate::build(PLAIN, StrategyChoice::Auto).expect("build");
        let threads = 4;
        let mut seen = HashSet::new();
        for worker in 0..threads {
            let mut record = t.bytes().to_vec();
            let mut s = t.strategy_for(worker, threads).expect("strategy");
            assert_eq!(s.prefix_len(), t.digest_prefix_len());
            for _ in 0..500 {
                assert_eq!(s.advance(&mut record), Step::InPlace);
                let value = decode_field(&record[t.region().range()]).expect("decodes");
                assert_eq!(value as usize % threads, worker);
                assert!(seen.insert(value));
                assert_eq!(record[..t.digest_prefix_len()], t.bytes()[..t.digest_prefix_len()]);
            }
        }
        assert_eq!(seen.len(), 4 * 500);
    }
}
