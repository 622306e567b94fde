//! Per-worker mutation strategies.
//!
//! A strategy owns one worker's private search state and writes each
//! successive state into that worker's private copy of the record. Workers
//! are seeded with `(worker_index, stride)` so that the states enumerated by
//! different workers never coincide.

use std::ops::Range;

use crate::encoding::{
    FIELD_WIDTH, OFFSET_SPACE, OFFSET_WIDTH, encode_field, encode_field_delta, encode_offset,
};

/// What [`MutationStrategy::advance`] did to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Bytes were rewritten in place; the record length is unchanged.
    InPlace,
    /// The record length changed; any digest state covering the store
    /// header must be rebuilt.
    Resized,
    /// This worker has enumerated its whole share of the state space.
    Exhausted,
}

/// The search state most recently written into the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatePosition {
    Counter(u64),
    Rotation {
        timestamp: u64,
        author_offset: u32,
        committer_offset: u32,
    },
}

/// Maps a worker's private search state onto the record's mutable region.
pub trait MutationStrategy: Send {
    /// Bytes before this offset are identical for every state this
    /// strategy will ever write.
    fn prefix_len(&self) -> usize;

    /// Advance to the next state and write it into `record`.
    fn advance(&mut self, record: &mut Vec<u8>) -> Step;

    /// The state last written, or `None` before the first `advance`.
    fn position(&self) -> Option<StatePosition>;
}

// ---------------------------------------------------------------------------
// Field injection (plain and signed-block variants)
// ---------------------------------------------------------------------------

/// Counter written into an injected field at a fixed offset.
#[derive(Debug, Clone)]
pub struct FieldCursor {
    offset: usize,
    next: Option<u64>,
    last: Option<u64>,
    stride: u64,
}

impl FieldCursor {
    /// Cursor enumerating `start, start + stride, start + 2 * stride, ...`.
    #[must_use]
    pub fn new(offset: usize, start: u64, stride: u64) -> Self {
        Self {
            offset,
            next: Some(start),
            last: None,
            stride,
        }
    }
}

impl MutationStrategy for FieldCursor {
    fn prefix_len(&self) -> usize {
        self.offset
    }

    #[inline]
    fn advance(&mut self, record: &mut Vec<u8>) -> Step {
        let Some(value) = self.next else {
            return Step::Exhausted;
        };
        let field = &mut record[self.offset..self.offset + FIELD_WIDTH];
        match self.last {
            None => encode_field(value, field),
            Some(prev) => {
                encode_field_delta(prev, value, field);
            }
        }
        self.last = Some(value);
        self.next = value.checked_add(self.stride);
        Step::InPlace
    }

    fn position(&self) -> Option<StatePosition> {
        self.last.map(StatePosition::Counter)
    }
}

// ---------------------------------------------------------------------------
// Timestamp rotation
// ---------------------------------------------------------------------------

/// Byte positions the rotation strategy rewrites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationLayout {
    /// Start of the author `±HHMM` field; nothing before it ever changes.
    pub author_offset: usize,
    /// Committer seconds-since-epoch digits.
    pub committer_timestamp: Range<usize>,
    /// Start of the committer `±HHMM` field.
    pub committer_offset: usize,
    /// Committer timestamp as found in the original record.
    pub base_timestamp: u64,
}

/// Rotates the committer offset (fast), the author offset (partitioned by
/// stride), and finally the committer timestamp.
#[derive(Debug, Clone)]
pub struct TimestampCursor {
    layout: RotationLayout,
    author_start: u32,
    stride: u32,
    author: u32,
    committer: u32,
    delta: u64,
    started: bool,
    exhausted: bool,
}

impl TimestampCursor {
    /// `author_start` must be below [`OFFSET_SPACE`].
    #[must_use]
    pub fn new(layout: RotationLayout, author_start: u32, stride: u32) -> Self {
        debug_assert!(author_start < OFFSET_SPACE);
        Self {
            layout,
            author_start,
            stride: stride.max(1),
            author: author_start,
            committer: 0,
            delta: 0,
            started: false,
            exhausted: false,
        }
    }

    fn write_author(&self, record: &mut [u8]) {
        let at = self.layout.author_offset;
        record[at..at + OFFSET_WIDTH].copy_from_slice(&encode_offset(self.author));
    }

    fn write_committer(&self, record: &mut [u8]) {
        let at = self.layout.committer_offset;
        record[at..at + OFFSET_WIDTH].copy_from_slice(&encode_offset(self.committer));
    }

    fn write_timestamp(&mut self, record: &mut Vec<u8>, seconds: u64) -> Step {
        let digits = seconds.to_string();
        let range = self.layout.committer_timestamp.clone();
        if digits.len() == range.len() {
            record[range].copy_from_slice(digits.as_bytes());
            return Step::InPlace;
        }
        let (old_len, new_len) = (range.len(), digits.len());
        record.splice(range.clone(), digits.bytes());
        self.layout.committer_timestamp = range.start..range.start + new_len;
        self.layout.committer_offset = self.layout.committer_offset + new_len - old_len;
        Step::Resized
    }
}

impl MutationStrategy for TimestampCursor {
    fn prefix_len(&self) -> usize {
        self.layout.author_offset
    }

    fn advance(&mut self, record: &mut Vec<u8>) -> Step {
        if self.exhausted {
            return Step::Exhausted;
        }
        if !self.started {
            self.started = true;
            self.write_author(record);
            self.write_committer(record);
            return Step::InPlace;
        }

        let mut step = Step::InPlace;
        self.committer += 1;
        if self.committer >= OFFSET_SPACE {
            self.committer = 0;
            self.author = self.author.saturating_add(self.stride);
            if self.author >= OFFSET_SPACE {
                self.author = self.author_start;
                let next = self
                    .delta
                    .checked_add(1)
                    .and_then(|d| self.layout.base_timestamp.checked_add(d).map(|ts| (d, ts)));
                let Some((delta, seconds)) = next else {
                    self.exhausted = true;
                    return Step::Exhausted;
                };
                self.delta = delta;
                step = self.write_timestamp(record, seconds);
            }
            self.write_author(record);
        }
        self.write_committer(record);
        step
    }

    fn position(&self) -> Option<StatePosition> {
        self.started.then(|| StatePosition::Rotation {
            timestamp: self.layout.base_timestamp + self.delta,
            author_offset: self.author,
            committer_offset: self.committer,
        })
    }
}
