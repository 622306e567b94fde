//! Line tokenizer for serialized commit records.
//!
//! A commit body is a run of header lines (`key SP value LF`), where a line
//! starting with a single space continues the previous header's value, then
//! one empty line, then the free-text message. The tokenizer returns byte
//! ranges into the original buffer; it never copies.

use std::ops::Range;

use commitpow_error::{PowError, Result};
use memchr::memchr;

/// One header field and all of its continuation lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    /// Header key (`tree`, `parent`, `gpgsig`, ...).
    pub key: Range<usize>,
    /// Value on the first line, excluding the trailing newline.
    pub value: Range<usize>,
    /// Continuation lines, each excluding its trailing newline but
    /// including the leading space marker.
    pub continuations: Vec<Range<usize>>,
    /// Whole field including every newline.
    pub span: Range<usize>,
}

impl HeaderField {
    /// Whether this header's key equals `key`.
    #[must_use]
    pub fn is(&self, bytes: &[u8], key: &[u8]) -> bool {
        &bytes[self.key.clone()] == key
    }
}

/// Tokenized layout of a commit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitLayout {
    /// Header fields in record order.
    pub headers: Vec<HeaderField>,
    /// Offset of the empty line that ends the header block.
    pub separator: usize,
    /// Free-text message after the separator.
    pub message: Range<usize>,
}

impl CommitLayout {
    /// First header with the given key.
    #[must_use]
    pub fn find<'a>(&'a self, bytes: &[u8], key: &[u8]) -> Option<&'a HeaderField> {
        self.headers.iter().find(|h| h.is(bytes, key))
    }

    /// All headers with the given key, in order.
    pub fn find_all<'a>(
        &'a self,
        bytes: &'a [u8],
        key: &'a [u8],
    ) -> impl Iterator<Item = &'a HeaderField> + 'a {
        self.headers.iter().filter(move |h| h.is(bytes, key))
    }
}

/// Split `bytes` into header fields and message.
pub fn tokenize(bytes: &[u8]) -> Result<CommitLayout> {
    let mut headers: Vec<HeaderField> = Vec::new();
    let mut pos = 0_usize;

    loop {
        if pos >= bytes.len() {
            return Err(PowError::malformed(
                pos,
                "header block is not terminated by an empty line",
            ));
        }
        let Some(rel) = memchr(b'\n', &bytes[pos..]) else {
            return Err(PowError::malformed(pos, "unterminated header line"));
        };
        let line_end = pos + rel;

        if line_end == pos {
            return Ok(CommitLayout {
                headers,
                separator: pos,
                message: pos + 1..bytes.len(),
            });
        }

        if bytes[pos] == b' ' {
            let Some(last) = headers.last_mut() else {
                return Err(PowError::malformed(pos, "continuation line before any header"));
            };
            last.continuations.push(pos..line_end);
            last.span.end = line_end + 1;
        } else {
            let Some(space) = memchr(b' ', &bytes[pos..line_end]) else {
                return Err(PowError::malformed(pos, "header line without a value"));
            };
            if space == 0 {
                return Err(PowError::malformed(pos, "header line with an empty key"));
            }
            headers.push(HeaderField {
                key: pos..pos + space,
                value: pos + space + 1..line_end,
                continuations: Vec::new(),
                span: pos..line_end + 1,
            });
        }
        pos = line_end + 1;
    }
}
