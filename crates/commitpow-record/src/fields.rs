//! Typed view over the headers of a commit record.

use std::ops::Range;

use commitpow_error::{PowError, Result};
use memchr::memrchr;
use serde::Serialize;

use crate::tokenizer::{CommitLayout, HeaderField, tokenize};

/// Header keys that carry an embedded signature block.
pub const SIGNATURE_KEYS: [&[u8]; 2] = [b"gpgsig", b"gpgsig-sha256"];

/// Byte positions of the time fields on an `author`/`committer` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityLayout {
    /// Decimal seconds since the epoch.
    pub timestamp: Range<usize>,
    /// `+HHMM` / `-HHMM` offset.
    pub offset: Range<usize>,
}

/// Locate the trailing `<timestamp> <offset>` pair of an identity header.
pub fn identity_layout(bytes: &[u8], field: &HeaderField) -> Result<IdentityLayout> {
    let value = field.value.clone();
    let line = &bytes[value.clone()];

    let Some(last_space) = memrchr(b' ', line) else {
        return Err(PowError::malformed(value.start, "identity without a timezone"));
    };
    let offset = value.start + last_space + 1..value.end;
    let Some(ts_space) = memrchr(b' ', &line[..last_space]) else {
        return Err(PowError::malformed(value.start, "identity without a timestamp"));
    };
    let timestamp = value.start + ts_space + 1..value.start + last_space;

    let tz = &bytes[offset.clone()];
    if tz.len() != 5 || !matches!(tz[0], b'+' | b'-') || !tz[1..].iter().all(u8::is_ascii_digit) {
        return Err(PowError::malformed(offset.start, "timezone is not +HHMM/-HHMM"));
    }
    let ts = &bytes[timestamp.clone()];
    if ts.is_empty() || !ts.iter().all(u8::is_ascii_digit) {
        return Err(PowError::malformed(timestamp.start, "timestamp is not decimal"));
    }

    Ok(IdentityLayout { timestamp, offset })
}

/// Parsed `Name <email> <seconds> <offset>` identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub name_and_email: String,
    pub seconds: u64,
    pub offset: String,
}

/// Decoded commit header fields, the `RecordDescription` handed over by the
/// repository collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitFields {
    pub tree: String,
    pub parents: Vec<String>,
    pub author: Option<Identity>,
    pub committer: Identity,
    pub signature: Option<String>,
    pub message: String,
}

impl CommitFields {
    /// Decode the headers of a serialized commit.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let layout = tokenize(bytes)?;
        Self::from_layout(bytes, &layout)
    }

    pub(crate) fn from_layout(bytes: &[u8], layout: &CommitLayout) -> Result<Self> {
        let text = |r: Range<usize>| String::from_utf8_lossy(&bytes[r]).into_owned();

        let first = layout
            .headers
            .first()
            .ok_or_else(|| PowError::malformed(0, "record has no headers"))?;
        if !first.is(bytes, b"tree") {
            return Err(PowError::malformed(first.key.start, "first header must be tree"));
        }

        let identity = |field: &HeaderField| -> Result<Identity> {
            let l = identity_layout(bytes, field)?;
            let seconds = text(l.timestamp.clone())
                .parse::<u64>()
                .map_err(|_| PowError::malformed(l.timestamp.start, "timestamp overflows"))?;
            Ok(Identity {
                name_and_email: text(field.value.start..l.timestamp.start.saturating_sub(1)),
                seconds,
                offset: text(l.offset),
            })
        };

        let committer = layout
            .find(bytes, b"committer")
            .ok_or_else(|| PowError::malformed(layout.separator, "record has no committer"))?;

        let signature = signature_field(bytes, layout).map(|field| {
            let mut armored = text(field.value.clone());
            for line in &field.continuations {
                armored.push('\n');
                armored.push_str(&text(line.start + 1..line.end));
            }
            armored
        });

        Ok(Self {
            tree: text(first.value.clone()),
            parents: layout
                .find_all(bytes, b"parent")
                .map(|h| text(h.value.clone()))
                .collect(),
            author: layout.find(bytes, b"author").map(identity).transpose()?,
            committer: identity(committer)?,
            signature,
            message: text(layout.message.clone()),
        })
    }

    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

/// The embedded signature header, if the record carries one.
#[must_use]
pub fn signature_field<'a>(bytes: &[u8], layout: &'a CommitLayout) -> Option<&'a HeaderField> {
    layout
        .headers
        .iter()
        .find(|h| SIGNATURE_KEYS.iter().any(|key| h.is(bytes, key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{PLAIN, SIGNED};

    #[test]
    fn test_parse_plain_fields() {
        let fields = CommitFields::parse(PLAIN).expect("plain record parses");
        assert_eq!(fields.tree, "d11fc77c07df4faadf669a4e397714a1bd588f5d");
        assert_eq!(fields.parents, vec!["0000255c99724e379f925df516265e9535e3feb0"]);
        let author = fields.author.as_ref().expect("author present");
        assert_eq!(author.name_and_email, "Glenn Smith <couleeapps@gmail.com>");
        assert_eq!(author.seconds, 1_624_473_924);
        assert_eq!(author.offset, "+0613");
        assert_eq!(fields.committer.offset, "-0302");
        assert!(!fields.is_signed());
        assert_eq!(fields.message, "Test\n");
    }

    #[test]
    fn test_parse_signed_fields() {
        let fields = CommitFields::parse(SIGNED).expect("signed record parses");
        let sig = fields.signature.expect("signature present");
        assert!(sig.starts_with("-----BEGIN PGP SIGNATURE-----\nComment:"));
        assert!(sig.ends_with("-----END PGP SIGNATURE-----"));
    }

    #[test]
    fn test_identity_layout_positions() {
        let layout = tokenize(PLAIN).expect("tokenize");
        let author = layout.find(PLAIN, b"author").expect("author");
        let l = identity_layout(PLAIN, author).expect("layout");
        assert_eq!(&PLAIN[l.timestamp], b"1624473924");
        assert_eq!(&PLAIN[l.offset], b"+0613");
    }

    #[test]
    fn test_rejects_bad_timezone() {
        let record = b"tree t\ncommitter c <c> 1 +06\n\nm\n";
        let err = CommitFields::parse(record).expect_err("short tz");
        assert!(matches!(err, PowError::MalformedRecord { .. }));
    }

    #[test]
    fn test_rejects_tree_not_first() {
        let record = b"parent p\ntree t\ncommitter c <c> 1 +0000\n\nm\n";
        assert!(CommitFields::parse(record).is_err());
    }

    #[test]
    fn test_rejects_missing_committer() {
        let record = b"tree t\nauthor a <a> 1 +0000\n\nm\n";
        assert!(CommitFields::parse(record).is_err());
    }
}
