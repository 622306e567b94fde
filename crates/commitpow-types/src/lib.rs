//! Core type definitions shared across the commitpow crates.
//!
//! - [`ObjectId`]: a 20-byte SHA-1 object name with hex rendering
//! - [`ObjectKind`]: the object type named in the store header
//! - [`leading_zero_bits`]: the search predicate's bit counter

use std::fmt;
use std::str::FromStr;

use commitpow_error::PowError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Width of an object id in bytes.
pub const OBJECT_ID_LEN: usize = 20;

/// Width of an object id in bits; the largest meaningful target.
pub const OBJECT_ID_BITS: u32 = (OBJECT_ID_LEN as u32) * 8;

// ---------------------------------------------------------------------------
// ObjectId
// ---------------------------------------------------------------------------

/// Content-addressed name of a stored object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// The all-zero id, used as the "nothing found yet" placeholder.
    pub const ZERO: Self = Self([0; OBJECT_ID_LEN]);

    #[must_use]
    pub const fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Build from a slice; `None` unless exactly 20 bytes long.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; OBJECT_ID_LEN]>::try_from(bytes).ok().map(Self)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        &self.0
    }

    /// Leading zero bits of this id, capped at `cap`.
    #[must_use]
    pub fn leading_zero_bits(&self, cap: u32) -> u32 {
        leading_zero_bits(&self.0, cap)
    }

    /// Lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({self})")
    }
}

impl FromStr for ObjectId {
    type Err = PowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.as_bytes();
        if hex.len() != OBJECT_ID_LEN * 2 {
            return Err(PowError::malformed(
                0,
                format!("object id must be 40 hex digits, got {}", hex.len()),
            ));
        }
        let mut out = [0_u8; OBJECT_ID_LEN];
        for (i, pair) in hex.chunks_exact(2).enumerate() {
            let hi = hex_value(pair[0]).ok_or_else(|| PowError::malformed(i * 2, "bad hex"))?;
            let lo = hex_value(pair[1]).ok_or_else(|| PowError::malformed(i * 2 + 1, "bad hex"))?;
            out[i] = (hi << 4) | lo;
        }
        Ok(Self(out))
    }
}

const fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// ObjectKind
// ---------------------------------------------------------------------------

/// Object type as written in the `"<kind> <len>\0"` store header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
    Tag,
}

impl ObjectKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Tag => "tag",
        }
    }

    /// The store header that precedes a body of `body_len` bytes.
    #[must_use]
    pub fn store_header(self, body_len: usize) -> Vec<u8> {
        let mut header = format!("{} {body_len}", self.as_str()).into_bytes();
        header.push(0);
        header
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Leading zero bits
// ---------------------------------------------------------------------------

/// Count zero bits from the most significant bit of `digest[0]` onward,
/// stopping at the first set bit or once `cap` bits have been seen.
///
/// The result never exceeds `cap`.
#[must_use]
#[inline]
pub fn leading_zero_bits(digest: &[u8], cap: u32) -> u32 {
    let mut bits = 0_u32;
    for &byte in digest {
        if bits >= cap {
            break;
        }
        if byte == 0 {
            bits += 8;
        } else {
            bits += byte.leading_zeros();
            break;
        }
    }
    bits.min(cap)
}
