//! Fixed-width positional encodings for the mutable field.
//!
//! Injected fields carry a 64-bit counter as [`FIELD_WIDTH`] symbols of six
//! bits each, least significant symbol first. Only the symbols whose digit
//! changed are rewritten on each step, so a stride-1 walk touches one symbol
//! per attempt and carries into the next symbol every 64th attempt.
//!
//! Timestamp rotation enumerates the `±HHMM` offset space by index.

/// Symbols allowed in an injected field. None of them is a space, newline,
/// or armor delimiter.
pub const FIELD_ALPHABET: &[u8; 64] =
    b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Bits carried by one symbol.
pub const BITS_PER_SYMBOL: u32 = 6;

/// Symbols in an injected field: 66 bits, enough for every `u64`.
pub const FIELD_WIDTH: usize = 11;

const SYMBOL_MASK: u64 = (1 << BITS_PER_SYMBOL) - 1;

const fn symbol_index(symbol: u8) -> Option<u64> {
    match symbol {
        b'.' => Some(0),
        b'/' => Some(1),
        b'0'..=b'9' => Some((symbol - b'0') as u64 + 2),
        b'A'..=b'Z' => Some((symbol - b'A') as u64 + 12),
        b'a'..=b'z' => Some((symbol - b'a') as u64 + 38),
        _ => None,
    }
}

#[inline]
fn symbol(value: u64, digit: usize) -> u8 {
    FIELD_ALPHABET[((value >> (digit as u32 * BITS_PER_SYMBOL)) & SYMBOL_MASK) as usize]
}

/// Write all [`FIELD_WIDTH`] symbols of `value` into `out`.
pub fn encode_field(value: u64, out: &mut [u8]) {
    debug_assert_eq!(out.len(), FIELD_WIDTH);
    for (digit, slot) in out.iter_mut().enumerate() {
        *slot = symbol(value, digit);
    }
}

/// Rewrite only the symbols that differ between `prev` and `next`, assuming
/// `out` currently holds the encoding of `prev`. Returns how many symbols
/// were written.
#[inline]
pub fn encode_field_delta(prev: u64, next: u64, out: &mut [u8]) -> usize {
    debug_assert_eq!(out.len(), FIELD_WIDTH);
    let changed = prev ^ next;
    if changed == 0 {
        return 0;
    }
    let significant = u64::BITS - changed.leading_zeros();
    let digits = significant.div_ceil(BITS_PER_SYMBOL) as usize;
    for (digit, slot) in out.iter_mut().enumerate().take(digits) {
        *slot = symbol(next, digit);
    }
    digits
}

/// Decode a field previously written by [`encode_field`].
#[must_use]
pub fn decode_field(field: &[u8]) -> Option<u64> {
    if field.len() != FIELD_WIDTH {
        return None;
    }
    let mut value = 0_u64;
    for (digit, &sym) in field.iter().enumerate() {
        let index = symbol_index(sym)?;
        let shift = digit as u32 * BITS_PER_SYMBOL;
        if shift + BITS_PER_SYMBOL > u64::BITS && index >> (u64::BITS - shift) != 0 {
            return None;
        }
        value |= index << shift;
    }
    Some(value)
}

// ---------------------------------------------------------------------------
// Timezone offsets
// ---------------------------------------------------------------------------

/// Width of a `±HHMM` offset.
pub const OFFSET_WIDTH: usize = 5;

/// Distinct values of one sign: hours 00-99 times minutes 00-59.
const OFFSETS_PER_SIGN: u32 = 100 * 60;

/// Representable `±HHMM` offsets, `+0000..=+9959` then `-0000..=-9959`.
pub const OFFSET_SPACE: u32 = 2 * OFFSETS_PER_SIGN;

/// Render offset index `index` (< [`OFFSET_SPACE`]) as `±HHMM`.
#[must_use]
pub fn encode_offset(index: u32) -> [u8; OFFSET_WIDTH] {
    debug_assert!(index < OFFSET_SPACE);
    let sign = if index < OFFSETS_PER_SIGN { b'+' } else { b'-' };
    let minutes = index % OFFSETS_PER_SIGN;
    let (hh, mm) = (minutes / 60, minutes % 60);
    [
        sign,
        b'0' + (hh / 10) as u8,
        b'0' + (hh % 10) as u8,
        b'0' + (mm / 10) as u8,
        b'0' + (mm % 10) as u8,
    ]
}

/// Inverse of [`encode_offset`]; `None` for minutes above 59 or bad syntax.
#[cfg(test)]
fn decode_offset(offset: &[u8]) -> Option<u32> {
    let [sign, h1, h0, m1, m0] = <[u8; OFFSET_WIDTH]>::try_from(offset).ok()?;
    let digit = |b: u8| b.is_ascii_digit().then(|| u32::from(b - b'0'));
    let hh = digit(h1)? * 10 + digit(h0)?;
    let mm = digit(m1)? * 10 + digit(m0)?;
    if mm >= 60 {
        return None;
    }
    let base = match sign {
        b'+' => 0,
        b'-' => OFFSETS_PER_SIGN,
        _ => return None,
    };
    Some(base + hh * 60 + mm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_alphabet_is_unique_and_safe() {
        let mut seen = [false; 256];
        for &b in FIELD_ALPHABET {
            assert!(!seen[b as usize], "duplicate symbol {}", b as char);
            seen[b as usize] = true;
            assert!(b.is_ascii_graphic(), "symbol {b:#x} must be printable");
            assert_ne!(b, b'-', "armor delimiter must not appear");
        }
        for (i, &b) in FIELD_ALPHABET.iter().enumerate() {
            assert_eq!(symbol_index(b), Some(i as u64));
        }
    }

    #[test]
    fn test_encode_zero_and_max() {
        let mut out = [0_u8; FIELD_WIDTH];
        encode_field(0, &mut out);
        assert_eq!(&out, b"...........");
        encode_field(u64::MAX, &mut out);
        assert_eq!(decode_field(&out), Some(u64::MAX));
        assert_eq!(out[FIELD_WIDTH - 1], FIELD_ALPHABET[15]);
    }

    #[test]
    fn test_delta_touches_one_symbol_without_carry() {
        let mut out = [0_u8; FIELD_WIDTH];
        encode_field(5, &mut out);
        assert_eq!(encode_field_delta(5, 6, &mut out), 1);
        assert_eq!(decode_field(&out), Some(6));
    }

    #[test]
    fn test_delta_carries_every_64th_step() {
        let mut out = [0_u8; FIELD_WIDTH];
        encode_field(63, &mut out);
        assert_eq!(encode_field_delta(63, 64, &mut out), 2);
        assert_eq!(decode_field(&out), Some(64));
        encode_field(4095, &mut out);
        assert_eq!(encode_field_delta(4095, 4096, &mut out), 3);
        assert_eq!(decode_field(&out), Some(4096));
    }

    #[test]
    fn test_decode_rejects_out_of_range_top_symbol() {
        let mut out = [b'.'; FIELD_WIDTH];
        out[FIELD_WIDTH - 1] = FIELD_ALPHABET[16];
        assert_eq!(decode_field(&out), None);
        assert_eq!(decode_field(b"short"), None);
        assert_eq!(decode_field(b"..........-"), None);
    }

    #[test]
    fn test_offset_encoding_known_values() {
        assert_eq!(&encode_offset(0), b"+0000");
        assert_eq!(&encode_offset(373), b"+0613");
        assert_eq!(&encode_offset(OFFSETS_PER_SIGN - 1), b"+9959");
        assert_eq!(&encode_offset(OFFSETS_PER_SIGN), b"-0000");
        assert_eq!(&encode_offset(OFFSET_SPACE - 1), b"-9959");
        assert_eq!(decode_offset(b"-0302"), Some(OFFSETS_PER_SIGN + 182));
        assert_eq!(decode_offset(b"+0060"), None);
        assert_eq!(decode_offset(b"*0000"), None);
    }

    proptest! {
        #[test]
        fn prop_delta_encoding_matches_full_encoding(start in any::<u64>(), stride in 1_u64..4096) {
            let mut incremental = [0_u8; FIELD_WIDTH];
            encode_field(start, &mut incremental);
            let mut value = start;
            for _ in 0..64 {
                let Some(next) = value.checked_add(stride) else { break };
                encode_field_delta(value, next, &mut incremental);
                let mut full = [0_u8; FIELD_WIDTH];
                encode_field(next, &mut full);
                prop_assert_eq!(incremental, full);
                value = next;
            }
        }

        #[test]
        fn prop_field_encoding_is_injective(a in any::<u64>(), b in any::<u64>()) {
            let mut ea = [0_u8; FIELD_WIDTH];
            let mut eb = [0_u8; FIELD_WIDTH];
            encode_field(a, &mut ea);
            encode_field(b, &mut eb);
            prop_assert_eq!(a == b, ea == eb);
            prop_assert_eq!(decode_field(&ea), Some(a));
        }

        #[test]
        fn prop_offset_round_trip(index in 0_u32..OFFSET_SPACE) {
            prop_assert_eq!(decode_offset(&encode_offset(index)), Some(index));
        }
    }
}
