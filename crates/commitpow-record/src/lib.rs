//! Commit record handling for the search.
//!
//! - [`tokenizer`]: header/continuation/message line tokenizer
//! - [`fields`]: typed view of commit headers
//! - [`encoding`]: fixed-width field and `±HHMM` offset encodings
//! - [`template`]: builds the mutable template and chooses a strategy
//! - [`strategy`]: per-worker cursors that write successive states

pub mod encoding;
pub mod fields;
pub mod strategy;
pub mod template;
pub mod tokenizer;

pub use encoding::{FIELD_ALPHABET, FIELD_WIDTH, OFFSET_SPACE, decode_field, encode_field};
pub use fields::{CommitFields, Identity, SIGNATURE_KEYS};
pub use strategy::{FieldCursor, MutationStrategy, StatePosition, Step, TimestampCursor};
pub use template::{
    MutableRegion, PLAIN_FIELD_KEY, RecordTemplate, SIGNED_FIELD_PREFIX, StrategyChoice,
    StrategyKind, WorkerStrategy,
};
pub use tokenizer::{CommitLayout, HeaderField, tokenize};

#[cfg(test)]
pub(crate) mod fixtures {
    pub const PLAIN: &[u8] = b"tree d11fc77c07df4faadf669a4e397714a1bd588f5d\n\
parent 0000255c99724e379f925df516265e9535e3feb0\n\
author Glenn Smith <couleeapps@gmail.com> 1624473924 +0613\n\
committer Glenn Smith <couleeapps@gmail.com> 1624473924 -0302\n\
\n\
Test\n";

    pub const SIGNED: &[u8] = b"tree 31c2eae32101258cfffc2e85f1d2d790b229a9ad\n\
parent 8dfe0ce00895c6a8f55bbd30d2543c1945fcad15\n\
author Glenn Smith <couleeapps@gmail.com> 1625532218 -0400\n\
committer Glenn Smith <couleeapps@gmail.com> 1625532226 -0400\n\
gpgsig -----BEGIN PGP SIGNATURE-----\n \
Comment: Created with Krypton\n \
\n \
iF4EABMKAAYFAmDjp0IACgkQm3HsKD8LehTDDwD/c9DB6IxtAXzF55FjgqevfoNO\n \
Eegmn53HSsYrRHOE9ZMA/Av/moBkr9Qh/nTO2c3XVfa228grAOIwcSYkn9s6WS25\n \
=XM24\n \
-----END PGP SIGNATURE-----\n\
\n\
I should not be allowed near this\n";
}
