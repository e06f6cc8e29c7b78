/*!
# `scythe-json`

## 🗡⚡

Vectorized scanning and codec primitives for raw JSON byte buffers. This library
is the low-level core that a parser or writer drives: it locates structural
characters, escapes and unescapes string literals, skips whole values without
building a tree, and converts decimal digit runs to and from integers, all in
fixed-width SIMD chunks.

## ⚠️ CAREFUL

This library contains a _lot_ of unsafe code and is very performance sensitive.
Any changes need to be carefully considered and should be:

- tested against the benchmarks to make sure we don't regress (at least not accidentally).
- fuzz tested to ensure there aren't soundness holes introduced.

Chunked primitives read the input a full vector width at a time, so callers that
want the fast paths should leave [`PADDING`] bytes of slack after the logical
end of their buffers. Every routine also carries a tail path that either copies
the trailing partial chunk into a zeroed stack buffer or falls back to
byte-at-a-time scanning instead of reading past `len`, and the two paths
produce identical results.

Any unchecked operations performed on the buffer are done using macros that use
the checked variant in test/debug builds (or when the `checked` cfg is enabled)
to make sure we don't ever cause UB when working through documents.
*/

#![deny(warnings)]
#![allow(
    unused_labels,
    clippy::missing_safety_doc,
    clippy::question_mark,
    clippy::upper_case_acronyms
)]

#[macro_use]
mod macros;

mod std_ext;

pub mod simd;

mod error;
mod num;
mod quote;
mod scan;
mod skip;

pub use error::ParseError;
pub use num::{itoa64, str2int, utoa64};
pub use quote::{quote, quoted_max_len, unquote_in_place};
pub use scan::{StringBits, StringBlock};
pub use skip::{
    next_token, skip_array, skip_container, skip_literal, skip_number, skip_object, skip_string,
    SkipScanner, SkipString,
};

/**
The number of bytes of slack a caller should leave after the logical end of a
buffer so that chunked reads stay on the fast paths all the way to `len`.

One 64-byte block covers the widest backend.
*/
pub const PADDING: usize = 64;
