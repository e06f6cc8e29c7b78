/*!
Classification of string bytes in vector chunks.

[`StringBlock`] looks at a single vector chunk and answers the question a
string decoder asks at every step: what comes first, the closing quote, a
backslash, or a raw control byte? [`StringBits`] runs over 64 byte windows
and turns quote positions into an in-string region mask, carrying string
and escape state across window boundaries so a scan can stream through a
document without ever re-reading.
*/

use crate::simd::{dispatch, eq_bits64, escaped_bits, prefix_xor, Kernel, Vector};

/**
The classification of one vector chunk of a string literal's bytes.

Masks are lane bitmasks, least significant bit first. The predicates decide
what the decoder hits first within the chunk; each is only meaningful when
its leading byte class actually appears, so order the checks
[`has_quote_first`](Self::has_quote_first), then
[`has_backslash`](Self::has_backslash), then
[`has_unescaped`](Self::has_unescaped).
*/
#[derive(Debug, Clone, Copy)]
pub struct StringBlock {
    /**
    Lanes holding `\\`.
    */
    pub bs_bits: u64,

    /**
    Lanes holding `"`.
    */
    pub quote_bits: u64,

    /**
    Lanes holding a raw control byte (`0x00..=0x1f`).
    */
    pub unescaped_bits: u64,
}

impl StringBlock {
    /**
    Classify one loaded vector chunk.
    */
    #[inline(always)]
    pub fn classify<V: Vector>(v: V) -> Self {
        StringBlock {
            bs_bits: v.eq(V::splat(b'\\')),
            quote_bits: v.eq(V::splat(b'"')),
            unescaped_bits: v.le(V::splat(0x1f)),
        }
    }

    /**
    Whether a closing quote appears before any backslash, with no raw
    control byte before it.
    */
    #[inline(always)]
    pub fn has_quote_first(&self) -> bool {
        (self.bs_bits.wrapping_sub(1) & self.quote_bits) != 0 && !self.has_unescaped()
    }

    /**
    Whether a backslash appears before any quote.
    */
    #[inline(always)]
    pub fn has_backslash(&self) -> bool {
        (self.quote_bits.wrapping_sub(1) & self.bs_bits) != 0
    }

    /**
    Whether a raw control byte appears before any quote.
    */
    #[inline(always)]
    pub fn has_unescaped(&self) -> bool {
        (self.quote_bits.wrapping_sub(1) & self.unescaped_bits) != 0
    }

    #[inline(always)]
    pub fn quote_index(&self) -> usize {
        self.quote_bits.trailing_zeros() as usize
    }

    #[inline(always)]
    pub fn bs_index(&self) -> usize {
        self.bs_bits.trailing_zeros() as usize
    }

    #[inline(always)]
    pub fn unescaped_index(&self) -> usize {
        self.unescaped_bits.trailing_zeros() as usize
    }
}

/**
Carry state for streaming in-string masks across 64 byte windows.

`prev_instring` is all-ones while a string literal is still open at a
window boundary; `prev_escaped` marks a backslash run that spilled over.
Feeding windows in order keeps quote pairing correct no matter where
chunk boundaries fall relative to quotes and escapes.
*/
#[derive(Debug, Default, Clone)]
pub struct StringBits {
    prev_instring: u64,
    prev_escaped: u64,
}

impl StringBits {
    #[inline(always)]
    pub fn new() -> Self {
        StringBits {
            prev_instring: 0,
            prev_escaped: 0,
        }
    }

    /**
    The in-string bitmask for the next 64 byte window.

    A set bit means the byte at that offset is inside a string literal,
    counting the opening quote but not the closing one.
    */
    #[inline]
    pub fn scan_window(&mut self, window: &[u8; 64]) -> u64 {
        dispatch(ScanWindow {
            bits: self,
            window,
        })
    }

    // SAFETY: callers must ensure 64 bytes are readable from `ptr` and
    // that `V`'s target features are available
    #[inline(always)]
    pub(crate) unsafe fn scan_window_unchecked<V: Vector>(&mut self, ptr: *const u8) -> u64 {
        let bs_bits = eq_bits64::<V>(ptr, b'\\');

        let escaped = if bs_bits != 0 {
            escaped_bits(&mut self.prev_escaped, bs_bits)
        } else {
            let escaped = self.prev_escaped;
            self.prev_escaped = 0;
            escaped
        };

        let quote_bits = eq_bits64::<V>(ptr, b'"') & !escaped;

        let in_string = prefix_xor(quote_bits) ^ self.prev_instring;

        // an arithmetic shift smears the top bit: all-ones while a
        // string is still open at the window boundary
        self.prev_instring = ((in_string as i64) >> 63) as u64;

        in_string
    }
}

struct ScanWindow<'a> {
    bits: &'a mut StringBits,
    window: &'a [u8; 64],
}

impl<'a> Kernel for ScanWindow<'a> {
    type Output = u64;

    #[inline(always)]
    fn call<V: Vector>(self) -> u64 {
        // SAFETY: `window` is 64 readable bytes; `dispatch` ensures the
        // backend's target features are available
        unsafe { self.bits.scan_window_unchecked::<V>(self.window.as_ptr()) }
    }
}
