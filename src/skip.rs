/*!
Structural skipping over raw JSON without building anything.

These routines move a cursor across whole values: strings (honoring
escapes), containers (counting braces outside strings), literals, numbers
and whitespace runs. [`SkipScanner`] caches the non-space bitmask of the
last 64 byte window it classified, so the dense punctuation of a compact
document costs one classification per window rather than one per call.

Container and string scans work in 64 byte windows with carry state across
boundaries; the trailing partial window is copied into a zeroed stack
buffer instead of reading past the input.
*/

use crate::{
    error::ParseError,
    scan::StringBits,
    simd::{dispatch, eq_bits64, escaped_bits, Kernel, Vector},
};

/**
How a string literal ended.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipString {
    /**
    Closed, and contains no escape sequences; the raw bytes between the
    quotes are the decoded string.
    */
    Normal,

    /**
    Closed, but contains escapes; the payload needs
    [`unquote_in_place`](crate::unquote_in_place) before use.
    */
    Escaped,

    /**
    The input ended before the closing quote.
    */
    Unclosed,
}

/**
Skip to just past the closing quote of the string the cursor is in.

On entry `*pos` must point just past the opening quote.
*/
pub fn skip_string(data: &[u8], pos: &mut usize) -> SkipString {
    dispatch(SkipStringCall { data, pos })
}

struct SkipStringCall<'a> {
    data: &'a [u8],
    pos: &'a mut usize,
}

impl<'a> Kernel for SkipStringCall<'a> {
    type Output = SkipString;

    #[inline(always)]
    fn call<V: Vector>(self) -> SkipString {
        skip_string_impl::<V>(self.data, self.pos)
    }
}

fn skip_string_impl<V: Vector>(data: &[u8], pos: &mut usize) -> SkipString {
    let len = data.len();
    let mut prev_escaped = 0u64;
    let mut found = false;

    while *pos + 64 <= len {
        // SAFETY: 64 bytes are readable at `pos`; `dispatch` ensures the
        // backend's target features are available
        let (bs_bits, quote_bits) = unsafe {
            let ptr = data.as_ptr().add(*pos);
            (eq_bits64::<V>(ptr, b'\\'), eq_bits64::<V>(ptr, b'"'))
        };

        let escaped = if bs_bits != 0 {
            escaped_bits(&mut prev_escaped, bs_bits)
        } else {
            std::mem::take(&mut prev_escaped)
        };

        let quote_bits = quote_bits & !escaped;
        if quote_bits != 0 {
            let idx = quote_bits.trailing_zeros() as usize;

            // only escapes before the closing quote make the string escaped
            if (bs_bits | escaped) & ((1u64 << idx) - 1) != 0 {
                found = true;
            }

            *pos += idx + 1;
            return if found {
                SkipString::Escaped
            } else {
                SkipString::Normal
            };
        }

        if bs_bits != 0 {
            found = true;
        }
        *pos += 64;
    }

    // a backslash run that spilled out of the last window escapes the
    // first tail byte
    if prev_escaped != 0 && *pos < len {
        *pos += 1;
    }

    while *pos < len {
        let byte = *get_unchecked!(data, *pos);
        if byte == b'\\' {
            found = true;
            *pos += 2;
            continue;
        }

        *pos += 1;
        if byte == b'"' {
            return if found {
                SkipString::Escaped
            } else {
                SkipString::Normal
            };
        }
    }

    SkipString::Unclosed
}

/**
Skip to just past the byte that balances an already-consumed `left`.

Counts `left`/`right` bytes outside string literals. Returns `false` when
the input ends before the container is balanced, leaving the cursor where
the last window began.
*/
pub fn skip_container(data: &[u8], pos: &mut usize, left: u8, right: u8) -> bool {
    dispatch(SkipContainerCall {
        data,
        pos,
        left,
        right,
    })
}

/**
Skip a `{...}` whose opening brace was already consumed.
*/
pub fn skip_object(data: &[u8], pos: &mut usize) -> bool {
    skip_container(data, pos, b'{', b'}')
}

/**
Skip a `[...]` whose opening bracket was already consumed.
*/
pub fn skip_array(data: &[u8], pos: &mut usize) -> bool {
    skip_container(data, pos, b'[', b']')
}

struct SkipContainerCall<'a> {
    data: &'a [u8],
    pos: &'a mut usize,
    left: u8,
    right: u8,
}

impl<'a> Kernel for SkipContainerCall<'a> {
    type Output = bool;

    #[inline(always)]
    fn call<V: Vector>(self) -> bool {
        skip_container_impl::<V>(self.data, self.pos, self.left, self.right)
    }
}

fn skip_container_impl<V: Vector>(data: &[u8], pos: &mut usize, left: u8, right: u8) -> bool {
    let len = data.len();

    let mut bits = StringBits::new();
    let mut lbrace_num = 0u64;
    let mut rbrace_num = 0u64;

    // scans one 64 byte window, returning from the enclosing function as
    // soon as a closing brace goes unbalanced; evaluates to the window's
    // mask of opening braces outside strings
    macro_rules! scan_window {
        ($ptr:expr) => {{
            // SAFETY: 64 bytes are readable at the given pointer;
            // `dispatch` ensures the backend's target features are
            // available
            let (mut rbrace, lbrace) = unsafe {
                let ptr = $ptr;
                let instring = bits.scan_window_unchecked::<V>(ptr);
                (
                    eq_bits64::<V>(ptr, right) & !instring,
                    eq_bits64::<V>(ptr, left) & !instring,
                )
            };

            // walk each closing brace; openers to its left balance it
            while rbrace > 0 {
                rbrace_num += 1;
                let opened = lbrace_num + ((rbrace - 1) & lbrace).count_ones() as u64;
                if opened < rbrace_num {
                    test_assert_eq!(rbrace_num, opened + 1);
                    *pos += rbrace.trailing_zeros() as usize + 1;
                    return true;
                }
                rbrace &= rbrace - 1;
            }

            lbrace
        }};
    }

    while *pos + 64 <= len {
        let lbrace = scan_window!(data.as_ptr().add(*pos));
        lbrace_num += lbrace.count_ones() as u64;
        *pos += 64;
    }

    // the partial tail window can still close the container; whatever it
    // opens is unclosed regardless
    let mut buf = [0u8; 64];
    buf[..len - *pos].copy_from_slice(&data[*pos..]);
    let _ = scan_window!(buf.as_ptr());

    false
}

/**
Advance the cursor to the next occurrence of any byte in `tokens` and
return it without consuming it, or `\0` when the input is exhausted.
*/
pub fn next_token(data: &[u8], pos: &mut usize, tokens: &[u8]) -> u8 {
    dispatch(NextTokenCall { data, pos, tokens })
}

struct NextTokenCall<'a> {
    data: &'a [u8],
    pos: &'a mut usize,
    tokens: &'a [u8],
}

impl<'a> Kernel for NextTokenCall<'a> {
    type Output = u8;

    #[inline(always)]
    fn call<V: Vector>(self) -> u8 {
        next_token_impl::<V>(self.data, self.pos, self.tokens)
    }
}

fn next_token_impl<V: Vector>(data: &[u8], pos: &mut usize, tokens: &[u8]) -> u8 {
    let len = data.len();

    while *pos + V::LANES <= len {
        // SAFETY: `V::LANES` bytes are readable at `pos`; `dispatch`
        // ensures the backend's target features are available
        let v = unsafe { V::load(data.as_ptr().add(*pos)) };

        let mut mask = 0u64;
        for &token in tokens {
            mask |= v.eq(V::splat(token));
        }

        if mask != 0 {
            *pos += mask.trailing_zeros() as usize;
            return *get_unchecked!(data, *pos);
        }
        *pos += V::LANES;
    }

    while *pos < len {
        let byte = *get_unchecked!(data, *pos);
        if tokens.contains(&byte) {
            return byte;
        }
        *pos += 1;
    }

    0
}

/**
Skip past a `true`, `false` or `null` whose first byte was already
consumed.

`token` is that first byte. Returns `false` when the input doesn't spell
the literal out.
*/
pub fn skip_literal(data: &[u8], pos: &mut usize, token: u8) -> bool {
    const TRUE_BIN: u32 = u32::from_le_bytes(*b"true");
    const NULL_BIN: u32 = u32::from_le_bytes(*b"null");
    const ALSE_BIN: u32 = u32::from_le_bytes(*b"alse");

    test_assert!(*pos > 0);
    let start = *pos - 1;

    match token {
        b't' if eq_bytes4(data, start, TRUE_BIN) => {
            *pos += 3;
            true
        }
        b'n' if eq_bytes4(data, start, NULL_BIN) => {
            *pos += 3;
            true
        }
        b'f' if eq_bytes4(data, start + 1, ALSE_BIN) => {
            *pos += 4;
            true
        }
        _ => false,
    }
}

#[inline(always)]
fn eq_bytes4(data: &[u8], at: usize, target: u32) -> bool {
    match data.get(at..at + 4) {
        Some(&[a, b, c, d]) => u32::from_le_bytes([a, b, c, d]) == target,
        _ => false,
    }
}

/**
Skip to the end of a number by finding the next structural byte.

The digits themselves aren't validated.
*/
pub fn skip_number(data: &[u8], pos: &mut usize) -> u8 {
    next_token(data, pos, b"]},")
}

/**
A whitespace skipper that caches the non-space bitmask of the last 64 byte
window it classified.

Reuse one scanner for a whole document and always move the cursor forward;
the cache keys off absolute positions.
*/
#[derive(Debug, Default, Clone)]
pub struct SkipScanner {
    nonspace_bits: u64,
    nonspace_bits_end: usize,
}

// whitespace keyed by low nibble; the sentinels never equal a byte with
// that nibble, and indexes with the high bit set come back zero
#[rustfmt::skip]
const WHITESPACE_TAB: [u8; 16] = [
    b' ', 100,   100, 100,
    17,   100,   113, 2,
    100,  b'\t', b'\n', 112,
    100,  b'\r', 100, 100,
];

#[inline(always)]
fn is_space(byte: u8) -> bool {
    byte == b' ' || byte == b'\t' || byte == b'\n' || byte == b'\r'
}

// SAFETY: callers must ensure 64 bytes are readable from `ptr` and that
// `V`'s target features are available
#[inline(always)]
unsafe fn nonspace_bits64<V: Vector>(ptr: *const u8) -> u64 {
    let mut space = 0u64;
    let mut lane = 0;
    while lane < 64 {
        let v = V::load(ptr.add(lane));
        space |= v.eq(v.lookup16(WHITESPACE_TAB)) << lane;
        lane += V::LANES;
    }
    !space
}

impl SkipScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /**
    Advance past whitespace and consume the first non-space byte,
    returning it. `\0` when the input is exhausted.
    */
    pub fn skip_space(&mut self, data: &[u8], pos: &mut usize) -> u8 {
        dispatch(SkipSpaceCall {
            scanner: self,
            data,
            pos,
        })
    }

    /**
    Skip one whole JSON value of any kind, returning the offset of its
    first byte.

    Strings, containers and literals are validated as far as skipping
    needs; numbers are not.
    */
    pub fn skip_one(&mut self, data: &[u8], pos: &mut usize) -> Result<usize, ParseError> {
        let first = self.skip_space(data, pos);
        if first == 0 {
            return Err(ParseError::InvalidLiteral { offset: *pos });
        }

        let start = *pos - 1;
        match first {
            b'"' => match skip_string(data, pos) {
                SkipString::Unclosed => Err(ParseError::UnclosedString { offset: start }),
                _ => Ok(start),
            },
            b'{' => skip_object(data, pos)
                .then_some(start)
                .ok_or(ParseError::UnclosedContainer { offset: start }),
            b'[' => skip_array(data, pos)
                .then_some(start)
                .ok_or(ParseError::UnclosedContainer { offset: start }),
            b't' | b'f' | b'n' => skip_literal(data, pos, first)
                .then_some(start)
                .ok_or(ParseError::InvalidLiteral { offset: start }),
            b'0'..=b'9' | b'-' => {
                skip_number(data, pos);
                Ok(start)
            }
            _ => Err(ParseError::InvalidLiteral { offset: start }),
        }
    }

    fn skip_space_impl<V: Vector>(&mut self, data: &[u8], pos: &mut usize) -> u8 {
        let len = data.len();

        // fast path for at most one space before the next token
        for _ in 0..2 {
            if *pos >= len {
                return 0;
            }
            let byte = *get_unchecked!(data, *pos);
            *pos += 1;
            if !is_space(byte) {
                return byte;
            }
        }

        // the cursor may still be inside the last classified window
        if *pos < self.nonspace_bits_end {
            let window_start = self.nonspace_bits_end - 64;
            test_assert!(*pos >= window_start);

            let bit_pos = *pos - window_start;
            let nonspace = self.nonspace_bits & !((1u64 << bit_pos) - 1);
            if nonspace != 0 {
                *pos = window_start + nonspace.trailing_zeros() as usize;
                let byte = *get_unchecked!(data, *pos);
                *pos += 1;
                return byte;
            }
            *pos = self.nonspace_bits_end;
        }

        while *pos + 64 <= len {
            // SAFETY: 64 bytes are readable at `pos`; `dispatch` ensures
            // the backend's target features are available
            let nonspace = unsafe { nonspace_bits64::<V>(data.as_ptr().add(*pos)) };
            if nonspace != 0 {
                self.nonspace_bits = nonspace;
                self.nonspace_bits_end = *pos + 64;
                *pos += nonspace.trailing_zeros() as usize;
                let byte = *get_unchecked!(data, *pos);
                *pos += 1;
                return byte;
            }
            *pos += 64;
        }

        while *pos < len {
            let byte = *get_unchecked!(data, *pos);
            *pos += 1;
            if !is_space(byte) {
                return byte;
            }
        }

        0
    }
}

struct SkipSpaceCall<'a> {
    scanner: &'a mut SkipScanner,
    data: &'a [u8],
    pos: &'a mut usize,
}

impl<'a> Kernel for SkipSpaceCall<'a> {
    type Output = u8;

    #[inline(always)]
    fn call<V: Vector>(self) -> u8 {
        self.scanner.skip_space_impl::<V>(self.data, self.pos)
    }
}
