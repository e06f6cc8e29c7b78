/*!
Escape-encoding and in-place decoding of JSON string literals.

[`quote`] appends an escaped copy of raw bytes, surrounding quotes included.
It streams vector chunks straight into the output and only drops to a
scalar table walk for the bytes that actually need escaping, so documents
that are mostly plain text move at memcpy speed.

[`unquote_in_place`] is the inverse. Decoding shortens the payload, so it
rewrites the buffer in place behind the read cursor and hands back the
decoded length. It runs as an explicit three-state machine: scanning while
nothing has been rewritten yet, handling one escape sequence, and copying
once the write cursor trails the read cursor.
*/

use crate::{
    error::ParseError,
    scan::StringBlock,
    simd::{dispatch, Kernel, Vector},
    std_ext::char as char_ext,
};

/**
The worst-case encoded length of a string literal, surrounding quotes
included.

Every input byte can expand to a six byte `\u00XX` sequence.
*/
#[inline]
pub fn quoted_max_len(len: usize) -> usize {
    6 * len + 2
}

const HEX_DIGITS: [u8; 16] = *b"0123456789abcdef";

/**
Whether a byte can't appear raw inside a string literal.
*/
const NEED_ESCAPE: [bool; 256] = {
    let mut tab = [false; 256];
    let mut b = 0;
    while b < 256 {
        tab[b] = b < 0x20 || b == b'"' as usize || b == b'\\' as usize;
        b += 1;
    }
    tab
};

#[derive(Clone, Copy)]
struct Escape {
    len: u8,
    // padded so the whole sequence can be written with one 8 byte copy
    seq: [u8; 8],
}

const QUOTE_TAB: [Escape; 256] = {
    const fn short(a: u8, b: u8) -> Escape {
        Escape {
            len: 2,
            seq: [a, b, 0, 0, 0, 0, 0, 0],
        }
    }

    let mut tab = [Escape {
        len: 0,
        seq: [0; 8],
    }; 256];

    let mut b = 0;
    while b < 256 {
        tab[b] = match b as u8 {
            b'"' => short(b'\\', b'"'),
            b'\\' => short(b'\\', b'\\'),
            0x08 => short(b'\\', b'b'),
            0x09 => short(b'\\', b't'),
            0x0a => short(b'\\', b'n'),
            0x0c => short(b'\\', b'f'),
            0x0d => short(b'\\', b'r'),
            byte if byte < 0x20 => Escape {
                len: 6,
                seq: [
                    b'\\',
                    b'u',
                    b'0',
                    b'0',
                    HEX_DIGITS[(byte >> 4) as usize],
                    HEX_DIGITS[(byte & 0x0f) as usize],
                    0,
                    0,
                ],
            },
            _ => Escape {
                len: 0,
                seq: [0; 8],
            },
        };
        b += 1;
    }
    tab
};

/**
What a byte following a `\` decodes to, with `0` marking an invalid escape.

`\u` isn't in the table; it's handled separately.
*/
const UNESCAPE_TAB: [u8; 256] = {
    let mut tab = [0u8; 256];
    tab[b'"' as usize] = b'"';
    tab[b'\\' as usize] = b'\\';
    tab[b'/' as usize] = b'/';
    tab[b'b' as usize] = 0x08;
    tab[b'f' as usize] = 0x0c;
    tab[b'n' as usize] = 0x0a;
    tab[b'r' as usize] = 0x0d;
    tab[b't' as usize] = 0x09;
    tab
};

/**
Escape-encode `src` and append it to `dst` as a JSON string literal,
surrounding quotes included.
*/
pub fn quote(src: &[u8], dst: &mut Vec<u8>) {
    dispatch(Quote { src, dst })
}

struct Quote<'a> {
    src: &'a [u8],
    dst: &'a mut Vec<u8>,
}

impl<'a> Kernel for Quote<'a> {
    type Output = ();

    #[inline(always)]
    fn call<V: Vector>(self) {
        // SAFETY: `dispatch` ensures the backend's target features are
        // available
        unsafe { quote_impl::<V>(self.src, self.dst) }
    }
}

// SAFETY: callers must ensure `V`'s target features are available
unsafe fn quote_impl<V: Vector>(src: &[u8], dst: &mut Vec<u8>) {
    // worst case expansion, plus slack for whole-vector stores and the
    // 8 byte escape copies that overshoot the bytes they mean to write
    dst.reserve(quoted_max_len(src.len()) + crate::PADDING);

    let base = dst.as_mut_ptr();
    let start_len = dst.len();

    let mut s = src.as_ptr();
    let mut d = base.add(start_len);
    let mut nb = src.len();

    *d = b'"';
    d = d.add(1);

    let control = V::splat(0x1f);
    let quote = V::splat(b'"');
    let backslash = V::splat(b'\\');

    while nb >= V::LANES {
        let v = V::load(s);
        v.store(d);

        let mask = v.le(control) | v.eq(quote) | v.eq(backslash);
        if mask != 0 {
            // keep the clean prefix that was already stored, then walk
            // the escape run through the table
            let cnt = mask.trailing_zeros() as usize;
            s = s.add(cnt);
            d = d.add(cnt);
            nb -= cnt;

            escape_run(&mut s, &mut d, &mut nb);
        } else {
            s = s.add(V::LANES);
            d = d.add(V::LANES);
            nb -= V::LANES;
        }
    }

    let mut tmp = [0u8; 64];
    while nb > 0 {
        test_assert!(nb < V::LANES);

        let v = if can_load_straddle::<V>(s) {
            V::load(s)
        } else {
            std::ptr::copy_nonoverlapping(s, tmp.as_mut_ptr(), nb);
            V::load(tmp.as_ptr())
        };
        v.store(d);

        let mask = (v.le(control) | v.eq(quote) | v.eq(backslash))
            & (V::FULL_MASK >> (V::LANES - nb));

        if mask != 0 {
            let cnt = mask.trailing_zeros() as usize;
            s = s.add(cnt);
            d = d.add(cnt);
            nb -= cnt;

            escape_run(&mut s, &mut d, &mut nb);
        } else {
            d = d.add(nb);
            nb = 0;
        }
    }

    *d = b'"';
    d = d.add(1);

    // SAFETY: every byte up to `d` was written above and `d` is within
    // the reserved capacity
    dst.set_len(d as usize - base as usize);
}

/**
Whether a whole-vector read at `ptr` can overshoot the source without
crossing into an unmapped page.
*/
#[inline(always)]
fn can_load_straddle<V: Vector>(ptr: *const u8) -> bool {
    #[cfg(any(all(test, debug), checked))]
    {
        let _ = ptr;
        false
    }

    #[cfg(not(any(all(test, debug), checked)))]
    {
        const PAGE_SIZE: usize = 4096;
        (ptr as usize & (PAGE_SIZE - 1)) <= PAGE_SIZE - 2 * V::LANES
    }
}

// SAFETY: callers must ensure `*s` points at a byte needing escape with
// `*nb` bytes readable, and `*d` has 8 bytes of slack beyond each escape
#[inline(always)]
unsafe fn escape_run(s: &mut *const u8, d: &mut *mut u8, nb: &mut usize) {
    loop {
        let escape = &QUOTE_TAB[**s as usize];
        test_assert!(escape.len > 0);

        // the sequence is padded to 8 bytes; only `len` of them count
        std::ptr::copy_nonoverlapping(escape.seq.as_ptr(), *d, 8);
        *d = (*d).add(escape.len as usize);
        *s = (*s).add(1);
        *nb -= 1;

        if *nb == 0 || !NEED_ESCAPE[**s as usize] {
            return;
        }
    }
}

/**
Decode the string literal the cursor sits in, rewriting the buffer in
place.

On entry `*pos` must point just past the opening quote. On success the
decoded bytes occupy `buf[start..start + len]` where `start` is the entry
position and `len` the returned length, and `*pos` has advanced past the
closing quote. On an error the buffer contents behind the cursor are
unspecified.
*/
pub fn unquote_in_place(buf: &mut [u8], pos: &mut usize) -> Result<usize, ParseError> {
    dispatch(Unquote { buf, pos })
}

struct Unquote<'a> {
    buf: &'a mut [u8],
    pos: &'a mut usize,
}

impl<'a> Kernel for Unquote<'a> {
    type Output = Result<usize, ParseError>;

    #[inline(always)]
    fn call<V: Vector>(self) -> Self::Output {
        // SAFETY: `dispatch` ensures the backend's target features are
        // available
        unsafe { unquote_impl::<V>(self.buf, self.pos) }
    }
}

enum UnquoteState {
    /**
    Nothing has been rewritten yet; bytes are staying where they are.
    */
    Scanning,

    /**
    The read cursor sits on a `\`.
    */
    HandlingEscape,

    /**
    The write cursor trails the read cursor; every byte moves.
    */
    Copying,
}

// SAFETY: callers must ensure `V`'s target features are available
unsafe fn unquote_impl<V: Vector>(buf: &mut [u8], pos: &mut usize) -> Result<usize, ParseError> {
    use self::UnquoteState::*;

    let len = buf.len();
    let start = *pos;

    let mut src = start;
    let mut dst = start;
    let mut state = Scanning;

    'state: loop {
        match state {
            Scanning => {
                while src + V::LANES <= len {
                    // SAFETY: `V::LANES` bytes are readable at `src`
                    let block = StringBlock::classify(V::load(buf.as_ptr().add(src)));

                    if block.has_quote_first() {
                        let end = src + block.quote_index();
                        *pos = end + 1;
                        return Ok(end - start);
                    }
                    if block.has_unescaped() {
                        let at = src + block.unescaped_index();
                        return Err(ParseError::UnescapedControlByte {
                            byte: *get_unchecked!(buf, at),
                            offset: at,
                        });
                    }
                    if block.has_backslash() {
                        src += block.bs_index();
                        dst = src;
                        state = HandlingEscape;
                        continue 'state;
                    }

                    src += V::LANES;
                }

                while src < len {
                    match *get_unchecked!(buf, src) {
                        b'"' => {
                            *pos = src + 1;
                            return Ok(src - start);
                        }
                        b'\\' => {
                            dst = src;
                            state = HandlingEscape;
                            continue 'state;
                        }
                        byte if byte <= 0x1f => {
                            return Err(ParseError::UnescapedControlByte { byte, offset: src })
                        }
                        _ => src += 1,
                    }
                }

                return Err(ParseError::UnclosedString { offset: start });
            }

            HandlingEscape => {
                test_assert_eq!(b'\\', buf[src]);

                if src + 1 >= len {
                    return Err(ParseError::UnclosedString { offset: start });
                }

                let escape = *get_unchecked!(buf, src + 1);
                if escape == b'u' {
                    let decoded = decode_unicode_escape(buf, &mut src)?;

                    let mut utf8 = [0u8; 4];
                    for &byte in decoded.encode_utf8(&mut utf8).as_bytes() {
                        // a `\uXXXX` consumes 6 bytes and emits at most 4,
                        // so the write cursor can't catch the read cursor
                        test_assert!(dst < src);
                        *get_unchecked_mut!(buf, dst) = byte;
                        dst += 1;
                    }
                } else {
                    let unescaped = UNESCAPE_TAB[escape as usize];
                    if unescaped == 0 {
                        return Err(ParseError::InvalidEscapeFormat {
                            escape,
                            offset: src + 1,
                        });
                    }

                    *get_unchecked_mut!(buf, dst) = unescaped;
                    dst += 1;
                    src += 2;
                }

                // consecutive escapes skip the vector probe
                if src < len && *get_unchecked!(buf, src) == b'\\' {
                    continue 'state;
                }

                state = Copying;
            }

            Copying => {
                while src + V::LANES <= len {
                    // SAFETY: `V::LANES` bytes are readable at `src`
                    let v = V::load(buf.as_ptr().add(src));
                    let block = StringBlock::classify(v);

                    if block.has_quote_first() {
                        let idx = block.quote_index();
                        // the ranges overlap when escapes were short
                        std::ptr::copy(buf.as_ptr().add(src), buf.as_mut_ptr().add(dst), idx);
                        *pos = src + idx + 1;
                        return Ok(dst + idx - start);
                    }
                    if block.has_unescaped() {
                        let at = src + block.unescaped_index();
                        return Err(ParseError::UnescapedControlByte {
                            byte: *get_unchecked!(buf, at),
                            offset: at,
                        });
                    }
                    if block.has_backslash() {
                        let idx = block.bs_index();
                        std::ptr::copy(buf.as_ptr().add(src), buf.as_mut_ptr().add(dst), idx);
                        src += idx;
                        dst += idx;
                        state = HandlingEscape;
                        continue 'state;
                    }

                    // a clean block moves wholesale
                    // SAFETY: `dst <= src`, so the store stays in bounds
                    v.store(buf.as_mut_ptr().add(dst));
                    src += V::LANES;
                    dst += V::LANES;
                }

                while src < len {
                    match *get_unchecked!(buf, src) {
                        b'"' => {
                            *pos = src + 1;
                            return Ok(dst - start);
                        }
                        b'\\' => {
                            state = HandlingEscape;
                            continue 'state;
                        }
                        byte if byte <= 0x1f => {
                            return Err(ParseError::UnescapedControlByte { byte, offset: src })
                        }
                        byte => {
                            *get_unchecked_mut!(buf, dst) = byte;
                            dst += 1;
                            src += 1;
                        }
                    }
                }

                return Err(ParseError::UnclosedString { offset: start });
            }
        }
    }
}

/**
Decode a `\uXXXX` escape, pairing surrogates, with `*src` on the `\`.
*/
fn decode_unicode_escape(buf: &[u8], src: &mut usize) -> Result<char, ParseError> {
    let offset = *src;

    let hi = parse_hex4(buf, *src + 2).ok_or(ParseError::InvalidUnicodeEscape { offset })?;
    *src += 6;

    if char_ext::is_utf16_low_surrogate(hi) {
        return Err(ParseError::InvalidUnicodeEscape { offset });
    }

    if char_ext::is_utf16_high_surrogate(hi) {
        if buf.len() < *src + 6 || buf[*src] != b'\\' || buf[*src + 1] != b'u' {
            return Err(ParseError::InvalidUnicodeEscape { offset });
        }

        let lo = parse_hex4(buf, *src + 2).ok_or(ParseError::InvalidUnicodeEscape { offset })?;
        *src += 6;

        return char_ext::try_from_utf16_surrogate_pair(hi, lo)
            .ok_or(ParseError::InvalidUnicodeEscape { offset });
    }

    char::from_u32(hi as u32).ok_or(ParseError::InvalidUnicodeEscape { offset })
}

fn parse_hex4(buf: &[u8], at: usize) -> Option<u16> {
    if buf.len() < at + 4 {
        return None;
    }

    let mut value = 0u16;
    for &byte in &buf[at..at + 4] {
        let digit = (byte as char).to_digit(16)?;
        value = (value << 4) | digit as u16;
    }

    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quoted(src: &[u8]) -> String {
        let mut dst = Vec::new();
        quote(src, &mut dst);
        String::from_utf8(dst).expect("quoted output is valid utf8")
    }

    fn unquoted(literal: &str) -> Result<(Vec<u8>, usize), ParseError> {
        let mut buf = literal.as_bytes().to_vec();
        let mut pos = 1;
        let len = unquote_in_place(&mut buf, &mut pos)?;
        Ok((buf[1..1 + len].to_vec(), pos))
    }

    #[test]
    fn quote_plain() {
        assert_eq!("\"\"", quoted(b""));
        assert_eq!("\"hello\"", quoted(b"hello"));
    }

    #[test]
    fn quote_escapes() {
        assert_eq!(r#""a\"b""#, quoted(b"a\"b"));
        assert_eq!(r#""a\\b""#, quoted(b"a\\b"));
        assert_eq!(r#""a\nb\tc""#, quoted(b"a\nb\tc"));
        assert_eq!("\"nul\\u0000end\"", quoted(b"nul\0end"));
    }

    #[test]
    fn quote_longer_than_one_vector() {
        let src = [b'x'; 100];
        let expected = format!("\"{}\"", "x".repeat(100));
        assert_eq!(expected, quoted(&src));
    }

    #[test]
    fn unquote_plain() {
        let (decoded, pos) = unquoted(r#""hello""#).expect("valid literal");
        assert_eq!(b"hello".to_vec(), decoded);
        assert_eq!(7, pos);
    }

    #[test]
    fn unquote_escapes() {
        let (decoded, _) = unquoted(r#""a\nb\\c\"d""#).expect("valid literal");
        assert_eq!(b"a\nb\\c\"d".to_vec(), decoded);
    }

    #[test]
    fn unquote_unicode() {
        let (decoded, _) = unquoted(r#""Aé世""#).expect("valid literal");
        assert_eq!("Aé世".as_bytes().to_vec(), decoded);
    }

    #[test]
    fn unquote_surrogate_pair() {
        let (decoded, _) = unquoted(r#""😀""#).expect("valid literal");
        assert_eq!("😀".as_bytes().to_vec(), decoded);
    }

    #[test]
    fn unquote_rejects_lone_surrogates() {
        assert!(matches!(
            unquoted(r#""\ud83d""#),
            Err(ParseError::InvalidUnicodeEscape { .. })
        ));
        assert!(matches!(
            unquoted(r#""\ude00x""#),
            Err(ParseError::InvalidUnicodeEscape { .. })
        ));
    }

    #[test]
    fn unquote_rejects_bad_escape() {
        assert!(matches!(
            unquoted(r#""a\qb""#),
            Err(ParseError::InvalidEscapeFormat { escape: b'q', .. })
        ));
    }

    #[test]
    fn unquote_rejects_raw_control() {
        assert!(matches!(
            unquoted("\"a\u{1}b\""),
            Err(ParseError::UnescapedControlByte { byte: 1, .. })
        ));
    }

    #[test]
    fn unquote_rejects_unclosed() {
        assert!(matches!(
            unquoted(r#""never ends"#),
            Err(ParseError::UnclosedString { .. })
        ));
    }

    #[test]
    fn unquote_stops_at_closing_quote() {
        let mut buf = br#""a\tb", "next""#.to_vec();
        let mut pos = 1;

        let len = unquote_in_place(&mut buf, &mut pos).expect("valid literal");

        assert_eq!(b"a\tb".to_vec(), buf[1..1 + len].to_vec());
        // the cursor lands on the comma, with the document beyond intact
        assert_eq!(6, pos);
        assert_eq!(b", \"next\"".to_vec(), buf[6..].to_vec());
    }

    #[test]
    fn escape_tables_are_total() {
        for b in 0..=255u8 {
            let escape = &QUOTE_TAB[b as usize];
            if NEED_ESCAPE[b as usize] {
                assert!(escape.len >= 2, "byte {:#04x} needs an escape entry", b);
            } else {
                assert_eq!(0, escape.len, "byte {:#04x} must not be escaped", b);
            }
        }
    }

    #[test]
    fn unescape_covers_every_escape_byte() {
        // every byte after a `\` either decodes or is rejected with the
        // offending byte and its offset; none are silently passed through
        for b in 0..=255u8 {
            let mut buf = vec![b'"', b'x', b'\\', b, b'y', b'"'];
            let mut pos = 1;

            let result = unquote_in_place(&mut buf, &mut pos);

            match b {
                b'u' => {
                    // `\u` needs four hex digits, which `y"` is not
                    assert_eq!(Err(ParseError::InvalidUnicodeEscape { offset: 2 }), result);
                }
                _ if UNESCAPE_TAB[b as usize] != 0 => {
                    assert_eq!(Ok(3), result, "byte {:#04x} decodes", b);
                    assert_eq!(&[b'x', UNESCAPE_TAB[b as usize], b'y'], &buf[1..4]);
                    assert_eq!(6, pos);
                }
                _ => {
                    assert_eq!(
                        Err(ParseError::InvalidEscapeFormat {
                            escape: b,
                            offset: 3
                        }),
                        result,
                        "byte {:#04x} must be rejected",
                        b
                    );
                }
            }
        }
    }
}
