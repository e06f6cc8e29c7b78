/*!
Decimal digit runs to and from `u64`/`i64`.

[`str2int`] evaluates up to 20 leading digits in a couple of multiply-add
instructions instead of a byte-at-a-time loop, wrapping modulo 2^64 past
the 20th digit's worth of range. [`utoa64`]/[`itoa64`] go the other way,
emitting fixed 8 and 16 digit groups from a vector kernel with a two-digit
lookup table covering the variable-length head.

The vector kernels are x86_64; other targets use the table path for
everything, producing identical bytes.
*/

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/**
Parse up to `*ndigits` leading decimal digits, wrapping modulo 2^64.

Reads at most 20 digits no matter what the caller asks for, and stops
early at the first non-digit byte; `*ndigits` comes back clamped to the
count actually consumed. The mantissa of a JSON number can claim more
digits than matter; callers track the overflow themselves.
*/
pub fn str2int(data: &[u8], ndigits: &mut usize) -> u64 {
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("sse4.1") {
            // SAFETY: SSE4.1 is available
            return unsafe { str2int_x86(data, ndigits) };
        }
    }

    str2int_scalar(data, ndigits)
}

fn str2int_scalar(data: &[u8], ndigits: &mut usize) -> u64 {
    let want = (*ndigits).min(data.len()).min(20);

    let mut value = 0u64;
    let mut count = 0;
    while count < want {
        let byte = *get_unchecked!(data, count);
        if !byte.is_ascii_digit() {
            break;
        }
        value = value.wrapping_mul(10).wrapping_add((byte - b'0') as u64);
        count += 1;
    }

    *ndigits = count;
    value
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.1")]
unsafe fn str2int_x86(data: &[u8], ndigits: &mut usize) -> u64 {
    let want = (*ndigits).min(data.len()).min(20);

    // the kernel reads a whole vector; pad short inputs on the stack
    let mut chunk = [0u8; 16];
    let head = if data.len() >= 16 {
        data.as_ptr()
    } else {
        chunk[..data.len()].copy_from_slice(data);
        chunk.as_ptr()
    };

    let mut head_digits = want.min(16);
    let value = str2int_sse(head, &mut head_digits);

    if head_digits < 16 || want <= 16 {
        *ndigits = head_digits;
        return value;
    }

    // digits 17..=20 compose on top of the vector result
    let mut value = value;
    let mut count = 16;
    while count < want {
        let byte = *get_unchecked!(data, count);
        if !byte.is_ascii_digit() {
            break;
        }
        value = value.wrapping_mul(10).wrapping_add((byte - b'0') as u64);
        count += 1;
    }

    *ndigits = count;
    value
}

/**
Evaluate the first `*ndigits` digits of one 16 byte chunk.

Subtracting `'0'` turns digits into `0..=9` and everything else out of
that range, so one compare pair finds where the run ends. The digits are
then left-aligned to the top of the vector and folded pairwise: bytes to
base-100 words, words to base-10000 dwords, dwords to two base-10^8
halves combined in scalar code.
*/
#[cfg(target_arch = "x86_64")]
#[inline(always)]
// SAFETY: callers must ensure 16 bytes are readable from `ptr` and that
// SSE4.1 is available
unsafe fn str2int_sse(ptr: *const u8, ndigits: &mut usize) -> u64 {
    let mut data = _mm_loadu_si128(ptr as *const _);

    data = _mm_sub_epi8(data, _mm_set1_epi8(b'0' as i8));
    let lt_zero = _mm_cmpgt_epi8(_mm_setzero_si128(), data);
    let gt_nine = _mm_cmpgt_epi8(data, _mm_set1_epi8(9));

    let num_end = _mm_movemask_epi8(_mm_or_si128(lt_zero, gt_nine)) as u32;
    let num_end_idx = if num_end != 0 {
        num_end.trailing_zeros() as usize
    } else {
        16
    };
    if num_end_idx < *ndigits {
        *ndigits = num_end_idx;
    }

    let nd = *ndigits;
    match nd {
        0 => 0,
        1 => _mm_extract_epi8::<0>(data) as u64,
        2 => (_mm_extract_epi8::<0>(data) * 10 + _mm_extract_epi8::<1>(data)) as u64,
        3..=4 => {
            let data = maddubs(shift_left(data, 16 - nd));
            (_mm_extract_epi16::<6>(data) * 100 + _mm_extract_epi16::<7>(data)) as u64
        }
        5..=8 => {
            let data = madd(maddubs(shift_left(data, 16 - nd)));
            (_mm_extract_epi32::<2>(data) as u64) * 10_000 + _mm_extract_epi32::<3>(data) as u64
        }
        _ => {
            let data = pack_and_madd(madd(maddubs(shift_left(data, 16 - nd))));
            (_mm_extract_epi32::<0>(data) as u32 as u64) * 100_000_000
                + _mm_extract_epi32::<1>(data) as u32 as u64
        }
    }
}

// `_mm_slli_si128` takes a const shift, so dispatch the dynamic one
#[cfg(target_arch = "x86_64")]
#[inline(always)]
unsafe fn shift_left(data: __m128i, bytes: usize) -> __m128i {
    match bytes {
        1 => _mm_slli_si128::<1>(data),
        2 => _mm_slli_si128::<2>(data),
        3 => _mm_slli_si128::<3>(data),
        4 => _mm_slli_si128::<4>(data),
        5 => _mm_slli_si128::<5>(data),
        6 => _mm_slli_si128::<6>(data),
        7 => _mm_slli_si128::<7>(data),
        8 => _mm_slli_si128::<8>(data),
        9 => _mm_slli_si128::<9>(data),
        10 => _mm_slli_si128::<10>(data),
        11 => _mm_slli_si128::<11>(data),
        12 => _mm_slli_si128::<12>(data),
        13 => _mm_slli_si128::<13>(data),
        _ => data,
    }
}

#[cfg(target_arch = "x86_64")]
#[inline(always)]
unsafe fn maddubs(data: __m128i) -> __m128i {
    _mm_maddubs_epi16(data, _mm_set1_epi64x(0x010A_010A_010A_010A))
}

#[cfg(target_arch = "x86_64")]
#[inline(always)]
unsafe fn madd(data: __m128i) -> __m128i {
    _mm_madd_epi16(data, _mm_set1_epi64x(0x0001_0064_0001_0064))
}

#[cfg(target_arch = "x86_64")]
#[inline(always)]
unsafe fn pack_and_madd(data: __m128i) -> __m128i {
    let data = _mm_packus_epi32(data, data);
    _mm_madd_epi16(data, _mm_set_epi16(0, 0, 0, 0, 1, 10000, 1, 10000))
}

/**
Append `val` in decimal and return the number of bytes written.
*/
pub fn utoa64(val: u64, dst: &mut Vec<u8>) -> usize {
    dst.reserve(32);

    let start = dst.len();

    // SAFETY: 32 bytes of spare capacity cover the digits plus the
    // overshoot of the fixed-width stores
    unsafe {
        let out = dst.as_mut_ptr().add(start);
        let end = u64toa(val, out);

        let written = end as usize - out as usize;
        dst.set_len(start + written);
        written
    }
}

/**
Append `val` in decimal, `-` included when negative, and return the
number of bytes written.
*/
pub fn itoa64(val: i64, dst: &mut Vec<u8>) -> usize {
    dst.reserve(33);

    let start = dst.len();
    let neg = (val < 0) as usize;

    // SAFETY: 33 bytes of spare capacity cover the sign and digits plus
    // the overshoot of the fixed-width stores
    unsafe {
        let out = dst.as_mut_ptr().add(start);
        *out = b'-';

        let end = u64toa(val.unsigned_abs(), out.add(neg));

        let written = end as usize - out as usize;
        dst.set_len(start + written);
        written
    }
}

/**
Pairs of decimal digits, so one two-byte copy emits two digits.
*/
const DIGITS: [u8; 200] = {
    let mut tab = [0u8; 200];
    let mut i = 0;
    while i < 100 {
        tab[i * 2] = b'0' + (i / 10) as u8;
        tab[i * 2 + 1] = b'0' + (i % 10) as u8;
        i += 1;
    }
    tab
};

// SAFETY: callers must ensure 2 bytes are writable at `dst`
#[inline(always)]
unsafe fn copy2(dst: *mut u8, idx: usize) {
    test_assert!(idx + 2 <= DIGITS.len());
    std::ptr::copy_nonoverlapping(DIGITS.as_ptr().add(idx), dst, 2);
}

// SAFETY: callers must ensure 32 bytes are writable at `out`
#[inline(always)]
unsafe fn u64toa(val: u64, out: *mut u8) -> *mut u8 {
    if val < 100_000_000 {
        utoa_1_8(out, val as u32)
    } else if val < 10_000_000_000_000_000 {
        let hi = (val / 100_000_000) as u32;
        let lo = (val % 100_000_000) as u32;
        utoa_8(lo, utoa_1_8(out, hi))
    } else {
        u64toa_17_20(val, out)
    }
}

/**
Write 1 to 8 digits with no leading zeros.

A pair whose high digit is zero starts its copy one byte into the table
entry and backs the cursor up, leaving a stray byte that later writes
overwrite or the final length excludes.
*/
// SAFETY: callers must ensure 9 bytes are writable at `out`
unsafe fn utoa_1_8(out: *mut u8, val: u32) -> *mut u8 {
    if val < 100 {
        let lz = (val < 10) as usize;
        copy2(out, val as usize * 2 + lz);
        out.add(2 - lz)
    } else if val < 10_000 {
        let hi = (val / 100) as usize;
        let lo = (val % 100) as usize;

        let lz = (hi < 10) as usize;
        copy2(out, hi * 2 + lz);
        let p = out.add(2 - lz);

        copy2(p, lo * 2);
        p.add(2)
    } else if val < 1_000_000 {
        let hi = (val / 10_000) as usize;
        let lo = val % 10_000;

        let lz = (hi < 10) as usize;
        copy2(out, hi * 2 + lz);
        let p = out.add(2 - lz);

        copy2(p, (lo / 100) as usize * 2);
        copy2(p.add(2), (lo % 100) as usize * 2);
        p.add(4)
    } else {
        let hi = val / 10_000;
        let lo = val % 10_000;
        let a = (hi / 100) as usize;

        let lz = (a < 10) as usize;
        copy2(out, a * 2 + lz);
        let p = out.add(2 - lz);

        copy2(p, (hi % 100) as usize * 2);
        copy2(p.add(2), (lo / 100) as usize * 2);
        copy2(p.add(4), (lo % 100) as usize * 2);
        p.add(6)
    }
}

// SAFETY: callers must ensure 21 bytes are writable at `out`
unsafe fn u64toa_17_20(val: u64, out: *mut u8) -> *mut u8 {
    let hi = (val / 10_000_000_000_000_000) as usize;
    let lo = val % 10_000_000_000_000_000;

    let p = if hi < 100 {
        let lz = (hi < 10) as usize;
        copy2(out, hi * 2 + lz);
        out.add(2 - lz)
    } else {
        let aa = hi / 100;
        let bb = hi % 100;

        let lz = (aa < 10) as usize;
        copy2(out, aa * 2 + lz);
        let p = out.add(2 - lz);

        copy2(p, bb * 2);
        p.add(2)
    };

    utoa_16(lo, p)
}

/**
Spread the 8 digits of `num` into packed 16-bit lanes.
*/
#[cfg(target_arch = "x86_64")]
#[inline(always)]
// SAFETY: callers must ensure SSE2 is available, which is baseline on
// x86_64
unsafe fn utoa_sse(num: u32) -> __m128i {
    const DIV_10K: i32 = 0xd1b7_1759u32 as i32;

    #[rustfmt::skip]
    let div_powers = _mm_setr_epi16(
        0x20c5, 0x147b, 0x3334, 0x8000u16 as i16,
        0x20c5, 0x147b, 0x3334, 0x8000u16 as i16,
    );
    #[rustfmt::skip]
    let shift_powers = _mm_setr_epi16(
        0x0080, 0x0800, 0x2000, 0x8000u16 as i16,
        0x0080, 0x0800, 0x2000, 0x8000u16 as i16,
    );

    // split abcdefgh into { abcd, efgh }
    let v00 = _mm_cvtsi32_si128(num as i32);
    let v01 = _mm_mul_epu32(v00, _mm_set1_epi32(DIV_10K));
    let v02 = _mm_srli_epi64::<45>(v01);
    let v03 = _mm_mul_epu32(v02, _mm_set1_epi32(10_000));
    let v04 = _mm_sub_epi32(v00, v03);
    let v05 = _mm_unpacklo_epi16(v02, v04);

    // broadcast each half into 4 lanes, scaled by 4
    let v06 = _mm_slli_epi64::<2>(v05);
    let v07 = _mm_unpacklo_epi16(v06, v06);
    let v08 = _mm_unpacklo_epi32(v07, v07);

    // prefix quotients { a, ab, abc, abcd, e, ef, efg, efgh }
    let v09 = _mm_mulhi_epu16(v08, div_powers);
    let v10 = _mm_mulhi_epu16(v09, shift_powers);

    // subtract 10x the previous prefix to isolate each digit
    let v11 = _mm_mullo_epi16(v10, _mm_set1_epi16(10));
    let v12 = _mm_slli_epi64::<16>(v11);

    _mm_sub_epi16(v10, v12)
}

/**
Write exactly 8 digits, leading zeros included.
*/
#[cfg(target_arch = "x86_64")]
// SAFETY: callers must ensure 16 bytes are writable at `out`
unsafe fn utoa_8(val: u32, out: *mut u8) -> *mut u8 {
    let v = _mm_packus_epi16(utoa_sse(val), _mm_setzero_si128());
    let v = _mm_add_epi8(v, _mm_set1_epi8(b'0' as i8));

    // stores the full vector; only the low 8 bytes count
    _mm_storeu_si128(out as *mut _, v);
    out.add(8)
}

/**
Write exactly 16 digits, leading zeros included.
*/
#[cfg(target_arch = "x86_64")]
// SAFETY: callers must ensure 16 bytes are writable at `out`
unsafe fn utoa_16(val: u64, out: *mut u8) -> *mut u8 {
    let v = _mm_packus_epi16(
        utoa_sse((val / 100_000_000) as u32),
        utoa_sse((val % 100_000_000) as u32),
    );
    let v = _mm_add_epi8(v, _mm_set1_epi8(b'0' as i8));

    _mm_storeu_si128(out as *mut _, v);
    out.add(16)
}

/**
Write exactly 8 digits, leading zeros included.
*/
#[cfg(not(target_arch = "x86_64"))]
// SAFETY: callers must ensure 8 bytes are writable at `out`
unsafe fn utoa_8(val: u32, out: *mut u8) -> *mut u8 {
    let hi = (val / 10_000) as usize;
    let lo = (val % 10_000) as usize;

    copy2(out, (hi / 100) * 2);
    copy2(out.add(2), (hi % 100) * 2);
    copy2(out.add(4), (lo / 100) * 2);
    copy2(out.add(6), (lo % 100) * 2);
    out.add(8)
}

/**
Write exactly 16 digits, leading zeros included.
*/
#[cfg(not(target_arch = "x86_64"))]
// SAFETY: callers must ensure 16 bytes are writable at `out`
unsafe fn utoa_16(val: u64, out: *mut u8) -> *mut u8 {
    let out = utoa_8((val / 100_000_000) as u32, out);
    utoa_8((val % 100_000_000) as u32, out)
}
