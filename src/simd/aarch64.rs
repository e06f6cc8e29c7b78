/*!
aarch64 backend.

Neon is a baseline feature so there's no runtime detection on this arch.
*/

use std::arch::aarch64::*;

use crate::simd::Vector;

/**
16 byte lanes over Neon.
*/
#[derive(Clone, Copy)]
pub struct Neon(uint8x16_t);

// Neon doesn't have a built-in equivalent to x86's movemask
// We implement our own by masking each lane to a single bit in the target
// and adding the lanes across each half of the vector
#[inline(always)]
// SAFETY: callers must ensure Neon is available
unsafe fn vmovemaskq_u8(v: uint8x16_t) -> u64 {
    #[rustfmt::skip]
    const BITS: [u8; 16] = [
        0b0000_0001, 0b0000_0010, 0b0000_0100, 0b0000_1000,
        0b0001_0000, 0b0010_0000, 0b0100_0000, 0b1000_0000,
        0b0000_0001, 0b0000_0010, 0b0000_0100, 0b0000_1000,
        0b0001_0000, 0b0010_0000, 0b0100_0000, 0b1000_0000,
    ];

    let bits = vandq_u8(v, vld1q_u8(BITS.as_ptr()));

    let lo = vaddv_u8(vget_low_u8(bits)) as u64;
    let hi = vaddv_u8(vget_high_u8(bits)) as u64;

    lo | (hi << 8)
}

impl Vector for Neon {
    const LANES: usize = 16;

    #[inline(always)]
    unsafe fn load(ptr: *const u8) -> Self {
        Neon(vld1q_u8(ptr))
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u8) {
        vst1q_u8(ptr, self.0)
    }

    #[inline(always)]
    fn splat(byte: u8) -> Self {
        // SAFETY: callers must ensure Neon is available
        unsafe { Neon(vdupq_n_u8(byte)) }
    }

    #[inline(always)]
    fn min(self, other: Self) -> Self {
        // SAFETY: callers must ensure Neon is available
        unsafe { Neon(vminq_u8(self.0, other.0)) }
    }

    #[inline(always)]
    fn eq(self, other: Self) -> u64 {
        // SAFETY: callers must ensure Neon is available
        unsafe { vmovemaskq_u8(vceqq_u8(self.0, other.0)) }
    }

    #[inline(always)]
    fn le(self, other: Self) -> u64 {
        // SAFETY: callers must ensure Neon is available
        unsafe { vmovemaskq_u8(vcleq_u8(self.0, other.0)) }
    }

    #[inline(always)]
    fn lookup16(self, table: [u8; 16]) -> Self {
        // SAFETY: callers must ensure Neon is available
        unsafe {
            // `vqtbl1q` zeroes any index past the table, while `pshufb`
            // only keys on the low nibble when the high bit is clear
            // masking indexes with `0x8f` makes the two agree
            let indexes = vandq_u8(self.0, vdupq_n_u8(0x8f));
            Neon(vqtbl1q_u8(vld1q_u8(table.as_ptr()), indexes))
        }
    }
}
