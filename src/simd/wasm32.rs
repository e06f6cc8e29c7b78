/*!
wasm32 backend.

Only compiled when the `simd128` target feature is enabled, in which case
every instruction here is available unconditionally.
*/

use std::arch::wasm32::*;

use crate::simd::Vector;

/**
16 byte lanes over the wasm `simd128` proposal.
*/
#[derive(Clone, Copy)]
pub struct Simd128(v128);

impl Vector for Simd128 {
    const LANES: usize = 16;

    #[inline(always)]
    unsafe fn load(ptr: *const u8) -> Self {
        Simd128(v128_load(ptr as *const v128))
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u8) {
        v128_store(ptr as *mut v128, self.0)
    }

    #[inline(always)]
    fn splat(byte: u8) -> Self {
        Simd128(u8x16_splat(byte))
    }

    #[inline(always)]
    fn min(self, other: Self) -> Self {
        Simd128(u8x16_min(self.0, other.0))
    }

    #[inline(always)]
    fn eq(self, other: Self) -> u64 {
        u8x16_bitmask(u8x16_eq(self.0, other.0)) as u64
    }

    #[inline(always)]
    fn le(self, other: Self) -> u64 {
        u8x16_bitmask(u8x16_le(self.0, other.0)) as u64
    }

    #[inline(always)]
    fn lookup16(self, table: [u8; 16]) -> Self {
        // `swizzle` zeroes any index past the table, while `pshufb` only
        // keys on the low nibble when the high bit is clear
        // masking indexes with `0x8f` makes the two agree
        let indexes = v128_and(self.0, u8x16_splat(0x8f));

        // SAFETY: `table` is 16 readable bytes
        let table = unsafe { v128_load(table.as_ptr() as *const v128) };

        Simd128(u8x16_swizzle(table, indexes))
    }
}
