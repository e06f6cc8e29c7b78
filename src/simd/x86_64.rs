/*!
x86_64 backends.

Methods here are `#[inline(always)]` rather than `#[target_feature]` so they
inline into the `#[target_feature]` trampolines that monomorphize the
kernels, the same way the checked macros rely on their callers for bounds.
*/

use std::arch::x86_64::*;

use crate::simd::Vector;

/**
16 byte lanes over SSE. The baseline vectorized backend for x86_64.
*/
#[derive(Clone, Copy)]
pub struct Sse42(__m128i);

impl Vector for Sse42 {
    const LANES: usize = 16;

    #[inline(always)]
    unsafe fn load(ptr: *const u8) -> Self {
        Sse42(_mm_loadu_si128(ptr as *const _))
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u8) {
        _mm_storeu_si128(ptr as *mut _, self.0)
    }

    #[inline(always)]
    fn splat(byte: u8) -> Self {
        // SAFETY: callers must ensure SSE4.2 is available
        unsafe { Sse42(_mm_set1_epi8(byte as i8)) }
    }

    #[inline(always)]
    fn min(self, other: Self) -> Self {
        // SAFETY: callers must ensure SSE4.2 is available
        unsafe { Sse42(_mm_min_epu8(self.0, other.0)) }
    }

    #[inline(always)]
    fn eq(self, other: Self) -> u64 {
        // SAFETY: callers must ensure SSE4.2 is available
        unsafe { _mm_movemask_epi8(_mm_cmpeq_epi8(self.0, other.0)) as u32 as u64 }
    }

    #[inline(always)]
    fn lookup16(self, table: [u8; 16]) -> Self {
        // SAFETY: callers must ensure SSE4.2 is available
        unsafe {
            let table = _mm_loadu_si128(table.as_ptr() as *const _);
            Sse42(_mm_shuffle_epi8(table, self.0))
        }
    }
}

/**
32 byte lanes over AVX2.
*/
#[derive(Clone, Copy)]
pub struct Avx2(__m256i);

impl Vector for Avx2 {
    const LANES: usize = 32;

    #[inline(always)]
    unsafe fn load(ptr: *const u8) -> Self {
        Avx2(_mm256_loadu_si256(ptr as *const _))
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u8) {
        _mm256_storeu_si256(ptr as *mut _, self.0)
    }

    #[inline(always)]
    fn splat(byte: u8) -> Self {
        // SAFETY: callers must ensure AVX2 is available
        unsafe { Avx2(_mm256_set1_epi8(byte as i8)) }
    }

    #[inline(always)]
    fn min(self, other: Self) -> Self {
        // SAFETY: callers must ensure AVX2 is available
        unsafe { Avx2(_mm256_min_epu8(self.0, other.0)) }
    }

    #[inline(always)]
    fn eq(self, other: Self) -> u64 {
        // SAFETY: callers must ensure AVX2 is available
        unsafe { _mm256_movemask_epi8(_mm256_cmpeq_epi8(self.0, other.0)) as u32 as u64 }
    }

    #[inline(always)]
    fn lookup16(self, table: [u8; 16]) -> Self {
        // SAFETY: callers must ensure AVX2 is available
        unsafe {
            // `vpshufb` shuffles within each 128-bit half, so the table
            // is replicated into both
            let table = _mm_loadu_si128(table.as_ptr() as *const _);
            let table = _mm256_set_m128i(table, table);
            Avx2(_mm256_shuffle_epi8(table, self.0))
        }
    }
}

/**
64 byte lanes over AVX-512BW. Comparisons come straight out of the mask
registers as `u64`.
*/
#[cfg(feature = "avx512")]
#[derive(Clone, Copy)]
pub struct Avx512(__m512i);

#[cfg(feature = "avx512")]
impl Vector for Avx512 {
    const LANES: usize = 64;

    #[inline(always)]
    unsafe fn load(ptr: *const u8) -> Self {
        Avx512(_mm512_loadu_si512(ptr as *const _))
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u8) {
        _mm512_storeu_si512(ptr as *mut _, self.0)
    }

    #[inline(always)]
    fn splat(byte: u8) -> Self {
        // SAFETY: callers must ensure AVX-512BW is available
        unsafe { Avx512(_mm512_set1_epi8(byte as i8)) }
    }

    #[inline(always)]
    fn min(self, other: Self) -> Self {
        // SAFETY: callers must ensure AVX-512BW is available
        unsafe { Avx512(_mm512_min_epu8(self.0, other.0)) }
    }

    #[inline(always)]
    fn eq(self, other: Self) -> u64 {
        // SAFETY: callers must ensure AVX-512BW is available
        unsafe { _mm512_cmpeq_epi8_mask(self.0, other.0) }
    }

    #[inline(always)]
    fn le(self, other: Self) -> u64 {
        // SAFETY: callers must ensure AVX-512BW is available
        unsafe { _mm512_cmple_epu8_mask(self.0, other.0) }
    }

    #[inline(always)]
    fn lookup16(self, table: [u8; 16]) -> Self {
        // SAFETY: callers must ensure AVX-512BW is available
        unsafe {
            let table = _mm_loadu_si128(table.as_ptr() as *const _);
            let table = _mm512_broadcast_i32x4(table);
            Avx512(_mm512_shuffle_epi8(table, self.0))
        }
    }
}
