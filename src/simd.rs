/*!
The vector abstraction the scanning and codec kernels are written against.

Kernels are generic over [`Vector`] and get monomorphized once per backend.
A backend is a fixed-width vector of byte lanes with loads, stores, splats
and comparisons that produce lane bitmasks. Comparisons always return `u64`
bitmasks regardless of width so the bit-manipulation layers above
(`prefix_xor`, carry propagation, clear-lowest-bit walks) are identical for
every backend.

[`dispatch`] picks the widest backend the running machine supports. On
x86_64 that's a runtime check; on aarch64 Neon is a baseline feature; on
wasm32 the `simd128` target feature decides at compile time. [`Fallback`]
is a plain-array rendition of the same API that works everywhere and doubles
as the oracle the vectorized backends are tested against.
*/

pub(crate) mod fallback;

#[cfg(target_arch = "aarch64")]
pub(crate) mod aarch64;
#[cfg(all(target_arch = "wasm32", target_feature = "simd128"))]
pub(crate) mod wasm32;
#[cfg(target_arch = "x86_64")]
pub(crate) mod x86_64;

pub use self::fallback::Fallback;

#[cfg(target_arch = "aarch64")]
pub use self::aarch64::Neon;
#[cfg(all(target_arch = "wasm32", target_feature = "simd128"))]
pub use self::wasm32::Simd128;
#[cfg(all(target_arch = "x86_64", feature = "avx512"))]
pub use self::x86_64::Avx512;
#[cfg(target_arch = "x86_64")]
pub use self::x86_64::{Avx2, Sse42};

/**
A fixed-width vector of byte lanes.

Comparison methods pack their results into the low `LANES` bits of a `u64`,
least significant bit first, so mask arithmetic above this trait is width
independent.

The operation set is deliberately small: just the loads, stores, splats,
comparisons and nibble table lookup the scanning kernels use, so a new
backend only has to fill in this much.
*/
pub trait Vector: Copy {
    /**
    The number of byte lanes in the vector.
    */
    const LANES: usize;

    /**
    A bitmask with one set bit per lane.
    */
    const FULL_MASK: u64 = if Self::LANES == 64 {
        !0
    } else {
        (1u64 << Self::LANES) - 1
    };

    // SAFETY: callers must ensure `LANES` bytes are readable from `ptr`
    unsafe fn load(ptr: *const u8) -> Self;

    // SAFETY: callers must ensure `LANES` bytes are writable at `ptr`
    unsafe fn store(self, ptr: *mut u8);

    fn splat(byte: u8) -> Self;

    fn min(self, other: Self) -> Self;

    /**
    A bitmask of the lanes where `self == other`.
    */
    fn eq(self, other: Self) -> u64;

    /**
    A bitmask of the lanes where `self <= other`, unsigned.
    */
    #[inline(always)]
    fn le(self, other: Self) -> u64 {
        self.min(other).eq(self)
    }

    /**
    Replace each lane with `table[lane & 0x0f]`, or zero when the lane's
    high bit is set.

    These are `pshufb` semantics. Backends whose table instruction zeroes
    any out-of-range index emulate them by masking indexes with `0x8f`.
    */
    fn lookup16(self, table: [u8; 16]) -> Self;
}

/**
A bitmask of the bytes equal to `byte` across a 64 byte window.
*/
// SAFETY: callers must ensure 64 bytes are readable from `ptr`
#[inline(always)]
pub(crate) unsafe fn eq_bits64<V: Vector>(ptr: *const u8, byte: u8) -> u64 {
    let needle = V::splat(byte);

    let mut bits = 0u64;
    let mut lane = 0;
    while lane < 64 {
        bits |= V::load(ptr.add(lane)).eq(needle) << lane;
        lane += V::LANES;
    }

    bits
}

/**
Spread each set bit in `bits` through to the bit before the next set bit.

Turns a mask of quote positions into a mask of in-string regions: every bit
between an opening and closing quote (inclusive of the opener, exclusive of
the closer) comes out set.
*/
#[inline(always)]
pub(crate) fn prefix_xor(bits: u64) -> u64 {
    #[cfg(all(target_arch = "x86_64", target_feature = "pclmulqdq"))]
    {
        use std::arch::x86_64::*;

        // a carryless multiply by all-ones is exactly a prefix xor
        // SAFETY: guarded by the `pclmulqdq` target feature
        unsafe {
            let product =
                _mm_clmulepi64_si128::<0>(_mm_set_epi64x(0, bits as i64), _mm_set1_epi8(-1));
            _mm_cvtsi128_si64(product) as u64
        }
    }

    #[cfg(not(all(target_arch = "x86_64", target_feature = "pclmulqdq")))]
    {
        let mut bits = bits;
        bits ^= bits << 1;
        bits ^= bits << 2;
        bits ^= bits << 4;
        bits ^= bits << 8;
        bits ^= bits << 16;
        bits ^= bits << 32;
        bits
    }
}

/**
A bitmask of the bytes that are escaped by a backslash in a 64 byte window.

Odd-length backslash runs escape the byte that follows them; even-length
runs don't. `prev_escaped` carries a run that ends exactly on the window
boundary into the next call and must start at zero.
*/
#[inline(always)]
pub(crate) fn escaped_bits(prev_escaped: &mut u64, backslash_bits: u64) -> u64 {
    const EVEN_BITS: u64 = 0x5555_5555_5555_5555;

    let backslash_bits = backslash_bits & !*prev_escaped;
    let follows_escape = (backslash_bits << 1) | *prev_escaped;

    let odd_run_starts = backslash_bits & !EVEN_BITS & !follows_escape;
    let (even_run_carries, overflow) = odd_run_starts.overflowing_add(backslash_bits);
    *prev_escaped = overflow as u64;

    let invert_mask = even_run_carries << 1;
    (EVEN_BITS ^ invert_mask) & follows_escape
}

/**
A kernel that can run against any [`Vector`] backend.

[`dispatch`] calls it with the widest backend the machine supports.
*/
pub(crate) trait Kernel {
    type Output;

    fn call<V: Vector>(self) -> Self::Output;
}

/**
Run a kernel against the widest backend the running machine supports.
*/
#[inline]
pub(crate) fn dispatch<K: Kernel>(kernel: K) -> K::Output {
    #[cfg(target_arch = "x86_64")]
    {
        #[cfg(feature = "avx512")]
        if std::arch::is_x86_feature_detected!("avx512bw") {
            // SAFETY: AVX-512BW is available
            return unsafe { call_avx512(kernel) };
        }

        if std::arch::is_x86_feature_detected!("avx2") {
            // SAFETY: AVX2 is available
            return unsafe { call_avx2(kernel) };
        }

        if std::arch::is_x86_feature_detected!("sse4.2") {
            // SAFETY: SSE4.2 is available
            return unsafe { call_sse42(kernel) };
        }

        return kernel.call::<Fallback>();
    }

    #[cfg(target_arch = "aarch64")]
    {
        // SAFETY: Neon is a baseline feature of aarch64
        return unsafe { call_neon(kernel) };
    }

    #[cfg(all(target_arch = "wasm32", target_feature = "simd128"))]
    {
        return kernel.call::<Simd128>();
    }

    #[cfg(not(any(
        target_arch = "x86_64",
        target_arch = "aarch64",
        all(target_arch = "wasm32", target_feature = "simd128")
    )))]
    {
        kernel.call::<Fallback>()
    }
}

#[cfg(all(target_arch = "x86_64", feature = "avx512"))]
#[target_feature(enable = "avx512f,avx512bw")]
unsafe fn call_avx512<K: Kernel>(kernel: K) -> K::Output {
    kernel.call::<Avx512>()
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn call_avx2<K: Kernel>(kernel: K) -> K::Output {
    kernel.call::<Avx2>()
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.2")]
unsafe fn call_sse42<K: Kernel>(kernel: K) -> K::Output {
    kernel.call::<Sse42>()
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
unsafe fn call_neon<K: Kernel>(kernel: K) -> K::Output {
    kernel.call::<Neon>()
}
