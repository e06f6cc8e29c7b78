/*!
A portable rendition of the vector API using plain byte arrays.

This backend works on any target and compiles down to reasonable scalar
code. It's also the oracle: the vectorized backends must agree with it
bit-for-bit, which the test suite checks by running both over the same
inputs.
*/

use crate::simd::Vector;

#[derive(Clone, Copy)]
pub struct Fallback([u8; 16]);

impl Vector for Fallback {
    const LANES: usize = 16;

    #[inline(always)]
    unsafe fn load(ptr: *const u8) -> Self {
        let mut lanes = [0u8; 16];
        std::ptr::copy_nonoverlapping(ptr, lanes.as_mut_ptr(), 16);
        Fallback(lanes)
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u8) {
        std::ptr::copy_nonoverlapping(self.0.as_ptr(), ptr, 16);
    }

    #[inline(always)]
    fn splat(byte: u8) -> Self {
        Fallback([byte; 16])
    }

    #[inline(always)]
    fn min(self, other: Self) -> Self {
        let mut lanes = [0u8; 16];
        for (i, lane) in lanes.iter_mut().enumerate() {
            *lane = self.0[i].min(other.0[i]);
        }
        Fallback(lanes)
    }

    #[inline(always)]
    fn eq(self, other: Self) -> u64 {
        let mut bits = 0u64;
        for i in 0..16 {
            bits |= ((self.0[i] == other.0[i]) as u64) << i;
        }
        bits
    }

    #[inline(always)]
    fn lookup16(self, table: [u8; 16]) -> Self {
        let mut lanes = [0u8; 16];
        for (i, lane) in lanes.iter_mut().enumerate() {
            let index = self.0[i];

            // zero the lane when the high bit is set, otherwise key
            // on the low nibble
            *lane = if index & 0x80 != 0 {
                0
            } else {
                table[(index & 0x0f) as usize]
            };
        }
        Fallback(lanes)
    }
}
