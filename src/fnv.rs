//! 32-bit FNV hashing and XOR-folding to small bit widths.

use core::hash::{BuildHasherDefault, Hasher};

const FNV1_32_INIT: u32 = 0x811c_9dc5;
const FNV1_32_PRIME: u32 = 16_777_619;

/// Hash `bytes` with 32-bit FNV: xor each byte into the state, then
/// multiply by the FNV prime.
#[inline]
pub fn fnv1_32(bytes: &[u8]) -> u32 {
    accumulate(FNV1_32_INIT, bytes)
}

#[inline]
fn accumulate(mut hash: u32, bytes: &[u8]) -> u32 {
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(FNV1_32_PRIME);
    }
    hash
}

/// Compress `hash` to `bits` bits by folding the high bits into the low
/// bits.
///
/// # Panics
///
/// Panics unless `1 <= bits < 16`.
#[inline]
pub fn fold(hash: u32, bits: u8) -> u16 {
    assert!(bits != 0, "fold width must be at least one bit");
    assert!(bits < 16, "fold width must be below 16 bits, got {bits}");
    // Fits: masked to fewer than 16 bits.
    xor_fold(hash, u32::from(bits)) as u16
}

/// Same formula as [`fold`] without the width contract; the index uses it
/// for tables wider than 2^15 slots.
#[inline]
pub(crate) fn xor_fold(hash: u32, bits: u32) -> u32 {
    debug_assert!(bits > 0 && bits < 32);
    ((hash >> bits) ^ hash) & ((1u32 << bits) - 1)
}

/// Streaming FNV-1 hasher. A single `write(bytes)` yields `fnv1_32(bytes)`
/// from `finish`.
#[derive(Clone, Copy, Debug)]
pub struct Fnv32Hasher {
    state: u32,
}

impl Default for Fnv32Hasher {
    fn default() -> Self {
        Self {
            state: FNV1_32_INIT,
        }
    }
}

impl Hasher for Fnv32Hasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        self.state = accumulate(self.state, bytes);
    }

    #[inline]
    fn finish(&self) -> u64 {
        u64::from(self.state)
    }
}

pub type BuildFnv32 = BuildHasherDefault<Fnv32Hasher>;
