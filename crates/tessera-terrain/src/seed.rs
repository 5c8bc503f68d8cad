//! Deterministic seeded generation utilities.
//!
//! Provides the per-chunk integer hash, sub-seed derivation for the algorithms
//! of a profile, deterministic math functions via `libm`, and grid hashing for
//! determinism verification.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::chunk::HeightGrid;

// ---------------------------------------------------------------------------
// Seed derivation
// ---------------------------------------------------------------------------

const HASH_PRIME_X: i64 = 73_856_093;
const HASH_PRIME_Z: i64 = 19_349_663;

/// Hash a chunk coordinate with the world seed.
///
/// Computes `(x * 73856093 + z * 19349663 + seed) mod 2^32` with wrapping
/// two's-complement arithmetic, so the result is identical on every platform.
pub fn chunk_hash(chunk_x: i64, chunk_z: i64, seed: u32) -> u32 {
    let h = chunk_x
        .wrapping_mul(HASH_PRIME_X)
        .wrapping_add(chunk_z.wrapping_mul(HASH_PRIME_Z))
        .wrapping_add(i64::from(seed));
    // Truncation keeps the low 32 bits, i.e. the value mod 2^32.
    h as u32
}

/// Per-chunk jitter in `[0, 1]` derived from [`chunk_hash`].
pub fn chunk_jitter(chunk_x: i64, chunk_z: i64, seed: u32) -> f64 {
    f64::from(chunk_hash(chunk_x, chunk_z, seed)) / f64::from(u32::MAX)
}

/// Derive the seed of the `index`-th algorithm in a profile.
///
/// `chunk_seed * multipliers[index % len]`, wrapping to 32 bits. An empty
/// multiplier list leaves the chunk seed unchanged.
pub fn algorithm_seed(chunk_seed: u32, multipliers: &[i64], index: usize) -> u32 {
    if multipliers.is_empty() {
        return chunk_seed;
    }
    let multiplier = multipliers[index % multipliers.len()];
    i64::from(chunk_seed).wrapping_mul(multiplier) as u32
}

// ---------------------------------------------------------------------------
// Deterministic math (libm)
// ---------------------------------------------------------------------------

/// Deterministic sine using libm (not platform libc).
#[inline]
pub fn det_sin(x: f64) -> f64 {
    libm::sin(x)
}

/// Deterministic cosine using libm.
#[inline]
pub fn det_cos(x: f64) -> f64 {
    libm::cos(x)
}

/// Deterministic power using libm.
#[inline]
pub fn det_pow(base: f64, exponent: f64) -> f64 {
    libm::pow(base, exponent)
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Hash the exact bit patterns of a height grid for determinism comparison.
pub fn hash_height_grid(grid: &HeightGrid) -> u64 {
    let mut hasher = DefaultHasher::new();
    grid.size().hash(&mut hasher);
    for value in grid.as_slice() {
        value.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}
