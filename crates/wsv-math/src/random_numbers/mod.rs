//! Random number generators.
//!
//! Every Monte-Carlo realization draws from its own Mersenne Twister
//! (MT19937-64) stream. The stream seed is a SplitMix64 mix of a batch seed
//! and the realization index, so a batch gives the same paths whether its
//! realizations run in order or on a thread pool.

pub mod brownian_bridge;

pub use brownian_bridge::split_increment;

use rand_mt::Mt19937GenRand64;

/// The per-path generator type.
///
/// Implements `rand::RngCore` and `rand::SeedableRng`, so every `rand`
/// distribution can draw from it.
pub type PathRng = Mt19937GenRand64;

/// SplitMix64 finalizer: a bijective mixing of 64-bit words.
#[inline]
pub fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed of the stream belonging to realization `index` of a batch.
#[inline]
pub fn stream_seed(base_seed: u64, index: u64) -> u64 {
    splitmix64(base_seed ^ splitmix64(index))
}

/// The generator for realization `index` of a batch seeded with `base_seed`.
pub fn path_rng(base_seed: u64, index: u64) -> PathRng {
    Mt19937GenRand64::new(stream_seed(base_seed, index))
}
