//! Deterministic partitioning of one seed into independent random streams.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use squish_core::Result;

/// Splits `seed` into `count` mutation streams.
///
/// Each stream is a copy of the master generator, after which the master is
/// reseeded from its own output. The sequence of streams depends only on the
/// seed.
pub fn partition(seed: u64, count: usize) -> Vec<ChaCha8Rng> {
    let mut master = ChaCha8Rng::seed_from_u64(seed);
    let mut streams = Vec::with_capacity(count);
    for _ in 0..count {
        streams.push(master.clone());
        master = ChaCha8Rng::seed_from_u64(master.next_u64());
    }
    streams
}

/// Generator for acceptance decisions, distinct from every mutation stream
pub fn decision_stream(seed: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(1);
    rng
}

pub fn rng_to_bytes(rng: &ChaCha8Rng) -> Result<Vec<u8>> {
    Ok(bincode::serialize(rng)?)
}

pub fn rng_from_bytes(bytes: &[u8]) -> Result<ChaCha8Rng> {
    Ok(bincode::deserialize(bytes)?)
}
