//! Key-to-partition routing for the sharded cache.
//!
//! Keys are hashed with a seeded djb33 variant:
//!
//! ```text
//! d = 5381 + seed + len(key)
//! for each byte b:  d = (d * 33) ^ b        (wrapping u32 arithmetic)
//! d = d ^ (d >> 16)
//! partition = d % partitions
//! ```
//!
//! The seed is drawn once per cache from the OS random source so an attacker
//! cannot precompute keys that all land in the same partition.

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Seeded djb33 hash of `key`.
#[inline]
pub fn djb33(seed: u32, key: &str) -> u32 {
    let bytes = key.as_bytes();
    let mut d = 5381u32
        .wrapping_add(seed)
        .wrapping_add(bytes.len() as u32);

    for &b in bytes {
        d = d.wrapping_mul(33) ^ u32::from(b);
    }

    d ^ (d >> 16)
}

/// Selects the partition for `key` among `partitions`.
///
/// `partitions` must be non-zero.
#[inline]
pub fn route(seed: u32, key: &str, partitions: usize) -> usize {
    djb33(seed, key) as usize % partitions
}

/// Draws a routing seed from the OS random source.
///
/// If the OS source fails, logs a warning and falls back to a generator
/// seeded from the clock.
pub fn random_seed() -> u32 {
    let mut buf = [0u8; 4];
    match OsRng.try_fill_bytes(&mut buf) {
        Ok(()) => u32::from_le_bytes(buf),
        Err(e) => {
            warn!(
                error = %e,
                "Failed to read from the system CSPRNG, continuing with an insecure routing seed"
            );
            fallback_seed()
        }
    }
}

fn fallback_seed() -> u32 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    StdRng::seed_from_u64(nanos).gen()
}
