//! Cache construction options.

use crate::storage::Expiration;
use std::time::Duration;

/// Options shared by [`Cache`](crate::Cache) and
/// [`ShardedCache`](crate::ShardedCache).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL for entries written with `Expiration::Default`.
    /// `Expiration::Default` here means entries never expire.
    pub default_ttl: Expiration,

    /// Interval between background sweeps (zero = no sweeper, lazy expiry only)
    pub cleanup_interval: Duration,

    /// Number of partitions for a [`ShardedCache`](crate::ShardedCache).
    /// Ignored by [`Cache`](crate::Cache); zero is treated as one.
    pub shards: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Expiration::Never,
            cleanup_interval: Duration::ZERO,
            shards: 1,
        }
    }
}

impl CacheConfig {
    /// Sets the default TTL.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Expiration::After(ttl);
        self
    }

    /// Sets the sweeper interval.
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Sets the partition count used by `ShardedCache::with_config`.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }
}
