//! Sharded Cache
//!
//! Stripes the key space across a fixed number of independent [`Store`]s so
//! writers to different keys rarely contend on the same lock.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ShardedCache                           │
//! │        key ──> djb33(seed, key) % M ──> partition           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Store 0 │ │ Store 1 │ │ Store 2 │ │Store M-1│           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!              ┌─────────────┴─────────────┐
//!              │   Sweeper (one timer)     │
//!              └───────────────────────────┘
//! ```
//!
//! Per-key operations go to exactly one partition and are linearized by its
//! lock. Global operations (`flush`, `items`, `delete_expired`) visit the
//! partitions one after another; they are atomic per partition only.

use crate::config::CacheConfig;
use crate::error::Result;
use crate::storage::arith::Numeric;
use crate::storage::entry::{Entry, Expiration};
use crate::storage::expiry::{Sweep, Sweeper, SweeperState};
use crate::storage::router::{random_seed, route};
use crate::storage::store::{EvictionHook, Store};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// The partitions of a sharded cache and the seed that routes keys to them.
#[derive(Debug)]
pub struct ShardSet {
    seed: u32,
    shards: Box<[Store]>,
}

impl ShardSet {
    fn new(default_ttl: Expiration, shards: usize, seed: u32) -> Self {
        let shards = (0..shards.max(1)).map(|_| Store::new(default_ttl)).collect();
        Self { seed, shards }
    }

    #[inline]
    fn bucket(&self, key: &str) -> &Store {
        &self.shards[route(self.seed, key, self.shards.len())]
    }
}

impl Sweep for ShardSet {
    fn sweep(&self) -> usize {
        self.shards.iter().map(Store::delete_expired).sum()
    }

    fn stored(&self) -> usize {
        self.shards.iter().map(Store::item_count).sum()
    }
}

/// A cache split into independently locked partitions.
///
/// # Example
///
/// ```
/// use flashcache::{Expiration, ShardedCache, Value};
/// use std::time::Duration;
///
/// let cache = ShardedCache::new(Expiration::Never, Duration::ZERO, 8);
///
/// cache.set("user:1", "Ariz", Expiration::Default);
/// assert_eq!(cache.get("user:1"), Some(Value::from("Ariz")));
/// ```
#[derive(Debug)]
pub struct ShardedCache {
    shards: Arc<ShardSet>,
    sweeper: Option<Sweeper>,
}

impl ShardedCache {
    /// Creates a cache with `shards` partitions (at least one) and a random
    /// routing seed.
    ///
    /// A non-zero `cleanup_interval` starts one sweeper for all partitions.
    pub fn new(default_ttl: Expiration, cleanup_interval: Duration, shards: usize) -> Self {
        Self::with_seed(default_ttl, cleanup_interval, shards, random_seed())
    }

    /// Creates a sharded cache from a configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self::new(config.default_ttl, config.cleanup_interval, config.shards)
    }

    /// Creates a cache with a fixed routing seed.
    ///
    /// Only use this when a reproducible layout is needed; a predictable
    /// seed lets crafted keys pile into one partition.
    pub fn with_seed(
        default_ttl: Expiration,
        cleanup_interval: Duration,
        shards: usize,
        seed: u32,
    ) -> Self {
        let shards = Arc::new(ShardSet::new(default_ttl, shards, seed));
        let sweeper = Sweeper::start(&shards, cleanup_interval);
        Self { shards, sweeper }
    }

    /// The routing seed of this instance.
    pub fn seed(&self) -> u32 {
        self.shards.seed
    }

    /// Number of partitions.
    pub fn shard_count(&self) -> usize {
        self.shards.shards.len()
    }

    /// Index of the partition `key` routes to.
    pub fn shard_index(&self, key: &str) -> usize {
        route(self.shards.seed, key, self.shards.shards.len())
    }

    /// Direct access to one partition.
    pub fn shard(&self, index: usize) -> Option<&Store> {
        self.shards.shards.get(index)
    }

    #[inline]
    fn bucket(&self, key: &str) -> &Store {
        self.shards.bucket(key)
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>, expiration: Expiration) {
        let key = key.into();
        self.bucket(&key).set(key, value, expiration);
    }

    pub fn set_default(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.set(key, value, Expiration::Default);
    }

    pub fn add(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
        expiration: Expiration,
    ) -> Result<()> {
        let key = key.into();
        self.bucket(&key).add(key, value, expiration)
    }

    pub fn replace(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
        expiration: Expiration,
    ) -> Result<()> {
        let key = key.into();
        self.bucket(&key).replace(key, value, expiration)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.bucket(key).get(key)
    }

    pub fn get_with_expiration(&self, key: &str) -> Option<(Value, Option<SystemTime>)> {
        self.bucket(key).get_with_expiration(key)
    }

    pub fn increment(&self, key: &str, n: i64) -> Result<()> {
        self.bucket(key).increment(key, n)
    }

    pub fn decrement(&self, key: &str, n: i64) -> Result<()> {
        self.bucket(key).decrement(key, n)
    }

    pub fn increment_float(&self, key: &str, n: f64) -> Result<()> {
        self.bucket(key).increment_float(key, n)
    }

    pub fn decrement_float(&self, key: &str, n: f64) -> Result<()> {
        self.bucket(key).decrement_float(key, n)
    }

    pub fn increment_as<T: Numeric>(&self, key: &str, n: T) -> Result<T> {
        self.bucket(key).increment_as(key, n)
    }

    pub fn decrement_as<T: Numeric>(&self, key: &str, n: T) -> Result<T> {
        self.bucket(key).decrement_as(key, n)
    }

    /// Deletes a key. Returns `true` if an entry was removed.
    pub fn delete(&self, key: &str) -> bool {
        self.bucket(key).delete(key)
    }

    /// Sweeps every partition and returns the total number of entries removed.
    pub fn delete_expired(&self) -> usize {
        self.shards.sweep()
    }

    /// Flushes every partition, one at a time.
    pub fn flush(&self) {
        for shard in self.shards.shards.iter() {
            shard.flush();
        }
    }

    /// Returns the live entries of each partition, in partition order.
    pub fn items(&self) -> Vec<HashMap<String, Entry>> {
        self.shards.shards.iter().map(Store::items).collect()
    }

    /// Total stored entries across partitions, including unswept expired ones.
    pub fn item_count(&self) -> usize {
        self.shards.stored()
    }

    /// Installs the same eviction hook on every partition. `None` disables it.
    pub fn set_eviction_hook(&self, hook: Option<EvictionHook>) {
        for shard in self.shards.shards.iter() {
            shard.set_eviction_hook(hook.clone());
        }
    }

    /// Installs `hook` as the eviction hook of every partition.
    pub fn on_evicted<F>(&self, hook: F)
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.set_eviction_hook(Some(Arc::new(hook)));
    }

    /// Stops the background sweeper, if any.
    pub fn stop(&self) {
        if let Some(sweeper) = &self.sweeper {
            sweeper.stop();
        }
    }

    /// State of the background sweeper, or `None` if none was started.
    pub fn sweeper_state(&self) -> Option<SweeperState> {
        self.sweeper.as_ref().map(Sweeper::state)
    }
}
