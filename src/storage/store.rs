//! Thread-Safe Single-Partition Store
//!
//! This module implements the core of the cache: a `HashMap` of entries
//! guarded by one reader/writer lock, with per-entry expiration and an
//! optional eviction hook.
//!
//! ## Design Decisions
//!
//! 1. **Lazy Expiry Without Removal**: Reads treat an expired entry as absent
//!    but leave it in the map, so every read path only needs the shared lock.
//!    Expired entries are reclaimed by `delete` or by a sweep pass.
//! 2. **Single Lock Acquisition**: `add`, `replace` and the arithmetic
//!    mutators check and write under one exclusive lock, so two concurrent
//!    `add` calls for the same key can never both succeed.
//! 3. **Hooks Outside The Lock**: Evicted `(key, value)` pairs are collected
//!    under the lock and the hook is invoked after it is released. A hook
//!    may call back into the store without deadlocking.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │                  Cache                   │
//! │  ┌────────────────────────┐  ┌─────────┐ │
//! │  │         Store          │  │ Sweeper │ │
//! │  │  RwLock<HashMap, hook> │<─│ (Weak)  │ │
//! │  └────────────────────────┘  └─────────┘ │
//! └──────────────────────────────────────────┘
//! ```

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::storage::entry::{Entry, Expiration};
use crate::storage::expiry::{Sweep, Sweeper, SweeperState};
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::error;

/// Callback invoked with the key and last stored value of an evicted entry.
pub type EvictionHook = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// The lock-protected state of a store.
struct StoreState {
    items: HashMap<String, Entry>,
    on_evicted: Option<EvictionHook>,
}

/// A single partition of the cache.
///
/// A `Store` is usually reached through a [`Cache`] (which adds the
/// background sweeper) or as one partition of a
/// [`ShardedCache`](crate::storage::ShardedCache).
///
/// # Example
///
/// ```
/// use flashcache::storage::{Expiration, Store};
/// use flashcache::Value;
///
/// let store = Store::new(Expiration::Never);
/// store.set("name", "Ariz", Expiration::Default);
/// assert_eq!(store.get("name"), Some(Value::from("Ariz")));
/// ```
pub struct Store {
    /// TTL applied for `Expiration::Default` (None = never expires)
    default_ttl: Option<Duration>,
    state: RwLock<StoreState>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Store")
            .field("default_ttl", &self.default_ttl)
            .field("items", &state.items.len())
            .field("on_evicted", &state.on_evicted.is_some())
            .finish()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(Expiration::Default)
    }
}

impl Store {
    /// Creates an empty store.
    ///
    /// `Expiration::Default` and `Expiration::Never` both mean entries
    /// written with `Expiration::Default` never expire.
    pub fn new(default_ttl: Expiration) -> Self {
        Self::from_items(default_ttl, HashMap::new())
    }

    /// Creates a store around an existing map of entries.
    pub fn from_items(default_ttl: Expiration, items: HashMap<String, Entry>) -> Self {
        Self {
            default_ttl: default_ttl.as_default_ttl(),
            state: RwLock::new(StoreState {
                items,
                on_evicted: None,
            }),
        }
    }

    /// The TTL used for entries written with `Expiration::Default`.
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    #[inline]
    fn entry(&self, value: Value, expiration: Expiration) -> Entry {
        Entry::with_optional_ttl(value, expiration.resolve(self.default_ttl))
    }

    /// Sets a value, replacing any existing entry.
    ///
    /// Overwriting never invokes the eviction hook.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>, expiration: Expiration) {
        let entry = self.entry(value.into(), expiration);
        self.state.write().items.insert(key.into(), entry);
    }

    /// Sets a value using the store's default expiration.
    pub fn set_default(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.set(key, value, Expiration::Default);
    }

    /// Inserts a value only if no live entry exists for the key.
    ///
    /// An expired entry still sitting in the map is overwritten.
    pub fn add(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
        expiration: Expiration,
    ) -> Result<()> {
        let key = key.into();
        let mut state = self.state.write();

        if live(&state.items, &key).is_some() {
            return Err(CacheError::already_exists(&key));
        }
        let entry = self.entry(value.into(), expiration);
        state.items.insert(key, entry);
        Ok(())
    }

    /// Replaces the value of a live entry.
    pub fn replace(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
        expiration: Expiration,
    ) -> Result<()> {
        let key = key.into();
        let mut state = self.state.write();

        if live(&state.items, &key).is_none() {
            return Err(CacheError::not_found(&key));
        }
        let entry = self.entry(value.into(), expiration);
        state.items.insert(key, entry);
        Ok(())
    }

    /// Gets the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired. The expired
    /// entry itself is left in place.
    pub fn get(&self, key: &str) -> Option<Value> {
        let state = self.state.read();
        live(&state.items, key).map(|entry| entry.value.clone())
    }

    /// Gets the value for a key together with its expiration instant.
    ///
    /// The instant is `None` for entries that never expire.
    pub fn get_with_expiration(&self, key: &str) -> Option<(Value, Option<SystemTime>)> {
        let state = self.state.read();
        live(&state.items, key).map(|entry| (entry.value.clone(), entry.expires_at))
    }

    /// Deletes a key, live or expired.
    ///
    /// # Returns
    ///
    /// Returns `true` if an entry was removed. The eviction hook is invoked
    /// only in that case, after the lock has been released.
    pub fn delete(&self, key: &str) -> bool {
        let (removed, hook) = {
            let mut state = self.state.write();
            (state.items.remove_entry(key), state.on_evicted.clone())
        };

        match removed {
            Some((key, entry)) => {
                if let Some(hook) = hook {
                    notify(&hook, vec![(key, entry.value)]);
                }
                true
            }
            None => false,
        }
    }

    /// Removes every expired entry in a single locked pass.
    ///
    /// The eviction hook is called once per removed entry after the lock is
    /// released.
    ///
    /// # Returns
    ///
    /// Returns the number of entries removed.
    pub fn delete_expired(&self) -> usize {
        let now = SystemTime::now();
        let (evicted, hook) = {
            let mut state = self.state.write();
            let expired: Vec<String> = state
                .items
                .iter()
                .filter(|(_, entry)| entry.is_expired_at(now))
                .map(|(key, _)| key.clone())
                .collect();

            let evicted: Vec<(String, Value)> = expired
                .into_iter()
                .filter_map(|key| state.items.remove_entry(&key))
                .map(|(key, entry)| (key, entry.value))
                .collect();

            (evicted, state.on_evicted.clone())
        };

        let removed = evicted.len();
        if let Some(hook) = hook {
            notify(&hook, evicted);
        }
        removed
    }

    /// Replaces the eviction hook. `None` disables eviction notifications.
    pub fn set_eviction_hook(&self, hook: Option<EvictionHook>) {
        self.state.write().on_evicted = hook;
    }

    /// Installs `hook` as the eviction hook.
    pub fn on_evicted<F>(&self, hook: F)
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.set_eviction_hook(Some(Arc::new(hook)));
    }

    /// Drops every entry at once. The eviction hook is not invoked.
    pub fn flush(&self) {
        // The old map is dropped after the lock is released
        let old = std::mem::take(&mut self.state.write().items);
        drop(old);
    }

    /// Returns a copy of every live entry.
    pub fn items(&self) -> HashMap<String, Entry> {
        let now = SystemTime::now();
        let state = self.state.read();
        state
            .items
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    /// Returns the number of stored entries.
    ///
    /// This includes entries that have expired but have not been swept yet,
    /// so it is not a count of live keys.
    pub fn item_count(&self) -> usize {
        self.state.read().items.len()
    }

    /// Returns true if nothing is stored, not even expired entries.
    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    /// Runs `op` on the live value for `key` under the exclusive lock and
    /// stores the value it returns, keeping the entry's expiration.
    pub(crate) fn update<T>(
        &self,
        key: &str,
        op: impl FnOnce(&Value) -> Result<(Value, T)>,
    ) -> Result<T> {
        let mut state = self.state.write();
        let now = SystemTime::now();

        let entry = match state.items.get_mut(key) {
            Some(entry) if !entry.is_expired_at(now) => entry,
            _ => return Err(CacheError::not_found(key)),
        };

        let (value, out) = op(&entry.value)?;
        entry.value = value;
        Ok(out)
    }

    /// Runs `f` with the full entries map (live and expired) under the
    /// shared lock.
    pub(crate) fn with_items<T>(&self, f: impl FnOnce(&HashMap<String, Entry>) -> T) -> T {
        f(&self.state.read().items)
    }

    /// Merges `incoming` into the store. An incoming entry is kept only where
    /// the store has no entry for the key or its entry has expired.
    ///
    /// # Returns
    ///
    /// Returns the number of incoming entries that were kept.
    pub(crate) fn merge(&self, incoming: HashMap<String, Entry>) -> usize {
        let now = SystemTime::now();
        let mut state = self.state.write();
        let mut merged = 0;

        for (key, entry) in incoming {
            let keep = state
                .items
                .get(&key)
                .map(|current| current.is_expired_at(now))
                .unwrap_or(true);
            if keep {
                state.items.insert(key, entry);
                merged += 1;
            }
        }

        merged
    }
}

impl Sweep for Store {
    fn sweep(&self) -> usize {
        self.delete_expired()
    }

    fn stored(&self) -> usize {
        self.item_count()
    }
}

/// Looks up a live entry.
#[inline]
fn live<'a>(items: &'a HashMap<String, Entry>, key: &str) -> Option<&'a Entry> {
    items.get(key).filter(|entry| !entry.is_expired())
}

/// Invokes the eviction hook for each evicted pair.
///
/// A panicking hook is logged and does not prevent the remaining
/// notifications from being delivered.
pub(crate) fn notify(hook: &EvictionHook, evicted: Vec<(String, Value)>) {
    for (key, value) in evicted {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| hook(&key, &value)));
        if outcome.is_err() {
            error!(key = %key, "Eviction hook panicked");
        }
    }
}

/// A [`Store`] together with its optional background sweeper.
///
/// Dereferences to [`Store`] for all cache operations. Dropping the cache
/// (or calling [`Cache::stop`]) stops the sweeper.
///
/// # Example
///
/// ```
/// use flashcache::{Cache, Expiration, Value};
/// use std::time::Duration;
///
/// let cache = Cache::new(Expiration::After(Duration::from_secs(300)), Duration::ZERO);
///
/// cache.set("session", "token123", Expiration::Default);
/// cache.set("hits", 10i64, Expiration::Never);
/// cache.increment("hits", 5).unwrap();
///
/// assert_eq!(cache.get("hits"), Some(Value::I64(15)));
/// ```
#[derive(Debug)]
pub struct Cache {
    store: Arc<Store>,
    sweeper: Option<Sweeper>,
}

impl Cache {
    /// Creates a cache.
    ///
    /// A non-zero `cleanup_interval` starts a background sweeper; zero means
    /// expired entries are only reclaimed by `delete` and `delete_expired`.
    pub fn new(default_ttl: Expiration, cleanup_interval: Duration) -> Self {
        Self::new_from(default_ttl, cleanup_interval, HashMap::new())
    }

    /// Creates a cache from a configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self::new(config.default_ttl, config.cleanup_interval)
    }

    /// Creates a cache pre-populated with `items`.
    pub fn new_from(
        default_ttl: Expiration,
        cleanup_interval: Duration,
        items: HashMap<String, Entry>,
    ) -> Self {
        let store = Arc::new(Store::from_items(default_ttl, items));
        let sweeper = Sweeper::start(&store, cleanup_interval);
        Self { store, sweeper }
    }

    /// Stops the background sweeper, if any. The cache stays usable with
    /// lazy expiration only.
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

impl Default for Cache {
    fn default() -> Self {
        Self::with_config(CacheConfig::default())
    }
}

impl Deref for Cache {
    type Target = Store;

    fn deref(&self) -> &Store {
        &self.store
    }
}
