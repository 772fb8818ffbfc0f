//! # FlashCache - An Embedded Key-Value Cache with Expiration
//!
//! FlashCache is an in-process, thread-safe key-value cache with per-entry
//! time-to-live. It is meant to be linked into an application that needs a
//! fast local cache without running an external service.
//!
//! ## Features
//!
//! - **Per-Entry TTL**: Every entry can use the cache default, never expire,
//!   or expire after its own duration
//! - **Lazy + Active Expiry**: Expired entries read as absent; an optional
//!   background sweeper reclaims them
//! - **Sharding**: [`ShardedCache`] stripes keys over independently locked
//!   partitions using a per-instance random seed
//! - **Typed Arithmetic**: Increment and decrement keep the stored number's
//!   exact kind and width
//! - **Snapshots**: Save to any writer, merge-load from any reader
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              FlashCache                                 │
//! │                                                                         │
//! │   caller threads                                                        │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐    │
//! │  │   Cache     │    │              ShardedCache                    │    │
//! │  │  (1 Store)  │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │    │
//! │  │   RwLock    │    │  │Store 0 │ │Store 1 │ │Store 2 │ │...N    │ │    │
//! │  └─────────────┘    │  └────────┘ └────────┘ └────────┘ └────────┘ │    │
//! │        ▲            └──────────────────────────────────────────────┘    │
//! │        │                              ▲                                 │
//! │  ┌─────┴───────────────────────────────┴───────────────────────────┐    │
//! │  │                    Sweeper (one per cache)                      │    │
//! │  │                   (Background Tokio Task)                       │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use flashcache::{Cache, CacheError, Expiration, Value};
//! use std::time::Duration;
//!
//! // Entries expire after five minutes unless told otherwise; no sweeper
//! let cache = Cache::new(Expiration::After(Duration::from_secs(300)), Duration::ZERO);
//!
//! cache.set("greeting", "hello", Expiration::Default);
//! cache.set("visits", 0u32, Expiration::Never);
//!
//! assert_eq!(cache.increment_u32("visits", 1).unwrap(), 1);
//! assert!(matches!(
//!     cache.add("greeting", "again", Expiration::Default),
//!     Err(CacheError::AlreadyExists { .. })
//! ));
//! assert_eq!(cache.get("greeting"), Some(Value::from("hello")));
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: Stores, sharding, arithmetic, snapshots and the sweeper
//! - [`value`]: The tagged value slot stored in each entry
//! - [`config`]: Construction options
//! - [`error`]: Error type returned by fallible operations
//!
//! ## Design Highlights
//!
//! ### Thread Safety
//!
//! Each store is one `HashMap` behind one reader/writer lock. Check-and-set
//! operations (`add`, `replace`, increment/decrement) happen under a single
//! exclusive acquisition, so they are atomic per key.
//!
//! ### Hooks Never Run Under The Lock
//!
//! Entries removed by `delete` or a sweep are collected under the lock and
//! the eviction hook is called after it is released. A hook may safely call
//! back into the cache.
//!
//! ### Deterministic Shutdown
//!
//! The sweeper stops when its cache handle is dropped or when `stop()` is
//! called, never at some later garbage-collection point.

pub mod config;
pub mod error;
pub mod storage;
pub mod value;

// Re-export commonly used types for convenience
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use storage::{
    Cache, Entry, EvictionHook, Expiration, Numeric, ShardedCache, Store, Sweeper, SweeperState,
};
pub use value::Value;

/// Version of FlashCache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
