//! Storage Module
//!
//! This module provides the core storage functionality for FlashCache:
//! a thread-safe key-value store with per-entry TTL, a sharded variant,
//! typed arithmetic on stored numbers, snapshot save/load and a background
//! expiry sweeper.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────┐      ┌─────────────────────────────────┐
//! │          Cache            │      │          ShardedCache           │
//! │  ┌─────────────────────┐  │      │  ┌───────┐ ┌───────┐ ┌───────┐  │
//! │  │        Store        │  │      │  │Store 0│ │Store 1│ │Store N│  │
//! │  │  RwLock<HashMap>    │  │      │  └───────┘ └───────┘ └───────┘  │
//! │  └─────────────────────┘  │      │      ▲ djb33(seed, key) % N     │
//! └─────────────▲─────────────┘      └──────────────▲──────────────────┘
//!               │                                   │
//!       ┌───────┴───────┐                   ┌───────┴───────┐
//!       │    Sweeper    │                   │    Sweeper    │
//!       └───────────────┘                   └───────────────┘
//! ```
//!
//! ## Features
//!
//! - **RwLock**: Multiple concurrent readers, exclusive writers
//! - **Lazy Expiry**: Expired keys read as absent but stay until swept
//! - **Active Expiry**: Background sweeper removes expired keys
//! - **Eviction Hook**: Notified on delete and sweep, never under the lock
//! - **Snapshots**: Merge-on-load binary dumps that keep value kinds
//!
//! ## Example
//!
//! ```
//! use flashcache::storage::{Cache, Expiration};
//! use flashcache::Value;
//! use std::time::Duration;
//!
//! let cache = Cache::new(Expiration::Never, Duration::ZERO);
//!
//! cache.set("name", "Ariz", Expiration::Default);
//! assert_eq!(cache.get("name"), Some(Value::from("Ariz")));
//!
//! // Set with TTL
//! cache.set("session", "token123", Expiration::After(Duration::from_secs(3600)));
//! ```

pub mod arith;
pub mod entry;
pub mod expiry;
pub mod router;
pub mod sharded;
pub mod snapshot;
pub mod store;

// Re-export commonly used types
pub use arith::Numeric;
pub use entry::{Entry, Expiration};
pub use expiry::{Sweep, Sweeper, SweeperState};
pub use router::{djb33, route};
pub use sharded::{ShardSet, ShardedCache};
pub use store::{Cache, EvictionHook, Store};
