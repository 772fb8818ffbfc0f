//! Cache entries and expiration policies.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// How long a newly written entry should live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiration {
    /// Use the default TTL the cache was constructed with
    #[default]
    Default,
    /// The entry never expires
    Never,
    /// The entry expires after the given duration.
    /// A zero duration behaves like [`Expiration::Default`].
    After(Duration),
}

impl Expiration {
    /// Resolves this policy against a cache default into a concrete TTL.
    ///
    /// Returns `None` when the entry should never expire.
    pub(crate) fn resolve(self, default_ttl: Option<Duration>) -> Option<Duration> {
        match self {
            Expiration::Never => None,
            Expiration::After(ttl) if !ttl.is_zero() => Some(ttl),
            Expiration::Default | Expiration::After(_) => default_ttl,
        }
    }

    /// Resolves the TTL a cache should use for `Expiration::Default`.
    ///
    /// At construction time there is no outer default, so `Default` means never.
    pub(crate) fn as_default_ttl(self) -> Option<Duration> {
        self.resolve(None)
    }
}

impl From<Duration> for Expiration {
    fn from(ttl: Duration) -> Self {
        Expiration::After(ttl)
    }
}

/// A stored value together with its expiration instant.
///
/// Entries are replaced wholesale on every mutation; readers never observe
/// a partially updated entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// The stored value
    pub value: Value,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<SystemTime>,
}

impl Entry {
    /// Creates an entry that never expires.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates an entry that expires `ttl` from now.
    ///
    /// A `ttl` too large to represent as a wall-clock instant means the
    /// entry never expires.
    pub fn with_ttl(value: Value, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: SystemTime::now().checked_add(ttl),
        }
    }

    pub(crate) fn with_optional_ttl(value: Value, ttl: Option<Duration>) -> Self {
        match ttl {
            Some(ttl) => Self::with_ttl(value, ttl),
            None => Self::new(value),
        }
    }

    /// Checks if this entry has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    /// Checks if this entry is expired at `now`. An entry is expired only
    /// once `now` is strictly past its expiration instant.
    #[inline]
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires_at.map(|exp| now > exp).unwrap_or(false)
    }

    /// Returns the remaining time to live, or None if the entry never expires.
    pub fn ttl(&self) -> Option<Duration> {
        self.expires_at.map(|exp| {
            exp.duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO)
        })
    }
}
