//! Error types returned by cache operations.
//!
//! Every fallible operation returns its error synchronously to the caller.
//! Nothing is retried internally and nothing is swallowed.

use thiserror::Error;

/// Errors that can occur while operating on a cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// `add` was called for a key that already holds a live entry
    #[error("item {key} already exists")]
    AlreadyExists { key: String },

    /// The key is absent or its entry has expired
    #[error("item {key} not found")]
    NotFound { key: String },

    /// The stored value cannot take part in the requested arithmetic
    #[error("the value for {key} is a {kind}, which does not support this operation")]
    UnsupportedType { key: String, kind: &'static str },

    /// A typed mutator was called with a delta of a different kind than the stored value
    #[error("the value for {key} is a {found}, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The snapshot stream is malformed
    #[error("snapshot decode error: {0}")]
    Decode(String),

    /// The entries could not be encoded into a snapshot
    #[error("snapshot encode error: {0}")]
    Encode(String),

    /// The underlying stream or file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    pub(crate) fn not_found(key: &str) -> Self {
        Self::NotFound {
            key: key.to_string(),
        }
    }

    pub(crate) fn already_exists(key: &str) -> Self {
        Self::AlreadyExists {
            key: key.to_string(),
        }
    }
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CacheError::not_found("session").to_string(),
            "item session not found"
        );
        assert_eq!(
            CacheError::already_exists("session").to_string(),
            "item session already exists"
        );

        let err = CacheError::TypeMismatch {
            key: "hits".into(),
            expected: "i32",
            found: "i64",
        };
        assert_eq!(err.to_string(), "the value for hits is a i64, expected i32");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err: CacheError = io.into();
        assert!(matches!(err, CacheError::Io(_)));
    }
}
