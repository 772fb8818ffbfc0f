//! The value slot stored in every cache entry.
//!
//! A cache entry holds one [`Value`]: either one of the supported numeric
//! kinds, which the arithmetic mutators can operate on, or an opaque payload
//! (text, raw bytes, a flag) that is only ever stored and returned.
//!
//! The variant is the runtime type of the value. Arithmetic never changes it,
//! so an `i16` stays an `i16` after any number of increments, and a snapshot
//! round-trip brings it back as the same variant.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A value stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Isize(isize),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Usize(usize),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Text(String),
    Bytes(Bytes),
}

impl Value {
    /// Returns the name of this value's kind, as used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Isize(_) => "isize",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::Usize(_) => "usize",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Bool(_) => "bool",
            Value::Text(_) => "string",
            Value::Bytes(_) => "bytes",
        }
    }

    /// Returns true for the integer and floating point kinds.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Value::Bool(_) | Value::Text(_) | Value::Bytes(_))
    }

    /// Returns true for `f32` and `f64`.
    pub fn is_float(&self) -> bool {
        matches!(self, Value::F32(_) | Value::F64(_))
    }

    /// Returns the text payload, if this is a `Text` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the byte payload, if this is a `Bytes` value.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    isize => Isize,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    usize => Usize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    String => Text,
    Bytes => Bytes,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_keeps_width() {
        assert_eq!(Value::from(7i8), Value::I8(7));
        assert_eq!(Value::from(7u16), Value::U16(7));
        assert_eq!(Value::from(1.5f32), Value::F32(1.5));
        assert_eq!(Value::from("hi"), Value::Text("hi".into()));
        assert_eq!(
            Value::from(vec![1u8, 2]),
            Value::Bytes(Bytes::from_static(&[1, 2]))
        );
    }

    #[test]
    fn test_kind_classification() {
        assert!(Value::U64(1).is_numeric());
        assert!(Value::F64(1.0).is_numeric());
        assert!(Value::F64(1.0).is_float());
        assert!(!Value::I32(1).is_float());
        assert!(!Value::from("x").is_numeric());
        assert!(!Value::Bool(true).is_numeric());
        assert_eq!(Value::Usize(3).kind(), "usize");
        assert_eq!(Value::from("x").kind(), "string");
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from("abc").as_str(), Some("abc"));
        assert_eq!(Value::I8(1).as_str(), None);
        assert!(Value::from(Bytes::from("x")).as_bytes().is_some());
    }
}
