//! Typed Increment / Decrement
//!
//! Arithmetic on a stored value happens in place under the store's
//! exclusive lock and never changes the value's kind: an `i16` stays an
//! `i16`, a `u8` stays a `u8`. Integer arithmetic wraps at the type's
//! bounds; float arithmetic follows IEEE-754.
//!
//! Three flavours exist:
//!
//! - [`Store::increment`] / [`Store::decrement`] take an `i64` delta and
//!   convert it to the stored kind (truncating, like an `as` cast).
//! - [`Store::increment_float`] / [`Store::decrement_float`] take an `f64`
//!   delta and only accept `f32` and `f64` values.
//! - [`Store::increment_as`] and the `increment_<kind>` family take a delta
//!   of the exact stored kind and return the new value, so callers never
//!   need a second `get` that could race with another writer.

use crate::error::{CacheError, Result};
use crate::storage::store::Store;
use crate::value::Value;

mod sealed {
    pub trait Sealed {}
}

/// A numeric kind that can be stored in a [`Value`].
///
/// Implemented for every integer width and for `f32`/`f64`.
pub trait Numeric: sealed::Sealed + Copy + Into<Value> {
    /// Kind name, matching [`Value::kind`].
    const KIND: &'static str;

    /// Extracts `Self` if the value is of exactly this kind.
    fn from_value(value: &Value) -> Option<Self>;

    /// Converts an `i64` delta to this kind.
    fn from_i64(n: i64) -> Self;

    fn add(self, rhs: Self) -> Self;

    fn sub(self, rhs: Self) -> Self;
}

macro_rules! impl_integer {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Numeric for $ty {
                const KIND: &'static str = stringify!($ty);

                #[inline]
                fn from_value(value: &Value) -> Option<Self> {
                    match *value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                #[inline]
                fn from_i64(n: i64) -> Self {
                    n as $ty
                }

                #[inline]
                fn add(self, rhs: Self) -> Self {
                    self.wrapping_add(rhs)
                }

                #[inline]
                fn sub(self, rhs: Self) -> Self {
                    self.wrapping_sub(rhs)
                }
            }
        )*
    };
}

macro_rules! impl_float {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Numeric for $ty {
                const KIND: &'static str = stringify!($ty);

                #[inline]
                fn from_value(value: &Value) -> Option<Self> {
                    match *value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                #[inline]
                fn from_i64(n: i64) -> Self {
                    n as $ty
                }

                #[inline]
                fn add(self, rhs: Self) -> Self {
                    self + rhs
                }

                #[inline]
                fn sub(self, rhs: Self) -> Self {
                    self - rhs
                }
            }
        )*
    };
}

impl_integer! {
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
}

impl_float! {
    f32 => F32,
    f64 => F64,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Up,
    Down,
}

impl Direction {
    #[inline]
    fn apply<T: Numeric>(self, current: T, n: T) -> T {
        match self {
            Direction::Up => current.add(n),
            Direction::Down => current.sub(n),
        }
    }
}

fn unsupported(key: &str, value: &Value) -> CacheError {
    CacheError::UnsupportedType {
        key: key.to_string(),
        kind: value.kind(),
    }
}

/// Shifts any numeric value by an `i64` delta converted to its kind.
fn shift_by_int(key: &str, value: &Value, n: i64, dir: Direction) -> Result<Value> {
    #[inline]
    fn shifted<T: Numeric>(current: T, n: i64, dir: Direction) -> Value {
        dir.apply(current, T::from_i64(n)).into()
    }

    let next = match *value {
        Value::Isize(v) => shifted(v, n, dir),
        Value::I8(v) => shifted(v, n, dir),
        Value::I16(v) => shifted(v, n, dir),
        Value::I32(v) => shifted(v, n, dir),
        Value::I64(v) => shifted(v, n, dir),
        Value::Usize(v) => shifted(v, n, dir),
        Value::U8(v) => shifted(v, n, dir),
        Value::U16(v) => shifted(v, n, dir),
        Value::U32(v) => shifted(v, n, dir),
        Value::U64(v) => shifted(v, n, dir),
        Value::F32(v) => shifted(v, n, dir),
        Value::F64(v) => shifted(v, n, dir),
        Value::Bool(_) | Value::Text(_) | Value::Bytes(_) => return Err(unsupported(key, value)),
    };
    Ok(next)
}

/// Shifts a floating point value by an `f64` delta.
fn shift_by_float(key: &str, value: &Value, n: f64, dir: Direction) -> Result<Value> {
    match *value {
        Value::F32(v) => Ok(Value::F32(dir.apply(v, n as f32))),
        Value::F64(v) => Ok(Value::F64(dir.apply(v, n))),
        _ => Err(unsupported(key, value)),
    }
}

/// Shifts a value of exactly kind `T` by `n`.
fn shift_exact<T: Numeric>(key: &str, value: &Value, n: T, dir: Direction) -> Result<T> {
    match T::from_value(value) {
        Some(current) => Ok(dir.apply(current, n)),
        None if value.is_numeric() => Err(CacheError::TypeMismatch {
            key: key.to_string(),
            expected: T::KIND,
            found: value.kind(),
        }),
        None => Err(unsupported(key, value)),
    }
}

impl Store {
    /// Increments a numeric value by `n`, converted to the stored kind.
    ///
    /// Fails with `NotFound` for a missing or expired key and with
    /// `UnsupportedType` for a non-numeric value.
    pub fn increment(&self, key: &str, n: i64) -> Result<()> {
        self.update(key, |value| Ok((shift_by_int(key, value, n, Direction::Up)?, ())))
    }

    /// Decrements a numeric value by `n`, converted to the stored kind.
    pub fn decrement(&self, key: &str, n: i64) -> Result<()> {
        self.update(key, |value| Ok((shift_by_int(key, value, n, Direction::Down)?, ())))
    }

    /// Increments an `f32` or `f64` value by `n`.
    ///
    /// Any other kind, integers included, fails with `UnsupportedType`.
    pub fn increment_float(&self, key: &str, n: f64) -> Result<()> {
        self.update(key, |value| Ok((shift_by_float(key, value, n, Direction::Up)?, ())))
    }

    /// Decrements an `f32` or `f64` value by `n`.
    pub fn decrement_float(&self, key: &str, n: f64) -> Result<()> {
        self.update(key, |value| Ok((shift_by_float(key, value, n, Direction::Down)?, ())))
    }

    /// Increments a value of kind `T` by `n` and returns the new value.
    ///
    /// Fails with `TypeMismatch` if the stored value is numeric but not a `T`.
    pub fn increment_as<T: Numeric>(&self, key: &str, n: T) -> Result<T> {
        self.update(key, |value| {
            let next = shift_exact(key, value, n, Direction::Up)?;
            Ok((next.into(), next))
        })
    }

    /// Decrements a value of kind `T` by `n` and returns the new value.
    pub fn decrement_as<T: Numeric>(&self, key: &str, n: T) -> Result<T> {
        self.update(key, |value| {
            let next = shift_exact(key, value, n, Direction::Down)?;
            Ok((next.into(), next))
        })
    }
}

macro_rules! typed_mutators {
    ($($ty:ty => $inc:ident, $dec:ident;)*) => {
        impl Store {
            $(
                #[doc = concat!("Increments a stored `", stringify!($ty), "` by `n` and returns the new value.")]
                pub fn $inc(&self, key: &str, n: $ty) -> Result<$ty> {
                    self.increment_as(key, n)
                }

                #[doc = concat!("Decrements a stored `", stringify!($ty), "` by `n` and returns the new value.")]
                pub fn $dec(&self, key: &str, n: $ty) -> Result<$ty> {
                    self.decrement_as(key, n)
                }
            )*
        }
    };
}

typed_mutators! {
    isize => increment_isize, decrement_isize;
    i8 => increment_i8, decrement_i8;
    i16 => increment_i16, decrement_i16;
    i32 => increment_i32, decrement_i32;
    i64 => increment_i64, decrement_i64;
    usize => increment_usize, decrement_usize;
    u8 => increment_u8, decrement_u8;
    u16 => increment_u16, decrement_u16;
    u32 => increment_u32, decrement_u32;
    u64 => increment_u64, decrement_u64;
    f32 => increment_f32, decrement_f32;
    f64 => increment_f64, decrement_f64;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Expiration;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn store_with(key: &str, value: impl Into<Value>) -> Store {
        let store = Store::default();
        store.set(key, value, Expiration::Never);
        store
    }

    #[test]
    fn test_increment_every_kind_keeps_width() {
        let cases: Vec<(Value, Value)> = vec![
            (Value::Isize(1), Value::Isize(3)),
            (Value::I8(1), Value::I8(3)),
            (Value::I16(1), Value::I16(3)),
            (Value::I32(1), Value::I32(3)),
            (Value::I64(1), Value::I64(3)),
            (Value::Usize(1), Value::Usize(3)),
            (Value::U8(1), Value::U8(3)),
            (Value::U16(1), Value::U16(3)),
            (Value::U32(1), Value::U32(3)),
            (Value::U64(1), Value::U64(3)),
            (Value::F32(1.5), Value::F32(3.5)),
            (Value::F64(1.5), Value::F64(3.5)),
        ];

        for (start, expected) in cases {
            let store = store_with("n", start.clone());
            store.increment("n", 2).unwrap();
            assert_eq!(store.get("n"), Some(expected), "starting from {:?}", start);
        }
    }

    #[test]
    fn test_decrement() {
        let store = store_with("n", 10i64);
        store.decrement("n", 4).unwrap();
        assert_eq!(store.get("n"), Some(Value::I64(6)));

        let store = store_with("f", 2.5f32);
        store.decrement("f", 1).unwrap();
        assert_eq!(store.get("f"), Some(Value::F32(1.5)));
    }

    #[test]
    fn test_integer_arithmetic_wraps() {
        let store = store_with("small", 127i8);
        store.increment("small", 1).unwrap();
        assert_eq!(store.get("small"), Some(Value::I8(-128)));

        let store = store_with("unsigned", 0u8);
        store.decrement("unsigned", 1).unwrap();
        assert_eq!(store.get("unsigned"), Some(Value::U8(255)));

        // The delta is truncated to the stored width
        let store = store_with("u16", 0u16);
        store.increment("u16", 65_537).unwrap();
        assert_eq!(store.get("u16"), Some(Value::U16(1)));
    }

    #[test]
    fn test_increment_missing_or_expired() {
        let store = Store::default();
        assert!(matches!(
            store.increment("missing", 1),
            Err(CacheError::NotFound { .. })
        ));

        store.set("gone", 1i64, Expiration::After(Duration::from_millis(5)));
        thread::sleep(Duration::from_millis(15));
        assert!(matches!(
            store.increment("gone", 1),
            Err(CacheError::NotFound { .. })
        ));
        assert!(matches!(
            store.increment_i64("gone", 1),
            Err(CacheError::NotFound { .. })
        ));
    }

    #[test]
    fn test_increment_string_is_unsupported() {
        let store = store_with("text", "hello");

        let err = store.increment("text", 1).unwrap_err();
        assert!(matches!(err, CacheError::UnsupportedType { kind: "string", .. }));
        assert_eq!(store.get("text"), Some(Value::from("hello")));
    }

    #[test]
    fn test_increment_preserves_expiration() {
        let store = Store::default();
        store.set("n", 1i32, Expiration::After(Duration::from_secs(60)));
        let (_, before) = store.get_with_expiration("n").unwrap();

        store.increment("n", 1).unwrap();

        let (value, after) = store.get_with_expiration("n").unwrap();
        assert_eq!(value, Value::I32(2));
        assert_eq!(before, after);
    }

    #[test]
    fn test_float_only_variants() {
        let store = store_with("f", 10.5f64);
        store.increment_float("f", 2.5).unwrap();
        assert_eq!(store.get("f"), Some(Value::F64(13.0)));
        store.decrement_float("f", 3.0).unwrap();
        assert_eq!(store.get("f"), Some(Value::F64(10.0)));

        let store = store_with("f32", 1.0f32);
        store.increment_float("f32", 0.5).unwrap();
        assert_eq!(store.get("f32"), Some(Value::F32(1.5)));

        let store = store_with("int", 10i64);
        let err = store.increment_float("int", 1.0).unwrap_err();
        assert!(matches!(err, CacheError::UnsupportedType { kind: "i64", .. }));
        assert_eq!(store.get("int"), Some(Value::I64(10)));
    }

    #[test]
    fn test_typed_variants_return_new_value() {
        let store = store_with("hits", 41u32);
        assert_eq!(store.increment_u32("hits", 1).unwrap(), 42);
        assert_eq!(store.get("hits"), Some(Value::U32(42)));
        assert_eq!(store.decrement_u32("hits", 2).unwrap(), 40);

        let store = store_with("ratio", 0.5f32);
        assert_eq!(store.increment_f32("ratio", 0.25).unwrap(), 0.75);

        let store = store_with("i", -1isize);
        assert_eq!(store.decrement_isize("i", 1).unwrap(), -2);
        assert_eq!(store.increment_as::<isize>("i", 5).unwrap(), 3);
    }

    #[test]
    fn test_typed_variant_mismatch() {
        let store = store_with("n", 5i64);

        let err = store.increment_i32("n", 1).unwrap_err();
        match err {
            CacheError::TypeMismatch {
                expected, found, ..
            } => {
                assert_eq!(expected, "i32");
                assert_eq!(found, "i64");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(store.get("n"), Some(Value::I64(5)));

        let store = store_with("s", "five");
        assert!(matches!(
            store.decrement_u8("s", 1),
            Err(CacheError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(store_with("counter", 0u64));
        let mut handles = vec![];

        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..250 {
                    store.increment_u64("counter", 1).unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get("counter"), Some(Value::U64(2000)));
    }
}
