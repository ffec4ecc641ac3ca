//! Typed conversions between Rust values and the dynamic [`Value`] currency.
//!
//! `ValueType` maps a Rust type to its `sea_query::Value` variant, in both
//! directions. Row access ([`crate::executor::Row::get`]) and binder
//! normalization are built on it. Covers the primitive, string, binary and
//! JSON types directly; temporal (`chrono`), `uuid` and `rust_decimal`
//! values go through sea-query's own conversions.

use sea_query::Value;

/// Maps a Rust type to its `sea_query::Value` variant.
pub trait ValueType: Sized {
    /// Convert this value into a `Value`.
    fn into_value(self) -> Value;

    /// Convert a `Value` back into this type.
    ///
    /// Returns `None` if the value is null or holds a different variant.
    fn from_value(value: Value) -> Option<Self>;

    /// The null variant for this type.
    fn null_value() -> Value;
}

macro_rules! impl_value_type {
    ($rust:ty, $variant:ident) => {
        impl ValueType for $rust {
            fn into_value(self) -> Value {
                Value::$variant(Some(self))
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => v,
                    _ => None,
                }
            }

            fn null_value() -> Value {
                Value::$variant(None)
            }
        }
    };
}

impl_value_type!(bool, Bool);
impl_value_type!(i8, TinyInt);
impl_value_type!(i16, SmallInt);
impl_value_type!(i32, Int);
impl_value_type!(i64, BigInt);
impl_value_type!(u8, TinyUnsigned);
impl_value_type!(u16, SmallUnsigned);
impl_value_type!(u32, Unsigned);
impl_value_type!(u64, BigUnsigned);
impl_value_type!(f32, Float);
impl_value_type!(f64, Double);
impl_value_type!(String, String);
impl_value_type!(Vec<u8>, Bytes);

// Temporal, uuid and decimal values construct through sea-query's `From`
// impls; extraction delegates to its conversion trait.
macro_rules! impl_value_type_via {
    ($rust:ty, $variant:ident) => {
        impl ValueType for $rust {
            fn into_value(self) -> Value {
                Value::from(self)
            }

            fn from_value(value: Value) -> Option<Self> {
                <$rust as sea_query::ValueType>::try_from(value).ok()
            }

            fn null_value() -> Value {
                Value::$variant(None)
            }
        }
    };
}

impl_value_type_via!(chrono::NaiveDate, ChronoDate);
impl_value_type_via!(chrono::NaiveTime, ChronoTime);
impl_value_type_via!(chrono::NaiveDateTime, ChronoDateTime);
impl_value_type_via!(uuid::Uuid, Uuid);
impl_value_type_via!(rust_decimal::Decimal, Decimal);

impl ValueType for serde_json::Value {
    fn into_value(self) -> Value {
        Value::Json(Some(Box::new(self)))
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Json(Some(v)) => Some(*v),
            _ => None,
        }
    }

    fn null_value() -> Value {
        Value::Json(None)
    }
}

impl<T: ValueType> ValueType for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => T::null_value(),
        }
    }

    fn from_value(value: Value) -> Option<Self> {
        if is_null(&value) {
            Some(None)
        } else {
            T::from_value(value).map(Some)
        }
    }

    fn null_value() -> Value {
        T::null_value()
    }
}

/// Whether a dynamic value holds null, regardless of its variant.
pub fn is_null(value: &Value) -> bool {
    matches!(
        value,
        Value::Bool(None)
            | Value::TinyInt(None)
            | Value::SmallInt(None)
            | Value::Int(None)
            | Value::BigInt(None)
            | Value::TinyUnsigned(None)
            | Value::SmallUnsigned(None)
            | Value::Unsigned(None)
            | Value::BigUnsigned(None)
            | Value::Float(None)
            | Value::Double(None)
            | Value::String(None)
            | Value::Char(None)
            | Value::Bytes(None)
            | Value::Json(None)
            | Value::ChronoDate(None)
            | Value::ChronoTime(None)
            | Value::ChronoDateTime(None)
            | Value::ChronoDateTimeUtc(None)
            | Value::ChronoDateTimeLocal(None)
            | Value::ChronoDateTimeWithTimeZone(None)
            | Value::Uuid(None)
            | Value::Decimal(None)
    )
}

/// Whether a value is null or a zero number.
///
/// Used by the identifier-based "is new" heuristic: unsaved entities carry a
/// null or zero-valued primary key.
pub fn is_null_or_zero(value: &Value) -> bool {
    if is_null(value) {
        return true;
    }
    matches!(
        value,
        Value::TinyInt(Some(0))
            | Value::SmallInt(Some(0))
            | Value::Int(Some(0))
            | Value::BigInt(Some(0))
            | Value::TinyUnsigned(Some(0))
            | Value::SmallUnsigned(Some(0))
            | Value::Unsigned(Some(0))
            | Value::BigUnsigned(Some(0))
    )
}
