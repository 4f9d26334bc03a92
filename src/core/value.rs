// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Decoded value type system.
//!
//! Marshallers turn raw JSON into [`DecodedValue`]s; field setters then
//! convert those into concrete Rust types through [`FromDecoded`].

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;
use url::Url;

use crate::core::error::{CodecError, Result};
use crate::schema::descriptor::TypeKey;

/// Value produced by a marshaller.
#[derive(Debug)]
pub enum DecodedValue {
    // Scalars
    Bool(bool),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
    Url(Url),

    // Untyped JSON passed through as-is
    Raw(Value),

    // Containers
    Array(Vec<DecodedValue>),
    Set(Vec<DecodedValue>),
    Map(Vec<(String, DecodedValue)>),

    // Instance of a registered decodable type
    Object(DecodedObject),
}

impl DecodedValue {
    /// Get the type name of this value as a string.
    pub fn type_name(&self) -> &'static str {
        match self {
            DecodedValue::Bool(_) => "Boolean",
            DecodedValue::Number(_) => "Number",
            DecodedValue::String(_) => "String",
            DecodedValue::Date(_) => "Date",
            DecodedValue::Url(_) => "URL",
            DecodedValue::Raw(_) => "Object",
            DecodedValue::Array(_) => "Array",
            DecodedValue::Set(_) => "Set",
            DecodedValue::Map(_) => "Map",
            DecodedValue::Object(obj) => obj.key().short_name(),
        }
    }

    /// Try to get the inner number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DecodedValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to get the inner boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DecodedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get the inner string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DecodedValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the items of an array or set.
    pub fn as_items(&self) -> Option<&[DecodedValue]> {
        match self {
            DecodedValue::Array(items) | DecodedValue::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Equality used for set de-duplication.
    ///
    /// Decoded objects are never equal to anything, matching identity
    /// semantics for freshly built instances.
    pub fn same_as(&self, other: &DecodedValue) -> bool {
        match (self, other) {
            (DecodedValue::Bool(a), DecodedValue::Bool(b)) => a == b,
            (DecodedValue::Number(a), DecodedValue::Number(b)) => a == b,
            (DecodedValue::String(a), DecodedValue::String(b)) => a == b,
            (DecodedValue::Date(a), DecodedValue::Date(b)) => a == b,
            (DecodedValue::Url(a), DecodedValue::Url(b)) => a == b,
            (DecodedValue::Raw(a), DecodedValue::Raw(b)) => a == b,
            _ => false,
        }
    }

    /// Convert into a concrete Rust type.
    pub fn into_typed<T: FromDecoded>(self) -> Result<T> {
        T::from_decoded(self)
    }

    /// Render as JSON, for diagnostics and error messages.
    pub fn to_json(&self) -> Value {
        match self {
            DecodedValue::Bool(b) => Value::Bool(*b),
            DecodedValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            DecodedValue::String(s) => Value::String(s.clone()),
            DecodedValue::Date(d) => Value::String(d.to_rfc3339()),
            DecodedValue::Url(u) => Value::String(u.to_string()),
            DecodedValue::Raw(v) => v.clone(),
            DecodedValue::Array(items) | DecodedValue::Set(items) => {
                Value::Array(items.iter().map(DecodedValue::to_json).collect())
            }
            DecodedValue::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            DecodedValue::Object(obj) => Value::String(format!("<{}>", obj.key())),
        }
    }

    fn mismatch(self, target: &str) -> CodecError {
        CodecError::conversion(target, &self.to_json())
    }
}

/// Type-erased instance of a registered decodable type.
pub struct DecodedObject {
    key: TypeKey,
    value: Box<dyn Any + Send>,
}

impl DecodedObject {
    /// Wrap a concrete instance.
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            value: Box::new(value),
        }
    }

    /// Runtime type of the wrapped instance.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Check if the wrapped instance is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Borrow as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Mutably borrow as `T`.
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut::<T>()
    }

    /// Take the instance out as `T`, or get `self` back unchanged.
    pub fn downcast<T: Any>(self) -> std::result::Result<T, Self> {
        let key = self.key;
        match self.value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Self { key, value }),
        }
    }

    /// Take the instance out as `T`, failing with a type mismatch.
    pub fn into_inner<T: Any>(self) -> Result<T> {
        self.downcast::<T>().map_err(|obj| {
            CodecError::type_mismatch(TypeKey::of::<T>().short_name(), obj.key.short_name())
        })
    }

    pub(crate) fn as_any_mut(&mut self) -> &mut dyn Any {
        &mut *self.value
    }

    pub(crate) fn as_any(&self) -> &dyn Any {
        &*self.value
    }
}

impl fmt::Debug for DecodedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DecodedObject").field(&self.key).finish()
    }
}

/// Field value holding a nested decodable instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Nested<T>(pub T);

impl<T> Nested<T> {
    /// Unwrap the nested instance.
    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Conversion from a marshalled value into a field type.
pub trait FromDecoded: Sized {
    /// Convert `value`, failing with a conversion error on a type mismatch.
    fn from_decoded(value: DecodedValue) -> Result<Self>;
}

impl FromDecoded for DecodedValue {
    fn from_decoded(value: DecodedValue) -> Result<Self> {
        Ok(value)
    }
}

impl FromDecoded for bool {
    fn from_decoded(value: DecodedValue) -> Result<Self> {
        match value {
            DecodedValue::Bool(b) => Ok(b),
            other => Err(other.mismatch("bool")),
        }
    }
}

impl FromDecoded for f64 {
    fn from_decoded(value: DecodedValue) -> Result<Self> {
        match value {
            DecodedValue::Number(n) => Ok(n),
            other => Err(other.mismatch("f64")),
        }
    }
}

impl FromDecoded for f32 {
    fn from_decoded(value: DecodedValue) -> Result<Self> {
        match value {
            DecodedValue::Number(n) => Ok(n as f32),
            other => Err(other.mismatch("f32")),
        }
    }
}

macro_rules! impl_from_decoded_int {
    ($($ty:ty),*) => {
        $(
            impl FromDecoded for $ty {
                fn from_decoded(value: DecodedValue) -> Result<Self> {
                    match value {
                        DecodedValue::Number(n)
                            if n.is_finite()
                                && n.fract() == 0.0
                                && n >= <$ty>::MIN as f64
                                && n <= <$ty>::MAX as f64 =>
                        {
                            Ok(n as $ty)
                        }
                        other => Err(other.mismatch(stringify!($ty))),
                    }
                }
            }
        )*
    };
}

impl_from_decoded_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl FromDecoded for String {
    fn from_decoded(value: DecodedValue) -> Result<Self> {
        match value {
            DecodedValue::String(s) => Ok(s),
            other => Err(other.mismatch("String")),
        }
    }
}

impl FromDecoded for DateTime<Utc> {
    fn from_decoded(value: DecodedValue) -> Result<Self> {
        match value {
            DecodedValue::Date(d) => Ok(d),
            other => Err(other.mismatch("DateTime<Utc>")),
        }
    }
}

impl FromDecoded for Url {
    fn from_decoded(value: DecodedValue) -> Result<Self> {
        match value {
            DecodedValue::Url(u) => Ok(u),
            other => Err(other.mismatch("Url")),
        }
    }
}

impl FromDecoded for Value {
    fn from_decoded(value: DecodedValue) -> Result<Self> {
        match value {
            DecodedValue::Raw(v) => Ok(v),
            DecodedValue::Object(obj) => Err(CodecError::type_mismatch("Value", obj.key().short_name())),
            other => Ok(other.to_json()),
        }
    }
}

impl FromDecoded for DecodedObject {
    fn from_decoded(value: DecodedValue) -> Result<Self> {
        match value {
            DecodedValue::Object(obj) => Ok(obj),
            other => Err(other.mismatch("object")),
        }
    }
}

impl<T: Any> FromDecoded for Nested<T> {
    fn from_decoded(value: DecodedValue) -> Result<Self> {
        match value {
            DecodedValue::Object(obj) => obj.into_inner::<T>().map(Nested),
            other => Err(other.mismatch(TypeKey::of::<T>().short_name())),
        }
    }
}

impl<T: FromDecoded> FromDecoded for Option<T> {
    fn from_decoded(value: DecodedValue) -> Result<Self> {
        match value {
            DecodedValue::Raw(Value::Null) => Ok(None),
            other => T::from_decoded(other).map(Some),
        }
    }
}

impl<T: FromDecoded> FromDecoded for Vec<T> {
    fn from_decoded(value: DecodedValue) -> Result<Self> {
        match value {
            DecodedValue::Array(items) | DecodedValue::Set(items) => {
                items.into_iter().map(T::from_decoded).collect()
            }
            other => Err(other.mismatch("Vec")),
        }
    }
}

impl<T: FromDecoded + Ord> FromDecoded for BTreeSet<T> {
    fn from_decoded(value: DecodedValue) -> Result<Self> {
        match value {
            DecodedValue::Array(items) | DecodedValue::Set(items) => {
                items.into_iter().map(T::from_decoded).collect()
            }
            other => Err(other.mismatch("BTreeSet")),
        }
    }
}

impl<T: FromDecoded> FromDecoded for BTreeMap<String, T> {
    fn from_decoded(value: DecodedValue) -> Result<Self> {
        match value {
            DecodedValue::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| T::from_decoded(v).map(|v| (k, v)))
                .collect(),
            other => Err(other.mismatch("BTreeMap")),
        }
    }
}

impl<T: FromDecoded> FromDecoded for HashMap<String, T> {
    fn from_decoded(value: DecodedValue) -> Result<Self> {
        match value {
            DecodedValue::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| T::from_decoded(v).map(|v| (k, v)))
                .collect(),
            other => Err(other.mismatch("HashMap")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Child {
        id: u32,
    }

    #[test]
    fn test_integer_conversion() {
        assert_eq!(DecodedValue::Number(42.0).into_typed::<u32>().unwrap(), 42);
        assert_eq!(DecodedValue::Number(-3.0).into_typed::<i64>().unwrap(), -3);
        assert!(DecodedValue::Number(1.5).into_typed::<i32>().is_err());
        assert!(DecodedValue::Number(-1.0).into_typed::<u8>().is_err());
        assert!(DecodedValue::Number(f64::NAN).into_typed::<i64>().is_err());
    }

    #[test]
    fn test_float_keeps_nan() {
        let n = DecodedValue::Number(f64::NAN).into_typed::<f64>().unwrap();
        assert!(n.is_nan());
    }

    #[test]
    fn test_vec_conversion() {
        let value = DecodedValue::Array(vec![DecodedValue::Number(5.0), DecodedValue::Number(6.0)]);
        assert_eq!(value.into_typed::<Vec<f64>>().unwrap(), vec![5.0, 6.0]);
    }

    #[test]
    fn test_map_conversion() {
        let value = DecodedValue::Map(vec![
            ("a".to_string(), DecodedValue::Bool(true)),
            ("b".to_string(), DecodedValue::Bool(false)),
        ]);
        let map = value.into_typed::<BTreeMap<String, bool>>().unwrap();
        assert_eq!(map.get("a"), Some(&true));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_nested_conversion() {
        let value = DecodedValue::Object(DecodedObject::new(Child { id: 7 }));
        let nested = value.into_typed::<Nested<Child>>().unwrap();
        assert_eq!(nested.into_inner(), Child { id: 7 });
    }

    #[test]
    fn test_nested_conversion_wrong_type() {
        let value = DecodedValue::Object(DecodedObject::new(String::from("x")));
        let err = value.into_typed::<Nested<Child>>().unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));
    }

    #[test]
    fn test_mismatch_is_conversion_error() {
        let err = DecodedValue::String("x".into()).into_typed::<bool>().unwrap_err();
        assert!(matches!(err, CodecError::ConversionError { .. }));
    }

    #[test]
    fn test_value_conversion_renders_scalars() {
        let v = DecodedValue::Number(3.0).into_typed::<Value>().unwrap();
        assert_eq!(v, json!(3.0));
        let raw = DecodedValue::Raw(json!({"k": 1})).into_typed::<Value>().unwrap();
        assert_eq!(raw, json!({"k": 1}));
    }

    #[test]
    fn test_same_as() {
        assert!(DecodedValue::Number(1.0).same_as(&DecodedValue::Number(1.0)));
        assert!(!DecodedValue::Number(1.0).same_as(&DecodedValue::String("1".into())));
        let a = DecodedValue::Object(DecodedObject::new(Child { id: 1 }));
        let b = DecodedValue::Object(DecodedObject::new(Child { id: 1 }));
        assert!(!a.same_as(&b));
    }

    #[test]
    fn test_decoded_object_downcast_roundtrip() {
        let obj = DecodedObject::new(Child { id: 3 });
        assert!(obj.is::<Child>());
        let obj = obj.downcast::<String>().unwrap_err();
        assert_eq!(obj.downcast::<Child>().unwrap(), Child { id: 3 });
    }
}
