// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Marshaller registry.
//!
//! A marshaller converts one raw JSON value into a [`DecodedValue`], or
//! reports "no value" with `Ok(None)`. Marshallers for container
//! descriptors are composed from an item marshaller, recursively, so
//! `Array<Array<Nested>>` is an array marshaller wrapping an array
//! marshaller wrapping a nested-type marshaller.
//!
//! Non-container marshallers apply the reverse-array rule: given an array,
//! they convert its first element, and an empty array yields no value.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::core::error::{CodecError, Result};
use crate::core::value::{DecodedObject, DecodedValue};
use crate::encoding::scalar;
use crate::schema::descriptor::{CollectionKind, TypeDescriptor, TypeKey};

/// Recursive entry point into the decode engine for nested types.
pub trait NestedDecoder {
    /// Decode `value` as an instance of `key`, `None` on invalidation.
    fn decode_nested(&self, key: TypeKey, value: &Value) -> Result<Option<DecodedObject>>;
}

/// Per-call marshalling state.
pub struct MarshalContext<'a> {
    strict: bool,
    nested: &'a dyn NestedDecoder,
}

impl<'a> MarshalContext<'a> {
    /// Create a context.
    pub fn new(strict: bool, nested: &'a dyn NestedDecoder) -> Self {
        Self { strict, nested }
    }

    /// Raise instead of yielding "no value" on unconvertible input.
    pub fn strict(&self) -> bool {
        self.strict
    }

    /// Decode a nested type.
    pub fn decode_nested(&self, key: TypeKey, value: &Value) -> Result<Option<DecodedObject>> {
        self.nested.decode_nested(key, value)
    }
}

/// Conversion function from raw JSON to a decoded value.
pub type Marshaller =
    Arc<dyn Fn(&Value, &MarshalContext<'_>) -> Result<Option<DecodedValue>> + Send + Sync>;

/// Registry mapping type descriptors to marshallers.
pub struct MarshallerRegistry {
    scalars: RwLock<HashMap<TypeDescriptor, Marshaller>>,
    composed: RwLock<HashMap<TypeDescriptor, Marshaller>>,
}

impl MarshallerRegistry {
    /// Create a registry with the built-in scalar marshallers.
    pub fn new() -> Self {
        let mut scalars: HashMap<TypeDescriptor, Marshaller> = HashMap::new();
        scalars.insert(
            TypeDescriptor::Boolean,
            Arc::new(|value: &Value, ctx: &MarshalContext<'_>| {
                Ok(scalar::to_boolean(value, ctx.strict())?.map(DecodedValue::Bool))
            }),
        );
        scalars.insert(
            TypeDescriptor::Number,
            Arc::new(|value: &Value, ctx: &MarshalContext<'_>| {
                Ok(scalar::to_number(value, ctx.strict())?.map(DecodedValue::Number))
            }),
        );
        scalars.insert(
            TypeDescriptor::String,
            Arc::new(|value: &Value, ctx: &MarshalContext<'_>| {
                Ok(scalar::to_string(value, ctx.strict())?.map(DecodedValue::String))
            }),
        );
        scalars.insert(
            TypeDescriptor::Object,
            Arc::new(|value: &Value, ctx: &MarshalContext<'_>| {
                Ok(scalar::to_object(value, ctx.strict())?.map(DecodedValue::Raw))
            }),
        );
        scalars.insert(
            TypeDescriptor::Date,
            Arc::new(|value: &Value, ctx: &MarshalContext<'_>| {
                Ok(scalar::to_date(value, ctx.strict())?.map(DecodedValue::Date))
            }),
        );
        scalars.insert(
            TypeDescriptor::Url,
            Arc::new(|value: &Value, ctx: &MarshalContext<'_>| {
                Ok(scalar::to_url(value, ctx.strict())?.map(DecodedValue::Url))
            }),
        );

        Self {
            scalars: RwLock::new(scalars),
            composed: RwLock::new(HashMap::new()),
        }
    }

    /// Register or replace the marshaller for a scalar descriptor.
    ///
    /// The reverse-array rule is applied around `marshaller` automatically.
    pub fn register(&self, descriptor: TypeDescriptor, marshaller: Marshaller) -> Result<()> {
        if descriptor.is_collection() || matches!(descriptor, TypeDescriptor::Nested(_)) {
            return Err(CodecError::invalid_mapping(
                descriptor.to_string(),
                "only scalar marshallers can be registered",
            ));
        }
        self.scalars
            .write()
            .map_err(|e| CodecError::Other(format!("Marshaller registry lock poisoned: {e}")))?
            .insert(descriptor, marshaller);
        self.composed
            .write()
            .map_err(|e| CodecError::Other(format!("Marshaller registry lock poisoned: {e}")))?
            .clear();
        Ok(())
    }

    /// Get the marshaller for `descriptor`, composing containers recursively.
    pub fn marshaller_for(&self, descriptor: &TypeDescriptor) -> Result<Marshaller> {
        if let Some(found) = self
            .composed
            .read()
            .map_err(|e| CodecError::Other(format!("Marshaller registry lock poisoned: {e}")))?
            .get(descriptor)
        {
            return Ok(found.clone());
        }

        let built = self.build(descriptor)?;
        self.composed
            .write()
            .map_err(|e| CodecError::Other(format!("Marshaller registry lock poisoned: {e}")))?
            .insert(descriptor.clone(), built.clone());
        Ok(built)
    }

    fn build(&self, descriptor: &TypeDescriptor) -> Result<Marshaller> {
        descriptor
            .validate()
            .map_err(|reason| CodecError::invalid_mapping(descriptor.to_string(), reason))?;

        match descriptor {
            TypeDescriptor::Collection { element, .. } => {
                let item = self.marshaller_for(element)?;
                let kind = descriptor.collection_kind().ok_or_else(|| {
                    CodecError::invalid_mapping(descriptor.to_string(), "not a container")
                })?;
                Ok(self.collection_marshaller_for(kind, item))
            }
            TypeDescriptor::Array => {
                Ok(self.collection_marshaller_for(CollectionKind::Array, raw_marshaller()))
            }
            TypeDescriptor::Set => {
                Ok(self.collection_marshaller_for(CollectionKind::Set, raw_marshaller()))
            }
            TypeDescriptor::Map => {
                Ok(self.collection_marshaller_for(CollectionKind::Map, raw_marshaller()))
            }
            TypeDescriptor::Nested(key) => Ok(single(nested_marshaller(*key))),
            scalar => {
                let found = self
                    .scalars
                    .read()
                    .map_err(|e| {
                        CodecError::Other(format!("Marshaller registry lock poisoned: {e}"))
                    })?
                    .get(scalar)
                    .cloned();
                found
                    .map(single)
                    .ok_or_else(|| CodecError::type_not_found(scalar.to_string()))
            }
        }
    }

    /// Build a container marshaller around `item`.
    pub fn collection_marshaller_for(&self, kind: CollectionKind, item: Marshaller) -> Marshaller {
        match kind {
            CollectionKind::Array => Arc::new(move |value: &Value, ctx: &MarshalContext<'_>| {
                Ok(collect_items(value, &item, ctx)?.map(DecodedValue::Array))
            }),
            CollectionKind::Set => Arc::new(move |value: &Value, ctx: &MarshalContext<'_>| {
                Ok(collect_items(value, &item, ctx)?.map(|items| {
                    let mut unique: Vec<DecodedValue> = Vec::with_capacity(items.len());
                    for candidate in items {
                        if !unique.iter().any(|seen| seen.same_as(&candidate)) {
                            unique.push(candidate);
                        }
                    }
                    DecodedValue::Set(unique)
                }))
            }),
            CollectionKind::Map => Arc::new(move |value: &Value, ctx: &MarshalContext<'_>| {
                collect_entries(value, &item, ctx)
            }),
        }
    }

    /// Marshal `value`, passing it through untouched when no type is declared.
    pub fn marshal(
        &self,
        descriptor: Option<&TypeDescriptor>,
        value: &Value,
        ctx: &MarshalContext<'_>,
    ) -> Result<Option<DecodedValue>> {
        match descriptor {
            Some(descriptor) => (self.marshaller_for(descriptor)?)(value, ctx),
            None => Ok(Some(DecodedValue::Raw(value.clone()))),
        }
    }
}

impl Default for MarshallerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MarshallerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scalars = self.scalars.read().map(|s| s.len()).unwrap_or(0);
        f.debug_struct("MarshallerRegistry")
            .field("scalars", &scalars)
            .finish_non_exhaustive()
    }
}

fn raw_marshaller() -> Marshaller {
    Arc::new(|value: &Value, _ctx: &MarshalContext<'_>| {
        Ok(Some(DecodedValue::Raw(value.clone())))
    })
}

fn nested_marshaller(key: TypeKey) -> Marshaller {
    Arc::new(move |value: &Value, ctx: &MarshalContext<'_>| match value {
        Value::Null => Ok(None),
        Value::Object(_) | Value::Array(_) => {
            Ok(ctx.decode_nested(key, value)?.map(DecodedValue::Object))
        }
        _ if ctx.strict() => Err(CodecError::conversion(key.short_name(), value)),
        _ => Ok(None),
    })
}

/// Apply the reverse-array rule around a non-container marshaller.
fn single(inner: Marshaller) -> Marshaller {
    Arc::new(move |value: &Value, ctx: &MarshalContext<'_>| match value {
        Value::Array(items) => match items.first() {
            Some(first) => inner(first, ctx),
            None => Ok(None),
        },
        other => inner(other, ctx),
    })
}

fn collect_items(
    value: &Value,
    item: &Marshaller,
    ctx: &MarshalContext<'_>,
) -> Result<Option<Vec<DecodedValue>>> {
    match value {
        Value::Null => Ok(None),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for raw in items {
                if let Some(decoded) = item(raw, ctx)? {
                    out.push(decoded);
                }
            }
            Ok(Some(out))
        }
        other => Ok(item(other, ctx)?.map(|decoded| vec![decoded])),
    }
}

fn collect_entries(
    value: &Value,
    item: &Marshaller,
    ctx: &MarshalContext<'_>,
) -> Result<Option<DecodedValue>> {
    let mut out = Vec::new();
    match value {
        Value::Null => return Ok(None),
        Value::Object(map) => {
            for (key, raw) in map {
                if let Some(decoded) = item(raw, ctx)? {
                    out.push((key.clone(), decoded));
                }
            }
        }
        Value::Array(pairs) => {
            for pair in pairs {
                match pair.as_array().map(Vec::as_slice) {
                    Some([key, raw]) if key.is_string() || key.is_number() => {
                        let key = match key {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        if let Some(decoded) = item(raw, ctx)? {
                            out.push((key, decoded));
                        }
                    }
                    _ if ctx.strict() => return Err(CodecError::conversion("Map entry", pair)),
                    _ => {}
                }
            }
        }
        other => {
            if let Some(decoded) = item(other, ctx)? {
                out.push(("0".to_string(), decoded));
            }
        }
    }
    Ok(Some(DecodedValue::Map(out)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NoNested;

    impl NestedDecoder for NoNested {
        fn decode_nested(&self, key: TypeKey, value: &Value) -> Result<Option<DecodedObject>> {
            Ok(Some(DecodedObject::new((key.short_name().to_string(), value.clone()))))
        }
    }

    fn run(desc: &TypeDescriptor, value: Value, strict: bool) -> Result<Option<DecodedValue>> {
        let registry = MarshallerRegistry::new();
        let ctx = MarshalContext::new(strict, &NoNested);
        registry.marshal(Some(desc), &value, &ctx)
    }

    #[test]
    fn test_reverse_array_takes_first_element() {
        let out = run(&TypeDescriptor::Number, json!(["5", "6"]), false).unwrap();
        assert_eq!(out.and_then(|v| v.as_f64()), Some(5.0));
    }

    #[test]
    fn test_reverse_array_empty_is_no_value() {
        let out = run(&TypeDescriptor::Number, json!([]), false).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_array_of_numbers() {
        let out = run(
            &TypeDescriptor::array_of(TypeDescriptor::Number),
            json!(["5", "6"]),
            false,
        )
        .unwrap()
        .unwrap();
        assert_eq!(out.into_typed::<Vec<f64>>().unwrap(), vec![5.0, 6.0]);
    }

    #[test]
    fn test_array_wraps_single_value() {
        let out = run(
            &TypeDescriptor::array_of(TypeDescriptor::Number),
            json!("0b1001"),
            false,
        )
        .unwrap()
        .unwrap();
        assert_eq!(out.into_typed::<Vec<f64>>().unwrap(), vec![9.0]);
    }

    #[test]
    fn test_array_drops_items_without_value() {
        let out = run(
            &TypeDescriptor::array_of(TypeDescriptor::Boolean),
            json!(["yes", "maybe", 0]),
            false,
        )
        .unwrap()
        .unwrap();
        assert_eq!(out.into_typed::<Vec<bool>>().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_strict_item_failure_propagates() {
        let err = run(
            &TypeDescriptor::array_of(TypeDescriptor::Boolean),
            json!(["yes", "maybe"]),
            true,
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::ConversionError { .. }));
    }

    #[test]
    fn test_set_removes_duplicates() {
        let out = run(
            &TypeDescriptor::set_of(TypeDescriptor::String),
            json!(["a", "b", "a"]),
            false,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            out.into_typed::<Vec<String>>().unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_map_from_object_and_pairs() {
        let desc = TypeDescriptor::map_of(TypeDescriptor::Number);
        let from_object = run(&desc, json!({"x": "1", "y": 2}), false).unwrap().unwrap();
        let map = from_object
            .into_typed::<std::collections::BTreeMap<String, f64>>()
            .unwrap();
        assert_eq!(map.get("x"), Some(&1.0));
        assert_eq!(map.get("y"), Some(&2.0));

        let from_pairs = run(&desc, json!([["a", 3], ["b", "0x4"]]), false).unwrap().unwrap();
        let map = from_pairs
            .into_typed::<std::collections::BTreeMap<String, f64>>()
            .unwrap();
        assert_eq!(map.get("b"), Some(&4.0));
    }

    #[test]
    fn test_array_of_array_composes() {
        let desc = TypeDescriptor::array_of(TypeDescriptor::array_of(TypeDescriptor::Number));
        let out = run(&desc, json!([[1, 2], ["3"]]), false).unwrap().unwrap();
        assert_eq!(
            out.into_typed::<Vec<Vec<f64>>>().unwrap(),
            vec![vec![1.0, 2.0], vec![3.0]]
        );
    }

    #[test]
    fn test_nested_marshaller_recurses() {
        #[derive(Debug)]
        struct Child;
        let desc = TypeDescriptor::array_of(TypeDescriptor::nested::<Child>());
        let out = run(&desc, json!([{"a": 1}, {"a": 2}]), false).unwrap().unwrap();
        let items = out.into_typed::<Vec<DecodedObject>>().unwrap();
        assert_eq!(items.len(), 2);
        let (name, raw) = items
            .into_iter()
            .next()
            .unwrap()
            .into_inner::<(String, Value)>()
            .unwrap();
        assert_eq!(name, "Child");
        assert_eq!(raw, json!({"a": 1}));
    }

    #[test]
    fn test_nested_rejects_scalar_in_strict_mode() {
        struct Child;
        assert!(run(&TypeDescriptor::nested::<Child>(), json!(3), true).is_err());
        assert!(run(&TypeDescriptor::nested::<Child>(), json!(3), false)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_untyped_passes_raw_through() {
        let registry = MarshallerRegistry::new();
        let ctx = MarshalContext::new(false, &NoNested);
        let out = registry.marshal(None, &json!([1, 2]), &ctx).unwrap().unwrap();
        assert!(matches!(out, DecodedValue::Raw(ref v) if v == &json!([1, 2])));
    }

    #[test]
    fn test_register_custom_scalar() {
        let registry = MarshallerRegistry::new();
        registry
            .register(
                TypeDescriptor::String,
                Arc::new(|value: &Value, _ctx: &MarshalContext<'_>| {
                    Ok(value.as_str().map(|s| DecodedValue::String(s.to_uppercase())))
                }),
            )
            .unwrap();
        let ctx = MarshalContext::new(false, &NoNested);
        let out = registry
            .marshal(Some(&TypeDescriptor::String), &json!("abc"), &ctx)
            .unwrap();
        assert_eq!(out.as_ref().and_then(|v| v.as_str()), Some("ABC"));
    }

    #[test]
    fn test_register_rejects_collections() {
        let registry = MarshallerRegistry::new();
        assert!(registry.register(TypeDescriptor::Array, raw_marshaller()).is_err());
    }

    #[test]
    fn test_invalid_collection_descriptor() {
        let desc = TypeDescriptor::collection(TypeDescriptor::Date, TypeDescriptor::Number);
        assert!(run(&desc, json!([1]), false).is_err());
    }
}
