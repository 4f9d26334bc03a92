// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Decode lifecycle engine.
//!
//! A decode runs strictly in order:
//!
//! 1. Input shape check
//! 2. Object creation (factory hook or construction strategy)
//! 3. Schema validation against the nearest binding
//! 4. Context injection
//! 5. Per level, base first: pre-decode hook, then field mappings
//! 6. Notification handlers of every level
//! 7. Completion hooks, base first
//!
//! Factory, pre-decode and completion hooks can invalidate the decode, which
//! then yields `Ok(None)`.

use std::any::Any;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::core::error::{shape_of, CodecError, Result};
use crate::core::registry::{Ancestry, TypeRegistry};
use crate::core::value::{DecodedObject, DecodedValue};
use crate::decode::options::DecoderOptions;
use crate::encoding::marshal::{MarshalContext, MarshallerRegistry, NestedDecoder};
use crate::mapping::hooks::{Completion, FactoryOutcome, Flow};
use crate::mapping::table::TypeMapping;
use crate::schema::descriptor::TypeKey;
use crate::schema::error::ValidationError;
use crate::schema::validator::SchemaValidator;

/// Decodes raw JSON into registered types.
///
/// A decoder only reads the registry, so one decoder can serve many threads.
pub struct Decoder {
    registry: Arc<TypeRegistry>,
    marshallers: Arc<MarshallerRegistry>,
    schemas: SchemaValidator,
    options: DecoderOptions,
}

impl Decoder {
    /// Create a decoder with default options.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self::with_options(registry, DecoderOptions::default())
    }

    /// Create a decoder with `options`.
    pub fn with_options(registry: Arc<TypeRegistry>, options: DecoderOptions) -> Self {
        Self {
            registry,
            marshallers: Arc::new(MarshallerRegistry::new()),
            schemas: SchemaValidator::new(options.draft, options.cache_validators),
            options,
        }
    }

    /// Use a shared marshaller registry.
    pub fn with_marshallers(mut self, marshallers: Arc<MarshallerRegistry>) -> Self {
        self.marshallers = marshallers;
        self
    }

    /// The type registry.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// The marshaller registry.
    pub fn marshallers(&self) -> &MarshallerRegistry {
        &self.marshallers
    }

    /// Active options.
    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Decode `input` as a `T`.
    ///
    /// Fails with a type mismatch if a factory produced another type; use
    /// [`decode_dyn`](Self::decode_dyn) for polymorphic targets.
    pub fn decode<T: Any>(&self, input: &Value) -> Result<Option<T>> {
        self.decode_dyn(TypeKey::of::<T>(), input)?
            .map(DecodedObject::into_inner::<T>)
            .transpose()
    }

    /// Parse `text` as JSON and decode it as a `T`.
    pub fn decode_str<T: Any>(&self, text: &str) -> Result<Option<T>> {
        self.decode(&parse_input(text)?)
    }

    /// Decode every element of an array input as a `T`.
    pub fn decode_array<T: Any>(&self, input: &Value) -> Result<Vec<T>> {
        self.decode_array_dyn(TypeKey::of::<T>(), input)?
            .into_iter()
            .map(DecodedObject::into_inner::<T>)
            .collect()
    }

    /// Parse `text` as a JSON array and decode every element as a `T`.
    pub fn decode_array_str<T: Any>(&self, text: &str) -> Result<Vec<T>> {
        self.decode_array(&parse_input(text)?)
    }

    /// Decode every element of an array input as `key`.
    ///
    /// Elements that are not objects or arrays, and elements whose decode is
    /// invalidated, are left out of the result.
    pub fn decode_array_dyn(&self, key: TypeKey, input: &Value) -> Result<Vec<DecodedObject>> {
        let Value::Array(elements) = input else {
            return Err(CodecError::type_error("array", shape_of(input)));
        };

        let mut decoded = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            if !(element.is_object() || element.is_array()) {
                debug!(
                    type_name = key.short_name(),
                    index,
                    found = shape_of(element),
                    "Skipping array element that is not an object"
                );
                continue;
            }
            match self.decode_dyn(key, element)? {
                Some(instance) => decoded.push(instance),
                None => trace!(type_name = key.short_name(), index, "Array element invalidated"),
            }
        }
        Ok(decoded)
    }

    /// Decode `input` as the registered type `key`.
    pub fn decode_dyn(&self, key: TypeKey, input: &Value) -> Result<Option<DecodedObject>> {
        if !(input.is_object() || input.is_array()) {
            return Err(CodecError::type_error("object or array", shape_of(input)));
        }

        let mapping = self
            .registry
            .mapping(key)?
            .ok_or_else(|| CodecError::type_not_found(key.name()))?;

        let Some(mut instance) = self.instantiate(&mapping, input)? else {
            debug!(type_name = key.short_name(), "Factory invalidated decode");
            return Ok(None);
        };
        let runtime = instance.key();
        if runtime != key {
            debug!(
                requested = key.short_name(),
                runtime = runtime.short_name(),
                "Factory produced a different type"
            );
        }

        let ancestry = self.registry.ancestry(runtime)?;

        if self.options.validate_schemas {
            self.schemas.validate(&self.registry, runtime, input)?;
        }

        let ctx = MarshalContext::new(self.options.strict, self);

        for level in ancestry.levels() {
            if level.mapping().has_context() {
                let view = view_of(level.key(), &ancestry, &mut instance)?;
                level.mapping().apply_context(view, input)?;
            }
        }

        // Phase A: pre-decode hooks and field mappings, base first.
        for level in ancestry.levels() {
            let mapping = level.mapping();
            let view = view_of(level.key(), &ancestry, &mut instance)?;

            if let Some(pre_decode) = &mapping.hooks().pre_decode {
                if pre_decode(&mut *view, input)? == Flow::Invalidate {
                    debug!(
                        type_name = runtime.short_name(),
                        level = level.key().short_name(),
                        "Pre-decode hook invalidated decode"
                    );
                    return Ok(None);
                }
            }

            for entry in mapping.entries() {
                let Some(raw) = entry.source_path().resolve(input) else {
                    continue;
                };
                let Some(value) = self.marshallers.marshal(entry.target_type(), &raw, &ctx)? else {
                    trace!(field = entry.key(), path = %entry.source_path(), "No value for field");
                    continue;
                };
                let value = entry.apply_transform(value, input)?;
                let unparsed = is_nan(&value);
                if let Err(err) = entry.assign(&mut *view, value) {
                    if !self.lenient_nan(unparsed, &err) {
                        return Err(err);
                    }
                    trace!(
                        field = entry.key(),
                        path = %entry.source_path(),
                        "Unparsable number skipped"
                    );
                }
            }
        }

        // Phase B: notification handlers, after every field is assigned.
        for level in ancestry.levels() {
            let view = view_of(level.key(), &ancestry, &mut instance)?;
            for group in level.mapping().notifiers() {
                for notifier in group.entries() {
                    let Some(raw) = notifier.path().resolve(input) else {
                        continue;
                    };
                    if let Some(value) =
                        self.marshallers
                            .marshal(notifier.target_type(), &raw, &ctx)?
                    {
                        let unparsed = is_nan(&value);
                        if let Err(err) = notifier.notify(&mut *view, value, input) {
                            if !self.lenient_nan(unparsed, &err) {
                                return Err(err);
                            }
                            trace!(path = %notifier.path(), "Unparsable number skipped");
                        }
                    }
                }
            }
        }

        self.complete(instance, &ancestry, input)
    }

    /// Validate `input` against the schema bound to `key` or its nearest ancestor.
    pub fn validate(&self, key: TypeKey, input: &Value) -> Result<()> {
        self.schemas.validate(&self.registry, key, input)
    }

    /// Read back the current state of a decoded instance.
    ///
    /// `Ok(None)` when its type declares no snapshot.
    pub fn current_state(&self, instance: &DecodedObject) -> Result<Option<Value>> {
        let mapping = self
            .registry
            .mapping(instance.key())?
            .ok_or_else(|| CodecError::type_not_found(instance.key().name()))?;
        mapping.take_snapshot(instance.as_any()).transpose()
    }

    // Lenient marshalling yields NaN for unparsable numbers; a target that
    // cannot hold NaN treats it as no value.
    fn lenient_nan(&self, unparsed: bool, err: &CodecError) -> bool {
        unparsed && !self.options.strict && matches!(err, CodecError::ConversionError { .. })
    }

    fn instantiate(&self, mapping: &TypeMapping, input: &Value) -> Result<Option<DecodedObject>> {
        if let Some(factory) = &mapping.hooks().factory {
            match factory(input)? {
                FactoryOutcome::Created(instance) => return Ok(Some(instance)),
                FactoryOutcome::Invalid => return Ok(None),
                FactoryOutcome::UseDefault => {}
            }
        }
        mapping.construction().instantiate(mapping.key()).map(Some)
    }

    // Phase C: completion hooks, base first. A replacement instance is seen by
    // later hooks through its own ancestry.
    fn complete(
        &self,
        mut instance: DecodedObject,
        ancestry: &Arc<Ancestry>,
        input: &Value,
    ) -> Result<Option<DecodedObject>> {
        let mut chain = Some(ancestry.clone());

        for level in ancestry.levels() {
            let Some(completion) = level.mapping().hooks().completion.clone() else {
                continue;
            };
            let Some(view) = level_view(level.key(), chain.as_deref(), &mut instance) else {
                warn!(
                    level = level.key().short_name(),
                    runtime = instance.key().short_name(),
                    "Skipping completion hook for a replaced instance of an unrelated type"
                );
                continue;
            };

            let outcome = match completion(view, input) {
                Ok(outcome) => outcome,
                Err(CodecError::Validation(original)) => {
                    return Err(ValidationError::post_decode(input.clone(), original).into());
                }
                Err(other) => return Err(other),
            };

            match outcome {
                Completion::Keep => {}
                Completion::Invalid => {
                    debug!(
                        level = level.key().short_name(),
                        "Completion hook invalidated decode"
                    );
                    return Ok(None);
                }
                Completion::Replace(next) => {
                    trace!(
                        level = level.key().short_name(),
                        replacement = next.key().short_name(),
                        "Completion hook replaced instance"
                    );
                    chain = if self.registry.contains(next.key())? {
                        Some(self.registry.ancestry(next.key())?)
                    } else {
                        None
                    };
                    instance = next;
                }
            }
        }

        Ok(Some(instance))
    }
}

impl NestedDecoder for Decoder {
    fn decode_nested(&self, key: TypeKey, value: &Value) -> Result<Option<DecodedObject>> {
        self.decode_dyn(key, value)
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn is_nan(value: &DecodedValue) -> bool {
    matches!(value, DecodedValue::Number(n) if n.is_nan())
}

fn parse_input(text: &str) -> Result<Value> {
    Ok(serde_json::from_str(text)?)
}

fn view_of<'a>(
    level: TypeKey,
    ancestry: &Ancestry,
    instance: &'a mut DecodedObject,
) -> Result<&'a mut dyn Any> {
    let runtime = instance.key();
    level_view(level, Some(ancestry), instance)
        .ok_or_else(|| CodecError::type_mismatch(level.short_name(), runtime.short_name()))
}

fn level_view<'a>(
    level: TypeKey,
    chain: Option<&Ancestry>,
    instance: &'a mut DecodedObject,
) -> Option<&'a mut dyn Any> {
    if instance.key() == level {
        return Some(instance.as_any_mut());
    }
    chain?.level(level)?.view(instance.as_any_mut())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::builder::TypeBuilder;
    use crate::mapping::entry::FieldSpec;
    use crate::schema::descriptor::TypeDescriptor;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq)]
    struct Point {
        x: f64,
        y: f64,
    }

    fn point_decoder() -> Decoder {
        let registry = Arc::new(TypeRegistry::new());
        TypeBuilder::<Point>::new()
            .field("x", FieldSpec::new("x").of(TypeDescriptor::Number), |p, v: f64| p.x = v)
            .field("y", FieldSpec::new("y").of(TypeDescriptor::Number), |p, v: f64| p.y = v)
            .register(&registry)
            .unwrap();
        Decoder::new(registry)
    }

    #[test]
    fn test_decode_assigns_fields() {
        let decoder = point_decoder();
        let point: Point = decoder.decode(&json!({"x": 1, "y": "2.5"})).unwrap().unwrap();
        assert_eq!(point, Point { x: 1.0, y: 2.5 });
    }

    #[test]
    fn test_decode_rejects_scalar_input() {
        let decoder = point_decoder();
        let err = decoder.decode::<Point>(&json!(5)).unwrap_err();
        assert!(matches!(err, CodecError::TypeError { .. }));
    }

    #[test]
    fn test_decode_str_reports_parse_error() {
        let decoder = point_decoder();
        let err = decoder.decode_str::<Point>("{not json").unwrap_err();
        assert!(matches!(err, CodecError::ParseError { .. }));
    }

    #[test]
    fn test_unregistered_type() {
        let decoder = point_decoder();
        let err = decoder.decode::<String>(&json!({})).unwrap_err();
        assert!(matches!(err, CodecError::TypeNotFound { .. }));
    }

    #[test]
    fn test_decode_array_skips_bad_elements() {
        let decoder = point_decoder();
        let points: Vec<Point> = decoder
            .decode_array(&json!([{"x": 1}, 3, null, {"y": 2}]))
            .unwrap();
        assert_eq!(points, vec![Point { x: 1.0, y: 0.0 }, Point { x: 0.0, y: 2.0 }]);
    }

    #[test]
    fn test_decode_array_requires_array() {
        let decoder = point_decoder();
        let err = decoder.decode_array::<Point>(&json!({"x": 1})).unwrap_err();
        assert!(matches!(err, CodecError::TypeError { .. }));
    }

    #[test]
    fn test_level_view_for_runtime_type() {
        let mut instance = DecodedObject::new(Point::default());
        assert!(level_view(TypeKey::of::<Point>(), None, &mut instance).is_some());
        assert!(level_view(TypeKey::of::<String>(), None, &mut instance).is_none());
    }
}
