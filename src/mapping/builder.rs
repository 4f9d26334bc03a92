// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Fluent registration of a decodable type.
//!
//! # Example
//!
//! ```no_run
//! use mapcodec::{global_registry, Decoder, FieldSpec, TypeBuilder, TypeDescriptor};
//!
//! #[derive(Default)]
//! struct Item {
//!     name: String,
//!     index: Vec<f64>,
//! }
//!
//! TypeBuilder::<Item>::new()
//!     .field("name", FieldSpec::new("name").of(TypeDescriptor::String), |t, v: String| {
//!         t.name = v
//!     })
//!     .field(
//!         "index",
//!         FieldSpec::new("i").of(TypeDescriptor::array_of(TypeDescriptor::Number)),
//!         |t, v: Vec<f64>| t.index = v,
//!     )
//!     .register(&global_registry())?;
//!
//! let decoder = Decoder::new(global_registry());
//! let item: Option<Item> = decoder.decode_str(r#"{"name": "a", "i": 3}"#)?;
//! # Ok::<(), mapcodec::CodecError>(())
//! ```

use std::any::Any;
use std::marker::PhantomData;

use serde::Serialize;
use serde_json::Value;

use crate::core::error::Result;
use crate::core::registry::TypeRegistry;
use crate::core::value::FromDecoded;
use crate::mapping::entry::{FieldSpec, MappingEntry, NotificationEntry};
use crate::mapping::hooks::{Completion, FactoryOutcome, Flow, Hook};
use crate::mapping::lens::ParentLink;
use crate::mapping::table::{Construction, TypeMapping};
use crate::schema::binding::SchemaBinding;
use crate::schema::descriptor::TypeDescriptor;

/// Builder collecting a [`TypeMapping`] for `T`.
///
/// Errors from typed configuration are deferred until [`register`](Self::register).
pub struct TypeBuilder<T> {
    mapping: TypeMapping,
    error: Option<crate::core::error::CodecError>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send> TypeBuilder<T> {
    /// Start a mapping whose instances are allocated with `T::default()`.
    pub fn new() -> Self
    where
        T: Default,
    {
        let mut builder = Self::bare();
        builder.mapping.set_construction(Construction::bare::<T>());
        builder
    }

    /// Start a mapping with no construction strategy.
    ///
    /// Such a type needs a factory hook or a constructor.
    pub fn bare() -> Self {
        Self {
            mapping: TypeMapping::new::<T>(),
            error: None,
            _marker: PhantomData,
        }
    }

    /// Build instances with `constructor` instead of bare allocation.
    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.mapping
            .set_construction(Construction::constructor(constructor));
        self
    }

    /// Declare `B` as the parent type, embedded at the field `get` borrows.
    pub fn extends<B: Any>(mut self, get: fn(&mut T) -> &mut B) -> Self {
        let result = self.mapping.set_parent(ParentLink::new(get));
        self.record(result)
    }

    /// Map field `key` from `spec`.
    pub fn field<V, F>(mut self, key: &str, spec: impl Into<FieldSpec>, setter: F) -> Self
    where
        V: FromDecoded + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let result = self
            .mapping
            .insert_entry(MappingEntry::new(key, spec.into(), setter));
        self.record(result)
    }

    /// Call `handler` with the value found at `path`.
    pub fn notify<V, F>(mut self, path: &str, target_type: Option<TypeDescriptor>, handler: F) -> Self
    where
        V: FromDecoded + 'static,
        F: Fn(&mut T, V, &Value) -> Result<()> + Send + Sync + 'static,
    {
        self.mapping
            .push_notifier(NotificationEntry::new(path, target_type, handler));
        self
    }

    /// Build the decode target from raw input.
    pub fn factory<F>(self, factory: F) -> Self
    where
        F: Fn(&Value) -> Result<FactoryOutcome> + Send + Sync + 'static,
    {
        self.hook(Hook::Factory(Box::new(factory)))
    }

    /// Run `hook` before this type's fields are assigned.
    pub fn before_decode<F>(self, hook: F) -> Self
    where
        F: Fn(&mut T, &Value) -> Result<Flow> + Send + Sync + 'static,
    {
        self.hook(Hook::PreDecode(Box::new(hook)))
    }

    /// Run `hook` once all fields and notifiers are applied.
    pub fn after_decode<F>(self, hook: F) -> Self
    where
        F: Fn(&mut T, &Value) -> Result<Completion> + Send + Sync + 'static,
    {
        self.hook(Hook::Completion(Box::new(hook)))
    }

    /// Install a typed hook.
    pub fn hook(mut self, hook: Hook<T>) -> Self {
        let result = self.mapping.install_hook(hook);
        self.record(result)
    }

    /// Receive the whole raw input before fields are assigned.
    pub fn context<F>(mut self, setter: F) -> Self
    where
        F: Fn(&mut T, &Value) + Send + Sync + 'static,
    {
        let result = self.mapping.set_context(setter);
        self.record(result)
    }

    /// Validate raw input against `binding` before decoding.
    pub fn schema(mut self, binding: SchemaBinding) -> Self {
        self.mapping.set_schema(binding);
        self
    }

    /// Read back current state with `snapshot`.
    pub fn snapshot<F>(mut self, snapshot: F) -> Self
    where
        F: Fn(&T) -> Result<Value> + Send + Sync + 'static,
    {
        let result = self.mapping.set_snapshot(snapshot);
        self.record(result)
    }

    /// Read back current state through serde.
    pub fn serializable(mut self) -> Self
    where
        T: Serialize,
    {
        let result = self.mapping.set_serializable::<T>();
        self.record(result)
    }

    /// Finish without registering.
    pub fn build(self) -> Result<TypeMapping> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.mapping),
        }
    }

    /// Register the mapping, replacing any previous configuration of `T`.
    pub fn register(self, registry: &TypeRegistry) -> Result<()> {
        registry.register_mapping(self.build()?)
    }

    fn record(mut self, result: Result<()>) -> Self {
        if let Err(err) = result {
            self.error.get_or_insert(err);
        }
        self
    }
}

impl<T: Any + Send + Default> Default for TypeBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
