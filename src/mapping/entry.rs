// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Field mappings and notification entries.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::core::error::Result;
use crate::core::value::{DecodedValue, FromDecoded};
use crate::encoding::path::KeyPath;
use crate::mapping::hooks::downcast_target;
use crate::schema::descriptor::TypeDescriptor;

/// Post-marshal transform applied to a field value.
///
/// Receives the marshalled value and the whole raw input.
pub type Transform = Arc<dyn Fn(DecodedValue, &Value) -> Result<DecodedValue> + Send + Sync>;

pub(crate) type Setter = Arc<dyn Fn(&mut dyn Any, DecodedValue) -> Result<()> + Send + Sync>;
pub(crate) type Handler =
    Arc<dyn Fn(&mut dyn Any, DecodedValue, &Value) -> Result<()> + Send + Sync>;

/// Where a field comes from and how it is converted.
#[derive(Clone)]
pub struct FieldSpec {
    path: KeyPath,
    target_type: Option<TypeDescriptor>,
    transform: Option<Transform>,
}

impl FieldSpec {
    /// Read the field from `path` without conversion.
    pub fn new(path: &str) -> Self {
        Self {
            path: KeyPath::parse(path),
            target_type: None,
            transform: None,
        }
    }

    /// Convert the raw value to `descriptor`.
    pub fn of(mut self, descriptor: TypeDescriptor) -> Self {
        self.target_type = Some(descriptor);
        self
    }

    /// Run `transform` after conversion.
    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(DecodedValue, &Value) -> Result<DecodedValue> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Source path.
    pub fn path(&self) -> &KeyPath {
        &self.path
    }

    /// Declared target type.
    pub fn target_type(&self) -> Option<&TypeDescriptor> {
        self.target_type.as_ref()
    }
}

impl From<&str> for FieldSpec {
    fn from(path: &str) -> Self {
        FieldSpec::new(path)
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("path", &self.path.as_str())
            .field("target_type", &self.target_type)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// One field mapping of a type.
#[derive(Clone)]
pub struct MappingEntry {
    key: String,
    spec: FieldSpec,
    setter: Setter,
}

impl MappingEntry {
    /// Create an entry assigning into field `key` of a `T`.
    pub fn new<T, V, F>(key: impl Into<String>, spec: FieldSpec, setter: F) -> Self
    where
        T: Any,
        V: FromDecoded,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let setter: Setter = Arc::new(move |target: &mut dyn Any, value: DecodedValue| {
            let typed = V::from_decoded(value)?;
            setter(downcast_target::<T>(target)?, typed);
            Ok(())
        });
        Self {
            key: key.into(),
            spec,
            setter,
        }
    }

    /// Target field name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Source path.
    pub fn source_path(&self) -> &KeyPath {
        &self.spec.path
    }

    /// Declared target type.
    pub fn target_type(&self) -> Option<&TypeDescriptor> {
        self.spec.target_type.as_ref()
    }

    /// Check if a transform is declared.
    pub fn has_transform(&self) -> bool {
        self.spec.transform.is_some()
    }

    pub(crate) fn apply_transform(&self, value: DecodedValue, raw: &Value) -> Result<DecodedValue> {
        match &self.spec.transform {
            Some(transform) => transform(value, raw),
            None => Ok(value),
        }
    }

    pub(crate) fn assign(&self, target: &mut dyn Any, value: DecodedValue) -> Result<()> {
        (self.setter)(target, value)
    }
}

impl fmt::Debug for MappingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingEntry")
            .field("key", &self.key)
            .field("spec", &self.spec)
            .finish()
    }
}

/// Handler invoked with the value found at a path.
#[derive(Clone)]
pub struct NotificationEntry {
    path: KeyPath,
    target_type: Option<TypeDescriptor>,
    handler: Handler,
}

impl NotificationEntry {
    /// Create a notification on `path` for a `T`.
    pub fn new<T, V, F>(path: &str, target_type: Option<TypeDescriptor>, handler: F) -> Self
    where
        T: Any,
        V: FromDecoded,
        F: Fn(&mut T, V, &Value) -> Result<()> + Send + Sync + 'static,
    {
        let handler: Handler =
            Arc::new(move |target: &mut dyn Any, value: DecodedValue, raw: &Value| {
                let typed = V::from_decoded(value)?;
                handler(downcast_target::<T>(target)?, typed, raw)
            });
        Self {
            path: KeyPath::parse(path),
            target_type,
            handler,
        }
    }

    /// Watched path.
    pub fn path(&self) -> &KeyPath {
        &self.path
    }

    /// Declared value type.
    pub fn target_type(&self) -> Option<&TypeDescriptor> {
        self.target_type.as_ref()
    }

    pub(crate) fn notify(&self, target: &mut dyn Any, value: DecodedValue, raw: &Value) -> Result<()> {
        (self.handler)(target, value, raw)
    }
}

impl fmt::Debug for NotificationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationEntry")
            .field("path", &self.path.as_str())
            .field("target_type", &self.target_type)
            .finish()
    }
}

/// Notifications registered on one path, in registration order.
#[derive(Debug, Clone)]
pub struct NotifierGroup {
    pub(crate) path: String,
    pub(crate) entries: Vec<NotificationEntry>,
}

impl NotifierGroup {
    /// Watched path text.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Entries on this path.
    pub fn entries(&self) -> &[NotificationEntry] {
        &self.entries
    }
}
