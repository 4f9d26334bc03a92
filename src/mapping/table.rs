// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Per-type mapping configuration.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::core::error::{CodecError, Result};
use crate::core::value::DecodedObject;
use crate::mapping::entry::{MappingEntry, NotificationEntry, NotifierGroup};
use crate::mapping::hooks::{downcast_target, Hook, TypeLifecycleHooks};
use crate::mapping::lens::ParentLink;
use crate::schema::binding::SchemaBinding;
use crate::schema::descriptor::TypeKey;

pub(crate) type ConstructFn = Arc<dyn Fn() -> DecodedObject + Send + Sync>;
pub(crate) type ContextFn = Arc<dyn Fn(&mut dyn Any, &Value) -> Result<()> + Send + Sync>;
pub(crate) type SnapshotFn = Arc<dyn Fn(&dyn Any) -> Result<Value> + Send + Sync>;

/// How a fresh instance is produced when no factory supplies one.
#[derive(Clone, Default)]
pub struct Construction {
    bare: Option<ConstructFn>,
    constructor: Option<ConstructFn>,
    use_constructor: bool,
}

impl Construction {
    /// Allocate with `T::default()`.
    pub fn bare<T: Any + Send + Default>() -> Self {
        Self {
            bare: Some(Arc::new(|| DecodedObject::new(T::default()))),
            ..Self::default()
        }
    }

    /// Run `constructor` for every instance.
    pub fn constructor<T, F>(constructor: F) -> Self
    where
        T: Any + Send,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            bare: None,
            constructor: Some(Arc::new(move || DecodedObject::new(constructor()))),
            use_constructor: true,
        }
    }

    /// Check if the constructor strategy is selected.
    pub fn uses_constructor(&self) -> bool {
        self.use_constructor && self.constructor.is_some()
    }

    /// Check if any strategy is available.
    pub fn is_available(&self) -> bool {
        self.bare.is_some() || self.constructor.is_some()
    }

    fn merge(&mut self, other: Construction) {
        if other.bare.is_some() {
            self.bare = other.bare;
        }
        if other.constructor.is_some() {
            self.constructor = other.constructor;
            self.use_constructor = other.use_constructor;
        }
    }

    pub(crate) fn instantiate(&self, key: TypeKey) -> Result<DecodedObject> {
        let make = if self.use_constructor {
            self.constructor.as_ref().or(self.bare.as_ref())
        } else {
            self.bare.as_ref().or(self.constructor.as_ref())
        };
        make.map(|f| f())
            .ok_or_else(|| CodecError::invalid_mapping(key.short_name(), "no construction strategy"))
    }
}

impl fmt::Debug for Construction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Construction")
            .field("bare", &self.bare.is_some())
            .field("constructor", &self.constructor.is_some())
            .field("use_constructor", &self.use_constructor)
            .finish()
    }
}

/// Everything registered directly on one type.
///
/// Inherited configuration is not copied in; the decode engine walks
/// parent links instead.
#[derive(Clone)]
pub struct TypeMapping {
    key: TypeKey,
    parent: Option<ParentLink>,
    entries: Vec<MappingEntry>,
    notifiers: Vec<NotifierGroup>,
    hooks: TypeLifecycleHooks,
    construction: Construction,
    context: Option<ContextFn>,
    schema: Option<SchemaBinding>,
    snapshot: Option<SnapshotFn>,
}

impl TypeMapping {
    /// Create an empty mapping for `T`.
    pub fn new<T: Any>() -> Self {
        Self::for_key(TypeKey::of::<T>())
    }

    pub(crate) fn for_key(key: TypeKey) -> Self {
        Self {
            key,
            parent: None,
            entries: Vec::new(),
            notifiers: Vec::new(),
            hooks: TypeLifecycleHooks::default(),
            construction: Construction::default(),
            context: None,
            schema: None,
            snapshot: None,
        }
    }

    /// Type this mapping belongs to.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Declared parent.
    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    /// Field mappings in registration order.
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// Find a field mapping by target field name.
    pub fn entry(&self, key: &str) -> Option<&MappingEntry> {
        self.entries.iter().find(|e| e.key() == key)
    }

    /// Notifications grouped by path, in registration order.
    pub fn notifiers(&self) -> &[NotifierGroup] {
        &self.notifiers
    }

    /// Lifecycle hooks.
    pub fn hooks(&self) -> &TypeLifecycleHooks {
        &self.hooks
    }

    /// Construction strategy.
    pub fn construction(&self) -> &Construction {
        &self.construction
    }

    /// Schema binding declared directly on this type.
    pub fn schema(&self) -> Option<&SchemaBinding> {
        self.schema.as_ref()
    }

    /// Check if a context setter is declared.
    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    /// Check if a snapshot function is declared.
    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Add a field mapping, replacing one with the same key in place.
    ///
    /// A source path with no steps is rejected.
    pub fn insert_entry(&mut self, entry: MappingEntry) -> Result<()> {
        if entry.source_path().is_root() {
            return Err(CodecError::invalid_mapping(
                self.key.short_name(),
                "empty source path",
            ));
        }
        match self.entries.iter_mut().find(|e| e.key() == entry.key()) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        Ok(())
    }

    /// Append a notification to its path group.
    pub fn push_notifier(&mut self, entry: NotificationEntry) {
        let path = entry.path().as_str();
        match self.notifiers.iter_mut().find(|g| g.path == path) {
            Some(group) => group.entries.push(entry),
            None => self.notifiers.push(NotifierGroup {
                path: path.to_string(),
                entries: vec![entry],
            }),
        }
    }

    /// Install a hook, replacing any hook of the same kind.
    pub fn install_hook<T: Any>(&mut self, hook: Hook<T>) -> Result<()> {
        self.check_owner::<T>()?;
        self.hooks.install(hook);
        Ok(())
    }

    /// Declare the parent type.
    pub fn set_parent(&mut self, parent: ParentLink) -> Result<()> {
        if parent.key() == self.key {
            return Err(CodecError::invalid_mapping(
                self.key.short_name(),
                "a type cannot extend itself",
            ));
        }
        self.parent = Some(parent);
        Ok(())
    }

    /// Set or extend the construction strategy.
    pub fn set_construction(&mut self, construction: Construction) {
        self.construction.merge(construction);
    }

    /// Bind a schema, replacing any previous binding.
    pub fn set_schema(&mut self, binding: SchemaBinding) {
        self.schema = Some(binding);
    }

    /// Declare the context setter, called with the whole raw input.
    pub fn set_context<T, F>(&mut self, setter: F) -> Result<()>
    where
        T: Any,
        F: Fn(&mut T, &Value) + Send + Sync + 'static,
    {
        self.check_owner::<T>()?;
        self.context = Some(Arc::new(move |target: &mut dyn Any, raw: &Value| {
            setter(downcast_target::<T>(target)?, raw);
            Ok(())
        }));
        Ok(())
    }

    /// Declare how to read back an instance's current state.
    pub fn set_snapshot<T, F>(&mut self, snapshot: F) -> Result<()>
    where
        T: Any,
        F: Fn(&T) -> Result<Value> + Send + Sync + 'static,
    {
        self.check_owner::<T>()?;
        self.snapshot = Some(Arc::new(move |target: &dyn Any| {
            let typed = target.downcast_ref::<T>().ok_or_else(|| {
                CodecError::type_mismatch(TypeKey::of::<T>().short_name(), "unrelated instance")
            })?;
            snapshot(typed)
        }));
        Ok(())
    }

    /// Read back state through serde.
    pub fn set_serializable<T: Any + Serialize>(&mut self) -> Result<()> {
        self.set_snapshot(|value: &T| Ok(serde_json::to_value(value)?))
    }

    pub(crate) fn apply_context(&self, target: &mut dyn Any, raw: &Value) -> Result<()> {
        match &self.context {
            Some(context) => context(target, raw),
            None => Ok(()),
        }
    }

    pub(crate) fn take_snapshot(&self, target: &dyn Any) -> Option<Result<Value>> {
        self.snapshot.as_ref().map(|snapshot| snapshot(target))
    }

    fn check_owner<T: Any>(&self) -> Result<()> {
        if TypeKey::of::<T>() == self.key {
            Ok(())
        } else {
            Err(CodecError::invalid_mapping(
                self.key.short_name(),
                format!("configuration is typed for '{}'", TypeKey::of::<T>().short_name()),
            ))
        }
    }
}

impl fmt::Debug for TypeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMapping")
            .field("key", &self.key)
            .field("parent", &self.parent)
            .field("entries", &self.entries)
            .field("notifiers", &self.notifiers)
            .field("hooks", &self.hooks)
            .field("construction", &self.construction)
            .field("schema", &self.schema.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::entry::FieldSpec;

    #[derive(Default)]
    struct Item {
        name: String,
        base: Base,
    }

    #[derive(Default)]
    struct Base;

    #[test]
    fn test_insert_entry_replaces_in_place() {
        let mut mapping = TypeMapping::new::<Item>();
        mapping
            .insert_entry(MappingEntry::new("name", "a".into(), |i: &mut Item, v: String| {
                i.name = v
            }))
            .unwrap();
        mapping
            .insert_entry(MappingEntry::new("other", "b".into(), |i: &mut Item, v: String| {
                i.name = v
            }))
            .unwrap();
        mapping
            .insert_entry(MappingEntry::new(
                "name",
                FieldSpec::new("c"),
                |i: &mut Item, v: String| i.name = v,
            ))
            .unwrap();

        let keys: Vec<_> = mapping.entries().iter().map(|e| e.key()).collect();
        assert_eq!(keys, vec!["name", "other"]);
        assert_eq!(mapping.entry("name").unwrap().source_path().as_str(), "c");
    }

    #[test]
    fn test_insert_entry_rejects_empty_path() {
        let mut mapping = TypeMapping::new::<Item>();
        for path in ["", "..", "@"] {
            let err = mapping
                .insert_entry(MappingEntry::new("name", path.into(), |i: &mut Item, v: String| {
                    i.name = v
                }))
                .unwrap_err();
            assert!(matches!(err, CodecError::InvalidMapping { .. }));
            assert!(err.to_string().contains("empty source path"));
        }
        assert!(mapping.entries().is_empty());
    }

    #[test]
    fn test_notifiers_group_by_path() {
        let mut mapping = TypeMapping::new::<Item>();
        for path in ["a", "b", "a"] {
            mapping.push_notifier(NotificationEntry::new(
                path,
                None,
                |_: &mut Item, _: Value, _: &Value| Ok(()),
            ));
        }
        let groups: Vec<_> = mapping
            .notifiers()
            .iter()
            .map(|g| (g.path(), g.entries().len()))
            .collect();
        assert_eq!(groups, vec![("a", 2), ("b", 1)]);
    }

    #[test]
    fn test_construction_prefers_selected_strategy() {
        let mut construction = Construction::bare::<Item>();
        assert!(!construction.uses_constructor());
        construction.merge(Construction::constructor(|| Item {
            name: "built".into(),
            ..Item::default()
        }));
        assert!(construction.uses_constructor());

        let obj = construction.instantiate(TypeKey::of::<Item>()).unwrap();
        assert_eq!(obj.downcast_ref::<Item>().unwrap().name, "built");
    }

    #[test]
    fn test_missing_construction_is_reported() {
        let construction = Construction::default();
        assert!(!construction.is_available());
        let err = construction.instantiate(TypeKey::of::<Item>()).unwrap_err();
        assert!(matches!(err, CodecError::InvalidMapping { .. }));
    }

    #[test]
    fn test_rejects_self_parent_and_foreign_config() {
        let mut mapping = TypeMapping::new::<Item>();
        assert!(mapping
            .set_parent(ParentLink::new(|i: &mut Item| i))
            .is_err());
        assert!(mapping
            .set_parent(ParentLink::new(|i: &mut Item| &mut i.base))
            .is_ok());
        assert!(mapping.set_context(|_: &mut Base, _: &Value| {}).is_err());
    }
}
