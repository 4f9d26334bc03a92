// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Thread-safe registry of type mappings.
//!
//! Mappings are stored per type and shared as `Arc` snapshots, so a decode
//! never holds the registry lock while it runs user code. Ancestry chains are
//! computed lazily from parent links and cached until the next registration.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, RwLock};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::error::{CodecError, Result};
use super::value::FromDecoded;
use crate::mapping::entry::{FieldSpec, MappingEntry, NotificationEntry};
use crate::mapping::hooks::Hook;
use crate::mapping::lens::{project_through, ParentLink, Project};
use crate::mapping::table::{Construction, TypeMapping};
use crate::schema::binding::SchemaBinding;
use crate::schema::descriptor::{TypeDescriptor, TypeKey};

/// One level of an ancestry chain.
#[derive(Clone)]
pub struct AncestryLevel {
    mapping: Arc<TypeMapping>,
    lenses: Vec<Arc<dyn Project>>,
}

impl AncestryLevel {
    /// Mapping declared on this level's type.
    pub fn mapping(&self) -> &Arc<TypeMapping> {
        &self.mapping
    }

    /// Type of this level.
    pub fn key(&self) -> TypeKey {
        self.mapping.key()
    }

    /// Borrow the part of `instance` that belongs to this level.
    pub fn view<'a>(&self, instance: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        project_through(&self.lenses, instance)
    }
}

impl std::fmt::Debug for AncestryLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AncestryLevel")
            .field("key", &self.key())
            .field("depth", &self.lenses.len())
            .finish()
    }
}

/// Ancestry of a type, root-most ancestor first.
#[derive(Debug, Clone)]
pub struct Ancestry {
    levels: Vec<AncestryLevel>,
}

impl Ancestry {
    /// Levels from the root-most ancestor to the type itself.
    pub fn levels(&self) -> &[AncestryLevel] {
        &self.levels
    }

    /// Find the level of `key`.
    pub fn level(&self, key: TypeKey) -> Option<&AncestryLevel> {
        self.levels.iter().find(|level| level.key() == key)
    }

    /// Nearest schema binding, searching from the type towards its ancestors.
    pub fn nearest_schema(&self) -> Option<(TypeKey, &SchemaBinding)> {
        self.levels
            .iter()
            .rev()
            .find_map(|level| level.mapping.schema().map(|binding| (level.key(), binding)))
    }
}

/// Thread-safe registry of type mappings.
///
/// Uses RwLock for concurrent read access with exclusive write access.
/// Registration is expected to happen before concurrent decoding begins.
pub struct TypeRegistry {
    inner: RwLock<HashMap<TypeKey, Arc<TypeMapping>>>,
    ancestry: RwLock<HashMap<TypeKey, Arc<Ancestry>>>,
}

impl TypeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            ancestry: RwLock::new(HashMap::new()),
        }
    }

    /// Register a complete mapping, replacing any previous one for its type.
    pub fn register_mapping(&self, mapping: TypeMapping) -> Result<()> {
        let key = mapping.key();
        {
            let mut inner = self.write_types()?;
            inner.insert(key, Arc::new(mapping));
        }
        debug!(type_name = key.short_name(), "Registered type mapping");
        self.invalidate_ancestry()
    }

    /// Register `T`, allocating instances with `T::default()`.
    pub fn register_type<T: Any + Send + Default>(&self) -> Result<()> {
        self.update::<T>(|mapping| {
            mapping.set_construction(Construction::bare::<T>());
            Ok(())
        })
    }

    /// Register `T` with a constructor, selecting the constructor strategy.
    pub fn register_constructor<T, F>(&self, constructor: F) -> Result<()>
    where
        T: Any + Send,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.update::<T>(|mapping| {
            mapping.set_construction(Construction::constructor(constructor));
            Ok(())
        })
    }

    /// Add or replace the field mapping `key` of `T`.
    pub fn register_field<T, V, F>(&self, key: &str, spec: impl Into<FieldSpec>, setter: F) -> Result<()>
    where
        T: Any,
        V: FromDecoded + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let entry = MappingEntry::new(key, spec.into(), setter);
        self.update::<T>(|mapping| mapping.insert_entry(entry))
    }

    /// Append a notification on `path` to `T`.
    pub fn register_notifier<T, V, F>(
        &self,
        path: &str,
        target_type: Option<TypeDescriptor>,
        handler: F,
    ) -> Result<()>
    where
        T: Any,
        V: FromDecoded + 'static,
        F: Fn(&mut T, V, &Value) -> Result<()> + Send + Sync + 'static,
    {
        let entry = NotificationEntry::new(path, target_type, handler);
        self.update::<T>(|mapping| {
            mapping.push_notifier(entry);
            Ok(())
        })
    }

    /// Install a lifecycle hook on `T`.
    pub fn register_hook<T: Any>(&self, hook: Hook<T>) -> Result<()> {
        self.update::<T>(|mapping| mapping.install_hook(hook))
    }

    /// Bind a schema to `T`.
    pub fn register_schema<T: Any>(&self, binding: SchemaBinding) -> Result<()> {
        self.update::<T>(|mapping| {
            mapping.set_schema(binding);
            Ok(())
        })
    }

    /// Declare `B` as the parent of `T`.
    pub fn register_parent<T: Any, B: Any>(&self, get: fn(&mut T) -> &mut B) -> Result<()> {
        self.update::<T>(|mapping| mapping.set_parent(ParentLink::new(get)))
    }

    /// Declare the context setter of `T`.
    pub fn register_context<T, F>(&self, setter: F) -> Result<()>
    where
        T: Any,
        F: Fn(&mut T, &Value) + Send + Sync + 'static,
    {
        self.update::<T>(|mapping| mapping.set_context(setter))
    }

    /// Declare how to read back the state of a `T`.
    pub fn register_snapshot<T, F>(&self, snapshot: F) -> Result<()>
    where
        T: Any,
        F: Fn(&T) -> Result<Value> + Send + Sync + 'static,
    {
        self.update::<T>(|mapping| mapping.set_snapshot(snapshot))
    }

    /// Read back the state of a `T` through serde.
    pub fn register_serializable<T: Any + Serialize>(&self) -> Result<()> {
        self.update::<T>(|mapping| mapping.set_serializable::<T>())
    }

    /// Edit the mapping of `T`, creating it on first use.
    pub fn update<T: Any>(&self, edit: impl FnOnce(&mut TypeMapping) -> Result<()>) -> Result<()> {
        let key = TypeKey::of::<T>();
        {
            let mut inner = self.write_types()?;
            let mapping = inner
                .entry(key)
                .or_insert_with(|| Arc::new(TypeMapping::for_key(key)));
            edit(Arc::make_mut(mapping))?;
        }
        self.invalidate_ancestry()
    }

    /// Get the mapping declared directly on `key`.
    pub fn mapping(&self, key: TypeKey) -> Result<Option<Arc<TypeMapping>>> {
        Ok(self.read_types()?.get(&key).cloned())
    }

    /// Check if `key` is registered.
    pub fn contains(&self, key: TypeKey) -> Result<bool> {
        Ok(self.read_types()?.contains_key(&key))
    }

    /// Get all registered type names.
    pub fn names(&self) -> Result<Vec<&'static str>> {
        Ok(self.read_types()?.keys().map(TypeKey::name).collect())
    }

    /// Remove a mapping from the registry.
    pub fn remove(&self, key: TypeKey) -> Result<bool> {
        let removed = self.write_types()?.remove(&key).is_some();
        self.invalidate_ancestry()?;
        Ok(removed)
    }

    /// Clear all mappings from the registry.
    pub fn clear(&self) -> Result<()> {
        self.write_types()?.clear();
        self.invalidate_ancestry()
    }

    /// Get the number of registered types.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read_types()?.len())
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Ancestry of `key`, root-most ancestor first.
    pub fn ancestry(&self, key: TypeKey) -> Result<Arc<Ancestry>> {
        if let Some(cached) = self
            .ancestry
            .read()
            .map_err(|e| CodecError::Other(format!("Ancestry cache lock poisoned: {e}")))?
            .get(&key)
        {
            return Ok(cached.clone());
        }

        let built = Arc::new(self.build_ancestry(key)?);
        self.ancestry
            .write()
            .map_err(|e| CodecError::Other(format!("Ancestry cache lock poisoned: {e}")))?
            .insert(key, built.clone());
        Ok(built)
    }

    /// Nearest schema binding of `key` and the type that declares it.
    pub fn schema_binding(&self, key: TypeKey) -> Result<Option<(TypeKey, SchemaBinding)>> {
        let ancestry = self.ancestry(key)?;
        Ok(ancestry
            .nearest_schema()
            .map(|(owner, binding)| (owner, binding.clone())))
    }

    fn build_ancestry(&self, key: TypeKey) -> Result<Ancestry> {
        let types = self.read_types()?;
        let mut levels = Vec::new();
        let mut lenses: Vec<Arc<dyn Project>> = Vec::new();
        let mut seen = HashSet::new();
        let mut current = key;

        loop {
            if !seen.insert(current) {
                return Err(CodecError::invalid_mapping(
                    key.short_name(),
                    format!("cyclic parent chain through '{}'", current.short_name()),
                ));
            }
            let mapping = types
                .get(&current)
                .cloned()
                .ok_or_else(|| CodecError::type_not_found(current.name()))?;
            let parent = mapping.parent().cloned();
            levels.push(AncestryLevel {
                mapping,
                lenses: lenses.clone(),
            });
            match parent {
                Some(link) => {
                    lenses.push(link.lens);
                    current = link.key;
                }
                None => break,
            }
        }

        levels.reverse();
        Ok(Ancestry { levels })
    }

    fn invalidate_ancestry(&self) -> Result<()> {
        self.ancestry
            .write()
            .map_err(|e| CodecError::Other(format!("Ancestry cache lock poisoned: {e}")))?
            .clear();
        Ok(())
    }

    fn read_types(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<TypeKey, Arc<TypeMapping>>>> {
        self.inner
            .read()
            .map_err(|e| CodecError::Other(format!("Registry lock poisoned: {e}")))
    }

    fn write_types(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<TypeKey, Arc<TypeMapping>>>> {
        self.inner
            .write()
            .map_err(|e| CodecError::Other(format!("Registry lock poisoned: {e}")))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.inner.read().map(|types| types.len()).unwrap_or(0);
        f.debug_struct("TypeRegistry").field("types", &len).finish()
    }
}

/// Process-wide registry shared by default decoders.
pub fn global_registry() -> Arc<TypeRegistry> {
    static GLOBAL: OnceLock<Arc<TypeRegistry>> = OnceLock::new();
    GLOBAL.get_or_init(|| Arc::new(TypeRegistry::new())).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Root {
        id: u32,
    }

    #[derive(Default)]
    struct Middle {
        root: Root,
        label: String,
    }

    #[derive(Default)]
    struct Leaf {
        middle: Middle,
    }

    #[test]
    fn test_lazy_mapping_creation() {
        let registry = TypeRegistry::new();
        assert!(registry.is_empty().unwrap());

        registry
            .register_field("id", "id", |r: &mut Root, v: u32| r.id = v)
            .unwrap();
        let mapping = registry.mapping(TypeKey::of::<Root>()).unwrap().unwrap();
        assert_eq!(mapping.entries().len(), 1);
        assert!(!mapping.construction().is_available());

        registry.register_type::<Root>().unwrap();
        let mapping = registry.mapping(TypeKey::of::<Root>()).unwrap().unwrap();
        assert_eq!(mapping.entries().len(), 1);
        assert!(mapping.construction().is_available());
    }

    #[test]
    fn test_ancestry_orders_root_first() {
        let registry = TypeRegistry::new();
        registry.register_type::<Root>().unwrap();
        registry.register_type::<Middle>().unwrap();
        registry.register_type::<Leaf>().unwrap();
        registry
            .register_parent(|m: &mut Middle| &mut m.root)
            .unwrap();
        registry
            .register_parent(|l: &mut Leaf| &mut l.middle)
            .unwrap();

        let ancestry = registry.ancestry(TypeKey::of::<Leaf>()).unwrap();
        let keys: Vec<_> = ancestry.levels().iter().map(|l| l.key()).collect();
        assert_eq!(
            keys,
            vec![
                TypeKey::of::<Root>(),
                TypeKey::of::<Middle>(),
                TypeKey::of::<Leaf>()
            ]
        );

        let mut leaf = Leaf::default();
        let root_view = ancestry.levels()[0].view(&mut leaf).unwrap();
        root_view.downcast_mut::<Root>().unwrap().id = 9;
        assert_eq!(leaf.middle.root.id, 9);
    }

    #[test]
    fn test_ancestry_cache_invalidated_on_registration() {
        let registry = TypeRegistry::new();
        registry.register_type::<Root>().unwrap();
        registry.register_type::<Middle>().unwrap();
        assert_eq!(
            registry
                .ancestry(TypeKey::of::<Middle>())
                .unwrap()
                .levels()
                .len(),
            1
        );

        registry
            .register_parent(|m: &mut Middle| &mut m.root)
            .unwrap();
        assert_eq!(
            registry
                .ancestry(TypeKey::of::<Middle>())
                .unwrap()
                .levels()
                .len(),
            2
        );
    }

    #[test]
    fn test_unregistered_parent_is_reported() {
        let registry = TypeRegistry::new();
        registry
            .register_parent(|m: &mut Middle| &mut m.root)
            .unwrap();
        let err = registry.ancestry(TypeKey::of::<Middle>()).unwrap_err();
        assert!(matches!(err, CodecError::TypeNotFound { .. }));
    }

    #[test]
    fn test_nearest_schema_prefers_derived() {
        let registry = TypeRegistry::new();
        registry.register_type::<Root>().unwrap();
        registry.register_type::<Middle>().unwrap();
        registry
            .register_parent(|m: &mut Middle| &mut m.root)
            .unwrap();
        registry
            .register_schema::<Root>(SchemaBinding::new(json!({"$id": "root"})))
            .unwrap();

        let (owner, _) = registry
            .schema_binding(TypeKey::of::<Middle>())
            .unwrap()
            .unwrap();
        assert_eq!(owner, TypeKey::of::<Root>());

        registry
            .register_schema::<Middle>(SchemaBinding::new(json!({"$id": "middle"})))
            .unwrap();
        let (owner, binding) = registry
            .schema_binding(TypeKey::of::<Middle>())
            .unwrap()
            .unwrap();
        assert_eq!(owner, TypeKey::of::<Middle>());
        assert_eq!(binding.id(), Some("middle"));
    }

    #[test]
    fn test_register_mapping_replaces() {
        let registry = TypeRegistry::new();
        registry
            .register_field("label", "a", |m: &mut Middle, v: String| m.label = v)
            .unwrap();
        registry
            .register_mapping(TypeMapping::new::<Middle>())
            .unwrap();
        let mapping = registry.mapping(TypeKey::of::<Middle>()).unwrap().unwrap();
        assert!(mapping.entries().is_empty());
        assert_eq!(registry.names().unwrap().len(), 1);
        assert!(registry.remove(TypeKey::of::<Middle>()).unwrap());
        assert!(registry.is_empty().unwrap());
    }
}
