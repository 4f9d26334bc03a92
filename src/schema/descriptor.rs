// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Target type descriptors.
//!
//! A [`TypeDescriptor`] names the type a raw value should be marshalled to:
//! a scalar, a container, a nested decodable type, or a container whose
//! items are themselves described recursively.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable identity of a Rust type known to the registry.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Underlying type id.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path.
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        match base.rfind("::") {
            Some(idx) => &self.name[idx + 2..],
            None => self.name,
        }
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeKey").field(&self.name).finish()
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Container kinds that can wrap an item marshaller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    /// Ordered sequence
    Array,
    /// Sequence without duplicates
    Set,
    /// String-keyed entries
    Map,
}

impl CollectionKind {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Array => "Array",
            CollectionKind::Set => "Set",
            CollectionKind::Map => "Map",
        }
    }
}

/// Requested target type of a field or notifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    /// `true`/`false`
    Boolean,
    /// 64-bit float
    Number,
    /// UTF-8 text
    String,
    /// Raw object with unknown layout
    Object,
    /// UTC timestamp
    Date,
    /// Absolute URL
    Url,
    /// Array of raw values
    Array,
    /// Set of raw values
    Set,
    /// Map of raw values
    Map,
    /// A registered decodable type
    Nested(TypeKey),
    /// Container whose items have their own descriptor
    Collection {
        /// Container kind; always `Array`, `Set` or `Map`
        collection: Box<TypeDescriptor>,
        /// Item descriptor
        element: Box<TypeDescriptor>,
    },
}

impl TypeDescriptor {
    /// Descriptor for a nested decodable type.
    pub fn nested<T: Any>() -> Self {
        TypeDescriptor::Nested(TypeKey::of::<T>())
    }

    /// Array of `element`.
    pub fn array_of(element: TypeDescriptor) -> Self {
        Self::collection(TypeDescriptor::Array, element)
    }

    /// Set of `element`.
    pub fn set_of(element: TypeDescriptor) -> Self {
        Self::collection(TypeDescriptor::Set, element)
    }

    /// Map of `element`.
    pub fn map_of(element: TypeDescriptor) -> Self {
        Self::collection(TypeDescriptor::Map, element)
    }

    /// Generic collection descriptor.
    pub fn collection(collection: TypeDescriptor, element: TypeDescriptor) -> Self {
        TypeDescriptor::Collection {
            collection: Box::new(collection),
            element: Box::new(element),
        }
    }

    /// Container kind, for container descriptors.
    pub fn collection_kind(&self) -> Option<CollectionKind> {
        match self {
            TypeDescriptor::Array => Some(CollectionKind::Array),
            TypeDescriptor::Set => Some(CollectionKind::Set),
            TypeDescriptor::Map => Some(CollectionKind::Map),
            TypeDescriptor::Collection { collection, .. } => collection.collection_kind(),
            _ => None,
        }
    }

    /// Check if values of this type are containers.
    pub fn is_collection(&self) -> bool {
        self.collection_kind().is_some()
    }

    /// Innermost non-container descriptor.
    pub fn innermost(&self) -> &TypeDescriptor {
        match self {
            TypeDescriptor::Collection { element, .. } => element.innermost(),
            other => other,
        }
    }

    /// Check the nesting rules: a `Collection` wraps only container kinds.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            TypeDescriptor::Collection {
                collection,
                element,
            } => {
                if !matches!(
                    **collection,
                    TypeDescriptor::Array | TypeDescriptor::Set | TypeDescriptor::Map
                ) {
                    return Err(format!("{collection} cannot hold items"));
                }
                element.validate()
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Boolean => f.write_str("Boolean"),
            TypeDescriptor::Number => f.write_str("Number"),
            TypeDescriptor::String => f.write_str("String"),
            TypeDescriptor::Object => f.write_str("Object"),
            TypeDescriptor::Date => f.write_str("Date"),
            TypeDescriptor::Url => f.write_str("URL"),
            TypeDescriptor::Array => f.write_str("Array"),
            TypeDescriptor::Set => f.write_str("Set"),
            TypeDescriptor::Map => f.write_str("Map"),
            TypeDescriptor::Nested(key) => write!(f, "{key}"),
            TypeDescriptor::Collection {
                collection,
                element,
            } => write!(f, "{collection}<{element}>"),
        }
    }
}
