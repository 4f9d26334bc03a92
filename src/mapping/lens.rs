// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Parent-type projections.
//!
//! A derived type embeds its base type as a field and registers a lens that
//! borrows that field. The decode engine applies every ancestor's mappings
//! through the composed lenses, base first.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::schema::descriptor::TypeKey;

/// Projection from a derived instance to its embedded base.
pub trait Project: Send + Sync {
    /// Borrow the base part of `value`, `None` if `value` is not the derived type.
    fn project<'a>(&self, value: &'a mut dyn Any) -> Option<&'a mut dyn Any>;
}

/// Field lens from `D` to `B`.
pub struct FieldLens<D, B> {
    get: fn(&mut D) -> &mut B,
}

impl<D, B> FieldLens<D, B> {
    /// Create a lens from an accessor such as `|d: &mut Derived| &mut d.base`.
    pub fn new(get: fn(&mut D) -> &mut B) -> Self {
        Self { get }
    }
}

impl<D: Any, B: Any> Project for FieldLens<D, B> {
    fn project<'a>(&self, value: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        let derived = value.downcast_mut::<D>()?;
        Some((self.get)(derived))
    }
}

/// Declared parent of a type.
#[derive(Clone)]
pub struct ParentLink {
    pub(crate) key: TypeKey,
    pub(crate) lens: Arc<dyn Project>,
}

impl ParentLink {
    /// Link `D` to its base `B`.
    pub fn new<D: Any, B: Any>(get: fn(&mut D) -> &mut B) -> Self {
        Self {
            key: TypeKey::of::<B>(),
            lens: Arc::new(FieldLens::new(get)),
        }
    }

    /// The parent type.
    pub fn key(&self) -> TypeKey {
        self.key
    }
}

impl fmt::Debug for ParentLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ParentLink").field(&self.key).finish()
    }
}

/// Apply `lenses` in order, starting from `value`.
pub(crate) fn project_through<'a>(
    lenses: &[Arc<dyn Project>],
    value: &'a mut dyn Any,
) -> Option<&'a mut dyn Any> {
    let mut current = value;
    for lens in lenses {
        current = lens.project(current)?;
    }
    Some(current)
}
