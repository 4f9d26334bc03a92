// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Lifecycle hooks run by the decode engine.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::core::error::{CodecError, Result};
use crate::core::value::DecodedObject;
use crate::schema::descriptor::TypeKey;

/// Result of a factory hook.
#[derive(Debug)]
pub enum FactoryOutcome {
    /// Decode into this object; its runtime type drives the rest of the decode
    Created(DecodedObject),
    /// Fall back to the type's construction strategy
    UseDefault,
    /// Abort the decode and yield no object
    Invalid,
}

impl FactoryOutcome {
    /// Wrap a concrete instance.
    pub fn created<T: Any + Send>(value: T) -> Self {
        FactoryOutcome::Created(DecodedObject::new(value))
    }
}

/// Result of a pre-decode hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep decoding
    Continue,
    /// Abort the decode and yield no object
    Invalidate,
}

/// Result of a completion hook.
#[derive(Debug)]
pub enum Completion {
    /// Keep the current instance
    Keep,
    /// Replace the instance for later hooks and the final result
    Replace(DecodedObject),
    /// Abort the decode and yield no object
    Invalid,
}

impl Completion {
    /// Replace the working instance with `value`.
    pub fn replace<T: Any + Send>(value: T) -> Self {
        Completion::Replace(DecodedObject::new(value))
    }

    /// `Keep` when `valid`, `Invalid` otherwise.
    pub fn check(valid: bool) -> Self {
        if valid {
            Completion::Keep
        } else {
            Completion::Invalid
        }
    }
}

/// A typed hook, as handed to the registry.
pub enum Hook<T> {
    /// Builds the decode target from raw input
    Factory(Box<dyn Fn(&Value) -> Result<FactoryOutcome> + Send + Sync>),
    /// Runs when the ancestry walk reaches the type, before its fields
    PreDecode(Box<dyn Fn(&mut T, &Value) -> Result<Flow> + Send + Sync>),
    /// Runs after all fields and notifiers
    Completion(Box<dyn Fn(&mut T, &Value) -> Result<Completion> + Send + Sync>),
}

impl<T> fmt::Debug for Hook<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Factory(_) => f.write_str("Hook::Factory(<fn>)"),
            Hook::PreDecode(_) => f.write_str("Hook::PreDecode(<fn>)"),
            Hook::Completion(_) => f.write_str("Hook::Completion(<fn>)"),
        }
    }
}

pub(crate) type FactoryFn = Arc<dyn Fn(&Value) -> Result<FactoryOutcome> + Send + Sync>;
pub(crate) type PreDecodeFn = Arc<dyn Fn(&mut dyn Any, &Value) -> Result<Flow> + Send + Sync>;
pub(crate) type CompletionFn =
    Arc<dyn Fn(&mut dyn Any, &Value) -> Result<Completion> + Send + Sync>;

/// Per-type lifecycle hooks.
#[derive(Clone, Default)]
pub struct TypeLifecycleHooks {
    pub(crate) factory: Option<FactoryFn>,
    pub(crate) pre_decode: Option<PreDecodeFn>,
    pub(crate) completion: Option<CompletionFn>,
}

impl TypeLifecycleHooks {
    /// Check if a factory hook is declared.
    pub fn has_factory(&self) -> bool {
        self.factory.is_some()
    }

    /// Check if a pre-decode hook is declared.
    pub fn has_pre_decode(&self) -> bool {
        self.pre_decode.is_some()
    }

    /// Check if a completion hook is declared.
    pub fn has_completion(&self) -> bool {
        self.completion.is_some()
    }

    pub(crate) fn install<T: Any>(&mut self, hook: Hook<T>) {
        match hook {
            Hook::Factory(f) => self.factory = Some(Arc::from(f)),
            Hook::PreDecode(f) => {
                self.pre_decode = Some(Arc::new(move |target: &mut dyn Any, raw: &Value| {
                    f(downcast_target::<T>(target)?, raw)
                }))
            }
            Hook::Completion(f) => {
                self.completion = Some(Arc::new(move |target: &mut dyn Any, raw: &Value| {
                    f(downcast_target::<T>(target)?, raw)
                }))
            }
        }
    }
}

impl fmt::Debug for TypeLifecycleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeLifecycleHooks")
            .field("factory", &self.has_factory())
            .field("pre_decode", &self.has_pre_decode())
            .field("completion", &self.has_completion())
            .finish()
    }
}

pub(crate) fn downcast_target<T: Any>(target: &mut dyn Any) -> Result<&mut T> {
    target
        .downcast_mut::<T>()
        .ok_or_else(|| CodecError::type_mismatch(TypeKey::of::<T>().short_name(), "unrelated instance"))
}
