// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Declarative mapping configuration.
//!
//! A [`TypeMapping`] records, for one type, where each field comes from in the
//! raw input, what it converts to, which lifecycle hooks run, which schema
//! guards it, and which type it extends. [`TypeBuilder`] assembles one
//! fluently.

pub mod builder;
pub mod entry;
pub mod hooks;
pub mod lens;
pub mod table;

pub use builder::TypeBuilder;
pub use entry::{FieldSpec, MappingEntry, NotificationEntry, NotifierGroup, Transform};
pub use hooks::{Completion, FactoryOutcome, Flow, Hook, TypeLifecycleHooks};
pub use lens::{FieldLens, ParentLink, Project};
pub use table::{Construction, TypeMapping};
