// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Type descriptors and schema validation.
//!
//! This module provides:
//! - [`TypeDescriptor`] - Conversion targets for mapped fields
//! - [`SchemaBinding`] - JSON Schema documents bound to types
//! - [`SchemaValidator`] - Validation with structured, templated errors

pub mod binding;
pub mod descriptor;
pub mod error;
pub mod message;
pub mod validator;

pub use binding::{SchemaBinding, SchemaRef};
pub use descriptor::{CollectionKind, TypeDescriptor, TypeKey};
pub use error::{ValidationError, ValidationIssue, POST_DECODE_MESSAGE};
pub use validator::{CompiledSchema, SchemaValidator};
