// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Mapcodec
//!
//! Declarative decoding of JSON object graphs into Rust types.
//!
//! Each decodable type registers a mapping: where each field is read from in
//! the raw input, what it converts to, which lifecycle hooks run, which JSON
//! Schema guards it, and which base type it extends.
//!
//! ## Architecture
//!
//! - `core/` - Errors, decoded values, and the type registry
//! - `encoding/` - Key paths, literal grammars, and the marshaller registry
//! - `mapping/` - Per-type mapping configuration and the fluent builder
//! - `schema/` - Type descriptors, schema bindings, and validation
//! - `decode/` - The decode lifecycle engine and its options
//!
//! ## Example: Decoding with inheritance
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use mapcodec::{Decoder, FieldSpec, TypeBuilder, TypeDescriptor, TypeRegistry};
//!
//! #[derive(Default)]
//! struct Entity {
//!     id: u64,
//! }
//!
//! #[derive(Default)]
//! struct User {
//!     entity: Entity,
//!     name: String,
//! }
//!
//! let registry = Arc::new(TypeRegistry::new());
//! TypeBuilder::<Entity>::new()
//!     .field("id", FieldSpec::new("id").of(TypeDescriptor::Number), |e, v: u64| e.id = v)
//!     .register(&registry)?;
//! TypeBuilder::<User>::new()
//!     .extends(|u: &mut User| &mut u.entity)
//!     .field("name", FieldSpec::new("profile.name").of(TypeDescriptor::String), |u, v: String| {
//!         u.name = v
//!     })
//!     .register(&registry)?;
//!
//! let decoder = Decoder::new(registry);
//! let user: Option<User> = decoder.decode_str(r#"{"id": 7, "profile": {"name": "ada"}}"#)?;
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

pub use core::{
    global_registry, CodecError, DecodedObject, DecodedValue, FromDecoded, Nested, Result,
    TypeRegistry,
};

// Raw-value access and conversion
pub mod encoding;

pub use encoding::{KeyPath, MarshalContext, Marshaller, MarshallerRegistry};

// Mapping configuration
pub mod mapping;

pub use mapping::{
    Completion, Construction, FactoryOutcome, FieldSpec, Flow, Hook, MappingEntry,
    NotificationEntry, TypeBuilder, TypeMapping,
};

// Type descriptors and validation
pub mod schema;

pub use schema::{
    SchemaBinding, SchemaRef, TypeDescriptor, TypeKey, ValidationError, ValidationIssue,
};

// Decode engine
pub mod decode;

pub use decode::{Decoder, DecoderOptions, SchemaDraft};
