// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout mapcodec.
//!
//! This module provides the foundational types for the library:
//! - [`CodecError`] - Error handling
//! - [`DecodedValue`] - Marshalled value representation
//! - [`TypeRegistry`] - Registry of type mappings

pub mod error;
pub mod registry;
pub mod value;

pub use error::{CodecError, Result};
pub use registry::{global_registry, Ancestry, AncestryLevel, TypeRegistry};
pub use value::{DecodedObject, DecodedValue, FromDecoded, Nested};
