// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Raw-value access and conversion.
//!
//! - [`path`] - Key-path resolution against raw input
//! - [`scalar`] - Literal grammars for scalar conversions
//! - [`marshal`] - Marshaller registry and container composition

pub mod marshal;
pub mod path;
pub mod scalar;

pub use marshal::{MarshalContext, Marshaller, MarshallerRegistry, NestedDecoder};
pub use path::{resolve, KeyPath, PathStep};
