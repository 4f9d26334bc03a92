// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Decoding raw input into registered types.

pub mod engine;
pub mod options;

pub use engine::Decoder;
pub use options::{DecoderOptions, SchemaDraft};
