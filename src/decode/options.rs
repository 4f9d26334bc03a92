// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Decoder configuration.

use std::path::Path;

use serde::Deserialize;

use crate::core::error::{CodecError, Result};

/// JSON Schema draft used to compile bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaDraft {
    /// Draft 4
    Draft4,
    /// Draft 6
    Draft6,
    /// Draft 7
    #[default]
    Draft7,
    /// Draft 2019-09
    Draft201909,
    /// Draft 2020-12
    Draft202012,
}

impl From<SchemaDraft> for jsonschema::Draft {
    fn from(draft: SchemaDraft) -> Self {
        match draft {
            SchemaDraft::Draft4 => jsonschema::Draft::Draft4,
            SchemaDraft::Draft6 => jsonschema::Draft::Draft6,
            SchemaDraft::Draft7 => jsonschema::Draft::Draft7,
            SchemaDraft::Draft201909 => jsonschema::Draft::Draft201909,
            SchemaDraft::Draft202012 => jsonschema::Draft::Draft202012,
        }
    }
}

/// Options controlling a [`Decoder`](crate::Decoder).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DecoderOptions {
    /// Raise conversion errors instead of yielding no value
    pub strict: bool,

    /// Validate raw input against schema bindings
    pub validate_schemas: bool,

    /// Draft used to compile schema bindings
    pub draft: SchemaDraft,

    /// Keep compiled validators between decodes
    pub cache_validators: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            strict: false,
            validate_schemas: true,
            draft: SchemaDraft::Draft7,
            cache_validators: true,
        }
    }
}

impl DecoderOptions {
    /// Parse options from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load options from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CodecError::parse(path.display().to_string(), format!("cannot read: {e}"))
        })?;
        Self::from_toml_str(&text)
    }

    /// Set strict conversion.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Enable or disable schema validation.
    pub fn with_schema_validation(mut self, enabled: bool) -> Self {
        self.validate_schemas = enabled;
        self
    }

    /// Select the schema draft.
    pub fn with_draft(mut self, draft: SchemaDraft) -> Self {
        self.draft = draft;
        self
    }

    /// Enable or disable the compiled-validator cache.
    pub fn with_validator_cache(mut self, enabled: bool) -> Self {
        self.cache_validators = enabled;
        self
    }
}
