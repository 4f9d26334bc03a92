// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for mapcodec.
//!
//! Provides the error taxonomy of the decode engine:
//! - Malformed textual input
//! - Input of the wrong shape
//! - Strict-mode conversion failures
//! - Aggregated schema validation failures
//! - Registry and mapping configuration problems

use std::fmt;

use crate::schema::error::ValidationError;

/// Errors that can occur while decoding.
#[derive(Debug, Clone)]
pub enum CodecError {
    /// Malformed textual input
    ParseError {
        /// What was being parsed
        context: String,
        /// Error message
        message: String,
    },

    /// Input is not a container where one was required
    TypeError {
        /// Expected shape
        expected: String,
        /// Shape actually found
        found: String,
    },

    /// A strict-mode marshaller could not convert a value
    ConversionError {
        /// Requested target type
        target: String,
        /// Offending value, rendered as JSON
        value: String,
    },

    /// One or more schema violations
    Validation(ValidationError),

    /// Schema binding could not be compiled
    InvalidSchema {
        /// Type or schema identifier
        schema_name: String,
        /// Compilation error message
        reason: String,
    },

    /// Type has no registered mapping configuration
    TypeNotFound {
        /// Type name that was not found
        type_name: String,
    },

    /// Decoded object is not of the requested type
    TypeMismatch {
        /// Requested type
        expected: String,
        /// Runtime type of the decoded object
        actual: String,
    },

    /// Registration produced an unusable mapping
    InvalidMapping {
        /// Type the mapping belongs to
        type_name: String,
        /// Why the mapping is rejected
        reason: String,
    },

    /// Other error
    Other(String),
}

impl CodecError {
    /// Create a parse error.
    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        CodecError::ParseError {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a type (shape) error.
    pub fn type_error(expected: impl Into<String>, found: impl Into<String>) -> Self {
        CodecError::TypeError {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a conversion error for `value` targeting `target`.
    pub fn conversion(target: impl Into<String>, value: &serde_json::Value) -> Self {
        CodecError::ConversionError {
            target: target.into(),
            value: value.to_string(),
        }
    }

    /// Create an invalid schema error.
    pub fn invalid_schema(schema_name: impl Into<String>, reason: impl Into<String>) -> Self {
        CodecError::InvalidSchema {
            schema_name: schema_name.into(),
            reason: reason.into(),
        }
    }

    /// Create a "type not found" error.
    pub fn type_not_found(type_name: impl Into<String>) -> Self {
        CodecError::TypeNotFound {
            type_name: type_name.into(),
        }
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        CodecError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an invalid mapping error.
    pub fn invalid_mapping(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        CodecError::InvalidMapping {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Check if this is a schema validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, CodecError::Validation(_))
    }

    /// Borrow the aggregated validation error, if any.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            CodecError::Validation(err) => Some(err),
            _ => None,
        }
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            CodecError::ParseError { context, message } => {
                vec![("context", context.clone()), ("message", message.clone())]
            }
            CodecError::TypeError { expected, found } => {
                vec![("expected", expected.clone()), ("found", found.clone())]
            }
            CodecError::ConversionError { target, value } => {
                vec![("target", target.clone()), ("value", value.clone())]
            }
            CodecError::Validation(err) => vec![
                ("message", err.message().to_string()),
                ("errors", err.errors().len().to_string()),
            ],
            CodecError::InvalidSchema {
                schema_name,
                reason,
            } => vec![("schema", schema_name.clone()), ("reason", reason.clone())],
            CodecError::TypeNotFound { type_name } => vec![("type", type_name.clone())],
            CodecError::TypeMismatch { expected, actual } => vec![
                ("expected", expected.clone()),
                ("actual", actual.clone()),
            ],
            CodecError::InvalidMapping { type_name, reason } => {
                vec![("type", type_name.clone()), ("reason", reason.clone())]
            }
            CodecError::Other(msg) => vec![("message", msg.clone())],
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::ParseError { context, message } => {
                write!(f, "Parse error in {context}: {message}")
            }
            CodecError::TypeError { expected, found } => {
                write!(f, "Type error: expected {expected}, found {found}")
            }
            CodecError::ConversionError { target, value } => {
                write!(f, "Cannot convert {value} to {target}")
            }
            CodecError::Validation(err) => write!(f, "{err}"),
            CodecError::InvalidSchema {
                schema_name,
                reason,
            } => {
                write!(f, "Invalid schema '{schema_name}': {reason}")
            }
            CodecError::TypeNotFound { type_name } => {
                write!(f, "Type not found: '{type_name}'")
            }
            CodecError::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: expected '{expected}', decoded '{actual}'")
            }
            CodecError::InvalidMapping { type_name, reason } => {
                write!(f, "Invalid mapping for '{type_name}': {reason}")
            }
            CodecError::Other(msg) => write!(f, "Other error: {msg}"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for CodecError {
    fn from(err: ValidationError) -> Self {
        CodecError::Validation(err)
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::parse("json", err.to_string())
    }
}

impl From<toml::de::Error> for CodecError {
    fn from(err: toml::de::Error) -> Self {
        CodecError::parse("toml", err.to_string())
    }
}

/// Result type for mapcodec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Short description of a JSON value's shape, used in error messages.
pub(crate) fn shape_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
