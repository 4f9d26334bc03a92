// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Structured schema validation errors.
//!
//! A failed validation is reported as one [`ValidationError`] carrying the
//! source input and the complete, ordered list of [`ValidationIssue`]s found.

use serde_json::Value;

/// Message used when a completion hook rejects the decoded object.
pub const POST_DECODE_MESSAGE: &str = "failed post decode";

/// A single structural problem found in the input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationIssue {
    /// A required property is absent.
    #[error("{message}")]
    MissingProperty {
        /// Dotted path of the missing property
        path: String,
        /// Name of the missing property
        property: String,
        /// Human-readable message
        message: String,
    },

    /// A property is present that the schema does not allow.
    #[error("{message}")]
    UnsupportedProperty {
        /// Dotted path of the extra property
        path: String,
        /// Name of the extra property
        property: String,
        /// Human-readable message
        message: String,
    },

    /// A value does not satisfy its schema.
    #[error("{message}")]
    InvalidValue {
        /// Dotted path of the value
        path: String,
        /// Name of the property holding the value
        property: String,
        /// Offending value, taken from the input
        value: Value,
        /// Human-readable message
        message: String,
    },

    /// A whole validation error nested inside another one.
    #[error(transparent)]
    Aggregate(Box<ValidationError>),
}

impl ValidationIssue {
    /// Missing property with the default message.
    pub fn missing_property(path: impl Into<String>, property: impl Into<String>) -> Self {
        let path = path.into();
        let property = property.into();
        let message = format!(
            "{} is missing required property '{property}'",
            owner_label(parent_path(&path))
        );
        ValidationIssue::MissingProperty {
            path,
            property,
            message,
        }
    }

    /// Unsupported property with the default message.
    pub fn unsupported_property(path: impl Into<String>, property: impl Into<String>) -> Self {
        let path = path.into();
        let property = property.into();
        let message = format!(
            "{} does not support property '{property}'",
            owner_label(parent_path(&path))
        );
        ValidationIssue::UnsupportedProperty {
            path,
            property,
            message,
        }
    }

    /// Invalid value with an explicit message.
    pub fn invalid_value(path: impl Into<String>, value: Value, message: impl Into<String>) -> Self {
        let path = path.into();
        let property = last_segment(&path).to_string();
        ValidationIssue::InvalidValue {
            path,
            property,
            value,
            message: message.into(),
        }
    }

    /// Replace the human-readable message.
    pub fn with_message(mut self, text: impl Into<String>) -> Self {
        match &mut self {
            ValidationIssue::MissingProperty { message, .. }
            | ValidationIssue::UnsupportedProperty { message, .. }
            | ValidationIssue::InvalidValue { message, .. } => *message = text.into(),
            ValidationIssue::Aggregate(_) => {}
        }
        self
    }

    /// Dotted property path; empty for the root object.
    pub fn path(&self) -> &str {
        match self {
            ValidationIssue::MissingProperty { path, .. }
            | ValidationIssue::UnsupportedProperty { path, .. }
            | ValidationIssue::InvalidValue { path, .. } => path,
            ValidationIssue::Aggregate(_) => "",
        }
    }

    /// Property name, independent of its path.
    pub fn property(&self) -> &str {
        match self {
            ValidationIssue::MissingProperty { property, .. }
            | ValidationIssue::UnsupportedProperty { property, .. }
            | ValidationIssue::InvalidValue { property, .. } => property,
            ValidationIssue::Aggregate(_) => "",
        }
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        match self {
            ValidationIssue::MissingProperty { message, .. }
            | ValidationIssue::UnsupportedProperty { message, .. }
            | ValidationIssue::InvalidValue { message, .. } => message,
            ValidationIssue::Aggregate(err) => err.message(),
        }
    }

    /// Check if this is a missing-property issue.
    pub fn is_missing_property(&self) -> bool {
        matches!(self, ValidationIssue::MissingProperty { .. })
    }

    /// Check if this is an unsupported-property issue.
    pub fn is_unsupported_property(&self) -> bool {
        matches!(self, ValidationIssue::UnsupportedProperty { .. })
    }

    /// Check if this is an invalid-value issue.
    pub fn is_invalid_value(&self) -> bool {
        matches!(self, ValidationIssue::InvalidValue { .. })
    }
}

/// Aggregate of every validation issue found in one input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}{}", render_issues(.errors))]
pub struct ValidationError {
    message: String,
    input: Value,
    errors: Vec<ValidationIssue>,
}

impl ValidationError {
    /// Create a validation error over `input`.
    pub fn new(message: impl Into<String>, input: Value, errors: Vec<ValidationIssue>) -> Self {
        Self {
            message: message.into(),
            input,
            errors,
        }
    }

    /// Wrap an error raised by a completion hook.
    pub fn post_decode(input: Value, original: ValidationError) -> Self {
        Self::new(
            POST_DECODE_MESSAGE,
            input,
            vec![ValidationIssue::Aggregate(Box::new(original))],
        )
    }

    /// Summary message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The input that failed validation.
    pub fn input(&self) -> &Value {
        &self.input
    }

    /// Individual issues, in the order they were found.
    pub fn errors(&self) -> &[ValidationIssue] {
        &self.errors
    }
}

fn render_issues(errors: &[ValidationIssue]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    format!(": {}", parts.join("; "))
}

pub(crate) fn parent_path(path: &str) -> &str {
    match path.rfind('.') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

pub(crate) fn last_segment(path: &str) -> &str {
    match path.rfind('.') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Label for the object at `path`; the root is called "object".
pub(crate) fn owner_label(path: &str) -> String {
    if path.is_empty() {
        "object".to_string()
    } else {
        format!("'{path}'")
    }
}
