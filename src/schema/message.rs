// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Custom validation messages.
//!
//! A schema object may carry an `errorMessage` keyword. A string applies to
//! every failing keyword of that object; an object maps keyword names to
//! messages. Templates use `{{param}}` tokens:
//!
//! - `property` - dotted path of the failing value, or `object` at the root
//! - `keyword` - the failing keyword
//! - `missingProperty`, `additionalProperty` - the property involved
//! - `value` - the failing value
//!
//! Parameter values other than `property` are quoted as `'x'`. Unknown
//! tokens are left as written.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

/// Keyword carrying custom messages.
pub const ERROR_MESSAGE_KEYWORD: &str = "errorMessage";

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("valid token pattern"))
}

/// Pick the template for `keyword` from an `errorMessage` value.
pub fn template_for<'a>(error_message: &'a Value, keyword: &str) -> Option<&'a str> {
    match error_message {
        Value::String(template) => Some(template),
        Value::Object(templates) => templates.get(keyword).and_then(Value::as_str),
        _ => None,
    }
}

/// Expand `{{param}}` tokens in `template`.
///
/// Values are quoted; an empty `property` reads as `object`.
pub fn expand(template: &str, params: &[(&str, String)]) -> String {
    token_pattern()
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            match params.iter().find(|(key, _)| *key == name) {
                Some((_, value)) if name == "property" && value.is_empty() => {
                    "object".to_string()
                }
                Some((_, value)) => format!("'{value}'"),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
