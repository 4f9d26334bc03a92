// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Scalar conversions with permissive literal grammars.
//!
//! Every conversion takes a `strict` flag. In non-strict mode an
//! unconvertible value yields `Ok(None)` ("no value"); in strict mode it
//! raises a conversion error. Numbers are the exception: a non-strict
//! failure yields `NaN`. A raw `null` is always "no value".

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::core::error::{CodecError, Result};

fn decimal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d(?:[\d,]*\d)?)?(\.\d*)?([eE][+-]?\d+)?$").expect("valid decimal pattern")
    })
}

fn reject<T>(strict: bool, target: &str, value: &Value) -> Result<Option<T>> {
    if strict {
        Err(CodecError::conversion(target, value))
    } else {
        Ok(None)
    }
}

/// Parse a number literal.
///
/// Accepts an optional sign followed by a `0x` hex integer, a `0b` binary
/// integer, or a decimal with optional `,` separators, fraction and
/// exponent. Surrounding whitespace is ignored.
pub fn parse_number_literal(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let (negative, body) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let magnitude = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        parse_radix(hex, 16)?
    } else if let Some(bin) = body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")) {
        parse_radix(bin, 2)?
    } else {
        let caps = decimal_pattern().captures(body)?;
        let has_int = caps.get(1).is_some();
        let has_frac = caps.get(2).is_some_and(|m| m.as_str().len() > 1);
        if !has_int && !has_frac {
            return None;
        }
        body.replace(',', "").parse::<f64>().ok()?
    };

    Some(if negative { -magnitude } else { magnitude })
}

fn parse_radix(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0f64, |acc, ch| {
        ch.to_digit(radix).map(|d| acc * radix as f64 + d as f64)
    })
}

/// Convert to a number.
pub fn to_number(value: &Value, strict: bool) -> Result<Option<f64>> {
    let parsed = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => parse_number_literal(s),
        Value::Array(_) | Value::Object(_) => None,
    };

    match parsed {
        Some(n) => Ok(Some(n)),
        None if strict => Err(CodecError::conversion("Number", value)),
        None => Ok(Some(f64::NAN)),
    }
}

/// Convert to a boolean.
///
/// Strings `true|yes|1` and `false|no|0` are accepted case-insensitively.
/// Non-strict mode treats any nonzero number as `true`; strict mode
/// accepts only `0` and `1`.
pub fn to_boolean(value: &Value, strict: bool) -> Result<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        Value::Number(n) => match n.as_f64() {
            Some(x) if x == 0.0 => Ok(Some(false)),
            Some(x) if x == 1.0 => Ok(Some(true)),
            Some(x) if !strict && !x.is_nan() => Ok(Some(true)),
            _ => reject(strict, "Boolean", value),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Some(true)),
            "false" | "no" | "0" => Ok(Some(false)),
            _ => reject(strict, "Boolean", value),
        },
        Value::Array(_) | Value::Object(_) => reject(strict, "Boolean", value),
    }
}

/// Convert to a string.
///
/// Numbers and booleans are rendered; containers become JSON text unless
/// `strict` is set.
pub fn to_string(value: &Value, strict: bool) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) if strict => Err(CodecError::conversion("String", value)),
        Value::Array(_) | Value::Object(_) => Ok(Some(value.to_string())),
    }
}

/// Pass through an object value.
pub fn to_object(value: &Value, strict: bool) -> Result<Option<Value>> {
    match value {
        Value::Null => Ok(None),
        Value::Object(_) => Ok(Some(value.clone())),
        _ => reject(strict, "Object", value),
    }
}

/// Convert to a UTC timestamp.
///
/// Numbers are milliseconds since the Unix epoch. Strings may be RFC 3339,
/// RFC 2822, `YYYY-MM-DD[( |T)HH:MM:SS[.fff]]` (taken as UTC) or a bare date.
pub fn to_date(value: &Value, strict: bool) -> Result<Option<DateTime<Utc>>> {
    let parsed = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64().and_then(|ms| {
            if ms.is_finite() {
                DateTime::<Utc>::from_timestamp_millis(ms as i64)
            } else {
                None
            }
        }),
        Value::String(s) => parse_date_literal(s),
        _ => None,
    };

    match parsed {
        Some(date) => Ok(Some(date)),
        None => reject(strict, "Date", value),
    }
}

/// Parse a date string.
pub fn parse_date_literal(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Convert to an absolute URL.
pub fn to_url(value: &Value, strict: bool) -> Result<Option<Url>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => match Url::parse(s.trim()) {
            Ok(url) => Ok(Some(url)),
            Err(_) => reject(strict, "URL", value),
        },
        _ => reject(strict, "URL", value),
    }
}
