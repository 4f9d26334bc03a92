// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Key-path resolution against raw input.
//!
//! A key path is a list of steps separated by `.` or `@`:
//! - `a.b` looks up key `b` inside key `a`
//! - `items.0` or `items@0` takes the first element of `items`
//! - `name.length` yields the length of a string or array
//!
//! A step introduced by `@` only addresses array elements. Empty steps are
//! skipped, so `a..b` behaves like `a.b`. Resolution never fails loudly:
//! a missing step simply yields `None`.

use std::borrow::Cow;
use std::fmt;

use serde_json::Value;

/// One step of a key path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    /// Key or index text
    pub key: String,
    /// Step was introduced by `@`
    pub indexed: bool,
}

/// Parsed key path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    source: String,
    steps: Vec<PathStep>,
}

impl KeyPath {
    /// Parse a key path. Parsing never fails.
    pub fn parse(path: &str) -> Self {
        let mut steps = Vec::new();
        let mut current = String::new();
        let mut indexed = false;

        for ch in path.chars() {
            match ch {
                '.' | '@' => {
                    if !current.is_empty() {
                        steps.push(PathStep {
                            key: std::mem::take(&mut current),
                            indexed,
                        });
                    }
                    indexed = ch == '@';
                }
                _ => current.push(ch),
            }
        }
        if !current.is_empty() {
            steps.push(PathStep {
                key: current,
                indexed,
            });
        }

        Self {
            source: path.to_string(),
            steps,
        }
    }

    /// The original path text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parsed steps, empty steps removed.
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Check if the path has no steps and therefore addresses the root.
    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Resolve this path against `root`.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<Cow<'a, Value>> {
        let mut current = Cow::Borrowed(root);

        for step in &self.steps {
            current = match current {
                Cow::Borrowed(value) => step_into(value, step)?,
                Cow::Owned(value) => Cow::Owned(step_into(&value, step)?.into_owned()),
            };
        }

        Some(current)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Resolve a key path given as text.
pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<Cow<'a, Value>> {
    KeyPath::parse(path).resolve(root)
}

// Null and other scalars cannot be stepped through.
fn step_into<'a>(value: &'a Value, step: &PathStep) -> Option<Cow<'a, Value>> {
    match value {
        Value::Object(map) if !step.indexed => map.get(&step.key).map(Cow::Borrowed),
        Value::Array(items) => {
            if step.key == "length" {
                Some(Cow::Owned(Value::from(items.len())))
            } else {
                let index = step.key.parse::<usize>().ok()?;
                items.get(index).map(Cow::Borrowed)
            }
        }
        Value::String(s) if !step.indexed => {
            if step.key == "length" {
                Some(Cow::Owned(Value::from(s.chars().count())))
            } else {
                let index = step.key.parse::<usize>().ok()?;
                s.chars()
                    .nth(index)
                    .map(|c| Cow::Owned(Value::String(c.to_string())))
            }
        }
        _ => None,
    }
}
