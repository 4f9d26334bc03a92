// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common fixtures for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use mapcodec::{Decoder, DecoderOptions, TypeRegistry};

// ============================================================================
// Event Log
// ============================================================================

/// Ordered record of hook and setter calls.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    /// Snapshot of all events so far.
    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Position of `event`, panicking if it was never logged.
    pub fn position(&self, event: &str) -> usize {
        self.events()
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("event '{event}' not logged in {:?}", self.events()))
    }
}

// ============================================================================
// Registry Helpers
// ============================================================================

/// A fresh, empty registry.
pub fn registry() -> Arc<TypeRegistry> {
    Arc::new(TypeRegistry::new())
}

/// Decoder with default options over `registry`.
pub fn decoder(registry: &Arc<TypeRegistry>) -> Decoder {
    Decoder::new(registry.clone())
}

/// Decoder with strict conversions over `registry`.
pub fn strict_decoder(registry: &Arc<TypeRegistry>) -> Decoder {
    Decoder::with_options(registry.clone(), DecoderOptions::default().with_strict(true))
}

// ============================================================================
// Shared Fixture Types
// ============================================================================

/// Root of a two-level hierarchy.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Base {
    pub x: f64,
}

/// Extends [`Base`] through its `base` field.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Derived {
    pub base: Base,
    pub y: f64,
}
