// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema bindings attached to types.

use std::any::Any;

use serde_json::Value;

use crate::schema::descriptor::TypeKey;

/// A schema made available to `$ref` resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaRef {
    /// Literal schema document; must carry an `$id`
    Schema(Value),
    /// The nearest schema binding of a registered type, with its own references
    Type(TypeKey),
}

/// JSON Schema bound to a type, with the schemas it references.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaBinding {
    schema: Value,
    references: Vec<SchemaRef>,
}

impl SchemaBinding {
    /// Bind `schema` with no references.
    pub fn new(schema: Value) -> Self {
        Self {
            schema,
            references: Vec::new(),
        }
    }

    /// Add a literal referenced schema.
    pub fn with_schema_ref(mut self, schema: Value) -> Self {
        self.references.push(SchemaRef::Schema(schema));
        self
    }

    /// Add the schema of type `T` as a reference.
    pub fn with_type_ref<T: Any>(mut self) -> Self {
        self.references.push(SchemaRef::Type(TypeKey::of::<T>()));
        self
    }

    /// Add a reference.
    pub fn with_reference(mut self, reference: SchemaRef) -> Self {
        self.references.push(reference);
        self
    }

    /// The root schema.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Declared references, in order.
    pub fn references(&self) -> &[SchemaRef] {
        &self.references
    }

    /// The root schema's `$id`.
    pub fn id(&self) -> Option<&str> {
        schema_id(&self.schema)
    }
}

pub(crate) fn schema_id(schema: &Value) -> Option<&str> {
    schema.get("$id").and_then(Value::as_str)
}
