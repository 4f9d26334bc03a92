// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema validation integration tests.
//!
//! Tests cover:
//! - Translation of validator errors into structured issues
//! - Schema inheritance along the type hierarchy
//! - Referenced schemas and custom messages
//! - Validation settings on the decoder

mod common;

use serde_json::{json, Value};

use common::{decoder, registry, Base, Derived, EventLog};
use mapcodec::{
    CodecError, Decoder, DecoderOptions, FieldSpec, SchemaBinding, SchemaDraft, TypeBuilder,
    TypeDescriptor, TypeKey, ValidationError, ValidationIssue,
};

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Debug, Default)]
struct Record {
    string_val: String,
}

fn validation_error(err: CodecError) -> ValidationError {
    match err {
        CodecError::Validation(validation) => validation,
        other => panic!("expected a validation error, got {other}"),
    }
}

fn register_base_with_schema(registry: &mapcodec::TypeRegistry) {
    TypeBuilder::<Base>::new()
        .field("x", FieldSpec::new("x").of(TypeDescriptor::Number), |b, v: f64| b.x = v)
        .schema(SchemaBinding::new(json!({
            "type": "object",
            "required": ["x"]
        })))
        .register(registry)
        .unwrap();
}

// ============================================================================
// Error Translation
// ============================================================================

#[test]
fn test_invalid_value_scenario() {
    let registry = registry();
    TypeBuilder::<Record>::new()
        .field(
            "string_val",
            FieldSpec::new("stringVal").of(TypeDescriptor::String),
            |r, v: String| r.string_val = v,
        )
        .schema(SchemaBinding::new(json!({
            "type": "object",
            "properties": {"stringVal": {"type": "string"}},
            "required": ["stringVal"]
        })))
        .register(&registry)
        .unwrap();

    let decoder = decoder(&registry);
    let input = json!({"stringVal": 5});
    let err = validation_error(decoder.decode::<Record>(&input).unwrap_err());
    assert_eq!(err.input(), &input);
    assert_eq!(err.errors().len(), 1);
    match &err.errors()[0] {
        ValidationIssue::InvalidValue {
            path,
            property,
            value,
            ..
        } => {
            assert_eq!(path, "stringVal");
            assert_eq!(property, "stringVal");
            assert_eq!(value, &json!(5));
        }
        other => panic!("unexpected issue: {other:?}"),
    }

    let record: Record = decoder
        .decode(&json!({"stringVal": "ok"}))
        .unwrap()
        .unwrap();
    assert_eq!(record.string_val, "ok");
}

#[test]
fn test_all_issues_reported_together() {
    let registry = registry();
    TypeBuilder::<Record>::new()
        .schema(SchemaBinding::new(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "integer", "minimum": 0}
            },
            "required": ["name", "id"],
            "additionalProperties": false
        })))
        .register(&registry)
        .unwrap();

    let err = validation_error(
        decoder(&registry)
            .decode::<Record>(&json!({"age": -1, "nickname": "z"}))
            .unwrap_err(),
    );

    let missing: Vec<_> = err
        .errors()
        .iter()
        .filter(|i| i.is_missing_property())
        .map(|i| i.property().to_string())
        .collect();
    assert_eq!(missing.len(), 2);
    assert!(missing.contains(&"name".to_string()));
    assert!(missing.contains(&"id".to_string()));

    let unsupported: Vec<_> = err
        .errors()
        .iter()
        .filter(|i| i.is_unsupported_property())
        .map(|i| i.path().to_string())
        .collect();
    assert_eq!(unsupported, vec!["nickname".to_string()]);

    let invalid: Vec<_> = err
        .errors()
        .iter()
        .filter(|i| i.is_invalid_value())
        .map(|i| i.path().to_string())
        .collect();
    assert_eq!(invalid, vec!["age".to_string()]);
}

#[test]
fn test_dependency_errors_are_missing_properties() {
    let registry = registry();
    TypeBuilder::<Record>::new()
        .schema(SchemaBinding::new(json!({
            "type": "object",
            "dependencies": {"a": ["b"]}
        })))
        .register(&registry)
        .unwrap();

    let decoder = decoder(&registry);
    let err = validation_error(decoder.decode::<Record>(&json!({"a": 1})).unwrap_err());
    assert_eq!(err.errors().len(), 1);
    assert!(err.errors()[0].is_missing_property());
    assert_eq!(err.errors()[0].path(), "b");
    assert!(decoder.decode::<Record>(&json!({"a": 1, "b": 2})).unwrap().is_some());
    assert!(decoder.decode::<Record>(&json!({"b": 2})).unwrap().is_some());
}

#[test]
fn test_dependent_required_is_missing_property() {
    let registry = registry();
    TypeBuilder::<Record>::new()
        .schema(SchemaBinding::new(json!({
            "type": "object",
            "dependentRequired": {"card": ["billing"]}
        })))
        .register(&registry)
        .unwrap();

    let options = DecoderOptions::default().with_draft(SchemaDraft::Draft202012);
    let decoder = Decoder::with_options(registry.clone(), options);
    let err = validation_error(decoder.decode::<Record>(&json!({"card": "x"})).unwrap_err());
    assert_eq!(err.errors().len(), 1);
    assert!(err.errors()[0].is_missing_property());
    assert_eq!(err.errors()[0].property(), "billing");
}

#[test]
fn test_validation_runs_before_any_assignment() {
    let registry = registry();
    let log = EventLog::new();
    let field_log = log.clone();
    TypeBuilder::<Base>::new()
        .field("x", FieldSpec::new("x").of(TypeDescriptor::Number), move |b, v: f64| {
            field_log.push("set:x");
            b.x = v;
        })
        .schema(SchemaBinding::new(json!({
            "type": "object",
            "required": ["id"]
        })))
        .register(&registry)
        .unwrap();

    assert!(decoder(&registry).decode::<Base>(&json!({"x": 1})).is_err());
    assert!(log.events().is_empty());
}

#[test]
fn test_custom_messages() {
    let registry = registry();
    TypeBuilder::<Record>::new()
        .schema(SchemaBinding::new(json!({
            "type": "object",
            "required": ["stringVal"],
            "properties": {
                "count": {
                    "type": "number",
                    "errorMessage": "{{property}} should be a number, not {{value}}"
                }
            },
            "errorMessage": {
                "required": "{{property}} lacks {{missingProperty}}"
            }
        })))
        .register(&registry)
        .unwrap();

    let err = validation_error(
        decoder(&registry)
            .decode::<Record>(&json!({"count": "many"}))
            .unwrap_err(),
    );
    let messages: Vec<_> = err.errors().iter().map(|i| i.message().to_string()).collect();
    assert!(messages.contains(&"object lacks 'stringVal'".to_string()));
    assert!(messages.contains(&"'count' should be a number, not 'many'".to_string()));
    assert!(err.to_string().contains("object lacks 'stringVal'"));
}

// ============================================================================
// Inheritance
// ============================================================================

#[test]
fn test_derived_inherits_base_schema() {
    let registry = registry();
    register_base_with_schema(&registry);
    TypeBuilder::<Derived>::new()
        .extends(|d: &mut Derived| &mut d.base)
        .field("y", FieldSpec::new("y").of(TypeDescriptor::Number), |d, v: f64| d.y = v)
        .register(&registry)
        .unwrap();

    let err = validation_error(
        decoder(&registry)
            .decode::<Derived>(&json!({"y": 1}))
            .unwrap_err(),
    );
    assert_eq!(err.errors().len(), 1);
    assert_eq!(err.errors()[0].path(), "x");
}

#[test]
fn test_derived_schema_replaces_base_schema() {
    let registry = registry();
    register_base_with_schema(&registry);
    TypeBuilder::<Derived>::new()
        .extends(|d: &mut Derived| &mut d.base)
        .field("y", FieldSpec::new("y").of(TypeDescriptor::Number), |d, v: f64| d.y = v)
        .schema(SchemaBinding::new(json!({
            "type": "object",
            "required": ["y"]
        })))
        .register(&registry)
        .unwrap();

    let derived: Derived = decoder(&registry)
        .decode(&json!({"y": 1}))
        .unwrap()
        .unwrap();
    assert_eq!(derived.y, 1.0);

    let err = validation_error(
        decoder(&registry)
            .decode::<Derived>(&json!({"x": 1}))
            .unwrap_err(),
    );
    assert_eq!(err.errors()[0].path(), "y");
}

// ============================================================================
// References
// ============================================================================

#[derive(Debug, Default)]
struct Address {
    city: String,
}

#[derive(Debug, Default)]
struct Person {
    home: Option<Address>,
}

#[test]
fn test_type_references_are_resolved() {
    let registry = registry();
    TypeBuilder::<Address>::new()
        .field("city", FieldSpec::new("city").of(TypeDescriptor::String), |a, v: String| {
            a.city = v
        })
        .schema(
            SchemaBinding::new(json!({
                "$id": "https://schemas.test/address.json",
                "type": "object",
                "required": ["city"],
                "properties": {"zip": {"$ref": "https://schemas.test/zip.json"}}
            }))
            .with_schema_ref(json!({
                "$id": "https://schemas.test/zip.json",
                "type": "string",
                "pattern": "^[0-9]{5}$"
            })),
        )
        .register(&registry)
        .unwrap();
    TypeBuilder::<Person>::new()
        .field(
            "home",
            FieldSpec::new("home").of(TypeDescriptor::nested::<Address>()),
            |p, v: mapcodec::Nested<Address>| p.home = Some(v.into_inner()),
        )
        .schema(
            SchemaBinding::new(json!({
                "type": "object",
                "properties": {"home": {"$ref": "https://schemas.test/address.json"}}
            }))
            .with_type_ref::<Address>(),
        )
        .register(&registry)
        .unwrap();

    let decoder = decoder(&registry);
    let err = validation_error(
        decoder
            .decode::<Person>(&json!({"home": {"zip": "12"}}))
            .unwrap_err(),
    );
    let paths: Vec<_> = err.errors().iter().map(|i| i.path().to_string()).collect();
    assert!(paths.contains(&"home.city".to_string()));
    assert!(paths.contains(&"home.zip".to_string()));

    let person: Person = decoder
        .decode(&json!({"home": {"city": "Oslo", "zip": "01234"}}))
        .unwrap()
        .unwrap();
    assert_eq!(person.home.unwrap().city, "Oslo");
}

#[test]
fn test_reference_without_id_is_rejected() {
    let registry = registry();
    TypeBuilder::<Record>::new()
        .schema(SchemaBinding::new(json!({"type": "object"})).with_schema_ref(json!({"type": "string"})))
        .register(&registry)
        .unwrap();

    let err = decoder(&registry).decode::<Record>(&json!({})).unwrap_err();
    assert!(matches!(err, CodecError::InvalidSchema { .. }));
}

// ============================================================================
// Decoder Settings
// ============================================================================

#[test]
fn test_validation_can_be_disabled() {
    let registry = registry();
    register_base_with_schema(&registry);
    let options = DecoderOptions::from_toml_str("validate_schemas = false").unwrap();
    let decoder = Decoder::with_options(registry.clone(), options);
    assert!(decoder.decode::<Base>(&json!({})).unwrap().is_some());

    let err = decoder.validate(TypeKey::of::<Base>(), &json!({})).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_uncached_validator_matches_cached() {
    let registry = registry();
    register_base_with_schema(&registry);
    let options = DecoderOptions::default()
        .with_validator_cache(false)
        .with_draft(SchemaDraft::Draft202012);
    let decoder = Decoder::with_options(registry.clone(), options);

    for _ in 0..2 {
        let err = validation_error(decoder.decode::<Base>(&json!({})).unwrap_err());
        assert_eq!(err.errors().len(), 1);
    }
    assert!(decoder.decode::<Base>(&json!({"x": 2})).unwrap().is_some());
}

#[test]
fn test_validation_error_display() {
    let registry = registry();
    register_base_with_schema(&registry);
    let err = decoder(&registry).decode::<Base>(&json!({})).unwrap_err();
    let text = err.to_string();
    assert!(text.contains("failed schema validation"), "{text}");
    assert!(text.contains("object is missing required property 'x'"), "{text}");
    let _: &Value = validation_error(err).input();
}
