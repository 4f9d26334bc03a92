// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema validation adapter.
//!
//! Compiles the nearest schema binding of a type, together with every schema
//! it references transitively, into one `jsonschema` validator. Raw
//! validator errors are translated into [`ValidationIssue`]s and reported
//! together in a single [`ValidationError`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use jsonschema::error::ValidationErrorKind;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::core::error::{CodecError, Result};
use crate::core::registry::TypeRegistry;
use crate::decode::options::SchemaDraft;
use crate::schema::binding::{schema_id, SchemaBinding, SchemaRef};
use crate::schema::descriptor::TypeKey;
use crate::schema::error::{ValidationError, ValidationIssue};
use crate::schema::message::{expand, template_for, ERROR_MESSAGE_KEYWORD};

/// Validator compiled from one schema binding.
pub struct CompiledSchema {
    owner: TypeKey,
    validator: jsonschema::Validator,
    root: Value,
    resources: HashMap<String, Value>,
}

impl CompiledSchema {
    /// Compile `binding`, declared on `owner`.
    pub fn compile(
        registry: &TypeRegistry,
        owner: TypeKey,
        binding: &SchemaBinding,
        draft: SchemaDraft,
    ) -> Result<Self> {
        let mut resources = Vec::new();
        let mut seen_ids = HashSet::new();
        let mut seen_types = HashSet::from([owner]);
        if let Some(id) = binding.id() {
            seen_ids.insert(id.to_string());
        }
        flatten_references(
            registry,
            binding.references(),
            &mut resources,
            &mut seen_ids,
            &mut seen_types,
        )?;

        let draft: jsonschema::Draft = draft.into();
        let mut options = jsonschema::options();
        options.with_draft(draft);
        for (id, schema) in &resources {
            options.with_resource(id.clone(), draft.create_resource(schema.clone()));
        }
        let validator = options
            .build(binding.schema())
            .map_err(|e| CodecError::invalid_schema(owner.short_name(), e.to_string()))?;

        debug!(
            type_name = owner.short_name(),
            references = resources.len(),
            "Compiled schema validator"
        );

        Ok(Self {
            owner,
            validator,
            root: binding.schema().clone(),
            resources: resources.into_iter().collect(),
        })
    }

    /// Type that declares the binding.
    pub fn owner(&self) -> TypeKey {
        self.owner
    }

    /// Identifiers of the flattened references.
    pub fn resource_ids(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Check `input`, collecting every issue found.
    pub fn check(&self, input: &Value) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for error in self.validator.iter_errors(input) {
            let pointer = error.instance_path.as_str().to_string();
            let schema_path = split_pointer(error.schema_path.as_str());
            let path = dotted_path(&pointer);
            trace!(path = %path, schema_path = %error.schema_path.as_str(), "Schema violation");

            match &error.kind {
                ValidationErrorKind::Required { property } => {
                    let property = match property {
                        Value::String(name) => name.clone(),
                        other => other.to_string(),
                    };
                    let owner = keyword_owner(&schema_path, &["required", "dependencies", "dependentRequired"]);
                    let issue = ValidationIssue::missing_property(join_path(&path, &property), &property);
                    let params = [
                        ("property", path.clone()),
                        ("keyword", "required".to_string()),
                        ("missingProperty", property),
                    ];
                    issues.push(self.customize(issue, owner, "required", &params));
                }
                ValidationErrorKind::AdditionalProperties { unexpected } => {
                    let owner = keyword_owner(&schema_path, &["additionalProperties"]);
                    for property in unexpected {
                        let issue =
                            ValidationIssue::unsupported_property(join_path(&path, property), property);
                        let params = [
                            ("property", path.clone()),
                            ("keyword", "additionalProperties".to_string()),
                            ("additionalProperty", property.clone()),
                        ];
                        issues.push(self.customize(issue, owner, "additionalProperties", &params));
                    }
                }
                _ => {
                    let keyword = schema_path.last().map(String::as_str).unwrap_or_default();
                    let owner = &schema_path[..schema_path.len().saturating_sub(1)];
                    let value = input.pointer(&pointer).cloned().unwrap_or(Value::Null);
                    let params = [
                        ("property", path.clone()),
                        ("keyword", keyword.to_string()),
                        ("value", render_value(&value)),
                    ];
                    let issue = ValidationIssue::invalid_value(path, value, error.to_string());
                    issues.push(self.customize(issue, owner, keyword, &params));
                }
            }
        }

        issues
    }

    fn customize(
        &self,
        issue: ValidationIssue,
        owner: &[String],
        keyword: &str,
        params: &[(&str, String)],
    ) -> ValidationIssue {
        let template = self
            .locate(owner)
            .and_then(|node| node.get(ERROR_MESSAGE_KEYWORD))
            .and_then(|messages| template_for(messages, keyword));
        match template {
            Some(template) => issue.with_message(expand(template, params)),
            None => issue,
        }
    }

    /// Walk schema-path segments from the root, following `$ref`s.
    fn locate(&self, segments: &[String]) -> Option<&Value> {
        let mut document = &self.root;
        let mut node = &self.root;

        for segment in segments {
            if segment == "$ref" {
                let reference = node.get("$ref")?.as_str()?;
                (document, node) = self.resolve_ref(document, reference)?;
            } else {
                node = match node {
                    Value::Object(map) => map.get(segment)?,
                    Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                    _ => return None,
                };
            }
        }

        Some(node)
    }

    fn resolve_ref<'a>(&'a self, document: &'a Value, reference: &str) -> Option<(&'a Value, &'a Value)> {
        let (base, fragment) = reference.split_once('#').unwrap_or((reference, ""));
        let target = if base.is_empty() {
            document
        } else if schema_id(&self.root) == Some(base) {
            &self.root
        } else {
            self.resources.get(base).or_else(|| {
                self.resources
                    .iter()
                    .find(|(id, _)| id.ends_with(&format!("/{base}")))
                    .map(|(_, schema)| schema)
            })?
        };
        let node = if fragment.is_empty() {
            target
        } else {
            target.pointer(fragment)?
        };
        Some((target, node))
    }
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("owner", &self.owner)
            .field("resources", &self.resources.len())
            .finish()
    }
}

/// Validates raw input against the schema bound to a type.
pub struct SchemaValidator {
    draft: SchemaDraft,
    cache_enabled: bool,
    cache: RwLock<HashMap<TypeKey, Arc<CompiledSchema>>>,
}

impl SchemaValidator {
    /// Create a validator compiling with `draft`.
    pub fn new(draft: SchemaDraft, cache_enabled: bool) -> Self {
        Self {
            draft,
            cache_enabled,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Validate `input` for `key`; types without a binding always pass.
    pub fn validate(&self, registry: &TypeRegistry, key: TypeKey, input: &Value) -> Result<()> {
        let Some(compiled) = self.compiled_for(registry, key)? else {
            return Ok(());
        };

        let issues = compiled.check(input);
        if issues.is_empty() {
            return Ok(());
        }

        debug!(
            type_name = key.short_name(),
            issues = issues.len(),
            "Schema validation failed"
        );
        Err(ValidationError::new(
            format!("'{}' failed schema validation", key.short_name()),
            input.clone(),
            issues,
        )
        .into())
    }

    /// Compiled validator for `key`'s nearest binding.
    pub fn compiled_for(
        &self,
        registry: &TypeRegistry,
        key: TypeKey,
    ) -> Result<Option<Arc<CompiledSchema>>> {
        let Some((owner, binding)) = registry.schema_binding(key)? else {
            return Ok(None);
        };

        if self.cache_enabled {
            if let Some(found) = self
                .cache
                .read()
                .map_err(|e| CodecError::Other(format!("Schema cache lock poisoned: {e}")))?
                .get(&owner)
            {
                return Ok(Some(found.clone()));
            }
        }

        let compiled = Arc::new(CompiledSchema::compile(registry, owner, &binding, self.draft)?);
        if self.cache_enabled {
            self.cache
                .write()
                .map_err(|e| CodecError::Other(format!("Schema cache lock poisoned: {e}")))?
                .insert(owner, compiled.clone());
        }
        Ok(Some(compiled))
    }

    /// Drop all compiled validators.
    pub fn clear(&self) -> Result<()> {
        self.cache
            .write()
            .map_err(|e| CodecError::Other(format!("Schema cache lock poisoned: {e}")))?
            .clear();
        Ok(())
    }
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("draft", &self.draft)
            .field("cache_enabled", &self.cache_enabled)
            .finish_non_exhaustive()
    }
}

fn flatten_references(
    registry: &TypeRegistry,
    references: &[SchemaRef],
    out: &mut Vec<(String, Value)>,
    seen_ids: &mut HashSet<String>,
    seen_types: &mut HashSet<TypeKey>,
) -> Result<()> {
    for reference in references {
        match reference {
            SchemaRef::Schema(schema) => {
                push_resource(schema, "referenced schema", out, seen_ids)?;
            }
            SchemaRef::Type(key) => {
                if !seen_types.insert(*key) {
                    continue;
                }
                let (_, binding) = registry.schema_binding(*key)?.ok_or_else(|| {
                    CodecError::invalid_schema(key.short_name(), "referenced type has no schema")
                })?;
                push_resource(binding.schema(), key.short_name(), out, seen_ids)?;
                flatten_references(registry, binding.references(), out, seen_ids, seen_types)?;
            }
        }
    }
    Ok(())
}

fn push_resource(
    schema: &Value,
    origin: &str,
    out: &mut Vec<(String, Value)>,
    seen_ids: &mut HashSet<String>,
) -> Result<()> {
    let id = schema_id(schema)
        .ok_or_else(|| CodecError::invalid_schema(origin, "referenced schema has no $id"))?;
    if seen_ids.insert(id.to_string()) {
        out.push((id.to_string(), schema.clone()));
    } else if out.iter().any(|(seen, existing)| seen == id && existing != schema) {
        warn!(schema_id = id, "Ignoring a second, different schema with the same $id");
    }
    Ok(())
}

/// Segments of the schema path up to the keyword that failed.
fn keyword_owner<'a>(segments: &'a [String], keywords: &[&str]) -> &'a [String] {
    match segments
        .iter()
        .rposition(|segment| keywords.contains(&segment.as_str()))
    {
        Some(index) => &segments[..index],
        None => &segments[..segments.len().saturating_sub(1)],
    }
}

fn split_pointer(pointer: &str) -> Vec<String> {
    pointer
        .split('/')
        .skip(1)
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect()
}

fn dotted_path(pointer: &str) -> String {
    split_pointer(pointer).join(".")
}

fn join_path(parent: &str, property: &str) -> String {
    if parent.is_empty() {
        property.to_string()
    } else {
        format!("{parent}.{property}")
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
