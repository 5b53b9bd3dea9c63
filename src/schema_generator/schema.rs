use crate::oracle::TypeId;
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Prefix of every component reference.
pub const COMPONENTS_POINTER: &str = "#/components/schemas";

/// Longest `$ref` chain followed when looking through references.
const MAX_REF_HOPS: usize = 16;

/// OpenAPI Schema Object (the JSON Schema dialect shared by 3.0 and 3.1)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Reference to a component schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// The type of the schema; 3.1 allows `["string", "null"]`
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Allowed values, in the order they were declared
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Discriminator>,
    /// OpenAPI 3.0 only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

impl SchemaType {
    pub fn includes(&self, name: &str) -> bool {
        match self {
            SchemaType::Single(t) => t == name,
            SchemaType::Multiple(ts) => ts.iter().any(|t| t == name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<Schema>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discriminator {
    pub property_name: String,
    /// Literal value to component reference
    pub mapping: IndexMap<String, String>,
}

impl Schema {
    /// Schema with only `type` set
    pub fn typed(schema_type: &str) -> Self {
        Schema {
            schema_type: Some(SchemaType::Single(schema_type.to_string())),
            ..Schema::default()
        }
    }

    /// `$ref` to a component
    pub fn reference(name: &str) -> Self {
        Schema {
            reference: Some(format!("{}/{}", COMPONENTS_POINTER, name)),
            ..Schema::default()
        }
    }

    pub fn array(items: Schema) -> Self {
        Schema {
            items: Some(Box::new(items)),
            ..Schema::typed("array")
        }
    }

    /// Component name when this schema is a `$ref`
    pub fn ref_name(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .and_then(|r| r.strip_prefix(COMPONENTS_POINTER))
            .and_then(|r| r.strip_prefix('/'))
    }

    /// The "any" schema `{}`
    pub fn is_empty(&self) -> bool {
        *self == Schema::default()
    }

    pub fn is_type(&self, name: &str) -> bool {
        self.schema_type.as_ref().is_some_and(|t| t.includes(name))
    }

    /// An object schema that constrains nothing: no properties and no additional properties.
    pub fn is_empty_object(&self) -> bool {
        self.is_type("object")
            && self.properties.as_ref().map_or(true, IndexMap::is_empty)
            && self.additional_properties.is_none()
            && self.all_of.is_none()
            && self.any_of.is_none()
            && self.one_of.is_none()
    }

    /// Allows `null` in addition to what the schema already accepts.
    pub fn widen_with_null(mut self) -> Self {
        if self.is_empty() {
            return self;
        }
        match self.schema_type.take() {
            Some(SchemaType::Single(t)) if t == "null" => {
                self.schema_type = Some(SchemaType::Single(t));
                return self;
            }
            Some(SchemaType::Single(t)) => {
                self.schema_type = Some(SchemaType::Multiple(vec![t, "null".to_string()]));
            }
            Some(SchemaType::Multiple(mut ts)) => {
                if !ts.iter().any(|t| t == "null") {
                    ts.push("null".to_string());
                }
                self.schema_type = Some(SchemaType::Multiple(ts));
            }
            None => {
                return Schema {
                    any_of: Some(vec![self, Schema::typed("null")]),
                    ..Schema::default()
                };
            }
        }
        if let Some(values) = self.enum_values.as_mut() {
            if !values.contains(&Value::Null) {
                values.push(Value::Null);
            }
        }
        self
    }
}

/// Compilation-scoped component registry.
///
/// Names are reserved before their schema is expanded so that recursive
/// references resolve to a `$ref` instead of re-entering the expansion.
#[derive(Debug, Clone, Default)]
pub struct ComponentTable {
    schemas: IndexMap<String, Schema>,
    by_type: HashMap<TypeId, String>,
    in_progress: HashSet<TypeId>,
}

impl ComponentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Component name already assigned to a type
    pub fn name_for(&self, ty: TypeId) -> Option<&str> {
        self.by_type.get(&ty).map(String::as_str)
    }

    pub fn is_in_progress(&self, ty: TypeId) -> bool {
        self.in_progress.contains(&ty)
    }

    /// Claims `name` for `ty` ahead of expansion.
    pub(crate) fn reserve(&mut self, name: &str, ty: TypeId) {
        debug!("Reserving component {} for type {}", name, ty);
        self.schemas.insert(name.to_string(), Schema::default());
        self.by_type.insert(ty, name.to_string());
        self.in_progress.insert(ty);
    }

    pub(crate) fn complete(&mut self, name: &str, ty: TypeId, schema: Schema) {
        self.in_progress.remove(&ty);
        self.schemas.insert(name.to_string(), schema);
    }

    /// Registers a component not tied to a type. An existing entry is kept.
    pub fn insert(&mut self, name: &str, schema: Schema) -> bool {
        if self.schemas.contains_key(name) {
            warn!("Component {} already registered, keeping the first definition", name);
            return false;
        }
        self.schemas.insert(name.to_string(), schema);
        true
    }

    /// Follows `$ref`s to the schema they point at.
    pub fn resolve<'a>(&'a self, schema: &'a Schema) -> &'a Schema {
        let mut current = schema;
        for _ in 0..MAX_REF_HOPS {
            match current.ref_name().and_then(|name| self.schemas.get(name)) {
                Some(target) => current = target,
                None => break,
            }
        }
        current
    }

    pub fn schemas(&self) -> &IndexMap<String, Schema> {
        &self.schemas
    }

    pub fn into_schemas(self) -> IndexMap<String, Schema> {
        self.schemas
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Strips characters that are not allowed in component names.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect()
}
