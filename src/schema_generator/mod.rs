//! Type-to-schema conversion.
//!
//! [`SchemaGenerator`] walks types through a [`TypeOracle`] and produces
//! [`Schema`]s, hoisting every nameable union, intersection and object type into
//! the [`ComponentTable`] and returning a `$ref` in its place.

mod intersection;
pub mod schema;
mod union;

pub use schema::{
    sanitize_name, AdditionalProperties, ComponentTable, Discriminator, Schema, SchemaType,
    COMPONENTS_POINTER,
};

use crate::config::AdditionalPropertiesPolicy;
use crate::oracle::{TypeId, TypeKind, TypeOracle, ANONYMOUS_SYMBOL};
use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::json;

/// Per-run conversion state: the component table plus the chain of component
/// names currently being expanded.
#[derive(Debug, Default)]
pub struct SchemaContext {
    pub components: ComponentTable,
    name_stack: Vec<String>,
}

impl SchemaContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of component names from the outermost expansion, for diagnostics
    pub fn current_path(&self) -> String {
        self.name_stack.join(" > ")
    }

    /// The component currently being expanded; anonymous members are named after it.
    pub fn current_name(&self) -> Option<&str> {
        self.name_stack.last().map(String::as_str)
    }
}

/// Schema generator - converts oracle types to OpenAPI schemas
pub struct SchemaGenerator<'o, O: TypeOracle + ?Sized> {
    oracle: &'o O,
    context: SchemaContext,
    policy: AdditionalPropertiesPolicy,
}

impl<'o, O: TypeOracle + ?Sized> SchemaGenerator<'o, O> {
    /// Create a new SchemaGenerator with a fresh context
    pub fn new(oracle: &'o O) -> Self {
        debug!("Initializing SchemaGenerator");
        Self {
            oracle,
            context: SchemaContext::new(),
            policy: AdditionalPropertiesPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AdditionalPropertiesPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn oracle(&self) -> &'o O {
        self.oracle
    }

    pub fn components(&self) -> &ComponentTable {
        &self.context.components
    }

    pub fn into_components(self) -> ComponentTable {
        self.context.components
    }

    /// Registers a schema that does not come from a type under `name`.
    /// Returns the name the component was stored under, which carries a numeric
    /// suffix when the sanitized name is already taken.
    pub fn register(&mut self, name: &str, schema: Schema) -> String {
        let requested = sanitize_name(name);
        let name = self.unused_component_name(&requested);
        if name != requested {
            warn!("Component {} is already registered, storing the new schema as {}", requested, name);
        }
        self.context.components.insert(&name, schema);
        name
    }

    /// `base` when no component uses it yet, otherwise the first free `base_<n>`.
    pub fn unused_component_name(&self, base: &str) -> String {
        let base = sanitize_name(base);
        if !self.context.components.contains(&base) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", base, n);
            if !self.context.components.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Convert a type to a schema
    pub fn convert(&mut self, ty: TypeId) -> Schema {
        self.convert_with_hint(ty, None)
    }

    /// Convert a type, using `hint` (the type-reference name written at the use
    /// site) as a naming fallback.
    pub fn convert_with_hint(&mut self, ty: TypeId, hint: Option<&str>) -> Schema {
        let oracle = self.oracle;
        match oracle.kind(ty) {
            TypeKind::Undefined | TypeKind::Void => Schema::default(),
            TypeKind::Null => Schema::typed("null"),
            TypeKind::String => Schema::typed("string"),
            TypeKind::Number => Schema::typed("number"),
            TypeKind::Boolean => Schema::typed("boolean"),
            TypeKind::BigInt => Schema {
                format: Some("int64".to_string()),
                pattern: Some("^-?\\d+$".to_string()),
                ..Schema::typed("string")
            },
            TypeKind::Date => Schema {
                format: Some("date-time".to_string()),
                ..Schema::typed("string")
            },
            TypeKind::StringLiteral(s) => Schema {
                enum_values: Some(vec![json!(s)]),
                ..Schema::typed("string")
            },
            TypeKind::NumberLiteral(n) => Schema {
                enum_values: Some(vec![crate::parser::number_value(*n)]),
                ..Schema::typed("number")
            },
            TypeKind::BooleanLiteral(b) => Schema {
                enum_values: Some(vec![json!(b)]),
                ..Schema::typed("boolean")
            },
            TypeKind::Union(members) => {
                self.hoisted(ty, hint, |gen| union::resolve_union(gen, members))
            }
            TypeKind::Intersection(members) => {
                if let Some(primitive) = intersection::brand_collapse(oracle, members) {
                    debug!("Collapsing branded type {}", oracle.type_to_string(ty));
                    return self.convert(primitive);
                }
                self.hoisted(ty, hint, |gen| intersection::resolve_intersection(gen, members))
            }
            TypeKind::Marker { inner, .. } => self.convert_with_hint(*inner, hint),
            TypeKind::Array { .. } | TypeKind::Record { .. } => self.collection_schema(ty),
            TypeKind::Tuple(elements) => self.tuple_schema(elements),
            TypeKind::Object(_) => self.hoisted(ty, hint, |gen| gen.object_schema(ty)),
            TypeKind::Promise(inner) => self.convert_with_hint(*inner, hint),
            TypeKind::Any | TypeKind::Unknown | TypeKind::Never => Schema::default(),
            TypeKind::Pending => {
                warn!("Type {} is still being resolved, emitting an empty schema", ty);
                Schema::default()
            }
        }
    }

    /// Stable component name: alias name, then declared symbol, then the
    /// use-site reference name, then the enclosing alias.
    fn component_name(&self, ty: TypeId, hint: Option<&str>) -> Option<String> {
        let oracle = self.oracle;
        oracle
            .alias_name(ty)
            .or_else(|| oracle.symbol_name(ty).filter(|s| *s != ANONYMOUS_SYMBOL))
            .or(hint)
            .or_else(|| oracle.enclosing_alias(ty))
            .map(sanitize_name)
            .filter(|name| !name.is_empty())
    }

    /// Expands `ty` with `build`, hoisting the result into the component table
    /// when the type has a name.
    fn hoisted<F>(&mut self, ty: TypeId, hint: Option<&str>, build: F) -> Schema
    where
        F: FnOnce(&mut Self) -> Schema,
    {
        if let Some(existing) = self.context.components.name_for(ty) {
            if self.context.components.is_in_progress(ty) {
                debug!("Cycle through {} at {}", existing, self.context.current_path());
            }
            return Schema::reference(existing);
        }

        let Some(name) = self.component_name(ty, hint) else {
            return build(self);
        };

        if self.context.components.contains(&name) {
            warn!(
                "Schema name {} is already used by another type, referencing the existing component for {}",
                name,
                self.oracle.type_to_string(ty)
            );
            return Schema::reference(&name);
        }

        debug!("Generating component schema for: {}", name);
        self.context.components.reserve(&name, ty);
        self.context.name_stack.push(name.clone());
        let schema = build(self);
        self.context.name_stack.pop();
        self.context.components.complete(&name, ty, schema);
        Schema::reference(&name)
    }

    /// Arrays and sets become `items`, records become `additionalProperties`.
    fn collection_schema(&mut self, ty: TypeId) -> Schema {
        let oracle = self.oracle;
        if let Some((element, unique)) = oracle.array_element(ty) {
            let mut schema = Schema::array(self.convert(element));
            if unique {
                schema.unique_items = Some(true);
            }
            return schema;
        }
        match oracle.record_value(ty) {
            Some(value) => Schema {
                additional_properties: Some(AdditionalProperties::Schema(Box::new(self.convert(value)))),
                ..Schema::typed("object")
            },
            None => Schema::default(),
        }
    }

    fn object_schema(&mut self, ty: TypeId) -> Schema {
        let oracle = self.oracle;
        let mut properties = IndexMap::new();
        let mut required = Vec::new();

        for prop in oracle.properties(ty) {
            if oracle.has_call_signatures(prop.ty) {
                debug!("Skipping method property {}", prop.name);
                continue;
            }
            let schema = self.convert(prop.ty);
            if !prop.optional && !oracle.includes_undefined(prop.ty) {
                required.push(prop.name.clone());
            }
            properties.insert(prop.name, schema);
        }

        let index_value = match oracle.kind(ty) {
            TypeKind::Object(shape) => shape.index_value,
            _ => None,
        };
        let additional_properties = match index_value {
            Some(value) => Some(AdditionalProperties::Schema(Box::new(self.convert(value)))),
            None if !properties.is_empty() && self.policy == AdditionalPropertiesPolicy::Forbid => {
                Some(AdditionalProperties::Allowed(false))
            }
            None => None,
        };

        Schema {
            properties: (!properties.is_empty()).then_some(properties),
            required: (!required.is_empty()).then_some(required),
            additional_properties,
            ..Schema::typed("object")
        }
    }

    fn tuple_schema(&mut self, elements: &[TypeId]) -> Schema {
        let mut branches: Vec<Schema> = Vec::new();
        for element in elements {
            let schema = self.convert(*element);
            if !branches.contains(&schema) {
                branches.push(schema);
            }
        }
        let items = match branches.len() {
            0 => Schema::default(),
            1 => branches.remove(0),
            _ => Schema {
                any_of: Some(branches),
                ..Schema::default()
            },
        };
        Schema {
            min_items: Some(elements.len()),
            max_items: Some(elements.len()),
            ..Schema::array(items)
        }
    }
}
