use super::{sanitize_name, Discriminator, Schema, SchemaGenerator, COMPONENTS_POINTER};
use crate::oracle::{TypeId, TypeKind, TypeOracle, ANONYMOUS_SYMBOL};
use indexmap::IndexMap;
use log::debug;
use serde_json::{json, Value};
use std::collections::HashSet;

pub(super) fn resolve_union<O: TypeOracle + ?Sized>(
    gen: &mut SchemaGenerator<'_, O>,
    members: &[TypeId],
) -> Schema {
    let oracle = gen.oracle();
    let mut has_null = false;
    let mut others = Vec::new();
    for member in members {
        match oracle.kind(*member) {
            TypeKind::Null => has_null = true,
            TypeKind::Undefined | TypeKind::Void => {}
            _ => others.push(*member),
        }
    }

    let widen = |schema: Schema| if has_null { schema.widen_with_null() } else { schema };

    if others.is_empty() {
        return if has_null { Schema::typed("null") } else { Schema::default() };
    }

    if let Some(values) = literal_values(oracle, &others, |k| match k {
        TypeKind::StringLiteral(s) => Some(json!(s)),
        _ => None,
    }) {
        return widen(Schema {
            enum_values: Some(values),
            ..Schema::typed("string")
        });
    }
    if others
        .iter()
        .all(|m| matches!(oracle.kind(*m), TypeKind::BooleanLiteral(_) | TypeKind::Boolean))
    {
        return widen(Schema::typed("boolean"));
    }
    if let Some(values) = literal_values(oracle, &others, |k| match k {
        TypeKind::NumberLiteral(n) => Some(crate::parser::number_value(*n)),
        _ => None,
    }) {
        return widen(Schema {
            enum_values: Some(values),
            ..Schema::typed("number")
        });
    }

    if others.len() == 1 {
        let schema = gen.convert(others[0]);
        return widen(schema);
    }

    let property = discriminator_property(oracle, &others);
    let parent = gen.context.current_name().map(str::to_string);
    let mut branches = Vec::with_capacity(others.len());
    for (index, member) in others.iter().enumerate() {
        let schema = match (&property, &parent) {
            (Some(property), Some(parent)) if is_anonymous_object(oracle, *member) => {
                let suffix = property.values[index]
                    .first()
                    .map(|value| sanitize_name(value))
                    .filter(|value| !value.is_empty())
                    .unwrap_or_else(|| index.to_string());
                let name = gen.unused_component_name(&format!("{}_{}", parent, suffix));
                debug!("Naming anonymous union branch {}", name);
                gen.convert_with_hint(*member, Some(&name))
            }
            _ => gen.convert(*member),
        };
        branches.push(schema);
    }
    let discriminator = property.and_then(|property| property.into_discriminator(&branches));

    let mut any_of = branches;
    if has_null {
        any_of.push(Schema::typed("null"));
    }
    let one_of = discriminator.is_some().then(|| any_of.clone());
    Schema {
        any_of: Some(any_of),
        one_of,
        discriminator,
        ..Schema::default()
    }
}

fn is_anonymous_object<O: TypeOracle + ?Sized>(oracle: &O, ty: TypeId) -> bool {
    matches!(oracle.kind(ty), TypeKind::Object(_))
        && oracle.alias_name(ty).is_none()
        && oracle.symbol_name(ty).map_or(true, |name| name == ANONYMOUS_SYMBOL)
}

/// Values of the members when every member matches `extract`, deduplicated in order.
fn literal_values<O, F>(oracle: &O, members: &[TypeId], extract: F) -> Option<Vec<Value>>
where
    O: TypeOracle + ?Sized,
    F: Fn(&TypeKind) -> Option<Value>,
{
    let mut values: Vec<Value> = Vec::new();
    for member in members {
        let value = extract(oracle.kind(*member))?;
        if !values.contains(&value) {
            values.push(value);
        }
    }
    Some(values)
}

/// String literal values of a literal or a union of only string literals.
fn string_literal_set<O: TypeOracle + ?Sized>(oracle: &O, ty: TypeId) -> Option<Vec<String>> {
    match oracle.kind(ty) {
        TypeKind::StringLiteral(s) => Some(vec![s.clone()]),
        TypeKind::Union(members) => members
            .iter()
            .map(|m| match oracle.kind(*m) {
                TypeKind::StringLiteral(s) => Some(s.clone()),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

/// A property shared by all members that is required everywhere and carries
/// pairwise-disjoint string literal values, with each member's values.
struct DiscriminatorProperty {
    name: String,
    values: Vec<Vec<String>>,
}

impl DiscriminatorProperty {
    /// Every branch must be a component reference so the mapping has somewhere to point.
    fn into_discriminator(self, branches: &[Schema]) -> Option<Discriminator> {
        let Some(branch_names) = branches.iter().map(Schema::ref_name).collect::<Option<Vec<_>>>() else {
            debug!("Union on {} has inline branches, skipping the discriminator", self.name);
            return None;
        };
        let mut mapping = IndexMap::new();
        for (values, branch) in self.values.iter().zip(branch_names) {
            for value in values {
                mapping.insert(value.clone(), format!("{}/{}", COMPONENTS_POINTER, branch));
            }
        }
        Some(Discriminator {
            property_name: self.name,
            mapping,
        })
    }
}

/// The first common property whose values tell the members apart.
fn discriminator_property<O: TypeOracle + ?Sized>(oracle: &O, members: &[TypeId]) -> Option<DiscriminatorProperty> {
    let member_props: Vec<_> = members.iter().map(|m| oracle.properties(*m)).collect();

    let candidates: Vec<String> = member_props
        .first()?
        .iter()
        .map(|p| p.name.clone())
        .filter(|name| member_props.iter().all(|props| props.iter().any(|p| &p.name == name)))
        .collect();

    'candidates: for candidate in candidates {
        let mut seen = HashSet::new();
        let mut values = Vec::with_capacity(members.len());
        for props in &member_props {
            let Some(prop) = props.iter().find(|p| p.name == candidate) else {
                continue 'candidates;
            };
            if prop.optional || oracle.includes_undefined(prop.ty) {
                continue 'candidates;
            }
            let Some(member_values) = string_literal_set(oracle, prop.ty) else {
                continue 'candidates;
            };
            for value in &member_values {
                if !seen.insert(value.clone()) {
                    continue 'candidates;
                }
            }
            values.push(member_values);
        }
        debug!("Detected discriminator property {}", candidate);
        return Some(DiscriminatorProperty {
            name: candidate,
            values,
        });
    }
    None
}
