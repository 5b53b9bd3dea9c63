use super::{Schema, SchemaGenerator};
use crate::oracle::{TypeId, TypeKind, TypeOracle};

/// Property names that mark an object as a nominal brand rather than data.
const BRAND_MARKERS: &[&str] = &["__brand", "_brand", "__type", "__tag", "__nominal", "__opaque"];

/// The primitive member of a branded type such as `number & { __brand: 'UserId' }`.
pub(super) fn brand_collapse<O: TypeOracle + ?Sized>(oracle: &O, members: &[TypeId]) -> Option<TypeId> {
    let mut primitive = None;
    for member in members {
        if oracle.kind(*member).is_primitive_like() {
            if primitive.is_some() {
                return None;
            }
            primitive = Some(*member);
        } else if !is_brand_object(oracle, *member) {
            return None;
        }
    }
    primitive
}

fn is_brand_object<O: TypeOracle + ?Sized>(oracle: &O, ty: TypeId) -> bool {
    match oracle.kind(ty) {
        TypeKind::Object(shape) => {
            !shape.callable
                && shape.index_value.is_none()
                && shape
                    .properties
                    .iter()
                    .all(|p| BRAND_MARKERS.contains(&p.name.as_str()))
        }
        _ => false,
    }
}

/// `{}` and property-less interfaces contribute nothing to an `allOf`.
fn is_empty_object<O: TypeOracle + ?Sized>(oracle: &O, ty: TypeId) -> bool {
    match oracle.kind(ty) {
        TypeKind::Object(shape) => {
            !shape.callable && shape.index_value.is_none() && oracle.properties(ty).is_empty()
        }
        _ => false,
    }
}

pub(super) fn resolve_intersection<O: TypeOracle + ?Sized>(
    gen: &mut SchemaGenerator<'_, O>,
    members: &[TypeId],
) -> Schema {
    let oracle = gen.oracle();
    let mut branches = Vec::new();
    for member in members {
        if is_empty_object(oracle, *member) {
            continue;
        }
        let schema = gen.convert(*member);
        if gen.components().resolve(&schema).is_empty_object() {
            continue;
        }
        branches.push(schema);
    }
    match branches.len() {
        0 => Schema::typed("object"),
        1 => branches.remove(0),
        _ => Schema {
            all_of: Some(branches),
            ..Schema::default()
        },
    }
}
