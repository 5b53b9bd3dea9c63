//! The type-checking oracle consumed by the schema generator and the scanner.
//!
//! Everything downstream of the parser asks questions about types through
//! [`TypeOracle`] and never looks at declarations directly, so the converter is
//! independent of how types are represented or where they come from.

use crate::parser::ast::TypeNode;
use std::fmt;

/// Opaque handle to a type owned by the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type category, the equivalent of a checker's type flags.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Any,
    Unknown,
    Never,
    Void,
    Undefined,
    Null,
    String,
    Number,
    Boolean,
    BigInt,
    StringLiteral(String),
    NumberLiteral(f64),
    BooleanLiteral(bool),
    Union(Vec<TypeId>),
    Intersection(Vec<TypeId>),
    /// Structural object type (interfaces, classes, object literals)
    Object(ObjectShape),
    Array { element: TypeId, unique: bool },
    Tuple(Vec<TypeId>),
    Record { key: TypeId, value: TypeId },
    Promise(TypeId),
    Date,
    /// `Body<T>`, `Query<T>`, `Headers<T>`, `Cookies<T>`
    Marker { marker: MarkerKind, inner: TypeId },
    /// Reserved slot for a declaration whose body is still being resolved
    Pending,
}

impl TypeKind {
    pub fn is_primitive_like(&self) -> bool {
        matches!(
            self,
            TypeKind::String
                | TypeKind::Number
                | TypeKind::Boolean
                | TypeKind::BigInt
                | TypeKind::StringLiteral(_)
                | TypeKind::NumberLiteral(_)
                | TypeKind::BooleanLiteral(_)
        )
    }
}

/// Properties, index signature and call signatures of an object type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectShape {
    pub properties: Vec<PropertyInfo>,
    pub index_value: Option<TypeId>,
    pub callable: bool,
}

/// A property symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyInfo {
    pub name: String,
    pub ty: TypeId,
    pub optional: bool,
}

/// Explicit binding marker types recognised by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Body,
    Query,
    Headers,
    Cookies,
}

impl MarkerKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Body" => Some(MarkerKind::Body),
            "Query" => Some(MarkerKind::Query),
            "Headers" => Some(MarkerKind::Headers),
            "Cookies" => Some(MarkerKind::Cookies),
            _ => None,
        }
    }
}

/// Synthetic symbol name carried by anonymous object literal types.
pub const ANONYMOUS_SYMBOL: &str = "__type";

/// Narrow query interface over a host type system.
pub trait TypeOracle {
    /// Category of the type.
    fn kind(&self, ty: TypeId) -> &TypeKind;

    /// Own and inherited properties of an object-like type, in declaration order.
    /// Intersections report the merged properties of their members.
    fn properties(&self, ty: TypeId) -> Vec<PropertyInfo>;

    /// Element type when the type is array-like; the flag is set for set-like types.
    fn array_element(&self, ty: TypeId) -> Option<(TypeId, bool)>;

    /// Value type when the type is a two-argument record-like generic.
    fn record_value(&self, ty: TypeId) -> Option<TypeId>;

    /// Whether the type has call or construct signatures.
    fn has_call_signatures(&self, ty: TypeId) -> bool;

    /// Name of the type alias the type was declared through.
    fn alias_name(&self, ty: TypeId) -> Option<&str>;

    /// Name of the declared symbol (interface, class, enum); anonymous object
    /// literals report [`ANONYMOUS_SYMBOL`].
    fn symbol_name(&self, ty: TypeId) -> Option<&str>;

    /// Name of a type alias declaration whose body resolved to this type.
    fn enclosing_alias(&self, ty: TypeId) -> Option<&str>;

    /// Human readable rendering, used in logs.
    fn type_to_string(&self, ty: TypeId) -> String;

    /// `T` for `Promise<T>`.
    fn promised_type(&self, ty: TypeId) -> Option<TypeId> {
        match self.kind(ty) {
            TypeKind::Promise(inner) => Some(*inner),
            _ => None,
        }
    }

    /// Whether the type is `undefined` or a union containing it.
    fn includes_undefined(&self, ty: TypeId) -> bool {
        match self.kind(ty) {
            TypeKind::Undefined | TypeKind::Void => true,
            TypeKind::Union(members) => members
                .iter()
                .any(|m| matches!(self.kind(*m), TypeKind::Undefined | TypeKind::Void)),
            _ => false,
        }
    }
}

/// An oracle that also resolves type annotations written in source.
///
/// The scanner resolves parameter and return annotations through this and asks
/// every other question through [`TypeOracle`].
pub trait AnnotationResolver: TypeOracle {
    fn resolve_annotation(&mut self, node: &TypeNode) -> TypeId;
}
