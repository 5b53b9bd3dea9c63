//! Declaration-level syntax tree for TypeScript sources.

use serde_json::Value;

/// Top-level declarations recovered from a source file.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Interface(InterfaceDecl),
    TypeAlias(TypeAliasDecl),
    Enum(EnumDecl),
    Class(ClassDecl),
}

impl Item {
    pub fn name(&self) -> &str {
        match self {
            Item::Interface(d) => &d.name,
            Item::TypeAlias(d) => &d.name,
            Item::Enum(d) => &d.name,
            Item::Class(d) => &d.name,
        }
    }
}

/// A decorator application such as `@Get('/users/:id')`.
#[derive(Debug, Clone, PartialEq)]
pub struct Decorator {
    pub name: String,
    pub args: Vec<DecoratorArg>,
    pub line: usize,
}

/// Decorator arguments: only literal constants are captured.
#[derive(Debug, Clone, PartialEq)]
pub enum DecoratorArg {
    Literal(Value),
    NonLiteral,
}

impl Decorator {
    /// The first argument if it is a string literal.
    pub fn string_arg(&self) -> Option<&str> {
        match self.args.first() {
            Some(DecoratorArg::Literal(Value::String(s))) => Some(s),
            _ => None,
        }
    }

    /// All string literal arguments, flattening array literals.
    pub fn string_args(&self) -> Vec<String> {
        let mut out = Vec::new();
        for arg in &self.args {
            match arg {
                DecoratorArg::Literal(Value::String(s)) => out.push(s.clone()),
                DecoratorArg::Literal(Value::Array(items)) => {
                    out.extend(items.iter().filter_map(|v| v.as_str().map(str::to_string)))
                }
                _ => {}
            }
        }
        out
    }

    /// The first argument if it is a literal (of any JSON type).
    pub fn literal_arg(&self) -> Option<&Value> {
        match self.args.first() {
            Some(DecoratorArg::Literal(v)) => Some(v),
            _ => None,
        }
    }
}

pub fn find_decorator<'a>(decorators: &'a [Decorator], name: &str) -> Option<&'a Decorator> {
    decorators.iter().find(|d| d.name == name)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: String,
    pub default: Option<TypeNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub extends: Vec<TypeNode>,
    pub body: ObjectTypeNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDecl {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub ty: TypeNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: String,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: String,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub decorators: Vec<Decorator>,
    pub extends: Option<TypeNode>,
    pub properties: Vec<ClassProperty>,
    pub methods: Vec<MethodDecl>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassProperty {
    pub name: String,
    pub decorators: Vec<Decorator>,
    pub ty: Option<TypeNode>,
    pub optional: bool,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub decorators: Vec<Decorator>,
    pub params: Vec<ParamDecl>,
    pub return_type: Option<TypeNode>,
    pub is_static: bool,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub decorators: Vec<Decorator>,
    pub ty: Option<TypeNode>,
    pub optional: bool,
    pub has_initializer: bool,
}

/// Type syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeNode {
    Keyword(Keyword),
    StringLiteral(String),
    NumberLiteral(f64),
    BooleanLiteral(bool),
    Reference { name: String, args: Vec<TypeNode> },
    Array(Box<TypeNode>),
    Tuple(Vec<TypeNode>),
    Union(Vec<TypeNode>),
    Intersection(Vec<TypeNode>),
    Object(ObjectTypeNode),
    Function,
    /// typeof, keyof, conditional, mapped and indexed-access types
    Unsupported(String),
}

impl TypeNode {
    pub fn reference(name: &str) -> Self {
        TypeNode::Reference {
            name: name.to_string(),
            args: Vec::new(),
        }
    }

    /// The referenced name when the node is a plain type reference.
    pub fn reference_name(&self) -> Option<&str> {
        match self {
            TypeNode::Reference { name, .. } => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    String,
    Number,
    Boolean,
    BigInt,
    Null,
    Undefined,
    Any,
    Unknown,
    Void,
    Never,
    Object,
    Symbol,
}

impl Keyword {
    pub fn from_ident(ident: &str) -> Option<Self> {
        Some(match ident {
            "string" => Keyword::String,
            "number" => Keyword::Number,
            "boolean" => Keyword::Boolean,
            "bigint" => Keyword::BigInt,
            "null" => Keyword::Null,
            "undefined" => Keyword::Undefined,
            "any" => Keyword::Any,
            "unknown" => Keyword::Unknown,
            "void" => Keyword::Void,
            "never" => Keyword::Never,
            "object" => Keyword::Object,
            "symbol" => Keyword::Symbol,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectTypeNode {
    pub properties: Vec<PropertySignature>,
    pub index_value: Option<Box<TypeNode>>,
    pub callable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySignature {
    pub name: String,
    pub ty: TypeNode,
    pub optional: bool,
}
