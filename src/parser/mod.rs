//! Parser for TypeScript sources.
//!
//! Files are parsed by `swc_ecma_parser` and lowered into the declaration-level
//! [`ast`]: interfaces, type aliases, enums and classes with their decorators.
//! Statements, function bodies and initialisers are parsed but not kept, so
//! arbitrary application code around the declarations is tolerated.
//!
//! # Example
//!
//! ```
//! use ts_route_compiler::parser::{AstParser, ast::Item};
//! use std::path::Path;
//!
//! let parsed = AstParser::parse_source(
//!     Path::new("user.ts"),
//!     "export interface User { id: number; name: string }",
//! ).unwrap();
//! assert!(matches!(parsed.items[0], Item::Interface(_)));
//! ```

pub mod ast;

use crate::error::{Error, Result};
use ast::*;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use swc_common::sync::Lrc;
use swc_common::{FileName, Globals, SourceMap, Span, Spanned, GLOBALS};
use swc_ecma_ast as swc;
use swc_ecma_parser::{parse_file_as_module, Syntax, TsSyntax};

/// Parser entry points.
pub struct AstParser;

/// A successfully parsed source file.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// Declarations in source order
    pub items: Vec<Item>,
}

impl ParsedFile {
    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Class(class) => Some(class),
            _ => None,
        })
    }
}

impl AstParser {
    /// Reads and parses a single source file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TypeScript.
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::parse_source(path, &content)
    }

    /// Parses source text that was already loaded.
    pub fn parse_source(path: &Path, content: &str) -> Result<ParsedFile> {
        let source_map: Lrc<SourceMap> = Default::default();
        let source_file = source_map.new_source_file(
            FileName::Custom(path.display().to_string()).into(),
            content.to_string(),
        );
        let syntax = Syntax::Typescript(TsSyntax {
            decorators: true,
            ..Default::default()
        });

        let lowering = Lowering {
            source_map: &source_map,
            path,
        };
        let module = GLOBALS.set(&Globals::new(), || {
            let mut recovered = Vec::new();
            let module = parse_file_as_module(
                &source_file,
                syntax,
                swc::EsVersion::latest(),
                None,
                &mut recovered,
            )
            .map_err(|e| lowering.syntax_error(&e))?;
            match recovered.first() {
                Some(e) => Err(lowering.syntax_error(e)),
                None => Ok(module),
            }
        })?;

        let items = lowering.module_items(&module);
        debug!("Parsed {} declarations from {}", items.len(), path.display());
        Ok(ParsedFile {
            path: path.to_path_buf(),
            items,
        })
    }

    /// Parses several files, returning one result per path.
    pub fn parse_files(paths: &[PathBuf]) -> Vec<Result<ParsedFile>> {
        debug!("Parsing {} files", paths.len());
        paths
            .iter()
            .map(|path| {
                Self::parse_file(path).inspect_err(|e| {
                    warn!("Failed to parse {}: {}", path.display(), e);
                })
            })
            .collect()
    }
}

/// Maps the swc module tree onto [`ast`] nodes.
struct Lowering<'a> {
    source_map: &'a SourceMap,
    path: &'a Path,
}

impl Lowering<'_> {
    fn line(&self, span: Span) -> usize {
        self.source_map.lookup_char_pos(span.lo).line
    }

    fn syntax_error(&self, error: &swc_ecma_parser::error::Error) -> Error {
        Error::Parse {
            file: self.path.to_path_buf(),
            line: self.line(error.span()),
            message: error.kind().msg().into_owned(),
        }
    }

    fn module_items(&self, module: &swc::Module) -> Vec<Item> {
        let mut items = Vec::new();
        for module_item in &module.body {
            let decl = match module_item {
                swc::ModuleItem::Stmt(swc::Stmt::Decl(decl)) => decl,
                swc::ModuleItem::ModuleDecl(swc::ModuleDecl::ExportDecl(export)) => &export.decl,
                swc::ModuleItem::ModuleDecl(swc::ModuleDecl::ExportDefaultDecl(export)) => {
                    match &export.decl {
                        swc::DefaultDecl::Class(class) => {
                            let name = class
                                .ident
                                .as_ref()
                                .map(|ident| ident.sym.to_string())
                                .unwrap_or_else(|| "default".to_string());
                            items.push(Item::Class(self.class(name, &class.class)));
                        }
                        swc::DefaultDecl::TsInterfaceDecl(interface) => {
                            items.push(Item::Interface(self.interface(interface)));
                        }
                        swc::DefaultDecl::Fn(_) => {}
                    }
                    continue;
                }
                _ => continue,
            };
            match decl {
                swc::Decl::Class(class) => {
                    items.push(Item::Class(self.class(class.ident.sym.to_string(), &class.class)))
                }
                swc::Decl::TsInterface(interface) => items.push(Item::Interface(self.interface(interface))),
                swc::Decl::TsTypeAlias(alias) => items.push(Item::TypeAlias(self.type_alias(alias))),
                swc::Decl::TsEnum(decl) => items.push(Item::Enum(enum_decl(decl))),
                _ => {}
            }
        }
        items
    }

    fn interface(&self, decl: &swc::TsInterfaceDecl) -> InterfaceDecl {
        debug!("Parsed interface {}", decl.id.sym);
        InterfaceDecl {
            name: decl.id.sym.to_string(),
            type_params: type_params(decl.type_params.as_deref()),
            extends: decl
                .extends
                .iter()
                .filter_map(|parent| heritage(&parent.expr, parent.type_args.as_deref()))
                .collect(),
            body: object_type(&decl.body.body),
        }
    }

    fn type_alias(&self, decl: &swc::TsTypeAliasDecl) -> TypeAliasDecl {
        debug!("Parsed type alias {}", decl.id.sym);
        TypeAliasDecl {
            name: decl.id.sym.to_string(),
            type_params: type_params(decl.type_params.as_deref()),
            ty: type_node(&decl.type_ann),
        }
    }

    fn class(&self, name: String, class: &swc::Class) -> ClassDecl {
        let mut properties = Vec::new();
        let mut methods = Vec::new();

        for member in &class.body {
            match member {
                swc::ClassMember::Method(method) if method.kind == swc::MethodKind::Method => {
                    let Some(method_name) = prop_name(&method.key) else {
                        continue;
                    };
                    let function = &method.function;
                    methods.push(MethodDecl {
                        name: method_name,
                        decorators: self.decorators(&function.decorators),
                        params: function.params.iter().filter_map(|p| self.param(p)).collect(),
                        return_type: function.return_type.as_ref().map(|ann| type_node(&ann.type_ann)),
                        is_static: method.is_static,
                        line: self.line(method.span),
                    });
                }
                swc::ClassMember::ClassProp(prop) => {
                    let Some(prop_name) = prop_name(&prop.key) else {
                        continue;
                    };
                    properties.push(ClassProperty {
                        name: prop_name,
                        decorators: self.decorators(&prop.decorators),
                        ty: prop.type_ann.as_ref().map(|ann| type_node(&ann.type_ann)),
                        optional: prop.is_optional,
                        is_static: prop.is_static,
                    });
                }
                // constructors, accessors, private and computed members carry no routes or columns
                _ => {}
            }
        }

        debug!(
            "Parsed class {} ({} properties, {} methods)",
            name,
            properties.len(),
            methods.len()
        );
        ClassDecl {
            name,
            type_params: type_params(class.type_params.as_deref()),
            decorators: self.decorators(&class.decorators),
            extends: class
                .super_class
                .as_ref()
                .and_then(|expr| heritage(expr, class.super_type_params.as_deref())),
            properties,
            methods,
            line: self.line(class.span),
        }
    }

    fn decorators(&self, decorators: &[swc::Decorator]) -> Vec<Decorator> {
        decorators
            .iter()
            .filter_map(|decorator| {
                let (callee, args) = match &*decorator.expr {
                    swc::Expr::Call(call) => match &call.callee {
                        swc::Callee::Expr(callee) => (&**callee, call.args.as_slice()),
                        _ => return None,
                    },
                    other => (other, &[][..]),
                };
                let name = match callee {
                    swc::Expr::Ident(ident) => ident.sym.to_string(),
                    swc::Expr::Member(member) => match &member.prop {
                        swc::MemberProp::Ident(ident) => ident.sym.to_string(),
                        _ => return None,
                    },
                    _ => return None,
                };
                let args = args
                    .iter()
                    .map(|arg| match arg.spread {
                        Some(_) => DecoratorArg::NonLiteral,
                        None => literal(&arg.expr).map_or(DecoratorArg::NonLiteral, DecoratorArg::Literal),
                    })
                    .collect();
                Some(Decorator {
                    name,
                    args,
                    line: self.line(decorator.span),
                })
            })
            .collect()
    }

    fn param(&self, param: &swc::Param) -> Option<ParamDecl> {
        let decorators = self.decorators(&param.decorators);
        let (pat, has_initializer) = match &param.pat {
            swc::Pat::Assign(assign) => (&*assign.left, true),
            other => (other, false),
        };
        let (name, ty, optional) = match pat {
            swc::Pat::Ident(binding) => (
                binding.id.sym.to_string(),
                binding.type_ann.as_deref(),
                binding.id.optional,
            ),
            swc::Pat::Rest(rest) => {
                let name = match &*rest.arg {
                    swc::Pat::Ident(binding) => binding.id.sym.to_string(),
                    _ => "__destructured".to_string(),
                };
                (name, rest.type_ann.as_deref(), true)
            }
            swc::Pat::Object(object) => ("__destructured".to_string(), object.type_ann.as_deref(), object.optional),
            swc::Pat::Array(array) => ("__destructured".to_string(), array.type_ann.as_deref(), array.optional),
            _ => return None,
        };
        if name == "this" {
            return None;
        }
        Some(ParamDecl {
            name,
            decorators,
            ty: ty.map(|ann| type_node(&ann.type_ann)),
            optional,
            has_initializer,
        })
    }
}

fn enum_decl(decl: &swc::TsEnumDecl) -> EnumDecl {
    EnumDecl {
        name: decl.id.sym.to_string(),
        members: decl
            .members
            .iter()
            .map(|member| EnumMember {
                name: match &member.id {
                    swc::TsEnumMemberId::Ident(ident) => ident.sym.to_string(),
                    swc::TsEnumMemberId::Str(s) => s.value.to_string(),
                },
                value: member.init.as_deref().and_then(literal),
            })
            .collect(),
    }
}

fn type_params(decl: Option<&swc::TsTypeParamDecl>) -> Vec<TypeParam> {
    decl.map(|decl| {
        decl.params
            .iter()
            .map(|param| TypeParam {
                name: param.name.sym.to_string(),
                default: param.default.as_deref().map(type_node),
            })
            .collect()
    })
    .unwrap_or_default()
}

fn type_args(args: Option<&swc::TsTypeParamInstantiation>) -> Vec<TypeNode> {
    args.map(|args| args.params.iter().map(|arg| type_node(arg)).collect())
        .unwrap_or_default()
}

/// `extends` clauses of interfaces and classes; only named parents are kept.
fn heritage(expr: &swc::Expr, args: Option<&swc::TsTypeParamInstantiation>) -> Option<TypeNode> {
    Some(TypeNode::Reference {
        name: expr_path(expr)?,
        args: type_args(args),
    })
}

fn expr_path(expr: &swc::Expr) -> Option<String> {
    match expr {
        swc::Expr::Ident(ident) => Some(ident.sym.to_string()),
        swc::Expr::Member(member) => match &member.prop {
            swc::MemberProp::Ident(prop) => Some(format!("{}.{}", expr_path(&member.obj)?, prop.sym)),
            _ => None,
        },
        _ => None,
    }
}

fn entity_name(name: &swc::TsEntityName) -> String {
    match name {
        swc::TsEntityName::Ident(ident) => ident.sym.to_string(),
        swc::TsEntityName::TsQualifiedName(qualified) => {
            format!("{}.{}", entity_name(&qualified.left), qualified.right.sym)
        }
    }
}

fn prop_name(key: &swc::PropName) -> Option<String> {
    match key {
        swc::PropName::Ident(ident) => Some(ident.sym.to_string()),
        swc::PropName::Str(s) => Some(s.value.to_string()),
        swc::PropName::Num(n) => Some(number_value(n.value).to_string()),
        _ => None,
    }
}

fn type_node(ty: &swc::TsType) -> TypeNode {
    use swc::TsKeywordTypeKind as K;

    match ty {
        swc::TsType::TsKeywordType(keyword) => TypeNode::Keyword(match keyword.kind {
            K::TsStringKeyword => Keyword::String,
            K::TsNumberKeyword => Keyword::Number,
            K::TsBooleanKeyword => Keyword::Boolean,
            K::TsBigIntKeyword => Keyword::BigInt,
            K::TsNullKeyword => Keyword::Null,
            K::TsUndefinedKeyword => Keyword::Undefined,
            K::TsAnyKeyword => Keyword::Any,
            K::TsUnknownKeyword => Keyword::Unknown,
            K::TsVoidKeyword => Keyword::Void,
            K::TsNeverKeyword => Keyword::Never,
            K::TsObjectKeyword => Keyword::Object,
            K::TsSymbolKeyword => Keyword::Symbol,
            K::TsIntrinsicKeyword => return TypeNode::Unsupported("intrinsic".to_string()),
        }),
        swc::TsType::TsTypeRef(reference) => TypeNode::Reference {
            name: entity_name(&reference.type_name),
            args: type_args(reference.type_params.as_deref()),
        },
        swc::TsType::TsLitType(lit) => match &lit.lit {
            swc::TsLit::Str(s) => TypeNode::StringLiteral(s.value.to_string()),
            swc::TsLit::Number(n) => TypeNode::NumberLiteral(n.value),
            swc::TsLit::Bool(b) => TypeNode::BooleanLiteral(b.value),
            swc::TsLit::BigInt(_) => TypeNode::Keyword(Keyword::BigInt),
            swc::TsLit::Tpl(_) => TypeNode::Keyword(Keyword::String),
        },
        swc::TsType::TsArrayType(array) => TypeNode::Array(Box::new(type_node(&array.elem_type))),
        swc::TsType::TsTupleType(tuple) => TypeNode::Tuple(
            tuple
                .elem_types
                .iter()
                .map(|element| match &*element.ty {
                    swc::TsType::TsRestType(rest) => match type_node(&rest.type_ann) {
                        TypeNode::Array(inner) => *inner,
                        other => other,
                    },
                    swc::TsType::TsOptionalType(optional) => type_node(&optional.type_ann),
                    other => type_node(other),
                })
                .collect(),
        ),
        swc::TsType::TsOptionalType(optional) => type_node(&optional.type_ann),
        swc::TsType::TsRestType(rest) => type_node(&rest.type_ann),
        swc::TsType::TsUnionOrIntersectionType(swc::TsUnionOrIntersectionType::TsUnionType(union)) => {
            TypeNode::Union(union.types.iter().map(|member| type_node(member)).collect())
        }
        swc::TsType::TsUnionOrIntersectionType(swc::TsUnionOrIntersectionType::TsIntersectionType(
            intersection,
        )) => TypeNode::Intersection(intersection.types.iter().map(|member| type_node(member)).collect()),
        swc::TsType::TsParenthesizedType(inner) => type_node(&inner.type_ann),
        swc::TsType::TsTypeLit(object) => TypeNode::Object(object_type(&object.members)),
        swc::TsType::TsFnOrConstructorType(_) => TypeNode::Function,
        swc::TsType::TsTypePredicate(_) => TypeNode::Keyword(Keyword::Boolean),
        swc::TsType::TsTypeOperator(operator) => match operator.op {
            swc::TsTypeOperatorOp::KeyOf => TypeNode::Unsupported("keyof".to_string()),
            swc::TsTypeOperatorOp::ReadOnly | swc::TsTypeOperatorOp::Unique => type_node(&operator.type_ann),
        },
        swc::TsType::TsTypeQuery(_) => TypeNode::Unsupported("typeof".to_string()),
        swc::TsType::TsConditionalType(_) => TypeNode::Unsupported("conditional type".to_string()),
        swc::TsType::TsMappedType(_) => TypeNode::Unsupported("mapped type".to_string()),
        swc::TsType::TsIndexedAccessType(_) => TypeNode::Unsupported("indexed access type".to_string()),
        swc::TsType::TsInferType(_) => TypeNode::Unsupported("infer".to_string()),
        swc::TsType::TsThisType(_) => TypeNode::Unsupported("this".to_string()),
        swc::TsType::TsImportType(_) => TypeNode::Unsupported("import type".to_string()),
    }
}

fn object_type(members: &[swc::TsTypeElement]) -> ObjectTypeNode {
    let mut object = ObjectTypeNode::default();
    for member in members {
        match member {
            swc::TsTypeElement::TsPropertySignature(prop) => {
                if prop.computed {
                    continue;
                }
                let name = match &*prop.key {
                    swc::Expr::Ident(ident) => ident.sym.to_string(),
                    swc::Expr::Lit(swc::Lit::Str(s)) => s.value.to_string(),
                    swc::Expr::Lit(swc::Lit::Num(n)) => number_value(n.value).to_string(),
                    _ => continue,
                };
                let ty = prop
                    .type_ann
                    .as_ref()
                    .map_or(TypeNode::Keyword(Keyword::Any), |ann| type_node(&ann.type_ann));
                object.properties.push(PropertySignature {
                    name,
                    ty,
                    optional: prop.optional,
                });
            }
            swc::TsTypeElement::TsIndexSignature(index) => {
                object.index_value = Some(Box::new(
                    index
                        .type_ann
                        .as_ref()
                        .map_or(TypeNode::Keyword(Keyword::Any), |ann| type_node(&ann.type_ann)),
                ));
            }
            swc::TsTypeElement::TsCallSignatureDecl(_) | swc::TsTypeElement::TsConstructSignatureDecl(_) => {
                object.callable = true;
            }
            // method signatures and accessors are not data properties
            _ => {}
        }
    }
    object
}

/// Evaluates a constant expression; anything else is `None`.
fn literal(expr: &swc::Expr) -> Option<Value> {
    match expr {
        swc::Expr::Lit(swc::Lit::Str(s)) => Some(Value::String(s.value.to_string())),
        swc::Expr::Lit(swc::Lit::Num(n)) => Some(number_value(n.value)),
        swc::Expr::Lit(swc::Lit::Bool(b)) => Some(Value::Bool(b.value)),
        swc::Expr::Lit(swc::Lit::Null(_)) => Some(Value::Null),
        swc::Expr::Unary(unary) if unary.op == swc::UnaryOp::Minus => match &*unary.arg {
            swc::Expr::Lit(swc::Lit::Num(n)) => Some(number_value(-n.value)),
            _ => None,
        },
        swc::Expr::Tpl(tpl) if tpl.exprs.is_empty() => tpl
            .quasis
            .first()
            .and_then(|quasi| quasi.cooked.as_ref())
            .map(|cooked| Value::String(cooked.to_string())),
        swc::Expr::Paren(paren) => literal(&paren.expr),
        swc::Expr::TsConstAssertion(assertion) => literal(&assertion.expr),
        swc::Expr::Array(array) => array
            .elems
            .iter()
            .map(|element| match element {
                Some(element) if element.spread.is_none() => literal(&element.expr),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        swc::Expr::Object(object) => {
            let mut map = Map::new();
            for prop in &object.props {
                let swc::PropOrSpread::Prop(prop) = prop else {
                    return None;
                };
                let swc::Prop::KeyValue(entry) = &**prop else {
                    return None;
                };
                map.insert(prop_name(&entry.key)?, literal(&entry.value)?);
            }
            Some(Value::Object(map))
        }
        _ => None,
    }
}

/// Renders a number as an integer JSON value when it has no fractional part.
pub(crate) fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(src: &str) -> Vec<Item> {
        AstParser::parse_source(Path::new("test.ts"), src).unwrap().items
    }

    fn alias_type(src: &str) -> TypeNode {
        match parse(src).remove(0) {
            Item::TypeAlias(alias) => alias.ty,
            other => panic!("expected type alias, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_interface_with_optional_and_index() {
        let items = parse(
            r#"
            export interface User extends Base {
                readonly id: number;
                name?: string,
                [key: string]: unknown
                greet(): void;
            }
            "#,
        );
        let Item::Interface(user) = &items[0] else {
            panic!("expected interface");
        };
        assert_eq!(user.name, "User");
        assert_eq!(user.extends, vec![TypeNode::reference("Base")]);
        assert_eq!(user.body.properties.len(), 2);
        assert!(user.body.properties[1].optional);
        assert_eq!(
            user.body.index_value.as_deref(),
            Some(&TypeNode::Keyword(Keyword::Unknown))
        );
    }

    #[test]
    fn test_parse_union_and_literals() {
        assert_eq!(
            alias_type("type Kind = | 'a' | \"b\" | 3 | -1 | true | null;"),
            TypeNode::Union(vec![
                TypeNode::StringLiteral("a".to_string()),
                TypeNode::StringLiteral("b".to_string()),
                TypeNode::NumberLiteral(3.0),
                TypeNode::NumberLiteral(-1.0),
                TypeNode::BooleanLiteral(true),
                TypeNode::Keyword(Keyword::Null),
            ])
        );
    }

    #[test]
    fn test_parse_generic_reference_and_arrays() {
        assert_eq!(
            alias_type("type X = Promise<Map<string, User[]>>"),
            TypeNode::Reference {
                name: "Promise".to_string(),
                args: vec![TypeNode::Reference {
                    name: "Map".to_string(),
                    args: vec![
                        TypeNode::Keyword(Keyword::String),
                        TypeNode::Array(Box::new(TypeNode::reference("User"))),
                    ],
                }],
            }
        );
    }

    #[test]
    fn test_parse_intersection_precedence() {
        assert_eq!(
            alias_type("type UserId = number & { __brand: 'UserId' } | null"),
            TypeNode::Union(vec![
                TypeNode::Intersection(vec![
                    TypeNode::Keyword(Keyword::Number),
                    TypeNode::Object(ObjectTypeNode {
                        properties: vec![PropertySignature {
                            name: "__brand".to_string(),
                            ty: TypeNode::StringLiteral("UserId".to_string()),
                            optional: false,
                        }],
                        index_value: None,
                        callable: false,
                    }),
                ]),
                TypeNode::Keyword(Keyword::Null),
            ])
        );
    }

    #[test]
    fn test_parse_function_and_unsupported_types() {
        assert_eq!(alias_type("type F = (a: string) => void"), TypeNode::Function);
        assert_eq!(
            alias_type("type K = keyof User"),
            TypeNode::Unsupported("keyof".to_string())
        );
        assert_eq!(
            alias_type("type M = { [K in Keys]: string }"),
            TypeNode::Unsupported("mapped type".to_string())
        );
        assert_eq!(
            alias_type("type P = (string | number)[]"),
            TypeNode::Array(Box::new(TypeNode::Union(vec![
                TypeNode::Keyword(Keyword::String),
                TypeNode::Keyword(Keyword::Number),
            ])))
        );
    }

    #[test]
    fn test_parse_tuple() {
        assert_eq!(
            alias_type("type T = [name: string, age?: number]"),
            TypeNode::Tuple(vec![
                TypeNode::Keyword(Keyword::String),
                TypeNode::Keyword(Keyword::Number),
            ])
        );
    }

    #[test]
    fn test_parse_enum() {
        let items = parse("export enum Status { Active = 'active', Archived = \"archived\" }\nenum Level { Low, High = 10 }");
        let Item::Enum(status) = &items[0] else {
            panic!("expected enum");
        };
        assert_eq!(status.members[0].value, Some(json!("active")));
        let Item::Enum(level) = &items[1] else {
            panic!("expected enum");
        };
        assert_eq!(level.members[0].value, None);
        assert_eq!(level.members[1].value, Some(json!(10)));
    }

    #[test]
    fn test_parse_controller_class() {
        let items = parse(
            r#"
            import { Controller, Get, Post } from '@app/core';
            import type { User } from './user';

            @Controller('/users')
            export class UserController extends BaseController {
                private readonly cache = new Map<string, User>();
                constructor(private readonly service: UserService) {
                    super();
                }

                @Get('/:id')
                async get(id: number, @Headers() headers?: { auth: string }): Promise<User> {
                    if (id > 0) { return this.service.find(id); }
                    throw new Error(`missing ${id}`);
                }

                @Post()
                @HttpCode(201)
                create(body: CreateUserPayload, page = 1): Promise<User> {
                    return this.service.create(body);
                }

                static helper() {}
            }

            const app = createApp({ controllers: [UserController] });
            "#,
        );
        assert_eq!(items.len(), 1);
        let Item::Class(class) = &items[0] else {
            panic!("expected class");
        };
        assert_eq!(class.name, "UserController");
        assert_eq!(class.decorators[0].name, "Controller");
        assert_eq!(class.decorators[0].string_arg(), Some("/users"));
        assert_eq!(class.extends, Some(TypeNode::reference("BaseController")));
        assert_eq!(class.properties.len(), 1);
        assert_eq!(class.properties[0].name, "cache");

        assert_eq!(class.methods.len(), 3);
        let get = &class.methods[0];
        assert_eq!(get.name, "get");
        assert_eq!(get.decorators[0].string_arg(), Some("/:id"));
        assert_eq!(get.params.len(), 2);
        assert_eq!(get.params[1].decorators[0].name, "Headers");
        assert!(get.params[1].optional);

        let create = &class.methods[1];
        assert_eq!(create.decorators.len(), 2);
        assert!(create.decorators[0].args.is_empty());
        assert_eq!(create.decorators[1].literal_arg(), Some(&json!(201)));
        assert!(create.params[1].has_initializer);
        assert!(create.params[1].ty.is_none());
        assert!(class.methods[2].is_static);
    }

    #[test]
    fn test_method_bodies_with_regex_and_quotes() {
        let items = parse(
            r#"
            @Controller('/text')
            export class TextController {
                @Get()
                strip(): string {
                    return "it's".replace(/'/g, '').replace(/\{/g, '') / 2 + `}${'{'}`;
                }

                @Get('/:id')
                one(id: number): string {
                    const pattern = /[{}"]+/;
                    return pattern.source;
                }
            }
            "#,
        );
        let Item::Class(class) = &items[0] else {
            panic!("expected class");
        };
        let names: Vec<_> = class.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["strip", "one"]);
        assert_eq!(class.methods[1].decorators[0].string_arg(), Some("/:id"));
    }

    #[test]
    fn test_non_literal_decorator_arguments_are_ignored() {
        let items = parse(
            r#"
            @Controller(BASE + '/users', { version: 1, guard: authGuard })
            class C {
                @Get(['/a', '/b'])
                list() {}
            }
            "#,
        );
        let Item::Class(class) = &items[0] else {
            panic!("expected class");
        };
        assert_eq!(
            class.decorators[0].args,
            vec![DecoratorArg::NonLiteral, DecoratorArg::NonLiteral]
        );
        assert_eq!(class.decorators[0].string_arg(), None);
        assert_eq!(class.methods[0].decorators[0].string_args(), vec!["/a", "/b"]);
    }

    #[test]
    fn test_entity_property_decorators() {
        let items = parse(
            r#"
            @Entity('users')
            export class UserEntity {
                @PrimaryGeneratedColumn()
                id!: number;

                @Column({ type: 'varchar', nullable: true })
                nickname?: string;

                @ManyToOne(() => Team, (team) => team.members)
                team: Team
                @CreateDateColumn() createdAt: Date = new Date()
            }
            "#,
        );
        let Item::Class(class) = &items[0] else {
            panic!("expected class");
        };
        let names: Vec<_> = class.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id", "nickname", "team", "createdAt"]);
        assert_eq!(
            class.properties[1].decorators[0].literal_arg(),
            Some(&json!({"type": "varchar", "nullable": true}))
        );
        assert_eq!(class.properties[2].decorators[0].args, vec![DecoratorArg::NonLiteral, DecoratorArg::NonLiteral]);
    }

    #[test]
    fn test_skips_functions_and_statements() {
        let items = parse(
            r#"
            export function helper(a: number): { x: number } {
                return { x: a };
            }
            export const routes = [1, 2, 3];
            export default routes;
            export * from './other';
            type Id = string;
            "#,
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name(), "Id");
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = AstParser::parse_source(Path::new("bad.ts"), "\ninterface A {\n  a: ;\n}").unwrap_err();
        match err {
            Error::Parse { line, file, .. } => {
                assert_eq!(line, 3);
                assert_eq!(file, PathBuf::from("bad.ts"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_parse_files_reports_each_result() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let good = temp_dir.path().join("good.ts");
        let bad = temp_dir.path().join("bad.ts");
        std::fs::write(&good, "type A = string;").unwrap();
        std::fs::write(&bad, "type B = ;").unwrap();
        let results = AstParser::parse_files(&[good, bad]);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
