use crate::oracle::{
    AnnotationResolver, MarkerKind, ObjectShape, PropertyInfo, TypeId, TypeKind, TypeOracle,
    ANONYMOUS_SYMBOL,
};
use crate::parser::ast::{
    ClassDecl, EnumDecl, InterfaceDecl, Item, Keyword, ObjectTypeNode, TypeAliasDecl, TypeNode,
    TypeParam,
};
use crate::parser::ParsedFile;
use log::{debug, warn};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

const ANY: TypeId = TypeId(0);
const UNKNOWN: TypeId = TypeId(1);
const NEVER: TypeId = TypeId(2);
const VOID: TypeId = TypeId(3);
const UNDEFINED: TypeId = TypeId(4);
const NULL: TypeId = TypeId(5);
const STRING: TypeId = TypeId(6);
const NUMBER: TypeId = TypeId(7);
const BOOLEAN: TypeId = TypeId(8);
const BIGINT: TypeId = TypeId(9);
const DATE: TypeId = TypeId(10);

/// Generic instantiations nested deeper than this resolve to `unknown`.
const MAX_INSTANTIATION_DEPTH: usize = 32;

/// Type resolver - indexes declarations from parsed files and resolves type
/// syntax into an arena of types that it answers [`TypeOracle`] queries about.
pub struct TypeResolver {
    /// Declarations indexed by name across all files
    declarations: HashMap<String, Declaration>,
    /// Type arena
    types: Vec<TypeData>,
    /// Declaration instances keyed by name and type arguments
    instances: HashMap<(String, Vec<TypeId>), TypeId>,
    literals: HashMap<LiteralKey, TypeId>,
    enclosing_aliases: HashMap<TypeId, String>,
    /// Alias-to-reference chains currently being followed
    resolving_aliases: HashSet<String>,
    depth: usize,
}

#[derive(Debug, Clone)]
struct TypeData {
    kind: TypeKind,
    alias_name: Option<String>,
    symbol_name: Option<String>,
}

#[derive(Debug, Clone)]
enum Declaration {
    Interface(InterfaceDecl),
    Alias(TypeAliasDecl),
    Enum(EnumDecl),
    Class(ClassDecl),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LiteralKey {
    Str(String),
    Num(u64),
    Bool(bool),
}

type Env = HashMap<String, TypeId>;

impl TypeResolver {
    /// Create a new TypeResolver over the declarations of the parsed files
    pub fn new(parsed_files: &[ParsedFile]) -> Self {
        debug!("Initializing TypeResolver with {} files", parsed_files.len());
        let mut declarations = HashMap::new();
        for file in parsed_files {
            for item in &file.items {
                let decl = match item {
                    Item::Interface(d) => Declaration::Interface(d.clone()),
                    Item::TypeAlias(d) => Declaration::Alias(d.clone()),
                    Item::Enum(d) => Declaration::Enum(d.clone()),
                    Item::Class(d) => Declaration::Class(d.clone()),
                };
                if declarations.contains_key(item.name()) {
                    warn!(
                        "Duplicate declaration of {} in {}, keeping the first one",
                        item.name(),
                        file.path.display()
                    );
                    continue;
                }
                declarations.insert(item.name().to_string(), decl);
            }
        }

        let primitive = |kind| TypeData {
            kind,
            alias_name: None,
            symbol_name: None,
        };
        let types = vec![
            primitive(TypeKind::Any),
            primitive(TypeKind::Unknown),
            primitive(TypeKind::Never),
            primitive(TypeKind::Void),
            primitive(TypeKind::Undefined),
            primitive(TypeKind::Null),
            primitive(TypeKind::String),
            primitive(TypeKind::Number),
            primitive(TypeKind::Boolean),
            primitive(TypeKind::BigInt),
            TypeData {
                kind: TypeKind::Date,
                alias_name: None,
                symbol_name: Some("Date".to_string()),
            },
        ];

        Self {
            declarations,
            types,
            instances: HashMap::new(),
            literals: HashMap::new(),
            enclosing_aliases: HashMap::new(),
            resolving_aliases: HashSet::new(),
            depth: 0,
        }
    }

    /// Resolve a type annotation written outside any generic scope
    pub fn resolve_type_node(&mut self, node: &TypeNode) -> TypeId {
        self.resolve_node(node, &Env::new())
    }

    /// Resolve a declared type by name, without type arguments
    pub fn resolve_named(&mut self, name: &str) -> Option<TypeId> {
        if !self.declarations.contains_key(name) {
            debug!("Type {} not declared", name);
            return None;
        }
        Some(self.instantiate(name, Vec::new()))
    }

    /// Number of types allocated so far
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    fn alloc(&mut self, kind: TypeKind, alias_name: Option<String>, symbol_name: Option<String>) -> TypeId {
        self.types.push(TypeData {
            kind,
            alias_name,
            symbol_name,
        });
        TypeId(self.types.len() - 1)
    }

    fn literal(&mut self, key: LiteralKey) -> TypeId {
        if let Some(id) = self.literals.get(&key) {
            return *id;
        }
        let kind = match &key {
            LiteralKey::Str(s) => TypeKind::StringLiteral(s.clone()),
            LiteralKey::Num(bits) => TypeKind::NumberLiteral(f64::from_bits(*bits)),
            LiteralKey::Bool(b) => TypeKind::BooleanLiteral(*b),
        };
        let id = self.alloc(kind, None, None);
        self.literals.insert(key, id);
        id
    }

    fn number_literal(&mut self, value: f64) -> TypeId {
        // normalise -0.0
        let value = if value == 0.0 { 0.0 } else { value };
        self.literal(LiteralKey::Num(value.to_bits()))
    }

    fn resolve_node(&mut self, node: &TypeNode, env: &Env) -> TypeId {
        match node {
            TypeNode::Keyword(keyword) => match keyword {
                Keyword::String => STRING,
                Keyword::Number => NUMBER,
                Keyword::Boolean => BOOLEAN,
                Keyword::BigInt => BIGINT,
                Keyword::Null => NULL,
                Keyword::Undefined => UNDEFINED,
                Keyword::Any => ANY,
                Keyword::Unknown | Keyword::Symbol => UNKNOWN,
                Keyword::Void => VOID,
                Keyword::Never => NEVER,
                Keyword::Object => self.alloc(
                    TypeKind::Object(ObjectShape::default()),
                    None,
                    Some(ANONYMOUS_SYMBOL.to_string()),
                ),
            },
            TypeNode::StringLiteral(s) => self.literal(LiteralKey::Str(s.clone())),
            TypeNode::NumberLiteral(n) => self.number_literal(*n),
            TypeNode::BooleanLiteral(b) => self.literal(LiteralKey::Bool(*b)),
            TypeNode::Reference { name, args } => self.resolve_reference(name, args, env),
            TypeNode::Array(inner) => {
                let element = self.resolve_node(inner, env);
                self.alloc(TypeKind::Array { element, unique: false }, None, None)
            }
            TypeNode::Tuple(elements) => {
                let elements = elements.iter().map(|e| self.resolve_node(e, env)).collect();
                self.alloc(TypeKind::Tuple(elements), None, None)
            }
            TypeNode::Union(members) => {
                let members: Vec<TypeId> = members.iter().map(|m| self.resolve_node(m, env)).collect();
                self.make_union(members)
            }
            TypeNode::Intersection(members) => {
                let mut flat = Vec::new();
                for member in members {
                    let id = self.resolve_node(member, env);
                    match &self.types[id.0].kind {
                        TypeKind::Intersection(inner) if self.types[id.0].alias_name.is_none() => {
                            flat.extend(inner.iter().copied())
                        }
                        _ => flat.push(id),
                    }
                }
                self.alloc(TypeKind::Intersection(flat), None, None)
            }
            TypeNode::Object(object) => {
                let shape = self.resolve_object(object, env);
                self.alloc(TypeKind::Object(shape), None, Some(ANONYMOUS_SYMBOL.to_string()))
            }
            TypeNode::Function => self.alloc(
                TypeKind::Object(ObjectShape {
                    callable: true,
                    ..ObjectShape::default()
                }),
                None,
                Some(ANONYMOUS_SYMBOL.to_string()),
            ),
            TypeNode::Unsupported(what) => {
                debug!("Unsupported type syntax ({}), resolving to unknown", what);
                UNKNOWN
            }
        }
    }

    fn resolve_object(&mut self, object: &ObjectTypeNode, env: &Env) -> ObjectShape {
        let properties = object
            .properties
            .iter()
            .map(|p| PropertyInfo {
                name: p.name.clone(),
                ty: self.resolve_node(&p.ty, env),
                optional: p.optional,
            })
            .collect();
        let index_value = object.index_value.as_ref().map(|v| self.resolve_node(v, env));
        ObjectShape {
            properties,
            index_value,
            callable: object.callable,
        }
    }

    /// Builds a union, flattening nested anonymous unions and dropping duplicates.
    fn make_union(&mut self, members: Vec<TypeId>) -> TypeId {
        let mut flat: Vec<TypeId> = Vec::new();
        for member in members {
            let data = &self.types[member.0];
            match &data.kind {
                TypeKind::Union(inner) if data.alias_name.is_none() && data.symbol_name.is_none() => {
                    for m in inner.clone() {
                        if !flat.contains(&m) {
                            flat.push(m);
                        }
                    }
                }
                TypeKind::Never => {}
                TypeKind::Any => return ANY,
                TypeKind::Unknown => return UNKNOWN,
                _ => {
                    if !flat.contains(&member) {
                        flat.push(member);
                    }
                }
            }
        }
        match flat.len() {
            0 => NEVER,
            1 => flat[0],
            _ => self.alloc(TypeKind::Union(flat), None, None),
        }
    }

    fn resolve_reference(&mut self, name: &str, args: &[TypeNode], env: &Env) -> TypeId {
        if args.is_empty() {
            if let Some(bound) = env.get(name) {
                return *bound;
            }
        }

        if let Some((head, member)) = name.rsplit_once('.') {
            if let Some(Declaration::Enum(decl)) = self.declarations.get(head).cloned() {
                return self.resolve_enum_member(&decl, member);
            }
            // namespace-qualified reference such as `models.User`
            return self.resolve_reference(member, args, env);
        }

        let arg_ids: Vec<TypeId> = args.iter().map(|a| self.resolve_node(a, env)).collect();
        if self.declarations.contains_key(name) {
            return self.instantiate(name, arg_ids);
        }
        let arg = |i: usize| arg_ids.get(i).copied().unwrap_or(UNKNOWN);

        match name {
            "Array" | "ReadonlyArray" => self.alloc(
                TypeKind::Array {
                    element: arg(0),
                    unique: false,
                },
                None,
                None,
            ),
            "Set" | "ReadonlySet" => self.alloc(
                TypeKind::Array {
                    element: arg(0),
                    unique: true,
                },
                None,
                None,
            ),
            "Record" | "Map" | "ReadonlyMap" => {
                let (key, value) = (arg(0), arg(1));
                self.record_type(key, value)
            }
            "Promise" | "PromiseLike" => self.alloc(TypeKind::Promise(arg(0)), None, None),
            "Date" => DATE,
            "String" => STRING,
            "Number" => NUMBER,
            "Boolean" => BOOLEAN,
            "BigInt" => BIGINT,
            "Object" => self.alloc(
                TypeKind::Object(ObjectShape::default()),
                None,
                Some(ANONYMOUS_SYMBOL.to_string()),
            ),
            "Partial" | "Required" | "Readonly" | "Pick" | "Omit" | "NonNullable" => {
                self.utility_type(name, &arg_ids)
            }
            _ => {
                if let Some(marker) = MarkerKind::from_name(name) {
                    return self.alloc(TypeKind::Marker { marker, inner: arg(0) }, None, None);
                }
                warn!("Could not resolve type: {}", name);
                UNKNOWN
            }
        }
    }

    /// `Record<K, V>`; literal-union keys expand to an object with those properties.
    fn record_type(&mut self, key: TypeId, value: TypeId) -> TypeId {
        let keys = self.string_literals(key);
        match keys {
            Some(keys) => {
                let properties = keys
                    .into_iter()
                    .map(|name| PropertyInfo {
                        name,
                        ty: value,
                        optional: false,
                    })
                    .collect();
                self.alloc(
                    TypeKind::Object(ObjectShape {
                        properties,
                        ..ObjectShape::default()
                    }),
                    None,
                    Some(ANONYMOUS_SYMBOL.to_string()),
                )
            }
            None => self.alloc(TypeKind::Record { key, value }, None, None),
        }
    }

    /// String values when the type is a string literal or a union of them.
    fn string_literals(&self, ty: TypeId) -> Option<Vec<String>> {
        match &self.types[ty.0].kind {
            TypeKind::StringLiteral(s) => Some(vec![s.clone()]),
            TypeKind::Union(members) => members
                .iter()
                .map(|m| match &self.types[m.0].kind {
                    TypeKind::StringLiteral(s) => Some(s.clone()),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    fn utility_type(&mut self, name: &str, args: &[TypeId]) -> TypeId {
        let display = self.display_instance(name, args);
        let key = (name.to_string(), args.to_vec());
        if let Some(id) = self.instances.get(&key) {
            return *id;
        }
        let target = args.first().copied().unwrap_or(UNKNOWN);
        let id = match name {
            "Readonly" => target,
            "NonNullable" => match self.types[target.0].kind.clone() {
                TypeKind::Union(members) => {
                    let kept = members
                        .into_iter()
                        .filter(|m| !matches!(self.types[m.0].kind, TypeKind::Null | TypeKind::Undefined))
                        .collect();
                    self.make_union(kept)
                }
                _ => target,
            },
            _ => {
                let mut properties = self.properties(target);
                let keys = args.get(1).and_then(|k| self.string_literals(*k)).unwrap_or_default();
                match name {
                    "Partial" => properties.iter_mut().for_each(|p| p.optional = true),
                    "Required" => properties.iter_mut().for_each(|p| p.optional = false),
                    "Pick" => properties.retain(|p| keys.contains(&p.name)),
                    _ => properties.retain(|p| !keys.contains(&p.name)),
                }
                let index_value = match &self.types[target.0].kind {
                    TypeKind::Object(shape) => shape.index_value,
                    _ => None,
                };
                self.alloc(
                    TypeKind::Object(ObjectShape {
                        properties,
                        index_value,
                        callable: false,
                    }),
                    Some(display),
                    None,
                )
            }
        };
        self.instances.insert(key, id);
        id
    }

    fn resolve_enum_member(&mut self, decl: &EnumDecl, member: &str) -> TypeId {
        let values = Self::enum_values(decl);
        match decl.members.iter().position(|m| m.name == member) {
            Some(idx) => match &values[idx] {
                Value::String(s) => self.literal(LiteralKey::Str(s.clone())),
                Value::Number(n) => self.number_literal(n.as_f64().unwrap_or(0.0)),
                _ => UNKNOWN,
            },
            None => {
                warn!("Enum {} has no member {}", decl.name, member);
                UNKNOWN
            }
        }
    }

    /// Member values with auto-increment applied to members without initialiser.
    fn enum_values(decl: &EnumDecl) -> Vec<Value> {
        let mut next = 0.0;
        decl.members
            .iter()
            .map(|m| match &m.value {
                Some(Value::Number(n)) => {
                    let v = n.as_f64().unwrap_or(0.0);
                    next = v + 1.0;
                    Value::Number(n.clone())
                }
                Some(other) => other.clone(),
                None => {
                    let v = crate::parser::number_value(next);
                    next += 1.0;
                    v
                }
            })
            .collect()
    }

    fn display_instance(&self, name: &str, args: &[TypeId]) -> String {
        if args.is_empty() {
            name.to_string()
        } else {
            let rendered: Vec<String> = args.iter().map(|a| self.type_to_string(*a)).collect();
            format!("{}<{}>", name, rendered.join(", "))
        }
    }

    fn bind_type_params(&mut self, params: &[TypeParam], mut args: Vec<TypeId>) -> (Env, Vec<TypeId>) {
        let mut env = Env::new();
        for (i, param) in params.iter().enumerate() {
            let id = match args.get(i) {
                Some(id) => *id,
                None => {
                    let id = match &param.default {
                        Some(default) => self.resolve_node(default, &env),
                        None => UNKNOWN,
                    };
                    args.push(id);
                    id
                }
            };
            env.insert(param.name.clone(), id);
        }
        args.truncate(params.len());
        (env, args)
    }

    /// Resolves a declared name with concrete type arguments, memoised per instance.
    fn instantiate(&mut self, name: &str, args: Vec<TypeId>) -> TypeId {
        let Some(decl) = self.declarations.get(name).cloned() else {
            return UNKNOWN;
        };
        let params: &[TypeParam] = match &decl {
            Declaration::Interface(d) => &d.type_params,
            Declaration::Alias(d) => &d.type_params,
            Declaration::Class(d) => &d.type_params,
            Declaration::Enum(_) => &[],
        };
        let (env, args) = self.bind_type_params(params, args);
        let key = (name.to_string(), args.clone());
        if let Some(id) = self.instances.get(&key) {
            return *id;
        }
        if self.depth >= MAX_INSTANTIATION_DEPTH {
            warn!("Instantiation of {} is nested too deeply, treating it as unknown", name);
            return UNKNOWN;
        }
        let display = self.display_instance(name, &args);
        debug!("Resolving type: {}", display);

        self.depth += 1;
        let id = match decl {
            Declaration::Alias(alias) => self.instantiate_alias(&alias, key, display, &env),
            Declaration::Interface(interface) => {
                let slot = self.alloc(TypeKind::Pending, None, Some(display));
                self.instances.insert(key, slot);
                let mut shape = self.inherited_shape(&interface.extends, &env);
                let own = self.resolve_object(&interface.body, &env);
                Self::merge_properties(&mut shape.properties, own.properties);
                shape.index_value = own.index_value.or(shape.index_value);
                shape.callable |= own.callable;
                self.types[slot.0].kind = TypeKind::Object(shape);
                slot
            }
            Declaration::Class(class) => {
                let slot = self.alloc(TypeKind::Pending, None, Some(display));
                self.instances.insert(key, slot);
                let extends: Vec<TypeNode> = class.extends.iter().cloned().collect();
                let mut shape = self.inherited_shape(&extends, &env);
                let own: Vec<PropertyInfo> = class
                    .properties
                    .iter()
                    .filter(|p| !p.is_static)
                    .map(|p| PropertyInfo {
                        name: p.name.clone(),
                        ty: match &p.ty {
                            Some(ty) => self.resolve_node(ty, &env),
                            None => UNKNOWN,
                        },
                        optional: p.optional,
                    })
                    .collect();
                Self::merge_properties(&mut shape.properties, own);
                self.types[slot.0].kind = TypeKind::Object(shape);
                slot
            }
            Declaration::Enum(decl) => {
                let members = Self::enum_values(&decl)
                    .into_iter()
                    .map(|v| match v {
                        Value::String(s) => self.literal(LiteralKey::Str(s)),
                        Value::Number(n) => self.number_literal(n.as_f64().unwrap_or(0.0)),
                        _ => UNKNOWN,
                    })
                    .collect();
                let id = self.alloc(TypeKind::Union(members), None, Some(display));
                self.instances.insert(key, id);
                id
            }
        };
        self.depth -= 1;
        id
    }

    fn instantiate_alias(
        &mut self,
        alias: &TypeAliasDecl,
        key: (String, Vec<TypeId>),
        display: String,
        env: &Env,
    ) -> TypeId {
        if matches!(alias.ty, TypeNode::Reference { .. }) {
            // an alias of a reference does not create a new type identity
            if !self.resolving_aliases.insert(display.clone()) {
                warn!("Circular type alias {}", display);
                return UNKNOWN;
            }
            let target = self.resolve_node(&alias.ty, env);
            self.resolving_aliases.remove(&display);
            self.instances.insert(key, target);
            let data = &self.types[target.0];
            if !data.kind.is_primitive_like() && target.0 > DATE.0 {
                self.enclosing_aliases.entry(target).or_insert(display);
            }
            return target;
        }

        let slot = self.alloc(TypeKind::Pending, Some(display), None);
        self.instances.insert(key, slot);
        let body = self.resolve_node(&alias.ty, env);
        let body_data = self.types[body.0].clone();
        let data = &mut self.types[slot.0];
        data.kind = body_data.kind;
        data.symbol_name = body_data.symbol_name;
        slot
    }

    fn inherited_shape(&mut self, bases: &[TypeNode], env: &Env) -> ObjectShape {
        let mut shape = ObjectShape::default();
        for base in bases {
            let base_id = self.resolve_node(base, env);
            if matches!(self.types[base_id.0].kind, TypeKind::Pending) {
                warn!("Circular inheritance through {}", self.type_to_string(base_id));
                continue;
            }
            let inherited = self.properties(base_id);
            Self::merge_properties(&mut shape.properties, inherited);
            if let TypeKind::Object(base_shape) = &self.types[base_id.0].kind {
                shape.index_value = shape.index_value.or(base_shape.index_value);
            }
        }
        shape
    }

    /// Adds `incoming` properties, replacing same-named ones in place.
    fn merge_properties(existing: &mut Vec<PropertyInfo>, incoming: Vec<PropertyInfo>) {
        for prop in incoming {
            match existing.iter_mut().find(|p| p.name == prop.name) {
                Some(slot) => *slot = prop,
                None => existing.push(prop),
            }
        }
    }

    fn data(&self, ty: TypeId) -> &TypeData {
        &self.types[ty.0]
    }
}

impl TypeOracle for TypeResolver {
    fn kind(&self, ty: TypeId) -> &TypeKind {
        &self.data(ty).kind
    }

    fn properties(&self, ty: TypeId) -> Vec<PropertyInfo> {
        match &self.data(ty).kind {
            TypeKind::Object(shape) => shape.properties.clone(),
            TypeKind::Intersection(members) => {
                let mut merged: Vec<PropertyInfo> = Vec::new();
                for member in members {
                    for prop in self.properties(*member) {
                        if !merged.iter().any(|p| p.name == prop.name) {
                            merged.push(prop);
                        }
                    }
                }
                merged
            }
            TypeKind::Marker { inner, .. } => self.properties(*inner),
            _ => Vec::new(),
        }
    }

    fn array_element(&self, ty: TypeId) -> Option<(TypeId, bool)> {
        match &self.data(ty).kind {
            TypeKind::Array { element, unique } => Some((*element, *unique)),
            _ => None,
        }
    }

    fn record_value(&self, ty: TypeId) -> Option<TypeId> {
        match &self.data(ty).kind {
            TypeKind::Record { value, .. } => Some(*value),
            _ => None,
        }
    }

    fn has_call_signatures(&self, ty: TypeId) -> bool {
        matches!(&self.data(ty).kind, TypeKind::Object(shape) if shape.callable)
    }

    fn alias_name(&self, ty: TypeId) -> Option<&str> {
        self.data(ty).alias_name.as_deref()
    }

    fn symbol_name(&self, ty: TypeId) -> Option<&str> {
        self.data(ty).symbol_name.as_deref()
    }

    fn enclosing_alias(&self, ty: TypeId) -> Option<&str> {
        self.enclosing_aliases.get(&ty).map(String::as_str)
    }

    fn type_to_string(&self, ty: TypeId) -> String {
        let data = self.data(ty);
        if let Some(alias) = &data.alias_name {
            return alias.clone();
        }
        if let Some(symbol) = data.symbol_name.as_deref().filter(|s| *s != ANONYMOUS_SYMBOL) {
            return symbol.to_string();
        }
        let join = |members: &[TypeId], sep: &str| {
            members
                .iter()
                .map(|m| self.type_to_string(*m))
                .collect::<Vec<_>>()
                .join(sep)
        };
        match &data.kind {
            TypeKind::Any => "any".to_string(),
            TypeKind::Unknown => "unknown".to_string(),
            TypeKind::Never => "never".to_string(),
            TypeKind::Void => "void".to_string(),
            TypeKind::Undefined => "undefined".to_string(),
            TypeKind::Null => "null".to_string(),
            TypeKind::String => "string".to_string(),
            TypeKind::Number => "number".to_string(),
            TypeKind::Boolean => "boolean".to_string(),
            TypeKind::BigInt => "bigint".to_string(),
            TypeKind::StringLiteral(s) => format!("'{}'", s),
            TypeKind::NumberLiteral(n) => crate::parser::number_value(*n).to_string(),
            TypeKind::BooleanLiteral(b) => b.to_string(),
            TypeKind::Union(members) => join(members, " | "),
            TypeKind::Intersection(members) => join(members, " & "),
            TypeKind::Array { element, unique: false } => {
                let inner = self.type_to_string(*element);
                if matches!(self.data(*element).kind, TypeKind::Union(_) | TypeKind::Intersection(_))
                    && self.data(*element).alias_name.is_none()
                {
                    format!("({})[]", inner)
                } else {
                    format!("{}[]", inner)
                }
            }
            TypeKind::Array { element, unique: true } => format!("Set<{}>", self.type_to_string(*element)),
            TypeKind::Tuple(elements) => format!("[{}]", join(elements, ", ")),
            TypeKind::Record { key, value } => format!(
                "Record<{}, {}>",
                self.type_to_string(*key),
                self.type_to_string(*value)
            ),
            TypeKind::Promise(inner) => format!("Promise<{}>", self.type_to_string(*inner)),
            TypeKind::Date => "Date".to_string(),
            TypeKind::Marker { marker, inner } => format!("{:?}<{}>", marker, self.type_to_string(*inner)),
            TypeKind::Object(shape) => {
                if shape.callable && shape.properties.is_empty() {
                    return "Function".to_string();
                }
                let props: Vec<String> = shape
                    .properties
                    .iter()
                    .map(|p| {
                        format!(
                            "{}{}: {}",
                            p.name,
                            if p.optional { "?" } else { "" },
                            self.type_to_string(p.ty)
                        )
                    })
                    .collect();
                format!("{{ {} }}", props.join("; "))
            }
            TypeKind::Pending => "<pending>".to_string(),
        }
    }
}

impl AnnotationResolver for TypeResolver {
    fn resolve_annotation(&mut self, node: &TypeNode) -> TypeId {
        self.resolve_type_node(node)
    }
}
