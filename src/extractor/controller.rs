use crate::error::{Error, Result};
use crate::extractor::{
    join_paths, ControllerExtractor, HttpMethod, ParamLocation, ParamShape, ScannedController,
    ScannedOperation, ScannedParam,
};
use crate::oracle::{AnnotationResolver, MarkerKind, TypeId, TypeKind, TypeOracle, ANONYMOUS_SYMBOL};
use crate::parser::ast::{find_decorator, ClassDecl, Decorator, Keyword, MethodDecl, ParamDecl, TypeNode};
use crate::parser::ParsedFile;
use crate::schema_generator::sanitize_name;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

/// `:name` and `{name}` path tokens
static PATH_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r":([A-Za-z_$][A-Za-z0-9_$]*)|\{([A-Za-z_$][A-Za-z0-9_$]*)\}").expect("valid regex")
});

/// Default class decorators that mark a controller
pub const DEFAULT_CONTROLLER_DECORATORS: &[&str] = &["Controller", "Route"];

/// Extracts controllers from classes carrying a controller decorator.
pub struct DecoratorExtractor {
    controller_decorators: Vec<String>,
}

impl Default for DecoratorExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_CONTROLLER_DECORATORS.iter().map(|s| s.to_string()).collect())
    }
}

impl ControllerExtractor for DecoratorExtractor {
    fn extract_controllers<R: AnnotationResolver + ?Sized>(
        &self,
        parsed_files: &[ParsedFile],
        resolver: &mut R,
    ) -> Result<Vec<ScannedController>> {
        let mut controllers = Vec::new();
        let mut operation_ids = HashSet::new();

        for parsed_file in parsed_files {
            for class in parsed_file.classes() {
                let Some(decorator) = self.controller_decorator(class) else {
                    continue;
                };
                let mut controller = ScannedController {
                    name: class.name.clone(),
                    base_path: decorator.string_arg().unwrap_or_default().to_string(),
                    operations: Vec::new(),
                    consumes: decorator_strings(&class.decorators, "Consumes"),
                    produces: decorator_strings(&class.decorators, "Produces"),
                    file: parsed_file.path.clone(),
                };
                debug!(
                    "Found controller {} with base path '{}' in {}",
                    controller.name,
                    controller.base_path,
                    parsed_file.path.display()
                );

                let class_tags = decorator_strings(&class.decorators, "Tags");
                for method in class.methods.iter().filter(|m| !m.is_static) {
                    let Some(mut operation) = self.scan_operation(class, &controller.base_path, method, resolver)
                    else {
                        continue;
                    };
                    if !operation_ids.insert(operation.operation_id.clone()) {
                        return Err(Error::DuplicateOperation {
                            operation_id: operation.operation_id,
                            controller: class.name.clone(),
                        });
                    }
                    if operation.tags.is_empty() {
                        operation.tags = class_tags.clone();
                    }
                    controller.operations.push(operation);
                }
                controllers.push(controller);
            }
        }

        info!(
            "Found {} controllers with {} operations",
            controllers.len(),
            operation_ids.len()
        );
        Ok(controllers)
    }
}

impl DecoratorExtractor {
    pub fn new(controller_decorators: Vec<String>) -> Self {
        Self { controller_decorators }
    }

    fn controller_decorator<'c>(&self, class: &'c ClassDecl) -> Option<&'c Decorator> {
        class
            .decorators
            .iter()
            .find(|d| self.controller_decorators.iter().any(|name| *name == d.name))
    }

    fn scan_operation<R: AnnotationResolver + ?Sized>(
        &self,
        class: &ClassDecl,
        base_path: &str,
        method: &MethodDecl,
        resolver: &mut R,
    ) -> Option<ScannedOperation> {
        let (http_method, route) = method
            .decorators
            .iter()
            .find_map(|d| HttpMethod::from_decorator(&d.name).map(|m| (m, d)))?;

        let path = route.string_arg().unwrap_or_default().to_string();
        if !route.args.is_empty() && route.string_arg().is_none() {
            warn!(
                "Non-literal path on {}.{}, treating it as ''",
                class.name, method.name
            );
        }
        let full_path = join_paths(base_path, &path);
        let operation_id = sanitize_name(&format!("{}_{}", class.name, method.name));
        debug!("Found route: {} {} -> {}", http_method, full_path, operation_id);

        let params = classify_params(http_method, &full_path, &method.params, resolver);
        let (return_type, return_hint) = resolve_return(method.return_type.as_ref(), resolver);

        let status = find_decorator(&method.decorators, "HttpCode")
            .and_then(Decorator::literal_arg)
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok())
            .unwrap_or_else(|| http_method.default_status());

        Some(ScannedOperation {
            operation_id,
            method_name: method.name.clone(),
            http_method,
            path,
            full_path,
            params,
            return_type,
            return_hint,
            status,
            consumes: decorator_strings(&method.decorators, "Consumes"),
            produces: decorator_strings(&method.decorators, "Produces"),
            tags: decorator_strings(&method.decorators, "Tags"),
            summary: find_decorator(&method.decorators, "Summary")
                .and_then(Decorator::string_arg)
                .map(str::to_string),
            deprecated: find_decorator(&method.decorators, "Deprecated").is_some(),
            line: method.line,
        })
    }
}

fn decorator_strings(decorators: &[Decorator], name: &str) -> Vec<String> {
    find_decorator(decorators, name)
        .map(Decorator::string_args)
        .unwrap_or_default()
}

/// Path parameter names in template order, without duplicates.
pub fn path_tokens(path: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for caps in PATH_TOKEN.captures_iter(path) {
        if let Some(name) = caps.get(1).or_else(|| caps.get(2)) {
            if !tokens.iter().any(|t| t == name.as_str()) {
                tokens.push(name.as_str().to_string());
            }
        }
    }
    tokens
}

/// Unwraps `Promise<T>`; void-like returns produce no type.
fn resolve_return<R: AnnotationResolver + ?Sized>(
    node: Option<&TypeNode>,
    resolver: &mut R,
) -> (Option<TypeId>, Option<String>) {
    let Some(node) = node else {
        return (None, None);
    };
    let hint_node = match node {
        TypeNode::Reference { name, args } if name == "Promise" => args.first().unwrap_or(node),
        _ => node,
    };
    let hint = hint_node.reference_name().map(str::to_string);

    let mut ty = resolver.resolve_annotation(node);
    while let Some(inner) = resolver.promised_type(ty) {
        ty = inner;
    }
    match resolver.kind(ty) {
        TypeKind::Void | TypeKind::Undefined | TypeKind::Never => (None, None),
        _ => (Some(ty), hint),
    }
}

/// Whether a parameter type binds a whole object of values.
fn is_object_like<O: TypeOracle + ?Sized>(oracle: &O, ty: TypeId) -> bool {
    match oracle.kind(ty) {
        TypeKind::Marker { inner, .. } => is_object_like(oracle, *inner),
        TypeKind::Object(shape) => {
            !shape.callable
                && (!shape.properties.is_empty() || oracle.symbol_name(ty) == Some(ANONYMOUS_SYMBOL))
        }
        TypeKind::Intersection(_) => !oracle.properties(ty).is_empty(),
        _ => false,
    }
}

/// Binding hint from a parameter decorator or a marker wrapper type.
fn explicit_location<O: TypeOracle + ?Sized>(
    param: &ParamDecl,
    ty: TypeId,
    oracle: &O,
) -> Option<(ParamLocation, Option<String>)> {
    const DECORATORS: &[(&str, ParamLocation)] = &[
        ("Body", ParamLocation::Body),
        ("Query", ParamLocation::Query),
        ("Headers", ParamLocation::Header),
        ("Cookies", ParamLocation::Cookie),
    ];
    for (name, location) in DECORATORS {
        if let Some(decorator) = find_decorator(&param.decorators, name) {
            return Some((*location, decorator.string_arg().map(str::to_string)));
        }
    }
    match oracle.kind(ty) {
        TypeKind::Marker { marker, .. } => Some((
            match marker {
                MarkerKind::Body => ParamLocation::Body,
                MarkerKind::Query => ParamLocation::Query,
                MarkerKind::Headers => ParamLocation::Header,
                MarkerKind::Cookies => ParamLocation::Cookie,
            },
            None,
        )),
        _ => None,
    }
}

/// Classifies parameters in a fixed order: path tokens, explicit hints, the
/// body of a body-bearing verb, one query object, then scalar query values.
pub(crate) fn classify_params<R: AnnotationResolver + ?Sized>(
    http_method: HttpMethod,
    full_path: &str,
    params: &[ParamDecl],
    resolver: &mut R,
) -> Vec<ScannedParam> {
    let resolved: Vec<(TypeId, Option<String>)> = params
        .iter()
        .map(|p| match &p.ty {
            Some(node) => (resolver.resolve_annotation(node), type_hint(node)),
            None => (resolver.resolve_annotation(&TypeNode::Keyword(Keyword::Any)), None),
        })
        .collect();
    classify_resolved(http_method, full_path, params, &resolved, &*resolver)
}

fn classify_resolved<O: TypeOracle + ?Sized>(
    http_method: HttpMethod,
    full_path: &str,
    params: &[ParamDecl],
    resolved: &[(TypeId, Option<String>)],
    oracle: &O,
) -> Vec<ScannedParam> {
    let tokens = path_tokens(full_path);

    let mut slots: Vec<Option<ScannedParam>> = vec![None; params.len()];
    let make = |index: usize, name: String, location: ParamLocation, shape: ParamShape| {
        let (ty, hint) = resolved[index].clone();
        let param = &params[index];
        let required = location == ParamLocation::Path
            || (!param.optional && !param.has_initializer && !oracle.includes_undefined(ty));
        ScannedParam {
            name,
            index,
            location,
            shape,
            ty,
            type_hint: hint,
            required,
        }
    };
    let shape_of = |index: usize| {
        if is_object_like(oracle, resolved[index].0) {
            ParamShape::Object
        } else {
            ParamShape::Scalar
        }
    };

    // 1. path tokens
    for (index, param) in params.iter().enumerate() {
        if tokens.iter().any(|t| *t == param.name) {
            slots[index] = Some(make(index, param.name.clone(), ParamLocation::Path, ParamShape::Scalar));
        }
    }
    for token in &tokens {
        if !params.iter().any(|p| p.name == *token) {
            debug!("Path token :{} has no matching parameter", token);
        }
    }

    // 2. explicit decorators and marker types
    let mut has_body = false;
    for (index, param) in params.iter().enumerate() {
        if slots[index].is_some() {
            continue;
        }
        let Some((location, binding_name)) = explicit_location(param, resolved[index].0, oracle) else {
            continue;
        };
        if location == ParamLocation::Body {
            if has_body {
                warn!("Parameter {} is a second body, classifying it by convention", param.name);
                continue;
            }
            has_body = true;
        }
        // a decorator naming a single value (`@Query('page')`) binds a scalar
        let shape = if binding_name.is_some() {
            ParamShape::Scalar
        } else {
            shape_of(index)
        };
        let name = binding_name.unwrap_or_else(|| param.name.clone());
        slots[index] = Some(make(index, name, location, shape));
    }

    // 3. first remaining parameter of a body-bearing verb
    if http_method.has_body() && !has_body {
        if let Some(index) = (0..params.len()).find(|i| slots[*i].is_none()) {
            slots[index] = Some(make(index, params[index].name.clone(), ParamLocation::Body, shape_of(index)));
        }
    }

    // 4. one query object, 5. scalar query values
    let mut has_query_object = slots
        .iter()
        .flatten()
        .any(|p| p.location == ParamLocation::Query && p.shape == ParamShape::Object);
    for index in 0..params.len() {
        if slots[index].is_some() {
            continue;
        }
        let shape = if !http_method.has_body() && !has_query_object && shape_of(index) == ParamShape::Object {
            has_query_object = true;
            ParamShape::Object
        } else {
            ParamShape::Scalar
        };
        slots[index] = Some(make(index, params[index].name.clone(), ParamLocation::Query, shape));
    }

    slots.into_iter().flatten().collect()
}

/// Type-reference name of an annotation, looking through marker wrappers.
fn type_hint(node: &TypeNode) -> Option<String> {
    match node {
        TypeNode::Reference { name, args } if MarkerKind::from_name(name).is_some() => {
            args.first().and_then(type_hint)
        }
        TypeNode::Reference { name, .. } => Some(name.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{ObjectShape, PropertyInfo};
    use crate::parser::AstParser;
    use crate::type_resolver::TypeResolver;
    use std::path::Path;

    /// A fixed table of types: strings resolve to slot 0, references to slot 1.
    struct TableOracle {
        kinds: Vec<TypeKind>,
    }

    impl TableOracle {
        fn new() -> Self {
            let shape = ObjectShape {
                properties: vec![PropertyInfo {
                    name: "name".into(),
                    ty: TypeId(0),
                    optional: true,
                }],
                ..ObjectShape::default()
            };
            Self {
                kinds: vec![TypeKind::String, TypeKind::Object(shape), TypeKind::Any],
            }
        }
    }

    impl TypeOracle for TableOracle {
        fn kind(&self, ty: TypeId) -> &TypeKind {
            &self.kinds[ty.0]
        }
        fn properties(&self, ty: TypeId) -> Vec<PropertyInfo> {
            match self.kind(ty) {
                TypeKind::Object(shape) => shape.properties.clone(),
                _ => Vec::new(),
            }
        }
        fn array_element(&self, _ty: TypeId) -> Option<(TypeId, bool)> {
            None
        }
        fn record_value(&self, _ty: TypeId) -> Option<TypeId> {
            None
        }
        fn has_call_signatures(&self, _ty: TypeId) -> bool {
            false
        }
        fn alias_name(&self, _ty: TypeId) -> Option<&str> {
            None
        }
        fn symbol_name(&self, ty: TypeId) -> Option<&str> {
            (ty.0 == 1).then_some("Filter")
        }
        fn enclosing_alias(&self, _ty: TypeId) -> Option<&str> {
            None
        }
        fn type_to_string(&self, ty: TypeId) -> String {
            format!("{:?}", self.kind(ty))
        }
    }

    impl AnnotationResolver for TableOracle {
        fn resolve_annotation(&mut self, node: &TypeNode) -> TypeId {
            match node {
                TypeNode::Keyword(Keyword::String) => TypeId(0),
                TypeNode::Reference { .. } => TypeId(1),
                _ => TypeId(2),
            }
        }
    }

    fn extract(code: &str) -> Vec<ScannedController> {
        let parsed = AstParser::parse_source(Path::new("test.controller.ts"), code).unwrap();
        let mut resolver = TypeResolver::new(std::slice::from_ref(&parsed));
        DecoratorExtractor::default()
            .extract_controllers(&[parsed], &mut resolver)
            .unwrap()
    }

    fn locations(op: &ScannedOperation) -> Vec<(String, ParamLocation, ParamShape)> {
        op.params
            .iter()
            .map(|p| (p.name.clone(), p.location, p.shape))
            .collect()
    }

    #[test]
    fn test_path_tokens() {
        assert_eq!(path_tokens("/users/:id/posts/{postId}/:id"), vec!["id", "postId"]);
        assert!(path_tokens("/health").is_empty());
    }

    #[test]
    fn test_path_and_body_classification() {
        let controllers = extract(
            r#"
            interface UpdateDto { name: string }
            @Controller('/users')
            export class UserController {
                @Post('/:id')
                update(id: number, body: UpdateDto) {}
            }
            "#,
        );
        let op = &controllers[0].operations[0];
        assert_eq!(op.operation_id, "UserController_update");
        assert_eq!(op.full_path, "/users/:id");
        assert_eq!(op.status, 201);
        assert_eq!(
            locations(op),
            vec![
                ("id".to_string(), ParamLocation::Path, ParamShape::Scalar),
                ("body".to_string(), ParamLocation::Body, ParamShape::Object),
            ]
        );
        assert_eq!(op.body().unwrap().type_hint.as_deref(), Some("UpdateDto"));
    }

    #[test]
    fn test_query_object_classification() {
        let controllers = extract(
            r#"
            @Controller('/users')
            class UserController {
                @Get('/users')
                list(filter: { name?: string }, other: { a: string }, page?: number) {}
            }
            "#,
        );
        let op = &controllers[0].operations[0];
        assert_eq!(
            locations(op),
            vec![
                ("filter".to_string(), ParamLocation::Query, ParamShape::Object),
                ("other".to_string(), ParamLocation::Query, ParamShape::Scalar),
                ("page".to_string(), ParamLocation::Query, ParamShape::Scalar),
            ]
        );
        assert!(!op.params[2].required);
    }

    #[test]
    fn test_explicit_decorators_and_markers() {
        let controllers = extract(
            r#"
            interface Filter { q: string }
            @Controller('items')
            class ItemController {
                @Put('{id}')
                replace(
                    @Headers('x-tenant') tenant: string,
                    id: string,
                    query: Query<Filter>,
                    @Cookies() cookies: { session: string },
                    payload: Body<{ name: string }>
                ) {}
            }
            "#,
        );
        let op = &controllers[0].operations[0];
        assert_eq!(
            locations(op),
            vec![
                ("x-tenant".to_string(), ParamLocation::Header, ParamShape::Scalar),
                ("id".to_string(), ParamLocation::Path, ParamShape::Scalar),
                ("query".to_string(), ParamLocation::Query, ParamShape::Object),
                ("cookies".to_string(), ParamLocation::Cookie, ParamShape::Object),
                ("payload".to_string(), ParamLocation::Body, ParamShape::Object),
            ]
        );
        assert_eq!(op.params[2].type_hint.as_deref(), Some("Filter"));
    }

    #[test]
    fn test_body_verb_takes_first_remaining_parameter() {
        let controllers = extract(
            r#"
            @Controller('/tags')
            class TagController {
                @Patch('/')
                rename(name: string, force?: boolean) {}
            }
            "#,
        );
        let op = &controllers[0].operations[0];
        assert_eq!(
            locations(op),
            vec![
                ("name".to_string(), ParamLocation::Body, ParamShape::Scalar),
                ("force".to_string(), ParamLocation::Query, ParamShape::Scalar),
            ]
        );
    }

    #[test]
    fn test_return_type_and_decorators() {
        let controllers = extract(
            r#"
            interface User { id: number }
            @Controller('/users')
            @Tags('users')
            @Produces('application/json')
            class UserController {
                @Get('/')
                @Summary('List users')
                async list(): Promise<User[]> { return []; }

                @Post('/')
                @HttpCode(202)
                @Deprecated()
                async create(): Promise<void> {}

                helper(): void {}
            }
            "#,
        );
        let controller = &controllers[0];
        assert_eq!(controller.produces, vec!["application/json"]);
        assert_eq!(controller.operations.len(), 2);

        let list = &controller.operations[0];
        assert!(list.return_type.is_some());
        assert_eq!(list.summary.as_deref(), Some("List users"));
        assert_eq!(list.tags, vec!["users"]);

        let create = &controller.operations[1];
        assert!(create.return_type.is_none());
        assert_eq!(create.status, 202);
        assert!(create.deprecated);
    }

    #[test]
    fn test_route_decorator_and_missing_base_path() {
        let controllers = extract(
            r#"
            @Route()
            class HealthController {
                @Get('health')
                check(): string { return 'ok'; }
            }
            class NotAController {
                @Get('/x')
                x() {}
            }
            "#,
        );
        assert_eq!(controllers.len(), 1);
        assert_eq!(controllers[0].base_path, "");
        assert_eq!(controllers[0].operations[0].full_path, "/health");
    }

    #[test]
    fn test_duplicate_operation_id_is_an_error() {
        let code = r#"
            @Controller('/a')
            class Dup {
                @Get('/one') read() {}
            }
            @Controller('/b')
            class Dup {
                @Get('/two') read() {}
            }
        "#;
        let parsed = AstParser::parse_source(Path::new("dup.ts"), code).unwrap();
        let mut resolver = TypeResolver::new(std::slice::from_ref(&parsed));
        let err = DecoratorExtractor::default()
            .extract_controllers(&[parsed], &mut resolver)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateOperation { .. }));
    }

    #[test]
    fn test_classify_with_table_oracle() {
        let code = r#"
            class C {
                list(id: string, filter: Filter, page?: string) {}
            }
        "#;
        let parsed = AstParser::parse_source(Path::new("c.ts"), code).unwrap();
        let method = &parsed.classes().next().unwrap().methods[0];
        let mut oracle = TableOracle::new();
        let params = classify_params(HttpMethod::Get, "/things/:id", &method.params, &mut oracle);
        let got: Vec<_> = params
            .iter()
            .map(|p| (p.name.as_str(), p.location, p.shape, p.required))
            .collect();
        assert_eq!(
            got,
            vec![
                ("id", ParamLocation::Path, ParamShape::Scalar, true),
                ("filter", ParamLocation::Query, ParamShape::Object, true),
                ("page", ParamLocation::Query, ParamShape::Scalar, false),
            ]
        );
    }
}
