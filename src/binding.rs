//! Binding a manifest against the controllers an application actually serves.
//!
//! Controllers are described with an explicit [`ControllerRegistration`] list
//! built at startup. [`bind`] refuses to produce a [`RouteTable`] when the
//! manifest and the registrations disagree, so a stale manifest is caught
//! before the first request is served.

use crate::extractor::controller::path_tokens;
use crate::extractor::{join_paths, HttpMethod};
use crate::manifest::{ManifestDocument, OperationEntry};
use indexmap::IndexMap;
use log::{debug, info};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("Route mismatch: controller `{controller}`: {detail}")]
    RouteMismatch { controller: String, detail: String },
}

impl BindError {
    fn mismatch(controller: &str, detail: String) -> Self {
        BindError::RouteMismatch {
            controller: controller.to_string(),
            detail,
        }
    }
}

/// A live route handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRegistration {
    pub method: HttpMethod,
    /// Path relative to the controller's base path
    pub path: String,
    pub handler: String,
    /// Number of parameters the handler accepts
    pub arity: usize,
}

/// A live controller and its routes, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerRegistration {
    pub name: String,
    pub base_path: String,
    pub routes: Vec<RouteRegistration>,
}

impl ControllerRegistration {
    pub fn new(name: &str, base_path: &str) -> Self {
        Self {
            name: name.to_string(),
            base_path: base_path.to_string(),
            routes: Vec::new(),
        }
    }

    pub fn route(mut self, method: HttpMethod, path: &str, handler: &str, arity: usize) -> Self {
        self.routes.push(RouteRegistration {
            method,
            path: path.to_string(),
            handler: handler.to_string(),
            arity,
        });
        self
    }

    pub fn get(self, path: &str, handler: &str, arity: usize) -> Self {
        self.route(HttpMethod::Get, path, handler, arity)
    }

    pub fn post(self, path: &str, handler: &str, arity: usize) -> Self {
        self.route(HttpMethod::Post, path, handler, arity)
    }

    pub fn put(self, path: &str, handler: &str, arity: usize) -> Self {
        self.route(HttpMethod::Put, path, handler, arity)
    }

    pub fn patch(self, path: &str, handler: &str, arity: usize) -> Self {
        self.route(HttpMethod::Patch, path, handler, arity)
    }

    pub fn delete(self, path: &str, handler: &str, arity: usize) -> Self {
        self.route(HttpMethod::Delete, path, handler, arity)
    }
}

/// A manifest operation tied to its live handler.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundRoute {
    pub controller: String,
    pub handler: String,
    pub method: HttpMethod,
    /// Full path as written in the manifest
    pub path: String,
    pub operation: OperationEntry,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// Splits a route template; both `:name` and `{name}` segments are parameters.
fn segments(path: &str) -> Vec<Segment> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match param_name(s) {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(s.to_string()),
        })
        .collect()
}

fn param_name(segment: &str) -> Option<&str> {
    segment
        .strip_prefix(':')
        .or_else(|| segment.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')))
        .filter(|name| !name.is_empty())
}

/// Result of matching a request against the route table.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch<'a> {
    pub route: &'a BoundRoute,
    /// Path parameter values, in path order
    pub params: IndexMap<String, String>,
}

/// Routes that passed binding, matched in manifest order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<BoundRoute>,
}

impl RouteTable {
    pub fn routes(&self) -> &[BoundRoute] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// First route whose method and path match the request.
    pub fn match_route(&self, method: HttpMethod, path: &str) -> Option<RouteMatch<'_>> {
        let request: Vec<&str> = path
            .split('?')
            .next()
            .unwrap_or_default()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        self.routes
            .iter()
            .filter(|route| route.method == method && route.segments.len() == request.len())
            .find_map(|route| {
                let mut params = IndexMap::new();
                for (segment, value) in route.segments.iter().zip(&request) {
                    match segment {
                        Segment::Literal(literal) if literal == value => {}
                        Segment::Literal(_) => return None,
                        Segment::Param(name) => {
                            params.insert(name.clone(), value.to_string());
                        }
                    }
                }
                Some(RouteMatch { route, params })
            })
    }
}

/// Checks the manifest against the live controllers and builds the route table.
///
/// Every difference is fatal: a controller present on one side only, a
/// different number of routes, or a route whose handler, method, path or
/// argument positions have drifted.
pub fn bind(manifest: &ManifestDocument, registrations: &[ControllerRegistration]) -> Result<RouteTable, BindError> {
    for registration in registrations {
        if manifest.controller(&registration.name).is_none() {
            return Err(BindError::mismatch(
                &registration.name,
                "controller is not listed in the manifest".to_string(),
            ));
        }
    }

    let mut routes = Vec::new();
    for controller in &manifest.controllers {
        let id = controller.controller_id.as_str();
        let registration = registrations
            .iter()
            .find(|r| r.name == id)
            .ok_or_else(|| BindError::mismatch(id, "controller is not registered".to_string()))?;

        if controller.operations.len() != registration.routes.len() {
            return Err(BindError::mismatch(
                id,
                format!(
                    "manifest lists {} operations but {} routes are registered",
                    controller.operations.len(),
                    registration.routes.len()
                ),
            ));
        }

        for operation in &controller.operations {
            let handler = operation.handler.method_name.as_str();
            let route = registration
                .routes
                .iter()
                .find(|r| r.handler == handler)
                .ok_or_else(|| {
                    BindError::mismatch(id, format!("handler `{}` is not registered", handler))
                })?;
            check_route(id, &registration.base_path, operation, route)?;
            debug!("Bound {} {} to {}.{}", operation.http.method, operation.http.path, id, handler);
            routes.push(BoundRoute {
                controller: id.to_string(),
                handler: handler.to_string(),
                method: operation.http.method,
                path: operation.http.path.clone(),
                segments: segments(&operation.http.path),
                operation: operation.clone(),
            });
        }
    }

    info!("Bound {} routes from {} controllers", routes.len(), manifest.controllers.len());
    Ok(RouteTable { routes })
}

fn check_route(
    controller: &str,
    base_path: &str,
    operation: &OperationEntry,
    route: &RouteRegistration,
) -> Result<(), BindError> {
    let handler = &route.handler;
    if operation.http.method != route.method {
        return Err(BindError::mismatch(
            controller,
            format!(
                "`{}` is {} in the manifest but {} in source",
                handler, operation.http.method, route.method
            ),
        ));
    }

    let live_path = join_paths(base_path, &route.path);
    if normalize(&operation.http.path) != normalize(&live_path) {
        return Err(BindError::mismatch(
            controller,
            format!(
                "`{}` is bound to {} in the manifest but {} in source",
                handler, operation.http.path, live_path
            ),
        ));
    }

    let expected_params = path_tokens(&live_path);
    let declared: Vec<&str> = operation.args.path.iter().map(|a| a.name.as_str()).collect();
    if let Some(missing) = declared.iter().find(|name| !expected_params.iter().any(|p| p == *name)) {
        return Err(BindError::mismatch(
            controller,
            format!("`{}` binds path parameter `{}` absent from {}", handler, missing, live_path),
        ));
    }

    if let Some(index) = operation.args.indices().find(|index| *index >= route.arity) {
        return Err(BindError::mismatch(
            controller,
            format!(
                "`{}` reads argument {} but the handler takes {} parameters",
                handler, index, route.arity
            ),
        ));
    }
    Ok(())
}

/// Joined path with every parameter written as `:name`.
fn normalize(path: &str) -> String {
    let canonical: Vec<String> = segments(path)
        .into_iter()
        .map(|segment| match segment {
            Segment::Literal(literal) => literal,
            Segment::Param(name) => format!(":{}", name),
        })
        .collect();
    join_paths("", &canonical.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;
    use crate::config::CompilerConfig;
    use crate::manifest::ManifestGenerator;
    use crate::parser::AstParser;
    use chrono::Utc;
    use std::path::Path;

    const SOURCE: &str = r#"
        interface User { id: number }
        @Controller('/users')
        class UserController {
            @Get('/')
            list(): User[] { return []; }

            @Get('/:id')
            get(id: number): User { return null as any; }

            @Put('/:id')
            update(id: number, body: User): User { return body; }
        }
    "#;

    fn manifest() -> ManifestDocument {
        let parsed = AstParser::parse_source(Path::new("users.ts"), SOURCE).unwrap();
        let config = CompilerConfig::default();
        let compilation = Compiler::new(config.clone()).compile(&[parsed]).unwrap();
        ManifestGenerator::new(&config).generate(&compilation, Utc::now())
    }

    fn live() -> ControllerRegistration {
        ControllerRegistration::new("UserController", "/users")
            .get("/", "list", 0)
            .get("/:id", "get", 1)
            .put("/:id", "update", 2)
    }

    fn mismatch(result: Result<RouteTable, BindError>) -> String {
        let err = result.unwrap_err();
        assert!(err.to_string().starts_with("Route mismatch"), "{}", err);
        err.to_string()
    }

    #[test]
    fn test_bind_and_match() {
        let table = bind(&manifest(), &[live()]).unwrap();
        assert_eq!(table.len(), 3);

        let found = table.match_route(HttpMethod::Get, "/users/42?verbose=1").unwrap();
        assert_eq!(found.route.handler, "get");
        assert_eq!(found.params.get("id").map(String::as_str), Some("42"));

        let list = table.match_route(HttpMethod::Get, "/users/").unwrap();
        assert_eq!(list.route.handler, "list");
        assert!(list.params.is_empty());

        assert!(table.match_route(HttpMethod::Delete, "/users/42").is_none());
        assert!(table.match_route(HttpMethod::Get, "/users/42/posts").is_none());
    }

    #[test]
    fn test_brace_templates_bind_and_match() {
        let source = r#"
            @Controller('/items')
            class ItemController {
                @Get('{id}')
                get(id: string): string { return id; }

                @Delete('/:id/tags/{tag}')
                untag(id: string, tag: string): void {}
            }
        "#;
        let parsed = AstParser::parse_source(Path::new("items.ts"), source).unwrap();
        let config = CompilerConfig::default();
        let compilation = Compiler::new(config.clone()).compile(&[parsed]).unwrap();
        let manifest = ManifestGenerator::new(&config).generate(&compilation, Utc::now());

        let live = ControllerRegistration::new("ItemController", "/items")
            .get(":id", "get", 1)
            .delete("/{id}/tags/:tag", "untag", 2);
        let table = bind(&manifest, &[live]).unwrap();

        let found = table.match_route(HttpMethod::Get, "/items/42").unwrap();
        assert_eq!(found.route.handler, "get");
        assert_eq!(found.params.get("id").map(String::as_str), Some("42"));

        let untag = table.match_route(HttpMethod::Delete, "/items/7/tags/red").unwrap();
        assert_eq!(untag.route.handler, "untag");
        assert_eq!(
            untag.params.into_iter().collect::<Vec<_>>(),
            vec![("id".to_string(), "7".to_string()), ("tag".to_string(), "red".to_string())]
        );
    }

    #[test]
    fn test_path_drift_is_route_mismatch() {
        let drifted = ControllerRegistration::new("UserController", "/users")
            .get("/", "list", 0)
            .get("/by-id/:id", "get", 1)
            .put("/:id", "update", 2);
        let message = mismatch(bind(&manifest(), &[drifted]));
        assert!(message.contains("/users/by-id/:id"));
    }

    #[test]
    fn test_method_drift_is_route_mismatch() {
        let drifted = ControllerRegistration::new("UserController", "/users")
            .get("/", "list", 0)
            .get("/:id", "get", 1)
            .patch("/:id", "update", 2);
        let message = mismatch(bind(&manifest(), &[drifted]));
        assert!(message.contains("PUT in the manifest but PATCH"));
    }

    #[test]
    fn test_arity_drift_is_route_mismatch() {
        let drifted = ControllerRegistration::new("UserController", "/users")
            .get("/", "list", 0)
            .get("/:id", "get", 1)
            .put("/:id", "update", 1);
        let message = mismatch(bind(&manifest(), &[drifted]));
        assert!(message.contains("argument 1"));
    }

    #[test]
    fn test_count_and_presence_drift() {
        let short = ControllerRegistration::new("UserController", "/users").get("/", "list", 0);
        assert!(mismatch(bind(&manifest(), &[short])).contains("3 operations"));

        assert!(mismatch(bind(&manifest(), &[])).contains("not registered"));

        let extra = ControllerRegistration::new("PostController", "/posts");
        assert!(mismatch(bind(&manifest(), &[live(), extra])).contains("not listed"));
    }

    #[test]
    fn test_renamed_handler() {
        let renamed = ControllerRegistration::new("UserController", "/users")
            .get("/", "list", 0)
            .get("/:id", "findOne", 1)
            .put("/:id", "update", 2);
        assert!(mismatch(bind(&manifest(), &[renamed])).contains("`get`"));
    }
}
