//! Controller extraction: finds decorated controller classes and classifies
//! the parameters of their route methods.
//!
//! # Example
//!
//! ```no_run
//! use ts_route_compiler::extractor::{ControllerExtractor, controller::DecoratorExtractor};
//! use ts_route_compiler::parser::AstParser;
//! use ts_route_compiler::type_resolver::TypeResolver;
//! use std::path::Path;
//!
//! let parsed = AstParser::parse_file(Path::new("src/users.controller.ts")).unwrap();
//! let mut resolver = TypeResolver::new(std::slice::from_ref(&parsed));
//! let controllers = DecoratorExtractor::default()
//!     .extract_controllers(&[parsed], &mut resolver)
//!     .unwrap();
//! println!("Found {} controllers", controllers.len());
//! ```

pub mod controller;

use crate::error::Result;
use crate::oracle::{AnnotationResolver, TypeId};
use crate::parser::ParsedFile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Trait for extracting controllers from parsed source files.
pub trait ControllerExtractor {
    /// Extracts every controller across all files, in file then declaration order.
    ///
    /// Annotations in route signatures are resolved through `resolver`.
    fn extract_controllers<R: AnnotationResolver + ?Sized>(
        &self,
        parsed_files: &[ParsedFile],
        resolver: &mut R,
    ) -> Result<Vec<ScannedController>>;
}

/// A decorated controller class.
#[derive(Debug, Clone)]
pub struct ScannedController {
    /// Class name, used as the controller id
    pub name: String,
    /// Base path from the controller decorator ("" when absent)
    pub base_path: String,
    pub operations: Vec<ScannedOperation>,
    /// Class-level `@Consumes(..)`
    pub consumes: Vec<String>,
    /// Class-level `@Produces(..)`
    pub produces: Vec<String>,
    pub file: PathBuf,
}

/// A decorated route method.
#[derive(Debug, Clone)]
pub struct ScannedOperation {
    /// `Controller_method`, sanitized
    pub operation_id: String,
    pub method_name: String,
    pub http_method: HttpMethod,
    /// Path template from the method decorator
    pub path: String,
    /// Base path joined with the method path, colon style
    pub full_path: String,
    pub params: Vec<ScannedParam>,
    /// Promise-unwrapped return type; `None` for void or unannotated methods
    pub return_type: Option<TypeId>,
    /// Type-reference name written in the return annotation
    pub return_hint: Option<String>,
    /// Success status code
    pub status: u16,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub deprecated: bool,
    pub line: usize,
}

impl ScannedOperation {
    pub fn params_in(&self, location: ParamLocation) -> impl Iterator<Item = &ScannedParam> {
        self.params.iter().filter(move |p| p.location == location)
    }

    pub fn body(&self) -> Option<&ScannedParam> {
        self.params_in(ParamLocation::Body).next()
    }
}

/// A classified method parameter.
#[derive(Debug, Clone)]
pub struct ScannedParam {
    /// Name the value is bound from (decorator argument or identifier)
    pub name: String,
    /// Position in the method signature
    pub index: usize,
    pub location: ParamLocation,
    pub shape: ParamShape,
    pub ty: TypeId,
    /// Type-reference name written in the parameter annotation
    pub type_hint: Option<String>,
    pub required: bool,
}

/// HTTP methods recognised on route methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Maps a method decorator name (`Get`, `Post`, ...) to its verb
    pub fn from_decorator(name: &str) -> Option<Self> {
        match name {
            "Get" => Some(HttpMethod::Get),
            "Post" => Some(HttpMethod::Post),
            "Put" => Some(HttpMethod::Put),
            "Patch" => Some(HttpMethod::Patch),
            "Delete" => Some(HttpMethod::Delete),
            _ => None,
        }
    }

    /// Lowercase name, as used for OpenAPI path item keys
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
        }
    }

    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }

    pub fn default_status(&self) -> u16 {
        match self {
            HttpMethod::Post => 201,
            _ => 200,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

/// Where a parameter is bound from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
    Body,
}

/// Whether a parameter binds one value or a whole object of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamShape {
    Scalar,
    Object,
}

/// Joins a base path and a method path into one normalised path.
pub fn join_paths(base: &str, path: &str) -> String {
    let segments: Vec<&str> = base
        .split('/')
        .chain(path.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}
