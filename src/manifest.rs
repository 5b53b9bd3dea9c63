//! Runtime manifest generation.
//!
//! The manifest is what an HTTP adapter binds against at startup: one entry per
//! operation naming its handler, route, arguments and response, every schema
//! given as a JSON pointer into the OpenAPI document's `components.schemas`.

use crate::compiler::{Compilation, CompiledOperation, CompiledParam};
use crate::config::{CompilerConfig, ValidationMode};
use crate::extractor::{HttpMethod, ParamLocation, ParamShape};
use crate::schema_generator::COMPONENTS_POINTER;
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

pub const MANIFEST_VERSION: u32 = 1;

/// Source dialect the schemas were generated from
const SOURCE_DIALECT: &str = "ts-decl-subset";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestDocument {
    pub manifest_version: u32,
    /// RFC 3339, UTC
    pub generated_at: String,
    pub generator: GeneratorInfo,
    pub schemas: SchemaSource,
    pub validation: ValidationSettings,
    pub controllers: Vec<ControllerEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorInfo {
    pub name: String,
    pub version: String,
    pub typescript: String,
}

/// Where the schemas referenced by `schemaRef` live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSource {
    pub kind: String,
    pub file: String,
    pub components_schemas_pointer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSettings {
    pub mode: ValidationMode,
    pub precompiled_module: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerEntry {
    pub controller_id: String,
    pub base_path: String,
    pub operations: Vec<OperationEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationEntry {
    pub operation_id: String,
    pub http: HttpBinding,
    pub handler: HandlerRef,
    pub args: ArgsSpec,
    pub responses: Vec<ResponseSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpBinding {
    pub method: HttpMethod,
    /// Full path, `:name` placeholders
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerRef {
    pub method_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgsSpec {
    pub body: Option<BodyArgSpec>,
    pub path: Vec<ArgSpec>,
    pub query: Vec<ArgSpec>,
    pub headers: Vec<ArgSpec>,
    pub cookies: Vec<ArgSpec>,
}

impl ArgsSpec {
    /// Handler argument positions referenced by this operation.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.body
            .iter()
            .map(|b| b.index)
            .chain(
                self.path
                    .iter()
                    .chain(&self.query)
                    .chain(&self.headers)
                    .chain(&self.cookies)
                    .map(|a| a.index),
            )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgSpec {
    pub name: String,
    pub index: usize,
    pub schema_ref: String,
    pub required: bool,
    /// `scalar` binds one value, `object` binds the whole location
    pub kind: ParamShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyArgSpec {
    pub index: usize,
    pub schema_ref: String,
    pub required: bool,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSpec {
    pub status: u16,
    pub content_type: String,
    /// `None` for handlers that return nothing
    pub schema_ref: Option<String>,
    pub is_array: bool,
}

impl ManifestDocument {
    pub fn operations(&self) -> impl Iterator<Item = &OperationEntry> {
        self.controllers.iter().flat_map(|c| c.operations.iter())
    }

    pub fn controller(&self, controller_id: &str) -> Option<&ControllerEntry> {
        self.controllers.iter().find(|c| c.controller_id == controller_id)
    }
}

/// Projects a [`Compilation`] into a [`ManifestDocument`].
#[derive(Debug, Clone)]
pub struct ManifestGenerator {
    schema_kind: String,
    schemas_file: String,
    validation: ValidationSettings,
}

impl ManifestGenerator {
    pub fn new(config: &CompilerConfig) -> Self {
        Self {
            schema_kind: config.openapi.spec_version.schema_kind().to_string(),
            schemas_file: config.openapi.file.clone(),
            validation: ValidationSettings {
                mode: config.manifest.validation,
                precompiled_module: config.manifest.precompiled_module.clone(),
            },
        }
    }

    /// Overrides the schema file name recorded in the manifest.
    pub fn with_schemas_file(mut self, file: &str) -> Self {
        self.schemas_file = file.to_string();
        self
    }

    pub fn generate(&self, compilation: &Compilation, generated_at: DateTime<Utc>) -> ManifestDocument {
        let controllers = compilation
            .controllers
            .iter()
            .map(|controller| ControllerEntry {
                controller_id: controller.name.clone(),
                base_path: controller.base_path.clone(),
                operations: controller.operations.iter().map(operation_entry).collect(),
            })
            .collect::<Vec<_>>();
        debug!("Manifest lists {} controllers", controllers.len());

        ManifestDocument {
            manifest_version: MANIFEST_VERSION,
            generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            generator: GeneratorInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                typescript: SOURCE_DIALECT.to_string(),
            },
            schemas: SchemaSource {
                kind: self.schema_kind.clone(),
                file: self.schemas_file.clone(),
                components_schemas_pointer: COMPONENTS_POINTER.to_string(),
            },
            validation: self.validation.clone(),
            controllers,
        }
    }
}

fn arg_specs(params: &[CompiledParam], location: ParamLocation) -> Vec<ArgSpec> {
    params
        .iter()
        .filter(|p| p.param.location == location)
        .map(|p| ArgSpec {
            name: p.param.name.clone(),
            index: p.param.index,
            schema_ref: p.schema_ref.clone(),
            required: p.param.required,
            kind: p.param.shape,
        })
        .collect()
}

fn operation_entry(operation: &CompiledOperation) -> OperationEntry {
    let scanned = &operation.scanned;
    let body = operation
        .params
        .iter()
        .find(|p| p.param.location == ParamLocation::Body)
        .map(|p| BodyArgSpec {
            index: p.param.index,
            schema_ref: p.schema_ref.clone(),
            required: p.param.required,
            content_type: operation.request_content_type.clone(),
        });

    OperationEntry {
        operation_id: scanned.operation_id.clone(),
        http: HttpBinding {
            method: scanned.http_method,
            path: scanned.full_path.clone(),
        },
        handler: HandlerRef {
            method_name: scanned.method_name.clone(),
        },
        args: ArgsSpec {
            body,
            path: arg_specs(&operation.params, ParamLocation::Path),
            query: arg_specs(&operation.params, ParamLocation::Query),
            headers: arg_specs(&operation.params, ParamLocation::Header),
            cookies: arg_specs(&operation.params, ParamLocation::Cookie),
        },
        responses: vec![ResponseSpec {
            status: scanned.status,
            content_type: operation.response_content_type.clone(),
            schema_ref: operation
                .response_component
                .as_ref()
                .map(|name| format!("{}/{}", COMPONENTS_POINTER, name)),
            is_array: operation.response_is_array,
        }],
    }
}
