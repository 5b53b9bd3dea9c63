use crate::compiler::{Compilation, CompiledOperation};
use crate::config::{OpenApiConfig, OpenApiVersion};
use crate::envelope::ERROR_ENVELOPE;
use crate::extractor::controller::path_tokens;
use crate::extractor::{HttpMethod, ParamLocation};
use crate::schema_generator::{AdditionalProperties, ComponentTable, Schema, SchemaType};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

/// OpenAPI document builder
pub struct OpenApiBuilder {
    version: OpenApiVersion,
    /// OpenAPI info section
    info: Info,
    /// Paths collection (URL path -> PathItem)
    paths: IndexMap<String, PathItem>,
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
}

impl PathItem {
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
        }
    }

    fn slot(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Patch => &mut self.patch,
        }
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub operation_id: String,
    /// Parameters (path, query, header, cookie)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Status code -> response
    pub responses: IndexMap<String, Response>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub deprecated: bool,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Parameter location (path, query, header, cookie)
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    pub schema: Schema,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    /// Content types and their schemas
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Components {
    pub schemas: IndexMap<String, Schema>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    pub info: Info,
    pub paths: IndexMap<String, PathItem>,
    pub components: Components,
}

/// Error responses attached to every operation
const ERROR_RESPONSES: [(&str, &str); 3] = [
    ("400", "Bad request"),
    ("404", "Not found"),
    ("500", "Internal server error"),
];

const ERROR_CONTENT_TYPE: &str = "application/json";

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with default info
    pub fn new() -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            version: OpenApiVersion::default(),
            info: Info {
                title: "API".to_string(),
                version: "1.0.0".to_string(),
                description: None,
            },
            paths: IndexMap::new(),
        }
    }

    pub fn from_config(config: &OpenApiConfig) -> Self {
        Self::new()
            .with_version(config.spec_version)
            .with_info(config.title.clone(), config.version.clone(), config.description.clone())
    }

    pub fn with_version(mut self, version: OpenApiVersion) -> Self {
        self.version = version;
        self
    }

    /// Set custom info for the API
    pub fn with_info(mut self, title: String, version: String, description: Option<String>) -> Self {
        self.info = Info {
            title,
            version,
            description,
        };
        self
    }

    /// Adds every operation of a compilation.
    pub fn add_compilation(&mut self, compilation: &Compilation) {
        for operation in compilation.controllers.iter().flat_map(|c| c.operations.iter()) {
            self.add_operation(operation, &compilation.components);
        }
    }

    /// Add an operation to the OpenAPI document
    pub fn add_operation(&mut self, operation: &CompiledOperation, components: &ComponentTable) {
        let scanned = &operation.scanned;
        debug!("Adding operation: {} {}", scanned.http_method, scanned.full_path);

        let openapi_path = Self::convert_path_format(&scanned.full_path);

        let mut parameters = Self::path_parameters(operation, components);
        for (location, name) in [
            (ParamLocation::Query, "query"),
            (ParamLocation::Header, "header"),
            (ParamLocation::Cookie, "cookie"),
        ] {
            parameters.extend(Self::unrolled_parameters(operation, components, location, name));
        }

        let request_body = match (scanned.http_method.has_body(), &operation.body_component) {
            (true, Some(component)) => Some(RequestBody {
                description: None,
                required: operation
                    .params
                    .iter()
                    .any(|p| p.param.location == ParamLocation::Body && p.param.required),
                content: self.content(&operation.request_content_type, Self::inline(components, component)),
            }),
            _ => None,
        };

        let mut responses = IndexMap::new();
        responses.insert(
            scanned.status.to_string(),
            Response {
                description: "Successful response".to_string(),
                content: operation
                    .response_component
                    .as_deref()
                    .map(|component| self.content(&operation.response_content_type, Self::inline(components, component))),
            },
        );
        for (status, description) in ERROR_RESPONSES {
            responses.insert(
                status.to_string(),
                Response {
                    description: description.to_string(),
                    content: Some(self.content(ERROR_CONTENT_TYPE, Schema::reference(ERROR_ENVELOPE))),
                },
            );
        }

        let operation = Operation {
            tags: scanned.tags.clone(),
            summary: scanned.summary.clone(),
            operation_id: scanned.operation_id.clone(),
            parameters,
            request_body,
            responses,
            deprecated: scanned.deprecated,
        };

        let path_item = self.paths.entry(openapi_path).or_default();
        *path_item.slot(scanned.http_method) = Some(operation);
    }

    fn content(&self, content_type: &str, mut schema: Schema) -> IndexMap<String, MediaType> {
        if self.version == OpenApiVersion::V3_0 {
            downgrade_to_3_0(&mut schema);
        }
        let mut content = IndexMap::new();
        content.insert(content_type.to_string(), MediaType { schema });
        content
    }

    /// The component's own schema, for use at the point of reference
    fn inline(components: &ComponentTable, name: &str) -> Schema {
        components.get(name).cloned().unwrap_or_else(|| Schema::reference(name))
    }

    fn path_parameters(operation: &CompiledOperation, components: &ComponentTable) -> Vec<Parameter> {
        let properties = operation
            .params_component
            .as_deref()
            .and_then(|name| components.get(name))
            .map(|schema| object_properties(components, schema).0)
            .unwrap_or_default();

        path_tokens(&operation.scanned.full_path)
            .into_iter()
            .map(|token| Parameter {
                schema: properties
                    .get(&token)
                    .cloned()
                    .unwrap_or_else(|| Schema::typed("string")),
                name: token,
                location: "path".to_string(),
                required: true,
                description: None,
            })
            .collect()
    }

    /// One parameter per property, only when the location's schema is an object
    /// with properties.
    fn unrolled_parameters(
        operation: &CompiledOperation,
        components: &ComponentTable,
        location: ParamLocation,
        location_name: &str,
    ) -> Vec<Parameter> {
        let Some(schema) = operation.component_for(location).and_then(|name| components.get(name)) else {
            return Vec::new();
        };
        let (properties, required) = object_properties(components, schema);
        properties
            .into_iter()
            .map(|(name, schema)| Parameter {
                required: required.contains(&name),
                name,
                location: location_name.to_string(),
                schema,
                description: None,
            })
            .collect()
    }

    /// Convert path format from :param to OpenAPI {param} format
    fn convert_path_format(path: &str) -> String {
        path.split('/')
            .map(|part| match part.strip_prefix(':') {
                Some(name) => format!("{{{}}}", name),
                None => part.to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Build the final OpenAPI document
    pub fn build(self, components: &ComponentTable) -> OpenApiDocument {
        debug!("Building final OpenAPI document");
        let mut schemas = components.schemas().clone();
        let mut paths = self.paths;
        if self.version == OpenApiVersion::V3_0 {
            schemas.values_mut().for_each(downgrade_to_3_0);
            for operation in paths.values_mut().flat_map(|item| {
                [&mut item.get, &mut item.post, &mut item.put, &mut item.delete, &mut item.patch]
                    .into_iter()
                    .flatten()
            }) {
                operation.parameters.iter_mut().for_each(|p| downgrade_to_3_0(&mut p.schema));
            }
        }

        OpenApiDocument {
            openapi: self.version.as_str().to_string(),
            info: self.info,
            paths,
            components: Components { schemas },
        }
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Properties and required names of an object schema, looking through
/// references and merging `allOf` members.
fn object_properties(components: &ComponentTable, schema: &Schema) -> (IndexMap<String, Schema>, Vec<String>) {
    let resolved = components.resolve(schema);
    let mut properties = IndexMap::new();
    let mut required = Vec::new();
    if let Some(members) = &resolved.all_of {
        for member in members {
            let (member_properties, member_required) = object_properties(components, member);
            for (name, schema) in member_properties {
                properties.entry(name).or_insert(schema);
            }
            required.extend(member_required);
        }
    }
    if let Some(own) = &resolved.properties {
        for (name, schema) in own {
            properties.entry(name.clone()).or_insert_with(|| schema.clone());
        }
        required.extend(resolved.required.iter().flatten().cloned());
    }
    (properties, required)
}

/// Rewrites 3.1-only constructs: `null` in a type array and `{type: "null"}`
/// union branches become `nullable: true`.
pub fn downgrade_to_3_0(schema: &mut Schema) {
    if let Some(SchemaType::Multiple(types)) = &schema.schema_type {
        if types.iter().any(|t| t == "null") {
            let mut rest: Vec<String> = types.iter().filter(|t| *t != "null").cloned().collect();
            schema.schema_type = match rest.len() {
                0 => None,
                1 => rest.pop().map(SchemaType::Single),
                _ => Some(SchemaType::Multiple(rest)),
            };
            schema.nullable = Some(true);
        }
    }
    for branches in [&mut schema.any_of, &mut schema.one_of].into_iter().flatten() {
        let before = branches.len();
        branches.retain(|b| !(b.is_type("null") && b.properties.is_none() && b.reference.is_none()));
        if branches.len() < before {
            schema.nullable = Some(true);
        }
    }

    if let Some(items) = schema.items.as_deref_mut() {
        downgrade_to_3_0(items);
    }
    if let Some(AdditionalProperties::Schema(inner)) = schema.additional_properties.as_mut() {
        downgrade_to_3_0(inner);
    }
    for property in schema.properties.iter_mut().flat_map(|p| p.values_mut()) {
        downgrade_to_3_0(property);
    }
    for branches in [&mut schema.any_of, &mut schema.one_of, &mut schema.all_of]
        .into_iter()
        .flatten()
    {
        branches.iter_mut().for_each(downgrade_to_3_0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;
    use crate::config::CompilerConfig;
    use crate::parser::AstParser;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::path::Path;

    fn document(code: &str, version: OpenApiVersion) -> Value {
        let parsed = AstParser::parse_source(Path::new("api.ts"), code).unwrap();
        let compilation = Compiler::new(CompilerConfig::default()).compile(&[parsed]).unwrap();
        let mut builder = OpenApiBuilder::new().with_version(version);
        builder.add_compilation(&compilation);
        serde_json::to_value(builder.build(&compilation.components)).unwrap()
    }

    const USERS: &str = r#"
        interface User { id: number; name: string; email?: string | null }
        interface CreateUserPayload { name: string }
        interface ListFilter { name?: string; limit?: number }

        @Controller('/users')
        @Tags('users')
        class UserController {
            @Get('/')
            @Summary('List users')
            list(filter: ListFilter): Promise<User[]> { return null as any; }

            @Post('/')
            create(payload: CreateUserPayload): Promise<User> { return null as any; }

            @Get('/:id')
            @Deprecated()
            get(id: number, @Headers('x-request-id') requestId: string): User { return null as any; }

            @Delete('/:id')
            @HttpCode(204)
            remove(id: number): void {}
        }
    "#;

    #[test]
    fn test_new_builder() {
        let builder = OpenApiBuilder::new();
        assert_eq!(builder.info.title, "API");
        assert_eq!(builder.info.version, "1.0.0");
        assert!(builder.paths.is_empty());
    }

    #[test]
    fn test_with_info() {
        let builder = OpenApiBuilder::new().with_info(
            "My API".to_string(),
            "2.0.0".to_string(),
            Some("Custom description".to_string()),
        );
        assert_eq!(builder.info.title, "My API");
        assert_eq!(builder.info.description, Some("Custom description".to_string()));
    }

    #[test]
    fn test_convert_path_format() {
        assert_eq!(OpenApiBuilder::convert_path_format("/users/:id"), "/users/{id}");
        assert_eq!(
            OpenApiBuilder::convert_path_format("/a/:a/b/:b"),
            "/a/{a}/b/{b}"
        );
        assert_eq!(OpenApiBuilder::convert_path_format("/health"), "/health");
    }

    #[test]
    fn test_list_and_create_schemas_are_inlined() {
        let doc = document(USERS, OpenApiVersion::V3_1);
        assert_eq!(doc["openapi"], json!("3.1.0"));
        assert_eq!(
            doc["paths"]["/users"]["get"]["responses"]["200"]["content"]["application/json"]["schema"],
            json!({"type": "array", "items": {"$ref": "#/components/schemas/User"}})
        );
        assert_eq!(
            doc["paths"]["/users"]["post"]["requestBody"]["content"]["application/json"]["schema"],
            json!({"$ref": "#/components/schemas/CreateUserPayload"})
        );
        assert_eq!(doc["paths"]["/users"]["post"]["requestBody"]["required"], json!(true));
        assert!(doc["paths"]["/users"]["post"]["responses"]["201"].is_object());
        assert!(doc["components"]["schemas"]["UserController_list_Response"].is_object());
        assert_eq!(
            doc["components"]["schemas"]["User"]["properties"]["email"],
            json!({"type": ["string", "null"]})
        );
    }

    #[test]
    fn test_query_object_is_unrolled() {
        let doc = document(USERS, OpenApiVersion::V3_1);
        let list = &doc["paths"]["/users"]["get"];
        assert_eq!(
            list["parameters"],
            json!([
                {"name": "name", "in": "query", "required": false, "schema": {"type": "string"}},
                {"name": "limit", "in": "query", "required": false, "schema": {"type": "number"}}
            ])
        );
        assert_eq!(list["tags"], json!(["users"]));
        assert_eq!(list["summary"], json!("List users"));
        assert_eq!(list["operationId"], json!("UserController_list"));
    }

    #[test]
    fn test_path_and_header_parameters() {
        let doc = document(USERS, OpenApiVersion::V3_1);
        let get = &doc["paths"]["/users/{id}"]["get"];
        assert_eq!(
            get["parameters"],
            json!([
                {"name": "id", "in": "path", "required": true, "schema": {"type": "number"}},
                {"name": "x-request-id", "in": "header", "required": true, "schema": {"type": "string"}}
            ])
        );
        assert_eq!(get["deprecated"], json!(true));
    }

    #[test]
    fn test_error_responses_share_envelope() {
        let doc = document(USERS, OpenApiVersion::V3_1);
        let remove = &doc["paths"]["/users/{id}"]["delete"];
        let statuses: Vec<&String> = remove["responses"].as_object().unwrap().keys().collect();
        assert_eq!(statuses, vec!["204", "400", "404", "500"]);
        assert!(remove["responses"]["204"].get("content").is_none());
        assert!(remove.get("requestBody").is_none());
        for status in ["400", "404", "500"] {
            assert_eq!(
                remove["responses"][status]["content"]["application/json"]["schema"],
                json!({"$ref": "#/components/schemas/ErrorEnvelope"})
            );
        }
        assert!(doc["components"]["schemas"]["ErrorEnvelope"].is_object());
    }

    #[test]
    fn test_unknown_path_token_falls_back_to_string() {
        let doc = document(
            r#"
            @Controller('/files')
            class FileController {
                @Get('/:bucket/:key')
                fetch(key: string) {}
            }
            "#,
            OpenApiVersion::V3_1,
        );
        let params = &doc["paths"]["/files/{bucket}/{key}"]["get"]["parameters"];
        assert_eq!(params[0], json!({"name": "bucket", "in": "path", "required": true, "schema": {"type": "string"}}));
        assert_eq!(params[1]["name"], json!("key"));
    }

    #[test]
    fn test_3_0_downgrade() {
        let doc = document(USERS, OpenApiVersion::V3_0);
        assert_eq!(doc["openapi"], json!("3.0.3"));
        assert_eq!(
            doc["components"]["schemas"]["User"]["properties"]["email"],
            json!({"type": "string", "nullable": true})
        );
    }

    #[test]
    fn test_downgrade_folds_null_branch() {
        let mut schema = Schema {
            any_of: Some(vec![Schema::reference("User"), Schema::typed("null")]),
            ..Schema::default()
        };
        downgrade_to_3_0(&mut schema);
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({"anyOf": [{"$ref": "#/components/schemas/User"}], "nullable": true})
        );
    }
}
