//! One compilation run: scan controllers, convert every referenced type and
//! register the per-operation components both output documents point at.

use crate::config::CompilerConfig;
use crate::entity::EntityRegistry;
use crate::envelope;
use crate::error::Result;
use crate::extractor::controller::DecoratorExtractor;
use crate::extractor::{
    ControllerExtractor, ParamLocation, ParamShape, ScannedController, ScannedOperation, ScannedParam,
};
use crate::oracle::TypeOracle;
use crate::parser::ParsedFile;
use crate::schema_generator::{sanitize_name, ComponentTable, Schema, SchemaGenerator, COMPONENTS_POINTER};
use crate::type_resolver::TypeResolver;
use indexmap::IndexMap;
use log::{debug, info};

/// Default media type for bodies and responses
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Result of a compilation run.
#[derive(Debug)]
pub struct Compilation {
    pub controllers: Vec<CompiledController>,
    pub components: ComponentTable,
}

#[derive(Debug, Clone)]
pub struct CompiledController {
    pub name: String,
    pub base_path: String,
    pub operations: Vec<CompiledOperation>,
}

#[derive(Debug, Clone)]
pub struct CompiledOperation {
    pub scanned: ScannedOperation,
    /// Parameters with the JSON pointer of the schema each one validates against
    pub params: Vec<CompiledParam>,
    pub params_component: Option<String>,
    pub query_component: Option<String>,
    pub headers_component: Option<String>,
    pub cookies_component: Option<String>,
    pub body_component: Option<String>,
    pub response_component: Option<String>,
    pub response_is_array: bool,
    pub request_content_type: String,
    pub response_content_type: String,
}

impl CompiledOperation {
    pub fn component_for(&self, location: ParamLocation) -> Option<&str> {
        match location {
            ParamLocation::Path => self.params_component.as_deref(),
            ParamLocation::Query => self.query_component.as_deref(),
            ParamLocation::Header => self.headers_component.as_deref(),
            ParamLocation::Cookie => self.cookies_component.as_deref(),
            ParamLocation::Body => self.body_component.as_deref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledParam {
    pub param: ScannedParam,
    pub schema_ref: String,
}

/// Drives a compilation run over already parsed files.
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn compile(&self, parsed_files: &[ParsedFile]) -> Result<Compilation> {
        let mut resolver = TypeResolver::new(parsed_files);
        let extractor = DecoratorExtractor::new(self.config.controller_decorators.clone());
        let controllers = extractor.extract_controllers(parsed_files, &mut resolver)?;
        let entities = if self.config.entity_schemas {
            Some(EntityRegistry::from_files(parsed_files, &mut resolver)?)
        } else {
            None
        };

        let mut generator = SchemaGenerator::new(&resolver).with_policy(self.config.additional_properties);
        for (name, schema) in envelope::component_schemas() {
            generator.register(name, schema);
        }

        let compiled = controllers
            .into_iter()
            .map(|controller| compile_controller(&mut generator, controller))
            .collect::<Vec<_>>();

        if let Some(entities) = entities {
            entities.register_components(&mut generator)?;
        }

        let components = generator.into_components();
        info!(
            "Compiled {} controllers into {} schema components ({} types resolved)",
            compiled.len(),
            components.len(),
            resolver.type_count()
        );
        Ok(Compilation {
            controllers: compiled,
            components,
        })
    }
}

fn compile_controller<O: TypeOracle + ?Sized>(
    generator: &mut SchemaGenerator<'_, O>,
    controller: ScannedController,
) -> CompiledController {
    let ScannedController {
        name,
        base_path,
        operations,
        consumes,
        produces,
        ..
    } = controller;
    let operations = operations
        .into_iter()
        .map(|operation| {
            let request_content_type = operation
                .consumes
                .first()
                .or(consumes.first())
                .map_or(JSON_CONTENT_TYPE, String::as_str)
                .to_string();
            let response_content_type = operation
                .produces
                .first()
                .or(produces.first())
                .map_or(JSON_CONTENT_TYPE, String::as_str)
                .to_string();
            compile_operation(generator, operation, request_content_type, response_content_type)
        })
        .collect();
    CompiledController {
        name,
        base_path,
        operations,
    }
}

fn pointer(component: &str, suffix: &[&str]) -> String {
    let mut pointer = format!("{}/{}", COMPONENTS_POINTER, component);
    for segment in suffix {
        pointer.push('/');
        pointer.push_str(&segment.replace('~', "~0").replace('/', "~1"));
    }
    pointer
}

fn compile_operation<O: TypeOracle + ?Sized>(
    generator: &mut SchemaGenerator<'_, O>,
    scanned: ScannedOperation,
    request_content_type: String,
    response_content_type: String,
) -> CompiledOperation {
    let op_id = scanned.operation_id.clone();
    debug!("Compiling operation {}", op_id);
    let mut params = Vec::new();

    let params_component = compile_group(generator, &scanned, ParamLocation::Path, "Params", &mut params);
    let query_component = compile_group(generator, &scanned, ParamLocation::Query, "Query", &mut params);
    let headers_component = compile_group(generator, &scanned, ParamLocation::Header, "Headers", &mut params);
    let cookies_component = compile_group(generator, &scanned, ParamLocation::Cookie, "Cookies", &mut params);

    let body_component = scanned.body().map(|body| {
        let schema = generator.convert_with_hint(body.ty, body.type_hint.as_deref());
        let name = generator.register(&format!("{}_Body", op_id), schema);
        params.push(CompiledParam {
            param: body.clone(),
            schema_ref: pointer(&name, &[]),
        });
        name
    });
    params.sort_by_key(|p| p.param.index);

    let mut response_is_array = false;
    let response_component = scanned.return_type.map(|ty| {
        let schema = generator.convert_with_hint(ty, scanned.return_hint.as_deref());
        response_is_array = generator.components().resolve(&schema).is_type("array");
        generator.register(&format!("{}_Response", op_id), schema)
    });

    CompiledOperation {
        scanned,
        params,
        params_component,
        query_component,
        headers_component,
        cookies_component,
        body_component,
        response_component,
        response_is_array,
        request_content_type,
        response_content_type,
    }
}

/// Registers `<opId>_<suffix>` for the parameters bound from `location`, if any.
fn compile_group<O: TypeOracle + ?Sized>(
    generator: &mut SchemaGenerator<'_, O>,
    scanned: &ScannedOperation,
    location: ParamLocation,
    suffix: &str,
    params: &mut Vec<CompiledParam>,
) -> Option<String> {
    let members: Vec<&ScannedParam> = scanned.params_in(location).collect();
    if members.is_empty() {
        return None;
    }
    let name = sanitize_name(&format!("{}_{}", scanned.operation_id, suffix));
    let (schema, refs) = group_schema(generator, &name, &members);
    let name = generator.register(&name, schema);
    params.extend(members.into_iter().zip(refs).map(|(param, schema_ref)| CompiledParam {
        param: param.clone(),
        schema_ref,
    }));
    Some(name)
}

/// Schema for the parameters of one location plus each parameter's pointer into it.
///
/// A lone object parameter is the whole schema; scalars form an object of their
/// own; a mix of both is combined with `allOf`.
fn group_schema<O: TypeOracle + ?Sized>(
    generator: &mut SchemaGenerator<'_, O>,
    component: &str,
    members: &[&ScannedParam],
) -> (Schema, Vec<String>) {
    let objects: Vec<&&ScannedParam> = members.iter().filter(|p| p.shape == ParamShape::Object).collect();
    let has_scalars = objects.len() < members.len();

    if !has_scalars && objects.len() == 1 {
        let param = objects[0];
        let schema = generator.convert_with_hint(param.ty, param.type_hint.as_deref());
        return (schema, vec![pointer(component, &[])]);
    }

    let mut properties = IndexMap::new();
    let mut required = Vec::new();
    for param in members.iter().filter(|p| p.shape == ParamShape::Scalar) {
        let schema = generator.convert_with_hint(param.ty, param.type_hint.as_deref());
        if param.required {
            required.push(param.name.clone());
        }
        properties.insert(param.name.clone(), schema);
    }
    let scalars = Schema {
        properties: Some(properties),
        required: (!required.is_empty()).then_some(required),
        ..Schema::typed("object")
    };

    if objects.is_empty() {
        let refs = members
            .iter()
            .map(|p| pointer(component, &["properties", p.name.as_str()]))
            .collect();
        return (scalars, refs);
    }

    // objects first, then the scalar object
    let mut all_of = Vec::new();
    let mut object_refs = Vec::new();
    for (i, param) in objects.iter().enumerate() {
        all_of.push(generator.convert_with_hint(param.ty, param.type_hint.as_deref()));
        object_refs.push((param.index, pointer(component, &["allOf", i.to_string().as_str()])));
    }
    let scalar_branch = all_of.len().to_string();
    if has_scalars {
        all_of.push(scalars);
    }
    let refs = members
        .iter()
        .map(|p| match object_refs.iter().find(|(index, _)| *index == p.index) {
            Some((_, r)) => r.clone(),
            None => pointer(component, &["allOf", scalar_branch.as_str(), "properties", p.name.as_str()]),
        })
        .collect();
    (
        Schema {
            all_of: Some(all_of),
            ..Schema::default()
        },
        refs,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstParser;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::Path;

    fn compile(code: &str) -> Compilation {
        let parsed = AstParser::parse_source(Path::new("api.ts"), code).unwrap();
        Compiler::new(CompilerConfig::default()).compile(&[parsed]).unwrap()
    }

    fn component(compilation: &Compilation, name: &str) -> serde_json::Value {
        serde_json::to_value(compilation.components.get(name).unwrap()).unwrap()
    }

    const USERS: &str = r#"
        interface User { id: number; name: string }
        interface CreateUserPayload { name: string }

        @Controller('/users')
        export class UserController {
            @Get('/')
            async list(): Promise<User[]> { return []; }

            @Post('/')
            async create(body: CreateUserPayload): Promise<User> { return null as any; }

            @Get('/:id')
            async get(id: number, @Headers('x-trace') trace?: string): Promise<User | null> { return null; }

            @Delete('/:id')
            async remove(id: number): Promise<void> {}
        }
    "#;

    #[test]
    fn test_registers_operation_components() {
        let compilation = compile(USERS);
        let ops = &compilation.controllers[0].operations;

        let list = &ops[0];
        assert_eq!(list.response_component.as_deref(), Some("UserController_list_Response"));
        assert!(list.response_is_array);
        assert_eq!(
            component(&compilation, "UserController_list_Response"),
            json!({"type": "array", "items": {"$ref": "#/components/schemas/User"}})
        );

        let create = &ops[1];
        assert_eq!(
            component(&compilation, "UserController_create_Body"),
            json!({"$ref": "#/components/schemas/CreateUserPayload"})
        );
        assert_eq!(create.params[0].schema_ref, "#/components/schemas/UserController_create_Body");
        assert!(!create.response_is_array);

        let remove = &ops[3];
        assert!(remove.response_component.is_none());
        assert!(compilation.components.contains("ErrorEnvelope"));
    }

    #[test]
    fn test_scalar_groups_and_pointers() {
        let compilation = compile(USERS);
        let get = &compilation.controllers[0].operations[2];
        assert_eq!(
            component(&compilation, "UserController_get_Params"),
            json!({"type": "object", "properties": {"id": {"type": "number"}}, "required": ["id"]})
        );
        assert_eq!(
            component(&compilation, "UserController_get_Headers"),
            json!({"type": "object", "properties": {"x-trace": {"type": "string"}}})
        );
        let refs: Vec<&str> = get.params.iter().map(|p| p.schema_ref.as_str()).collect();
        assert_eq!(
            refs,
            vec![
                "#/components/schemas/UserController_get_Params/properties/id",
                "#/components/schemas/UserController_get_Headers/properties/x-trace",
            ]
        );
    }

    #[test]
    fn test_mixed_query_uses_all_of() {
        let compilation = compile(
            r#"
            interface Paging { page: number }
            @Controller('/search')
            class SearchController {
                @Get('/')
                find(paging: Paging, term: string) {}
            }
            "#,
        );
        let find = &compilation.controllers[0].operations[0];
        assert_eq!(
            component(&compilation, "SearchController_find_Query"),
            json!({
                "allOf": [
                    {"$ref": "#/components/schemas/Paging"},
                    {"type": "object", "properties": {"term": {"type": "string"}}, "required": ["term"]}
                ]
            })
        );
        assert_eq!(find.params[0].schema_ref, "#/components/schemas/SearchController_find_Query/allOf/0");
        assert_eq!(
            find.params[1].schema_ref,
            "#/components/schemas/SearchController_find_Query/allOf/1/properties/term"
        );
    }

    #[test]
    fn test_content_types_from_decorators() {
        let compilation = compile(
            r#"
            @Controller('/files')
            @Consumes('multipart/form-data')
            class FileController {
                @Post('/')
                @Produces('text/plain')
                upload(file: string): string { return ''; }
            }
            "#,
        );
        let upload = &compilation.controllers[0].operations[0];
        assert_eq!(upload.request_content_type, "multipart/form-data");
        assert_eq!(upload.response_content_type, "text/plain");
    }

    #[test]
    fn test_entity_components_when_enabled() {
        let parsed = AstParser::parse_source(
            Path::new("user.entity.ts"),
            "@Entity('users') class User { @PrimaryColumn() id: string; @Column() name: string; }",
        )
        .unwrap();
        let config = CompilerConfig {
            entity_schemas: true,
            ..CompilerConfig::default()
        };
        let compilation = Compiler::new(config).compile(&[parsed]).unwrap();
        assert!(compilation.components.contains("UserEntity"));
        assert!(compilation.components.contains("UserIdParams"));
    }
}
