//! Schema builders for ORM entity classes.
//!
//! Classes decorated with `@Entity(..)` are read together with their column
//! decorators, and four components are derived from each: the selected row,
//! the insert payload, the partial update payload and the id parameters.

use crate::error::ConfigError;
use crate::oracle::{TypeId, TypeOracle};
use crate::parser::ast::{find_decorator, ClassDecl, ClassProperty, Decorator, DecoratorArg, Keyword, TypeNode};
use crate::parser::ParsedFile;
use crate::schema_generator::{Schema, SchemaGenerator};
use crate::type_resolver::TypeResolver;
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde_json::Value;

type Result<T> = std::result::Result<T, ConfigError>;

/// How a column is populated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Regular,
    Primary,
    PrimaryGenerated,
    CreateDate,
    UpdateDate,
}

impl ColumnKind {
    fn from_decorator(name: &str) -> Option<Self> {
        match name {
            "Column" => Some(ColumnKind::Regular),
            "PrimaryColumn" => Some(ColumnKind::Primary),
            "PrimaryGeneratedColumn" => Some(ColumnKind::PrimaryGenerated),
            "CreateDateColumn" => Some(ColumnKind::CreateDate),
            "UpdateDateColumn" => Some(ColumnKind::UpdateDate),
            _ => None,
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, ColumnKind::Primary | ColumnKind::PrimaryGenerated)
    }

    /// Filled in by the database, never accepted on insert
    pub fn is_generated(&self) -> bool {
        matches!(
            self,
            ColumnKind::PrimaryGenerated | ColumnKind::CreateDate | ColumnKind::UpdateDate
        )
    }
}

#[derive(Debug, Clone)]
pub struct ColumnDef {
    /// Property name on the entity class
    pub property: String,
    pub kind: ColumnKind,
    pub ty: TypeId,
    /// Explicit database type from the decorator, e.g. `varchar`
    pub column_type: Option<String>,
    pub nullable: bool,
    pub has_default: bool,
}

#[derive(Debug, Clone)]
pub struct EntityDef {
    pub name: String,
    pub table: String,
    pub columns: Vec<ColumnDef>,
}

/// All entities found in a project, keyed by class name.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: IndexMap<String, EntityDef>,
}

impl EntityRegistry {
    /// Collects entity classes; fails on column types that cannot be mapped to a schema.
    pub fn from_files(parsed_files: &[ParsedFile], resolver: &mut TypeResolver) -> Result<Self> {
        let mut entities = IndexMap::new();
        for class in parsed_files.iter().flat_map(ParsedFile::classes) {
            let Some(decorator) = find_decorator(&class.decorators, "Entity") else {
                continue;
            };
            let entity = Self::read_entity(class, decorator, resolver)?;
            debug!(
                "Found entity {} (table {}) with {} columns",
                entity.name,
                entity.table,
                entity.columns.len()
            );
            entities.insert(entity.name.clone(), entity);
        }
        info!("Found {} entities", entities.len());
        Ok(Self { entities })
    }

    fn read_entity(class: &ClassDecl, decorator: &Decorator, resolver: &mut TypeResolver) -> Result<EntityDef> {
        let table = match decorator.literal_arg() {
            Some(Value::String(name)) => name.clone(),
            Some(Value::Object(options)) => options
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| class.name.to_lowercase()),
            _ => class.name.to_lowercase(),
        };

        let mut columns = Vec::new();
        for property in class.properties.iter().filter(|p| !p.is_static) {
            let Some((kind, decorator)) = property
                .decorators
                .iter()
                .find_map(|d| ColumnKind::from_decorator(&d.name).map(|k| (k, d)))
            else {
                continue;
            };
            let column = Self::read_column(property, kind, decorator, resolver);
            if let Some(column_type) = &column.column_type {
                if column_type_schema(column_type).is_none() {
                    return Err(ConfigError::UnknownColumnType {
                        entity: class.name.clone(),
                        column: column.property.clone(),
                        column_type: column_type.clone(),
                    });
                }
            }
            columns.push(column);
        }

        Ok(EntityDef {
            name: class.name.clone(),
            table,
            columns,
        })
    }

    fn read_column(
        property: &ClassProperty,
        kind: ColumnKind,
        decorator: &Decorator,
        resolver: &mut TypeResolver,
    ) -> ColumnDef {
        let ty = match &property.ty {
            Some(node) => resolver.resolve_type_node(node),
            None => resolver.resolve_type_node(&TypeNode::Keyword(Keyword::Unknown)),
        };
        let mut column = ColumnDef {
            property: property.name.clone(),
            kind,
            ty,
            column_type: None,
            nullable: property.optional || resolver.includes_undefined(ty),
            has_default: false,
        };
        // `@Column('varchar')`, `@Column({ type, nullable, default })`, or both
        for arg in decorator.args.iter() {
            match arg {
                DecoratorArg::Literal(Value::String(column_type)) => {
                    // `@PrimaryGeneratedColumn('uuid')` names a strategy, not a type
                    if kind != ColumnKind::PrimaryGenerated || (column_type != "uuid" && column_type != "increment") {
                        column.column_type = Some(column_type.clone());
                    }
                }
                DecoratorArg::Literal(Value::Object(options)) => {
                    if let Some(column_type) = options.get("type").and_then(Value::as_str) {
                        column.column_type = Some(column_type.to_string());
                    }
                    if options.get("nullable").and_then(Value::as_bool) == Some(true) {
                        column.nullable = true;
                    }
                    if options.contains_key("default") {
                        column.has_default = true;
                    }
                }
                _ => {}
            }
        }
        column
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entity(&self, name: &str) -> Result<&EntityDef> {
        self.entities.get(name).ok_or_else(|| ConfigError::UnknownEntity {
            entity: name.to_string(),
        })
    }

    /// First primary key column. Never defaults.
    pub fn primary_key(&self, name: &str) -> Result<&ColumnDef> {
        let entity = self.entity(name)?;
        entity
            .columns
            .iter()
            .find(|c| c.kind.is_primary())
            .ok_or_else(|| ConfigError::MissingPrimaryKey {
                entity: entity.name.clone(),
                table: entity.table.clone(),
            })
    }

    /// Every column, as returned by a select.
    pub fn select_schema<O: TypeOracle + ?Sized>(&self, gen: &mut SchemaGenerator<'_, O>, name: &str) -> Result<Schema> {
        let entity = self.entity(name)?;
        let columns: Vec<&ColumnDef> = entity.columns.iter().collect();
        Ok(object_schema(gen, &columns, |c| !c.nullable, true))
    }

    /// Columns accepted on insert; generated columns are excluded.
    pub fn insert_schema<O: TypeOracle + ?Sized>(&self, gen: &mut SchemaGenerator<'_, O>, name: &str) -> Result<Schema> {
        let entity = self.entity(name)?;
        let columns: Vec<&ColumnDef> = entity.columns.iter().filter(|c| !c.kind.is_generated()).collect();
        Ok(object_schema(gen, &columns, |c| !c.nullable && !c.has_default, false))
    }

    /// Non-key insert columns, all optional.
    pub fn update_schema<O: TypeOracle + ?Sized>(&self, gen: &mut SchemaGenerator<'_, O>, name: &str) -> Result<Schema> {
        let entity = self.entity(name)?;
        let columns: Vec<&ColumnDef> = entity
            .columns
            .iter()
            .filter(|c| !c.kind.is_generated() && !c.kind.is_primary())
            .collect();
        Ok(object_schema(gen, &columns, |_| false, false))
    }

    /// Primary key columns as path parameters; an integer `id` when the entity declares none.
    pub fn id_params_schema<O: TypeOracle + ?Sized>(&self, gen: &mut SchemaGenerator<'_, O>, name: &str) -> Result<Schema> {
        let entity = self.entity(name)?;
        let columns: Vec<&ColumnDef> = entity.columns.iter().filter(|c| c.kind.is_primary()).collect();
        if columns.is_empty() {
            warn!("Entity {} has no primary key, id params default to an integer id", name);
            return Ok(Schema {
                properties: Some(IndexMap::from([("id".to_string(), Schema::typed("integer"))])),
                required: Some(vec!["id".to_string()]),
                ..Schema::typed("object")
            });
        }
        Ok(object_schema(gen, &columns, |_| true, false))
    }

    /// Registers `<E>Entity`, `<E>Insert`, `<E>Update` and `<E>IdParams` for every entity.
    pub fn register_components<O: TypeOracle + ?Sized>(&self, gen: &mut SchemaGenerator<'_, O>) -> Result<()> {
        for name in self.entities.keys() {
            let select = self.select_schema(gen, name)?;
            let insert = self.insert_schema(gen, name)?;
            let update = self.update_schema(gen, name)?;
            let id_params = self.id_params_schema(gen, name)?;
            gen.register(&format!("{}Entity", name), select);
            gen.register(&format!("{}Insert", name), insert);
            gen.register(&format!("{}Update", name), update);
            gen.register(&format!("{}IdParams", name), id_params);
        }
        Ok(())
    }
}

fn object_schema<O, F>(gen: &mut SchemaGenerator<'_, O>, columns: &[&ColumnDef], required: F, allow_null: bool) -> Schema
where
    O: TypeOracle + ?Sized,
    F: Fn(&ColumnDef) -> bool,
{
    let mut properties = IndexMap::new();
    let mut required_names = Vec::new();
    for column in columns {
        let mut schema = column
            .column_type
            .as_deref()
            .and_then(column_type_schema)
            .flatten()
            .unwrap_or_else(|| gen.convert(column.ty));
        if allow_null && column.nullable {
            schema = schema.widen_with_null();
        }
        if required(column) {
            required_names.push(column.property.clone());
        }
        properties.insert(column.property.clone(), schema);
    }
    Schema {
        properties: Some(properties),
        required: (!required_names.is_empty()).then_some(required_names),
        ..Schema::typed("object")
    }
}

/// Schema for a database column type. `Some(None)` means the property type decides.
fn column_type_schema(column_type: &str) -> Option<Option<Schema>> {
    let formatted = |t: &str, format: &str| Schema {
        format: Some(format.to_string()),
        ..Schema::typed(t)
    };
    Some(match column_type.to_ascii_lowercase().as_str() {
        "int" | "int2" | "int4" | "integer" | "smallint" | "tinyint" | "mediumint" => {
            Some(Schema::typed("integer"))
        }
        "int8" | "bigint" => Some(formatted("string", "int64")),
        "float" | "float4" | "float8" | "double" | "double precision" | "real" | "decimal" | "numeric" => {
            Some(Schema::typed("number"))
        }
        "varchar" | "char" | "text" | "string" | "character varying" | "citext" => Some(Schema::typed("string")),
        "uuid" => Some(formatted("string", "uuid")),
        "date" => Some(formatted("string", "date")),
        "datetime" | "timestamp" | "timestamptz" | "timestamp with time zone" => Some(formatted("string", "date-time")),
        "boolean" | "bool" => Some(Schema::typed("boolean")),
        "json" | "jsonb" | "simple-json" | "enum" | "simple-enum" | "simple-array" => None,
        _ => return None,
    })
}
