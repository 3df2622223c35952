use crate::error::{DocSchemaError, Result};
use crate::metadata::{FieldOptions, SchemaOptions};
use crate::node::{builder, Node};
use crate::registry::Registry;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// One node of a declarative schema file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct NodeDecl {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    nullable: bool,
    default: Option<Value>,
    /// Object fields
    #[serde(default)]
    fields: IndexMap<String, NodeDecl>,
    /// Array element
    items: Option<Box<NodeDecl>>,
    /// Record value
    of: Option<Box<NodeDecl>>,
    /// Union members
    #[serde(default)]
    members: Vec<NodeDecl>,
    /// Enum values
    #[serde(default)]
    values: Vec<String>,
    /// Literal value
    value: Option<Value>,
    /// Field options
    options: Option<FieldOptions>,
    /// Schema-level options, objects only
    schema: Option<SchemaOptions>,
}

/// Keys of [`SchemaOptions`], which field options must not carry.
const SCHEMA_KEYS: [&str; 3] = ["schemaOptions", "typeOptions", "unknownKeys"];

/// Parse a schema file into a validator tree, attaching its options through
/// `registry`.
pub fn load_schema(registry: &mut Registry, path: &Path) -> Result<Node> {
    let content = std::fs::read_to_string(path)?;
    load_schema_str(registry, &content)
}

/// Parse a YAML (or JSON) schema document into a validator tree.
pub fn load_schema_str(registry: &mut Registry, content: &str) -> Result<Node> {
    let decl: NodeDecl = serde_yaml::from_str(content)?;
    build(registry, "", decl)
}

fn build(registry: &mut Registry, path: &str, decl: NodeDecl) -> Result<Node> {
    if decl.schema.is_some() && decl.kind != "object" {
        return Err(schema_error(path, "`schema` options are only allowed on objects"));
    }
    if let Some(options) = &decl.options {
        if let Some(key) = SCHEMA_KEYS.iter().find(|key| options.extra.contains_key(**key)) {
            return Err(schema_error(
                path,
                &format!("`{key}` belongs in the `schema` block, not in `options`"),
            ));
        }
    }

    let base = match decl.kind.as_str() {
        "string" => builder::string(),
        "number" => builder::number(),
        "boolean" => builder::boolean(),
        "date" => builder::date(),
        "bigint" => builder::bigint(),
        "any" => builder::any(),
        "never" => builder::never(),
        "null" => builder::null(),
        "objectId" => builder::object_id(),
        "buffer" => builder::buffer(),
        "literal" => {
            let value = decl
                .value
                .ok_or_else(|| schema_error(path, "literal requires a `value`"))?;
            builder::literal(value)
        }
        "enum" => {
            if decl.values.is_empty() {
                return Err(schema_error(path, "enum requires at least one value"));
            }
            builder::enumeration(decl.values)
        }
        "array" => {
            let items = decl
                .items
                .ok_or_else(|| schema_error(path, "array requires `items`"))?;
            builder::array(build(registry, &child_path(path, "$"), *items)?)
        }
        "record" => {
            let of = decl
                .of
                .ok_or_else(|| schema_error(path, "record requires `of`"))?;
            builder::record(build(registry, &child_path(path, "$*"), *of)?)
        }
        "union" => {
            let members = decl
                .members
                .into_iter()
                .enumerate()
                .map(|(i, member)| build(registry, &child_path(path, &i.to_string()), member))
                .collect::<Result<Vec<_>>>()?;
            builder::union(members)
        }
        "object" => {
            let mut fields = Vec::with_capacity(decl.fields.len());
            for (name, field) in decl.fields {
                let node = build(registry, &child_path(path, &name), field)?;
                fields.push((name, node));
            }
            let node = builder::object(fields);
            match decl.schema {
                Some(options) => registry.schema_options(node, options),
                None => node,
            }
        }
        other => {
            return Err(schema_error(path, &format!("unknown type '{other}'")));
        }
    };

    let mut node = base;
    if let Some(default) = decl.default {
        node = node.default(default);
    }
    if decl.nullable {
        node = node.nullable();
    }
    if decl.optional {
        node = node.optional();
    }
    if let Some(options) = decl.options {
        node = registry.type_options(node, options);
    }
    Ok(node)
}

fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn schema_error(path: &str, message: &str) -> DocSchemaError {
    if path.is_empty() {
        DocSchemaError::Schema(message.to_string())
    } else {
        DocSchemaError::Schema(format!("{path}: {message}"))
    }
}
