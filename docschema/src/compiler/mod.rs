//! Schema compilation - turns a validator tree plus its attached options into
//! a [`TargetSchema`].
//!
//! [`Compiler::compile`] is the entry point. The schema pass walks an object's
//! fields in declaration order and hands each one to the field pass, which
//! recurses back into the schema pass for nested objects and array elements.

mod field;
mod schema;

use crate::error::Result;
use crate::metadata::{MetadataStore, SchemaOptions, UnknownKeys};
use crate::node::Node;
use crate::schema::TargetSchema;
use serde::Deserialize;

/// Compilation settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    /// Reject a `required` predicate on a field that is neither optional nor
    /// nullable. Off by default: predicates pass through unchecked.
    pub strict_required_predicates: bool,
    /// Unknown-keys mode for schemas that do not set one.
    pub default_unknown_keys: Option<UnknownKeys>,
}

impl CompileConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}

/// Read-only view over a metadata store used for one compilation.
pub struct Compiler<'a> {
    store: &'a MetadataStore,
    config: &'a CompileConfig,
}

impl<'a> Compiler<'a> {
    pub fn new(store: &'a MetadataStore, config: &'a CompileConfig) -> Self {
        Compiler { store, config }
    }

    /// Compile an object node. `options` are layered over the schema-level
    /// options attached to the node.
    pub fn compile(&self, node: &Node, options: Option<&SchemaOptions>) -> Result<TargetSchema> {
        self.compile_schema("", node, options)
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}
