use crate::compiler::{CompileConfig, Compiler};
use crate::error::{DocSchemaError, Result};
use crate::metadata::{FieldOptions, MetadataStore, SchemaOptions};
use crate::node::Node;
use crate::schema::TargetSchema;
use crate::timestamps;

/// Owns the option bags attached to validator nodes and compiles schemas
/// against them.
///
/// Annotation methods take a node and hand it back, so they chain the same
/// way node builder calls do:
///
/// ```
/// use docschema::{v, FieldOptions, Registry};
///
/// let mut registry = Registry::new();
/// let active = registry.type_options(
///     v::boolean().default(true),
///     FieldOptions::new().index(true),
/// );
/// let user = v::object([("username", v::string()), ("active", active)]);
///
/// let schema = registry.compile(&user).unwrap();
/// assert_eq!(schema.field("username").unwrap().is_required(), Some(true));
/// ```
#[derive(Default)]
pub struct Registry {
    store: MetadataStore,
    config: CompileConfig,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CompileConfig) -> Self {
        Registry {
            store: MetadataStore::new(),
            config,
        }
    }

    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// Attach field options to `node`. Repeated calls on the same node merge,
    /// later keys win.
    ///
    /// When a field is wrapped (`optional`, `default`, ...), the bags of the
    /// whole wrapper chain are merged from the innermost node outwards. A bag
    /// on an outer wrapper therefore beats one on the node it wraps, even if
    /// the inner one was attached later through a retained clone.
    pub fn type_options(&mut self, node: Node, options: FieldOptions) -> Node {
        self.store.attach(&node, options);
        node
    }

    /// Attach schema-level options to an object node. Repeated calls merge.
    pub fn schema_options(&mut self, node: Node, options: SchemaOptions) -> Node {
        self.store.attach_schema(&node, options);
        node
    }

    /// A new object node with the fields of `base` plus `fields`, keeping the
    /// schema-level options of `base`.
    pub fn extend<K, I>(&mut self, base: &Node, fields: I) -> Result<Node>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Node)>,
    {
        let extended = base
            .extended(fields)
            .ok_or_else(|| DocSchemaError::UnsupportedNodeKind {
                path: "<root>".to_string(),
                kind: base.kind().name(),
            })?;
        self.store.copy_schema(base, &extended);
        Ok(extended)
    }

    /// See [`timestamps::gen_timestamps_schema`].
    pub fn timestamps_schema(
        &mut self,
        created_at: Option<&str>,
        updated_at: Option<&str>,
    ) -> Result<Node> {
        timestamps::gen_timestamps_schema(&mut self.store, created_at, updated_at)
    }

    pub fn compile(&self, node: &Node) -> Result<TargetSchema> {
        Compiler::new(&self.store, &self.config).compile(node, None)
    }

    /// Compile with `options` layered over the options attached to `node`.
    pub fn compile_with(&self, node: &Node, options: &SchemaOptions) -> Result<TargetSchema> {
        Compiler::new(&self.store, &self.config).compile(node, Some(options))
    }
}
