use super::{display_path, join_path, Compiler};
use crate::error::{DocSchemaError, Result};
use crate::introspect;
use crate::metadata::{SchemaOptions, UnknownKeys};
use crate::node::Node;
use crate::schema::{TargetSchema, TargetSchemaOptions, TargetTimestamps};
use indexmap::IndexMap;

impl Compiler<'_> {
    /// Compile an object node into a schema. Fails for anything that does not
    /// unwrap to an object.
    pub(crate) fn compile_schema(
        &self,
        path: &str,
        node: &Node,
        explicit: Option<&SchemaOptions>,
    ) -> Result<TargetSchema> {
        let unwrapped = introspect::unwrap(node);
        let Some(shape) = unwrapped.base.shape() else {
            return Err(DocSchemaError::UnsupportedNodeKind {
                path: display_path(path),
                kind: unwrapped.base.kind().name(),
            });
        };

        let mut options = SchemaOptions::default();
        for node in unwrapped.chain.iter().rev() {
            options.merge(&self.store.read_schema(node));
        }
        if let Some(explicit) = explicit {
            options.merge(explicit);
        }

        log::debug!(
            "compiling schema '{}' with {} field(s)",
            display_path(path),
            shape.len()
        );

        for name in options.type_options.keys() {
            if !shape.contains_key(name) {
                log::warn!(
                    "type options for '{}' ignored: no such field in schema '{}'",
                    name,
                    display_path(path)
                );
            }
        }

        let mut fields = IndexMap::with_capacity(shape.len());
        for (name, field_node) in shape {
            let field_path = join_path(path, name);
            let field = self.compile_field(&field_path, field_node, options.type_options.get(name))?;
            fields.insert(name.clone(), field);
        }

        Ok(TargetSchema {
            fields,
            options: self.target_options(&options),
        })
    }

    fn target_options(&self, options: &SchemaOptions) -> TargetSchemaOptions {
        let mapper = &options.schema_options;
        let unknown_keys = options.unknown_keys.or(self.config.default_unknown_keys);
        // An explicit `strict` wins over the one implied by unknown keys
        let strict = mapper
            .strict
            .or_else(|| unknown_keys.map(UnknownKeys::strict_mode));
        let timestamps = mapper.timestamps.as_ref().map(|timestamps| {
            let (created_at, updated_at) = timestamps.resolve();
            TargetTimestamps {
                created_at,
                updated_at,
            }
        });

        TargetSchemaOptions {
            collection: mapper.collection.clone(),
            timestamps,
            strict,
            id: mapper.id,
            unknown_keys,
            extra: mapper.extra.clone(),
        }
    }
}
