// Timestamp schema generator - ready-made createdAt/updatedAt date fields

use crate::error::{DocSchemaError, Result};
use crate::metadata::{
    FieldOptions, MetadataStore, SchemaOptions, Timestamps, DEFAULT_CREATED_AT,
    DEFAULT_UPDATED_AT,
};
use crate::node::{builder, Node};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

/// Build an object node with a `createdAt` and an `updatedAt` date field under
/// the given names. `None` leaves that field out.
///
/// Both fields are required and indexed, `createdAt` is also immutable. The
/// schema-level `timestamps` option is set to the same names so the mapper
/// maintains them.
pub fn gen_timestamps_schema(
    store: &mut MetadataStore,
    created_at: Option<&str>,
    updated_at: Option<&str>,
) -> Result<Node> {
    if let (Some(created), Some(updated)) = (created_at, updated_at) {
        if created == updated {
            return Err(DocSchemaError::DuplicateTimestampName {
                name: created.to_string(),
            });
        }
    }

    let mut fields = Vec::with_capacity(2);
    if let Some(name) = created_at {
        let node = timestamp_field();
        store.attach(
            &node,
            FieldOptions::new().required(true).index(true).immutable(true),
        );
        fields.push((name, node));
    }
    if let Some(name) = updated_at {
        let node = timestamp_field();
        store.attach(&node, FieldOptions::new().required(true).index(true));
        fields.push((name, node));
    }

    let schema = builder::object(fields);
    store.attach_schema(
        &schema,
        SchemaOptions::new().timestamps(Timestamps::named(created_at, updated_at)),
    );
    Ok(schema)
}

/// [`gen_timestamps_schema`] with the mapper's default field names.
pub fn gen_default_timestamps_schema(store: &mut MetadataStore) -> Result<Node> {
    gen_timestamps_schema(store, Some(DEFAULT_CREATED_AT), Some(DEFAULT_UPDATED_AT))
}

fn timestamp_field() -> Node {
    builder::date().default_with(now)
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}
