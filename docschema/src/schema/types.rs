use crate::error::Result;
use crate::metadata::{Required, Strict, UnknownKeys};
use crate::node::Producer;
use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Compiled schema definition handed to the document mapper.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TargetSchema {
    #[serde(rename = "definition")]
    pub fields: IndexMap<String, TargetField>,
    pub options: TargetSchemaOptions,
}

impl TargetSchema {
    pub fn field(&self, name: &str) -> Option<&TargetField> {
        self.fields.get(name)
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render as JSON data for the mapper. Producer defaults are evaluated
    /// once for the rendering.
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Schema construction options in the mapper's shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSchemaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<TargetTimestamps>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<Strict>,
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<bool>,
    /// Recorded for the mapper integration; not a mapper option itself.
    #[serde(skip)]
    pub unknown_keys: Option<UnknownKeys>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Timestamp field names; `None` disables the field (rendered as `false`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTimestamps {
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Serialize for TargetTimestamps {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        for (key, name) in [("createdAt", &self.created_at), ("updatedAt", &self.updated_at)] {
            match name {
                Some(name) => map.serialize_entry(key, name)?,
                None => map.serialize_entry(key, &false)?,
            }
        }
        map.end()
    }
}

/// Compiled default of a field.
#[derive(Clone)]
pub enum TargetDefault {
    /// Explicitly no default, overriding the mapper's implicit one.
    Unset,
    Value(Value),
    /// Called for each new document.
    Producer(Producer),
}

impl TargetDefault {
    /// The default a new document would receive.
    pub fn materialize(&self) -> Option<Value> {
        match self {
            TargetDefault::Unset => None,
            TargetDefault::Value(v) => Some(v.clone()),
            TargetDefault::Producer(f) => Some(f()),
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, TargetDefault::Unset)
    }

    pub fn is_producer(&self) -> bool {
        matches!(self, TargetDefault::Producer(_))
    }
}

impl fmt::Debug for TargetDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetDefault::Unset => f.write_str("Unset"),
            TargetDefault::Value(v) => f.debug_tuple("Value").field(v).finish(),
            TargetDefault::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

impl Serialize for TargetDefault {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.materialize() {
            Some(value) => value.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }
}

/// Mapper type of a compiled field.
#[derive(Debug, Clone)]
pub enum TargetType {
    String,
    Number,
    Boolean,
    Date,
    BigInt,
    Mixed,
    ObjectId,
    Buffer,
    Array(Box<TargetField>),
    Map(Box<TargetField>),
    Schema(Box<TargetSchema>),
}

impl TargetType {
    /// The mapper's type name.
    pub fn name(&self) -> &'static str {
        match self {
            TargetType::String => "String",
            TargetType::Number => "Number",
            TargetType::Boolean => "Boolean",
            TargetType::Date => "Date",
            TargetType::BigInt => "BigInt",
            TargetType::Mixed => "Mixed",
            TargetType::ObjectId => "ObjectId",
            TargetType::Buffer => "Buffer",
            TargetType::Array(_) => "Array",
            TargetType::Map(_) => "Map",
            TargetType::Schema(_) => "Schema",
        }
    }

    /// Arrays and nested schemas, whose mapper defaults would be shared
    /// mutable values.
    pub fn is_container(&self) -> bool {
        matches!(self, TargetType::Array(_) | TargetType::Schema(_))
    }
}

/// Compiled definition of one field.
#[derive(Debug, Clone)]
pub struct TargetField {
    pub field_type: TargetType,
    pub required: Required,
    pub default: Option<TargetDefault>,
    /// Remaining mapper options (`index`, `unique`, `enum`, passthrough...).
    pub options: IndexMap<String, Value>,
}

impl TargetField {
    /// `None` when `required` is a predicate.
    pub fn is_required(&self) -> Option<bool> {
        self.required.as_flag()
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    pub fn default_value(&self) -> Option<Value> {
        self.default.as_ref().and_then(TargetDefault::materialize)
    }

    /// The nested schema of an object-typed field.
    pub fn schema(&self) -> Option<&TargetSchema> {
        match &self.field_type {
            TargetType::Schema(schema) => Some(schema),
            _ => None,
        }
    }

    /// The element definition of an array-typed field.
    pub fn element(&self) -> Option<&TargetField> {
        match &self.field_type {
            TargetType::Array(element) => Some(element),
            _ => None,
        }
    }
}

struct TypeRef<'a>(&'a TargetType);

impl Serialize for TypeRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            TargetType::Array(element) => [element.as_ref()].serialize(serializer),
            TargetType::Schema(schema) => schema.serialize(serializer),
            other => serializer.serialize_str(other.name()),
        }
    }
}

impl Serialize for TargetField {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", &TypeRef(&self.field_type))?;
        if let TargetType::Map(of) = &self.field_type {
            map.serialize_entry("of", of.as_ref())?;
        }
        map.serialize_entry("required", &self.required)?;
        if let Some(default) = &self.default {
            map.serialize_entry("default", default)?;
        }
        for (key, value) in &self.options {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
