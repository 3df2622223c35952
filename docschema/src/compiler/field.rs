use super::{display_path, join_path, Compiler};
use crate::error::{DocSchemaError, Result};
use crate::introspect::{self, Unwrapped};
use crate::metadata::{FieldOptions, Required};
use crate::node::{CustomType, DefaultValue, Node, NodeKind, Primitive};
use crate::schema::{TargetDefault, TargetField, TargetType};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

impl Compiler<'_> {
    /// Compile one field. `overrides` are the enclosing schema's type options
    /// for this field and win over options attached to the node.
    pub(crate) fn compile_field(
        &self,
        path: &str,
        node: &Node,
        overrides: Option<&FieldOptions>,
    ) -> Result<TargetField> {
        let unwrapped = introspect::unwrap(node);
        let field_type = self.compile_type(path, node, unwrapped.base)?;

        let mut options = self.own_options(&unwrapped);
        if let Some(overrides) = overrides {
            options.merge(overrides);
        }

        let required = self.resolve_required(path, &options, &unwrapped)?;
        let default = resolve_default(&options, &unwrapped, &field_type);

        let mut passthrough = implied_options(unwrapped.base);
        passthrough.extend(options.passthrough());

        log::trace!(
            "field '{}': type={} required={} optional={} nullable={}",
            path,
            field_type.name(),
            required,
            unwrapped.optional,
            unwrapped.nullable
        );

        Ok(TargetField {
            field_type,
            required,
            default,
            options: passthrough,
        })
    }

    /// Bags attached anywhere on the wrapper chain, innermost first, so an
    /// annotation made after wrapping wins over one made before.
    fn own_options(&self, unwrapped: &Unwrapped<'_>) -> FieldOptions {
        let mut options = FieldOptions::new();
        for node in unwrapped.chain.iter().rev() {
            options.merge(&self.store.read(node));
        }
        options
    }

    /// `node` is the field as declared, `base` its unwrapped base node.
    fn compile_type(&self, path: &str, node: &Node, base: &Node) -> Result<TargetType> {
        let field_type = match base.kind() {
            NodeKind::Primitive(primitive) => match primitive {
                Primitive::String => TargetType::String,
                Primitive::Number => TargetType::Number,
                Primitive::Boolean => TargetType::Boolean,
                Primitive::Date => TargetType::Date,
                Primitive::BigInt => TargetType::BigInt,
                Primitive::Any => TargetType::Mixed,
                Primitive::Never => return Err(unsupported(path, base)),
            },
            NodeKind::Literal(value) => literal_type(value),
            NodeKind::Enum(values) if values.is_empty() => return Err(unsupported(path, base)),
            NodeKind::Enum(_) => TargetType::String,
            NodeKind::Custom(CustomType::ObjectId) => TargetType::ObjectId,
            NodeKind::Custom(CustomType::Buffer) => TargetType::Buffer,
            // The full node, so schema options on its wrappers still apply
            NodeKind::Object(_) => {
                TargetType::Schema(Box::new(self.compile_schema(path, node, None)?))
            }
            NodeKind::Array(element) => {
                let element = self.compile_field(&join_path(path, "$"), element, None)?;
                TargetType::Array(Box::new(element))
            }
            NodeKind::Record(value) => {
                let value = self.compile_field(&join_path(path, "$*"), value, None)?;
                TargetType::Map(Box::new(value))
            }
            NodeKind::Union(members) if members.is_empty() => return Err(unsupported(path, base)),
            NodeKind::Union(members) => union_type(members),
            NodeKind::Tuple(_)
            | NodeKind::Optional(_)
            | NodeKind::Nullable(_)
            | NodeKind::Default { .. }
            | NodeKind::Effects { .. } => return Err(unsupported(path, base)),
        };
        Ok(field_type)
    }

    fn resolve_required(
        &self,
        path: &str,
        options: &FieldOptions,
        unwrapped: &Unwrapped<'_>,
    ) -> Result<Required> {
        let conflict = |required: &Required| DocSchemaError::RequiredConflict {
            path: display_path(path),
            required: required.to_string(),
            optional: unwrapped.optional,
            nullable: unwrapped.nullable,
        };

        match &options.required {
            None => Ok(Required::Flag(!unwrapped.is_omittable())),
            Some(required @ Required::Flag(true)) => {
                // A null literal must be present even though its value is null
                if unwrapped.optional || (unwrapped.nullable && !unwrapped.null_literal) {
                    Err(conflict(required))
                } else {
                    Ok(required.clone())
                }
            }
            Some(required @ Required::Flag(false)) => {
                if unwrapped.is_omittable() {
                    Ok(required.clone())
                } else {
                    Err(conflict(required))
                }
            }
            Some(required @ Required::Predicate(_)) => {
                if self.config.strict_required_predicates && !unwrapped.is_omittable() {
                    return Err(conflict(required));
                }
                log::debug!(
                    "field '{}': required predicate passed through without consistency check",
                    display_path(path)
                );
                Ok(required.clone())
            }
        }
    }
}

/// Type-option default beats the validator default. Containers with no
/// default at all get an explicit unset.
fn resolve_default(
    options: &FieldOptions,
    unwrapped: &Unwrapped<'_>,
    field_type: &TargetType,
) -> Option<TargetDefault> {
    match options.default.as_ref().or(unwrapped.default) {
        Some(DefaultValue::Value(value)) if is_composite(value) => {
            let value = value.clone();
            Some(TargetDefault::Producer(Arc::new(move || value.clone())))
        }
        Some(DefaultValue::Value(value)) => Some(TargetDefault::Value(value.clone())),
        Some(DefaultValue::Producer(producer)) => Some(TargetDefault::Producer(producer.clone())),
        None if field_type.is_container() => Some(TargetDefault::Unset),
        None => None,
    }
}

fn is_composite(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_))
}

/// Options implied by the node kind itself. Explicit options override them.
fn implied_options(base: &Node) -> IndexMap<String, Value> {
    let mut implied = IndexMap::new();
    if let NodeKind::Enum(values) = base.kind() {
        let values = values.iter().cloned().map(Value::String).collect();
        implied.insert("enum".to_string(), Value::Array(values));
    }
    implied
}

fn literal_type(value: &Value) -> TargetType {
    match value {
        Value::String(_) => TargetType::String,
        Value::Number(_) => TargetType::Number,
        Value::Bool(_) => TargetType::Boolean,
        Value::Null | Value::Array(_) | Value::Object(_) => TargetType::Mixed,
    }
}

/// Scalar type of a union member, `None` for members with no scalar type.
fn scalar_type(base: &Node) -> Option<TargetType> {
    match base.kind() {
        NodeKind::Primitive(Primitive::String) | NodeKind::Enum(_) => Some(TargetType::String),
        NodeKind::Primitive(Primitive::Number) => Some(TargetType::Number),
        NodeKind::Primitive(Primitive::Boolean) => Some(TargetType::Boolean),
        NodeKind::Primitive(Primitive::Date) => Some(TargetType::Date),
        NodeKind::Primitive(Primitive::BigInt) => Some(TargetType::BigInt),
        NodeKind::Custom(CustomType::ObjectId) => Some(TargetType::ObjectId),
        NodeKind::Custom(CustomType::Buffer) => Some(TargetType::Buffer),
        NodeKind::Literal(value) => match literal_type(value) {
            TargetType::Mixed => None,
            scalar => Some(scalar),
        },
        _ => None,
    }
}

/// The common scalar type of all non-null members, or `Mixed`.
fn union_type(members: &[Node]) -> TargetType {
    let mut common: Option<TargetType> = None;
    for member in members {
        let unwrapped = introspect::unwrap(member);
        if unwrapped.null_literal {
            continue;
        }
        let Some(scalar) = scalar_type(unwrapped.base) else {
            return TargetType::Mixed;
        };
        match &common {
            Some(existing) if existing.name() != scalar.name() => return TargetType::Mixed,
            Some(_) => {}
            None => common = Some(scalar),
        }
    }
    common.unwrap_or(TargetType::Mixed)
}

fn unsupported(path: &str, node: &Node) -> DocSchemaError {
    DocSchemaError::UnsupportedNodeKind {
        path: display_path(path),
        kind: node.kind().name(),
    }
}
