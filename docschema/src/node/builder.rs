//! Fluent constructors for validator nodes.
//!
//! Re-exported at the crate root as `v`, so schemas read as
//! `v::object([("name", v::string()), ("age", v::number().optional())])`.

use indexmap::IndexMap;
use serde_json::Value;

use super::{CustomType, Node, NodeKind, Primitive};

pub fn string() -> Node {
    Node::new(NodeKind::Primitive(Primitive::String))
}

pub fn number() -> Node {
    Node::new(NodeKind::Primitive(Primitive::Number))
}

pub fn boolean() -> Node {
    Node::new(NodeKind::Primitive(Primitive::Boolean))
}

pub fn date() -> Node {
    Node::new(NodeKind::Primitive(Primitive::Date))
}

pub fn bigint() -> Node {
    Node::new(NodeKind::Primitive(Primitive::BigInt))
}

pub fn any() -> Node {
    Node::new(NodeKind::Primitive(Primitive::Any))
}

pub fn never() -> Node {
    Node::new(NodeKind::Primitive(Primitive::Never))
}

pub fn literal(value: impl Into<Value>) -> Node {
    Node::new(NodeKind::Literal(value.into()))
}

/// The `null` literal.
pub fn null() -> Node {
    literal(Value::Null)
}

/// A set of accepted string values.
pub fn enumeration<I, S>(values: I) -> Node
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Node::new(NodeKind::Enum(values.into_iter().map(Into::into).collect()))
}

/// An object with fields in the given order.
pub fn object<I, K>(fields: I) -> Node
where
    I: IntoIterator<Item = (K, Node)>,
    K: Into<String>,
{
    let shape: IndexMap<String, Node> = fields
        .into_iter()
        .map(|(name, node)| (name.into(), node))
        .collect();
    Node::new(NodeKind::Object(shape))
}

pub fn array(element: Node) -> Node {
    Node::new(NodeKind::Array(element))
}

pub fn tuple(items: impl IntoIterator<Item = Node>) -> Node {
    Node::new(NodeKind::Tuple(items.into_iter().collect()))
}

/// String-keyed map with values of one shape.
pub fn record(value: Node) -> Node {
    Node::new(NodeKind::Record(value))
}

pub fn union(members: impl IntoIterator<Item = Node>) -> Node {
    Node::new(NodeKind::Union(members.into_iter().collect()))
}

pub fn object_id() -> Node {
    Node::new(NodeKind::Custom(CustomType::ObjectId))
}

pub fn buffer() -> Node {
    Node::new(NodeKind::Custom(CustomType::Buffer))
}
