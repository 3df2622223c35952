// Validator node model - the closed set of node kinds and stable node identities

pub mod builder;

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a validator node. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Produces a fresh value each time it is called.
pub type Producer = Arc<dyn Fn() -> Value + Send + Sync>;

/// Refinement check carried by an effects wrapper. Only the validation
/// runtime evaluates it; compilation treats the wrapper as transparent.
pub type Check = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A default value declared on a validator node or in field options.
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    Producer(Producer),
}

impl DefaultValue {
    /// Evaluate the default. Producers are called once per invocation.
    pub fn materialize(&self) -> Value {
        match self {
            DefaultValue::Value(v) => v.clone(),
            DefaultValue::Producer(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            DefaultValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

impl From<Value> for DefaultValue {
    fn from(value: Value) -> Self {
        DefaultValue::Value(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    String,
    Number,
    Boolean,
    Date,
    BigInt,
    Any,
    Never,
}

/// Mapper-native types with no validator counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomType {
    ObjectId,
    Buffer,
}

/// Every kind of validator node. Wrapper kinds own exactly one inner node.
pub enum NodeKind {
    Primitive(Primitive),
    Literal(Value),
    Enum(Vec<String>),
    Object(IndexMap<String, Node>),
    Array(Node),
    Tuple(Vec<Node>),
    Record(Node),
    Union(Vec<Node>),
    Custom(CustomType),
    Optional(Node),
    Nullable(Node),
    Default { inner: Node, value: DefaultValue },
    Effects { inner: Node, check: Check },
}

impl NodeKind {
    /// Short name used in error messages and logs.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Primitive(p) => match p {
                Primitive::String => "string",
                Primitive::Number => "number",
                Primitive::Boolean => "boolean",
                Primitive::Date => "date",
                Primitive::BigInt => "bigint",
                Primitive::Any => "any",
                Primitive::Never => "never",
            },
            NodeKind::Literal(_) => "literal",
            NodeKind::Enum(_) => "enum",
            NodeKind::Object(_) => "object",
            NodeKind::Array(_) => "array",
            NodeKind::Tuple(_) => "tuple",
            NodeKind::Record(_) => "record",
            NodeKind::Union(_) => "union",
            NodeKind::Custom(CustomType::ObjectId) => "objectId",
            NodeKind::Custom(CustomType::Buffer) => "buffer",
            NodeKind::Optional(_) => "optional",
            NodeKind::Nullable(_) => "nullable",
            NodeKind::Default { .. } => "default",
            NodeKind::Effects { .. } => "effects",
        }
    }

    /// The wrapped node, for wrapper kinds only.
    pub fn inner(&self) -> Option<&Node> {
        match self {
            NodeKind::Optional(inner)
            | NodeKind::Nullable(inner)
            | NodeKind::Default { inner, .. }
            | NodeKind::Effects { inner, .. } => Some(inner),
            _ => None,
        }
    }

    pub fn is_wrapper(&self) -> bool {
        self.inner().is_some()
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Primitive(p) => f.debug_tuple("Primitive").field(p).finish(),
            NodeKind::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            NodeKind::Enum(values) => f.debug_tuple("Enum").field(values).finish(),
            NodeKind::Object(shape) => f.debug_tuple("Object").field(shape).finish(),
            NodeKind::Array(el) => f.debug_tuple("Array").field(el).finish(),
            NodeKind::Tuple(items) => f.debug_tuple("Tuple").field(items).finish(),
            NodeKind::Record(v) => f.debug_tuple("Record").field(v).finish(),
            NodeKind::Union(members) => f.debug_tuple("Union").field(members).finish(),
            NodeKind::Custom(c) => f.debug_tuple("Custom").field(c).finish(),
            NodeKind::Optional(inner) => f.debug_tuple("Optional").field(inner).finish(),
            NodeKind::Nullable(inner) => f.debug_tuple("Nullable").field(inner).finish(),
            NodeKind::Default { inner, value } => f
                .debug_struct("Default")
                .field("inner", inner)
                .field("value", value)
                .finish(),
            NodeKind::Effects { inner, .. } => f.debug_tuple("Effects").field(inner).finish(),
        }
    }
}

struct NodeInner {
    id: NodeId,
    kind: NodeKind,
}

/// A validator node. Cloning shares the node; it keeps its identity.
/// Wrapping methods return a new node with a new identity.
#[derive(Clone)]
pub struct Node(Arc<NodeInner>);

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Node(Arc::new(NodeInner {
            id: NodeId::next(),
            kind,
        }))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    /// Field mapping of an object node, in declaration order.
    pub fn shape(&self) -> Option<&IndexMap<String, Node>> {
        match self.kind() {
            NodeKind::Object(shape) => Some(shape),
            _ => None,
        }
    }

    pub fn optional(&self) -> Node {
        Node::new(NodeKind::Optional(self.clone()))
    }

    pub fn nullable(&self) -> Node {
        Node::new(NodeKind::Nullable(self.clone()))
    }

    /// Both optional and nullable.
    pub fn nullish(&self) -> Node {
        self.nullable().optional()
    }

    pub fn default(&self, value: impl Into<Value>) -> Node {
        Node::new(NodeKind::Default {
            inner: self.clone(),
            value: DefaultValue::Value(value.into()),
        })
    }

    pub fn default_with<F>(&self, producer: F) -> Node
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Node::new(NodeKind::Default {
            inner: self.clone(),
            value: DefaultValue::Producer(Arc::new(producer)),
        })
    }

    pub fn refine<F>(&self, check: F) -> Node
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Node::new(NodeKind::Effects {
            inner: self.clone(),
            check: Arc::new(check),
        })
    }

    /// New object node with this node's fields plus `fields`; fields with an
    /// existing name replace the old node in place. `None` for non-objects.
    pub(crate) fn extended<K, I>(&self, fields: I) -> Option<Node>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Node)>,
    {
        let mut shape = self.shape()?.clone();
        for (name, node) in fields {
            shape.insert(name.into(), node);
        }
        Some(Node::new(NodeKind::Object(shape)))
    }

    pub(crate) fn downgrade(&self) -> WeakNode {
        WeakNode(Arc::downgrade(&self.0))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", self.id(), self.kind())
    }
}

/// Non-owning handle used by the metadata store to notice dropped nodes.
#[derive(Clone)]
pub(crate) struct WeakNode(Weak<NodeInner>);

impl WeakNode {
    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}
