// Node introspection - unwrap modifier wrappers down to a base node

use crate::node::{DefaultValue, Node, NodeKind};
use serde_json::Value;

/// Normalized modifier summary of a validator node.
#[derive(Debug, Clone)]
pub struct Unwrapped<'a> {
    /// First non-wrapper node.
    pub base: &'a Node,
    /// Every node crossed, outermost first, ending with `base`.
    pub chain: Vec<&'a Node>,
    pub optional: bool,
    /// Set by a nullable wrapper or a `null` literal base.
    pub nullable: bool,
    pub null_literal: bool,
    /// Default of the outermost default wrapper.
    pub default: Option<&'a DefaultValue>,
}

impl Unwrapped<'_> {
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Whether the value may be absent or null.
    pub fn is_omittable(&self) -> bool {
        self.optional || self.nullable
    }
}

/// Walk optional, nullable, default and effects wrappers inward.
///
/// optional and nullable accumulate regardless of wrapper order; of several
/// default wrappers only the outermost one counts.
pub fn unwrap(node: &Node) -> Unwrapped<'_> {
    let mut chain = vec![node];
    let mut optional = false;
    let mut nullable = false;
    let mut default = None;
    let mut current = node;

    loop {
        current = match current.kind() {
            NodeKind::Optional(inner) => {
                optional = true;
                inner
            }
            NodeKind::Nullable(inner) => {
                nullable = true;
                inner
            }
            NodeKind::Default { inner, value } => {
                default.get_or_insert(value);
                inner
            }
            NodeKind::Effects { inner, .. } => inner,
            _ => break,
        };
        chain.push(current);
    }

    let null_literal = matches!(current.kind(), NodeKind::Literal(Value::Null));

    Unwrapped {
        base: current,
        chain,
        optional,
        nullable: nullable || null_literal,
        null_literal,
        default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::builder::*;
    use serde_json::json;

    #[test]
    fn test_plain_node() {
        let node = string();
        let u = unwrap(&node);
        assert_eq!(u.base, &node);
        assert!(!u.optional);
        assert!(!u.nullable);
        assert!(!u.has_default());
        assert_eq!(u.chain.len(), 1);
    }

    #[test]
    fn test_flags_accumulate_in_any_order() {
        let a = string().optional().nullable();
        let b = string().nullable().optional();
        for node in [&a, &b] {
            let u = unwrap(node);
            assert!(u.optional);
            assert!(u.nullable);
            assert!(!u.null_literal);
            assert_eq!(u.base.kind().name(), "string");
        }
    }

    #[test]
    fn test_outermost_default_wins() {
        let node = number().default(1).optional().default(2);
        let u = unwrap(&node);
        assert_eq!(u.default.map(DefaultValue::materialize), Some(json!(2)));
        assert!(u.optional);
    }

    #[test]
    fn test_effects_are_transparent() {
        let node = string()
            .refine(|v| v.as_str().map_or(false, |s| !s.is_empty()))
            .nullable();
        let u = unwrap(&node);
        assert!(u.nullable);
        assert_eq!(u.base.kind().name(), "string");
        assert_eq!(u.chain.len(), 3);
    }

    #[test]
    fn test_null_literal_is_nullable() {
        let node = null();
        let u = unwrap(&node);
        assert!(u.nullable);
        assert!(u.null_literal);
        assert!(!u.optional);

        let other = literal("x");
        assert!(!unwrap(&other).nullable);
    }

    #[test]
    fn test_chain_order() {
        let base = boolean();
        let inner = base.default(true);
        let outer = inner.optional();
        let u = unwrap(&outer);
        let ids: Vec<_> = u.chain.iter().map(|n| n.id()).collect();
        assert_eq!(ids, vec![outer.id(), inner.id(), base.id()]);
    }
}
