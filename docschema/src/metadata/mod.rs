// Metadata store - database options attached to validator nodes by identity

use crate::node::{DefaultValue, Node, NodeId, WeakNode};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Predicate evaluated by the document mapper against the whole document.
pub type RequiredFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// The `required` option: a concrete flag, or a predicate passed through to
/// the mapper unchecked.
#[derive(Clone)]
pub enum Required {
    Flag(bool),
    Predicate(RequiredFn),
}

impl Required {
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Required::Flag(flag) => Some(*flag),
            Required::Predicate(_) => None,
        }
    }
}

impl From<bool> for Required {
    fn from(flag: bool) -> Self {
        Required::Flag(flag)
    }
}

impl fmt::Debug for Required {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Required::Flag(flag) => f.debug_tuple("Flag").field(flag).finish(),
            Required::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl fmt::Display for Required {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Required::Flag(flag) => write!(f, "{flag}"),
            Required::Predicate(_) => f.write_str("<predicate>"),
        }
    }
}

/// Only flags render as data; a predicate fails to serialize.
impl Serialize for Required {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Required::Flag(flag) => serializer.serialize_bool(*flag),
            Required::Predicate(_) => Err(serde::ser::Error::custom(
                "a `required` predicate cannot be rendered as data",
            )),
        }
    }
}

/// Database options for one field.
///
/// `merge` is a shallow merge: every key set on the right-hand side replaces
/// the left-hand value, keys it leaves unset are kept.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "RawFieldOptions")]
pub struct FieldOptions {
    pub required: Option<Required>,
    pub default: Option<DefaultValue>,
    pub index: Option<bool>,
    pub unique: Option<bool>,
    pub sparse: Option<bool>,
    pub immutable: Option<bool>,
    pub alias: Option<String>,
    pub select: Option<bool>,
    /// Options without a dedicated setter, passed to the mapper as-is.
    pub extra: IndexMap<String, Value>,
}

impl FieldOptions {
    pub fn new() -> Self {
        // `Self::default()` would resolve to the `default` setter below
        <Self as Default>::default()
    }

    pub fn required(mut self, required: impl Into<Required>) -> Self {
        self.required = Some(required.into());
        self
    }

    pub fn required_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.required = Some(Required::Predicate(Arc::new(predicate)));
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Producer(Arc::new(producer)));
        self
    }

    pub fn index(mut self, index: bool) -> Self {
        self.index = Some(index);
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = Some(unique);
        self
    }

    pub fn sparse(mut self, sparse: bool) -> Self {
        self.sparse = Some(sparse);
        self
    }

    pub fn immutable(mut self, immutable: bool) -> Self {
        self.immutable = Some(immutable);
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn select(mut self, select: bool) -> Self {
        self.select = Some(select);
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_none()
            && self.default.is_none()
            && self.index.is_none()
            && self.unique.is_none()
            && self.sparse.is_none()
            && self.immutable.is_none()
            && self.alias.is_none()
            && self.select.is_none()
            && self.extra.is_empty()
    }

    pub fn merge(&mut self, other: &FieldOptions) {
        if other.required.is_some() {
            self.required = other.required.clone();
        }
        if other.default.is_some() {
            self.default = other.default.clone();
        }
        if other.index.is_some() {
            self.index = other.index;
        }
        if other.unique.is_some() {
            self.unique = other.unique;
        }
        if other.sparse.is_some() {
            self.sparse = other.sparse;
        }
        if other.immutable.is_some() {
            self.immutable = other.immutable;
        }
        if other.alias.is_some() {
            self.alias = other.alias.clone();
        }
        if other.select.is_some() {
            self.select = other.select;
        }
        for (key, value) in &other.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }

    /// Options passed through to the mapper unchanged, under the mapper's key
    /// names.
    pub fn passthrough(&self) -> IndexMap<String, Value> {
        let mut out = IndexMap::new();
        let flags = [
            ("index", self.index),
            ("unique", self.unique),
            ("sparse", self.sparse),
            ("immutable", self.immutable),
        ];
        for (key, flag) in flags {
            if let Some(flag) = flag {
                out.insert(key.to_string(), Value::Bool(flag));
            }
        }
        if let Some(alias) = &self.alias {
            out.insert("alias".to_string(), Value::String(alias.clone()));
        }
        if let Some(select) = self.select {
            out.insert("select".to_string(), Value::Bool(select));
        }
        for (key, value) in &self.extra {
            out.insert(key.clone(), value.clone());
        }
        out
    }
}

#[derive(Deserialize)]
struct RawFieldOptions {
    required: Option<bool>,
    default: Option<Value>,
    index: Option<bool>,
    unique: Option<bool>,
    sparse: Option<bool>,
    immutable: Option<bool>,
    alias: Option<String>,
    select: Option<bool>,
    #[serde(flatten)]
    extra: IndexMap<String, Value>,
}

impl From<RawFieldOptions> for FieldOptions {
    fn from(raw: RawFieldOptions) -> Self {
        FieldOptions {
            required: raw.required.map(Required::Flag),
            default: raw.default.map(DefaultValue::Value),
            index: raw.index,
            unique: raw.unique,
            sparse: raw.sparse,
            immutable: raw.immutable,
            alias: raw.alias,
            select: raw.select,
            extra: raw.extra,
        }
    }
}

/// How fields absent from the declared mapping are treated by the mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownKeys {
    Ignore,
    Strip,
    Throw,
}

impl UnknownKeys {
    /// The mapper's `strict` setting for this mode.
    pub fn strict_mode(self) -> Strict {
        match self {
            UnknownKeys::Ignore => Strict::Enabled(false),
            UnknownKeys::Strip => Strict::Enabled(true),
            UnknownKeys::Throw => Strict::Throw,
        }
    }
}

/// The mapper's `strict` schema option: a flag or `"throw"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strict {
    Enabled(bool),
    Throw,
}

impl Serialize for Strict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Strict::Enabled(flag) => serializer.serialize_bool(*flag),
            Strict::Throw => serializer.serialize_str("throw"),
        }
    }
}

impl<'de> Deserialize<'de> for Strict {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawStrict {
            Flag(bool),
            Mode(String),
        }

        match RawStrict::deserialize(deserializer)? {
            RawStrict::Flag(flag) => Ok(Strict::Enabled(flag)),
            RawStrict::Mode(mode) if mode == "throw" => Ok(Strict::Throw),
            RawStrict::Mode(mode) => Err(serde::de::Error::custom(format!(
                "invalid strict mode '{mode}', expected a boolean or \"throw\""
            ))),
        }
    }
}

pub const DEFAULT_CREATED_AT: &str = "createdAt";
pub const DEFAULT_UPDATED_AT: &str = "updatedAt";

/// Naming of one timestamp field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TimestampName {
    /// The mapper's default field name.
    #[default]
    Default,
    Named(String),
    Disabled,
}

impl TimestampName {
    fn resolve(&self, default_name: &str) -> Option<String> {
        match self {
            TimestampName::Default => Some(default_name.to_string()),
            TimestampName::Named(name) => Some(name.clone()),
            TimestampName::Disabled => None,
        }
    }
}

impl From<Option<&str>> for TimestampName {
    fn from(name: Option<&str>) -> Self {
        match name {
            Some(name) => TimestampName::Named(name.to_string()),
            None => TimestampName::Disabled,
        }
    }
}

/// The `timestamps` schema option as authored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timestamps {
    Toggle(bool),
    Fields {
        created_at: TimestampName,
        updated_at: TimestampName,
    },
}

impl Timestamps {
    /// Explicit names; `None` disables that field.
    pub fn named(created_at: Option<&str>, updated_at: Option<&str>) -> Self {
        Timestamps::Fields {
            created_at: created_at.into(),
            updated_at: updated_at.into(),
        }
    }

    /// Resolve to concrete `(createdAt, updatedAt)` field names, `None` where
    /// the field is disabled.
    pub fn resolve(&self) -> (Option<String>, Option<String>) {
        match self {
            Timestamps::Toggle(true) => (
                Some(DEFAULT_CREATED_AT.to_string()),
                Some(DEFAULT_UPDATED_AT.to_string()),
            ),
            Timestamps::Toggle(false) => (None, None),
            Timestamps::Fields {
                created_at,
                updated_at,
            } => (
                created_at.resolve(DEFAULT_CREATED_AT),
                updated_at.resolve(DEFAULT_UPDATED_AT),
            ),
        }
    }
}

impl<'de> Deserialize<'de> for Timestamps {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawName {
            Flag(bool),
            Name(String),
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawTimestamps {
            Toggle(bool),
            Fields {
                #[serde(rename = "createdAt")]
                created_at: Option<RawName>,
                #[serde(rename = "updatedAt")]
                updated_at: Option<RawName>,
            },
        }

        fn name(raw: Option<RawName>) -> TimestampName {
            match raw {
                None | Some(RawName::Flag(true)) => TimestampName::Default,
                Some(RawName::Flag(false)) => TimestampName::Disabled,
                Some(RawName::Name(name)) => TimestampName::Named(name),
            }
        }

        Ok(match RawTimestamps::deserialize(deserializer)? {
            RawTimestamps::Toggle(flag) => Timestamps::Toggle(flag),
            RawTimestamps::Fields {
                created_at,
                updated_at,
            } => Timestamps::Fields {
                created_at: name(created_at),
                updated_at: name(updated_at),
            },
        })
    }
}

/// Options for constructing the mapper's schema object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapperOptions {
    pub collection: Option<String>,
    pub timestamps: Option<Timestamps>,
    pub strict: Option<Strict>,
    #[serde(rename = "_id")]
    pub id: Option<bool>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl MapperOptions {
    pub fn merge(&mut self, other: &MapperOptions) {
        if other.collection.is_some() {
            self.collection = other.collection.clone();
        }
        if other.timestamps.is_some() {
            self.timestamps = other.timestamps.clone();
        }
        if other.strict.is_some() {
            self.strict = other.strict;
        }
        if other.id.is_some() {
            self.id = other.id;
        }
        for (key, value) in &other.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

/// Options attached to an object node: mapper schema options, per-field
/// overrides, and the unknown-keys mode.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaOptions {
    #[serde(default)]
    pub schema_options: MapperOptions,
    #[serde(default)]
    pub type_options: IndexMap<String, FieldOptions>,
    pub unknown_keys: Option<UnknownKeys>,
}

impl SchemaOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.schema_options.collection = Some(name.into());
        self
    }

    pub fn timestamps(mut self, timestamps: Timestamps) -> Self {
        self.schema_options.timestamps = Some(timestamps);
        self
    }

    pub fn strict(mut self, strict: Strict) -> Self {
        self.schema_options.strict = Some(strict);
        self
    }

    pub fn id(mut self, id: bool) -> Self {
        self.schema_options.id = Some(id);
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.schema_options.extra.insert(key.into(), value.into());
        self
    }

    /// Add overrides for one field; repeated calls for the same field merge.
    pub fn type_options(mut self, field: impl Into<String>, options: FieldOptions) -> Self {
        self.type_options
            .entry(field.into())
            .or_default()
            .merge(&options);
        self
    }

    pub fn unknown_keys(mut self, mode: UnknownKeys) -> Self {
        self.unknown_keys = Some(mode);
        self
    }

    pub fn merge(&mut self, other: &SchemaOptions) {
        self.schema_options.merge(&other.schema_options);
        for (field, options) in &other.type_options {
            self.type_options
                .entry(field.clone())
                .or_default()
                .merge(options);
        }
        if other.unknown_keys.is_some() {
            self.unknown_keys = other.unknown_keys;
        }
    }
}

struct Slot<T> {
    owner: WeakNode,
    value: T,
}

const PRUNE_THRESHOLD: usize = 64;

/// Side table of option bags keyed by node identity.
///
/// Field options and schema-level options live in separate tables; both
/// merge on repeated attachment. Bags of dropped nodes are pruned
/// periodically on attachment, or on demand with [`MetadataStore::prune`].
pub struct MetadataStore {
    fields: HashMap<NodeId, Slot<FieldOptions>>,
    schemas: HashMap<NodeId, Slot<SchemaOptions>>,
    prune_at: usize,
}

impl Default for MetadataStore {
    fn default() -> Self {
        MetadataStore {
            fields: HashMap::new(),
            schemas: HashMap::new(),
            prune_at: PRUNE_THRESHOLD,
        }
    }
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `options` into the field bag of `node`, creating it if absent.
    pub fn attach(&mut self, node: &Node, options: FieldOptions) {
        self.fields
            .entry(node.id())
            .or_insert_with(|| Slot {
                owner: node.downgrade(),
                value: FieldOptions::new(),
            })
            .value
            .merge(&options);
        self.maybe_prune();
    }

    /// The field bag of `node`; empty if nothing was attached.
    pub fn read(&self, node: &Node) -> FieldOptions {
        self.fields
            .get(&node.id())
            .map(|slot| slot.value.clone())
            .unwrap_or_default()
    }

    /// Merge `options` into the schema-level bag of `node`.
    pub fn attach_schema(&mut self, node: &Node, options: SchemaOptions) {
        self.schemas
            .entry(node.id())
            .or_insert_with(|| Slot {
                owner: node.downgrade(),
                value: SchemaOptions::default(),
            })
            .value
            .merge(&options);
        self.maybe_prune();
    }

    pub fn read_schema(&self, node: &Node) -> SchemaOptions {
        self.schemas
            .get(&node.id())
            .map(|slot| slot.value.clone())
            .unwrap_or_default()
    }

    /// Merge the schema-level bag of `from` into the bag of `to`.
    pub fn copy_schema(&mut self, from: &Node, to: &Node) {
        if let Some(slot) = self.schemas.get(&from.id()) {
            let options = slot.value.clone();
            self.attach_schema(to, options);
        }
    }

    /// Drop bags whose node no longer exists. Returns how many were removed.
    pub fn prune(&mut self) -> usize {
        let before = self.len();
        self.fields.retain(|_, slot| slot.owner.is_alive());
        self.schemas.retain(|_, slot| slot.owner.is_alive());
        let removed = before - self.len();
        if removed > 0 {
            log::trace!("pruned {removed} option bag(s) of dropped nodes");
        }
        removed
    }

    /// Number of bags held, field and schema-level together.
    pub fn len(&self) -> usize {
        self.fields.len() + self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn maybe_prune(&mut self) {
        if self.len() >= self.prune_at {
            self.prune();
            self.prune_at = (self.len() * 2).max(PRUNE_THRESHOLD);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::builder::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_attach_merges_later_keys_win() {
        let mut store = MetadataStore::new();
        let node = boolean();

        store.attach(&node, FieldOptions::new().default(true).alias("b"));
        store.attach(&node, FieldOptions::new().index(true).default(false));

        let bag = store.read(&node);
        assert_eq!(bag.default.map(|d| d.materialize()), Some(json!(false)));
        assert_eq!(bag.index, Some(true));
        assert_eq!(bag.alias.as_deref(), Some("b"));
    }

    #[test]
    fn test_read_without_attach_is_empty() {
        let store = MetadataStore::new();
        let node = string();
        assert!(store.read(&node).is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_new_field_options_are_empty() {
        let options = FieldOptions::new();
        assert!(options.is_empty());
        assert!(options.passthrough().is_empty());
        assert!(FieldOptions::new().default(1).default.is_some());
    }

    #[test]
    fn test_bags_are_keyed_by_identity() {
        let mut store = MetadataStore::new();
        let base = string();
        let wrapped = base.optional();

        store.attach(&base, FieldOptions::new().unique(true));
        assert_eq!(store.read(&base).unique, Some(true));
        assert!(store.read(&wrapped).is_empty());
        assert_eq!(store.read(&base.clone()).unique, Some(true));
    }

    #[test]
    fn test_extra_options_merge_per_key() {
        let mut store = MetadataStore::new();
        let node = string();

        store.attach(&node, FieldOptions::new().option("lowercase", true).option("trim", true));
        store.attach(&node, FieldOptions::new().option("trim", false));

        let passthrough = store.read(&node).passthrough();
        assert_eq!(passthrough["lowercase"], json!(true));
        assert_eq!(passthrough["trim"], json!(false));
    }

    #[test]
    fn test_passthrough_uses_mapper_key_names() {
        let options = FieldOptions::new()
            .required(true)
            .default("x")
            .index(true)
            .unique(false)
            .immutable(true)
            .alias("n")
            .select(false);

        let passthrough = options.passthrough();
        let keys: Vec<&str> = passthrough.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["index", "unique", "immutable", "alias", "select"]);
    }

    #[test]
    fn test_schema_options_merge() {
        let mut store = MetadataStore::new();
        let node = object([("name", string())]);

        store.attach_schema(
            &node,
            SchemaOptions::new()
                .collection("people")
                .type_options("name", FieldOptions::new().index(true).alias("n")),
        );
        store.attach_schema(
            &node,
            SchemaOptions::new()
                .collection("users")
                .type_options("name", FieldOptions::new().alias("nm")),
        );

        let options = store.read_schema(&node);
        assert_eq!(options.schema_options.collection.as_deref(), Some("users"));
        let name = &options.type_options["name"];
        assert_eq!(name.index, Some(true));
        assert_eq!(name.alias.as_deref(), Some("nm"));
    }

    #[test]
    fn test_copy_schema() {
        let mut store = MetadataStore::new();
        let from = object([("a", string())]);
        let to = object([("b", string())]);

        store.attach_schema(&from, SchemaOptions::new().unknown_keys(UnknownKeys::Throw));
        store.copy_schema(&from, &to);

        assert_eq!(store.read_schema(&to).unknown_keys, Some(UnknownKeys::Throw));
    }

    #[test]
    fn test_prune_drops_bags_of_dropped_nodes() {
        let mut store = MetadataStore::new();
        let kept = string();
        store.attach(&kept, FieldOptions::new().index(true));
        {
            let dropped = number();
            store.attach(&dropped, FieldOptions::new().index(true));
            store.attach_schema(&dropped, SchemaOptions::new().collection("x"));
        }

        assert_eq!(store.len(), 3);
        assert_eq!(store.prune(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.read(&kept).index, Some(true));
    }

    #[test]
    fn test_attach_prunes_periodically() {
        let mut store = MetadataStore::new();
        for _ in 0..(PRUNE_THRESHOLD * 3) {
            let node = string();
            store.attach(&node, FieldOptions::new().index(true));
        }
        assert!(store.len() < PRUNE_THRESHOLD);
    }

    #[test]
    fn test_deserialize_field_options() {
        let options: FieldOptions = serde_yaml::from_str(
            "required: true\nindex: true\nalias: u\nlowercase: true\ndefault: [1, 2]",
        )
        .unwrap();

        assert_eq!(options.required.and_then(|r| r.as_flag()), Some(true));
        assert_eq!(options.index, Some(true));
        assert_eq!(options.alias.as_deref(), Some("u"));
        assert_eq!(options.extra["lowercase"], json!(true));
        assert_eq!(options.default.map(|d| d.materialize()), Some(json!([1, 2])));
    }

    #[test]
    fn test_deserialize_schema_options() {
        let options: SchemaOptions = serde_yaml::from_str(
            r#"
schemaOptions:
  collection: users
  strict: throw
  timestamps: { createdAt: created, updatedAt: false }
  versionKey: false
typeOptions:
  email: { unique: true }
unknownKeys: strip
"#,
        )
        .unwrap();

        let mapper = &options.schema_options;
        assert_eq!(mapper.collection.as_deref(), Some("users"));
        assert_eq!(mapper.strict, Some(Strict::Throw));
        assert_eq!(
            mapper.timestamps,
            Some(Timestamps::Fields {
                created_at: TimestampName::Named("created".into()),
                updated_at: TimestampName::Disabled,
            })
        );
        assert_eq!(mapper.extra["versionKey"], json!(false));
        assert_eq!(options.type_options["email"].unique, Some(true));
        assert_eq!(options.unknown_keys, Some(UnknownKeys::Strip));
    }

    #[test]
    fn test_timestamps_resolve() {
        assert_eq!(
            Timestamps::Toggle(true).resolve(),
            (Some("createdAt".into()), Some("updatedAt".into()))
        );
        assert_eq!(Timestamps::Toggle(false).resolve(), (None, None));
        assert_eq!(
            Timestamps::named(None, Some("modified")).resolve(),
            (None, Some("modified".into()))
        );

        let partial: Timestamps = serde_yaml::from_str("{ createdAt: born }").unwrap();
        assert_eq!(
            partial.resolve(),
            (Some("born".into()), Some("updatedAt".into()))
        );
    }

    #[test]
    fn test_unknown_keys_strict_mode() {
        assert_eq!(UnknownKeys::Ignore.strict_mode(), Strict::Enabled(false));
        assert_eq!(UnknownKeys::Strip.strict_mode(), Strict::Enabled(true));
        assert_eq!(UnknownKeys::Throw.strict_mode(), Strict::Throw);
    }
}
