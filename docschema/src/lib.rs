//! Compile validator schema trees into document-mapper schema definitions.
//!
//! Build a validator tree with the [`v`] constructors, attach database options
//! through a [`Registry`], then compile:
//!
//! ```
//! use docschema::{v, FieldOptions, Registry};
//!
//! let mut registry = Registry::new();
//! let registered = registry.type_options(
//!     v::boolean().optional(),
//!     FieldOptions::new().index(true),
//! );
//! let user = v::object([("username", v::string()), ("registered", registered)]);
//!
//! let schema = registry.compile(&user).unwrap();
//! assert_eq!(schema.field("username").unwrap().is_required(), Some(true));
//! assert_eq!(schema.field("registered").unwrap().is_required(), Some(false));
//! ```

pub mod compiler;
pub mod error;
pub mod introspect;
pub mod metadata;
pub mod node;
pub mod registry;
pub mod schema;
pub mod timestamps;

pub use compiler::{CompileConfig, Compiler};
pub use error::{DocSchemaError, Result};
pub use metadata::{
    FieldOptions, MetadataStore, Required, SchemaOptions, Strict, Timestamps, UnknownKeys,
};
pub use node::builder as v;
pub use node::{DefaultValue, Node, NodeId, NodeKind};
pub use registry::Registry;
pub use schema::{load_schema, load_schema_str, TargetField, TargetSchema, TargetType};
pub use timestamps::{gen_default_timestamps_schema, gen_timestamps_schema};
