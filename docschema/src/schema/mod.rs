// Target schema model and the declarative schema loader

mod parser;
mod types;

pub use parser::{load_schema, load_schema_str};
pub use types::{
    TargetDefault, TargetField, TargetSchema, TargetSchemaOptions, TargetTimestamps, TargetType,
};
