use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocSchemaError {
    #[error(
        "Required conflict at '{path}': required is {required} but the field is \
         optional={optional}, nullable={nullable}"
    )]
    RequiredConflict {
        path: String,
        required: String,
        optional: bool,
        nullable: bool,
    },

    #[error("`createdAt` and `updatedAt` fields must be different (both are '{name}')")]
    DuplicateTimestampName { name: String },

    #[error("Unsupported node kind '{kind}' at '{path}'")]
    UnsupportedNodeKind { path: String, kind: &'static str },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DocSchemaError>;
