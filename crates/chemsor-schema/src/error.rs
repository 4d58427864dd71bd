#![deny(unsafe_code)]

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid schema registry: {message}")]
    InvalidRegistry { message: String },

    #[error("invalid file pattern '{pattern}': {source}")]
    FilePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("table '{table}' references unknown column '{column}'")]
    UnknownColumn { table: String, column: String },

    #[error("duplicate table in registry: {table}")]
    DuplicateTable { table: String },

    #[error("missing table in registry: {table}")]
    MissingTable { table: String },

    #[error("invalid settings: {message}")]
    InvalidSettings { message: String },
}

impl SchemaError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRegistry {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchemaError>;
