use std::path::PathBuf;

use chemsor_model::TableKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("table file not found: {path}")]
    MissingFile { path: PathBuf },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid {column} in table {table}: {value:?}")]
    InvalidValue {
        table: TableKind,
        column: &'static str,
        value: String,
    },

    #[error("schema registry has no table {table}")]
    MissingTable { table: TableKind },

    #[error("{count} record foreign keys do not resolve; refusing to load")]
    DanglingReferences { count: usize },
}

pub type Result<T> = std::result::Result<T, StoreError>;
