use chemsor_ingest::IngestError;
use chemsor_model::TableKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    /// A declared grouping or projection column is not in the long table.
    #[error("table '{table}' declares column '{column}' which does not exist")]
    SchemaAssignment { table: TableKind, column: String },

    #[error("table '{table}' was not produced")]
    MissingTable { table: TableKind },

    #[error("wide table has no column '{column}'")]
    MissingWideColumn { column: String },

    #[error("table '{table}' row {row}: {message}")]
    InvalidValue {
        table: TableKind,
        row: usize,
        message: String,
    },

    #[error("{count} record foreign keys do not resolve to a dimension row")]
    DanglingReferences { count: usize },

    #[error("failed to read year {year}: {source}")]
    Ingest {
        year: i32,
        #[source]
        source: IngestError,
    },

    #[error(transparent)]
    Discovery(#[from] IngestError),

    #[error("DataFrame operation failed: {message}")]
    Frame { message: String },
}

impl From<polars::prelude::PolarsError> for TransformError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::Frame {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;
