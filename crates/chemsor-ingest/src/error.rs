//! Error types for acquisition and wide-table ingestion.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === CSV Errors ===
    #[error("failed to parse CSV {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    /// A raw column the schema registry expects is not in the file header.
    #[error("required column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },

    // === Acquisition Errors ===
    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("request to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("invalid archive link pattern '{pattern}': {source}")]
    ArchivePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("archive error: {message}")]
    Archive { message: String },

    #[error("member '{member}' not found in archive {url}")]
    MemberNotFound { url: String, member: String },

    #[error("column list {path} is empty")]
    EmptyColumnList { path: PathBuf },
}

impl IngestError {
    pub(crate) fn http(url: &str, err: &reqwest::Error) -> Self {
        Self::Http {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<polars::prelude::PolarsError> for IngestError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for IngestError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_display() {
        let err = IngestError::MissingColumn {
            column: "TRI_CHEM_ID".to_string(),
            path: PathBuf::from("raw/US_2a_2020.csv"),
        };
        assert_eq!(
            err.to_string(),
            "required column 'TRI_CHEM_ID' not found in raw/US_2a_2020.csv"
        );
    }

    #[test]
    fn from_polars() {
        let polars_err = polars::prelude::PolarsError::ColumnNotFound("x".into());
        let err: IngestError = polars_err.into();
        assert!(matches!(err, IngestError::DataFrame { .. }));
    }
}
