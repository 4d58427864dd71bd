use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("unknown long-form column: {0}")]
    UnknownColumn(String),
    #[error("unknown lookup status: {0}")]
    UnknownStatus(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
