#![deny(unsafe_code)]

pub mod batch;
pub mod entity;
pub mod error;
pub mod long;

pub use batch::{DanglingReference, EnrichmentCounts, StatusCounts, TableBatch};
pub use entity::{
    ChemicalEntity, ChemicalFlags, LookupStatus, RecordFact, ReductionEntity,
    SourceReductionActivityEntity, TableKind,
};
pub use error::{ModelError, Result};
pub use long::{
    ColumnKind, LONG_COLUMNS, LongColumn, LongRecord, ReductionBlock, ScalarFields, long_column,
};
