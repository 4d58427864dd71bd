#![deny(unsafe_code)]

//! Transform stage of the ChemSoR pipeline.
//!
//! Wide yearly tables are reshaped into long records, every output table gets
//! dense surrogate identifiers over its natural key, and the projected frames
//! are converted into a typed batch.

pub mod dedupe;
pub mod emit;
pub mod error;
pub mod pipeline;
pub mod reshape;
mod values;

pub use dedupe::{
    KeyValue, NormalizedTable, NormalizedTables, assign_ids, dense_ids, key_tuples, normalize,
    project_distinct,
};
pub use emit::emit_batch;
pub use error::{Result, TransformError};
pub use pipeline::{
    TransformOutput, YearSummary, build_batch, reshape_years, run_transform,
};
pub use reshape::{ReshapeStats, long_frame, reshape_wide};
pub use values::{capitalize, parse_integer};
