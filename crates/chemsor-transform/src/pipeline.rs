//! The transform stage: raw yearly files to an emitted [`TableBatch`].

use std::path::Path;
use std::time::Instant;

use chemsor_ingest::{YearFile, discover_year_files, read_wide_table};
use chemsor_model::{LongRecord, TableBatch};
use chemsor_schema::SchemaRegistry;
use tracing::{info, info_span};

use crate::dedupe::normalize;
use crate::emit::emit_batch;
use crate::error::{Result, TransformError};
use crate::reshape::{ReshapeStats, long_frame, reshape_wide};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearSummary {
    pub year: i32,
    pub stats: ReshapeStats,
}

#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub batch: TableBatch,
    pub years: Vec<YearSummary>,
}

impl TransformOutput {
    pub fn totals(&self) -> ReshapeStats {
        let mut totals = ReshapeStats::default();
        for year in &self.years {
            totals.merge(&year.stats);
        }
        totals
    }
}

/// Reads and reshapes each year in order, concatenating the long records.
pub fn reshape_years(
    files: &[YearFile],
    registry: &SchemaRegistry,
) -> Result<(Vec<LongRecord>, Vec<YearSummary>)> {
    let raw_columns = registry.raw_columns();
    let mut records = Vec::new();
    let mut years = Vec::with_capacity(files.len());
    for file in files {
        let start = Instant::now();
        let wide = read_wide_table(&file.path, &raw_columns).map_err(|source| {
            TransformError::Ingest {
                year: file.year,
                source,
            }
        })?;
        let (year_records, stats) = reshape_wide(&wide, registry)?;
        info!(
            year = file.year,
            input_rows = stats.input_rows,
            long_rows = stats.long_rows,
            unreported_chemical = stats.unreported_chemical,
            no_reduction_activity = stats.no_reduction_activity,
            malformed = stats.malformed,
            duration_ms = start.elapsed().as_millis(),
            "year reshaped"
        );
        records.extend(year_records);
        years.push(YearSummary {
            year: file.year,
            stats,
        });
    }
    Ok((records, years))
}

/// Assigns identifiers over the long records and emits the four tables.
pub fn build_batch(records: &[LongRecord], registry: &SchemaRegistry) -> Result<TableBatch> {
    let long = long_frame(records)?;
    let tables = normalize(long, registry)?;
    emit_batch(&tables)
}

/// Runs discovery, reshape, and identifier assignment over `raw_dir`.
///
/// The emitted chemicals are not enriched.
pub fn run_transform(raw_dir: &Path, registry: &SchemaRegistry) -> Result<TransformOutput> {
    let files = info_span!("ingest", raw_dir = %raw_dir.display()).in_scope(|| {
        let files = discover_year_files(raw_dir, registry)?;
        info!(file_count = files.len(), "discovered yearly files");
        Ok::<_, TransformError>(files)
    })?;

    let (records, years) = info_span!("reshape").in_scope(|| reshape_years(&files, registry))?;

    let batch = info_span!("dedupe").in_scope(|| -> Result<TableBatch> {
        let start = Instant::now();
        let batch = build_batch(&records, registry)?;
        info!(
            long_rows = records.len(),
            chemicals = batch.chemicals.len(),
            source_reduction_activities = batch.source_reduction_activities.len(),
            reductions = batch.reductions.len(),
            records = batch.records.len(),
            duration_ms = start.elapsed().as_millis(),
            "identifiers assigned"
        );
        Ok(batch)
    })?;

    Ok(TransformOutput { batch, years })
}
