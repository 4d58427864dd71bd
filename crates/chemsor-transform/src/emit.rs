//! Conversion of projected frames into the typed [`TableBatch`].

use chemsor_model::{
    ChemicalEntity, ChemicalFlags, RecordFact, ReductionEntity, SourceReductionActivityEntity,
    TableBatch, TableKind,
};
use polars::prelude::{AnyValue, DataFrame};

use crate::dedupe::NormalizedTables;
use crate::error::{Result, TransformError};
use crate::values::parse_integer;

/// Typed cell access over one projected table.
struct FrameReader<'a> {
    kind: TableKind,
    df: &'a DataFrame,
}

impl<'a> FrameReader<'a> {
    fn new(tables: &'a NormalizedTables, kind: TableKind) -> Result<Self> {
        let table = tables
            .get(kind)
            .ok_or(TransformError::MissingTable { table: kind })?;
        for column in kind.required_columns() {
            if table.frame.column(column).is_err() {
                return Err(TransformError::SchemaAssignment {
                    table: kind,
                    column: (*column).to_string(),
                });
            }
        }
        Ok(Self {
            kind,
            df: &table.frame,
        })
    }

    fn rows(&self) -> std::ops::Range<usize> {
        0..self.df.height()
    }

    fn invalid(&self, row: usize, message: String) -> TransformError {
        TransformError::InvalidValue {
            table: self.kind,
            row,
            message,
        }
    }

    fn cell(&self, column: &str, row: usize) -> Result<AnyValue<'a>> {
        Ok(self.df.column(column)?.get(row)?)
    }

    fn int(&self, column: &str, row: usize) -> Result<i64> {
        let value = self.cell(column, row)?;
        let parsed = match &value {
            AnyValue::Int64(v) => Some(*v),
            AnyValue::Int32(v) => Some(i64::from(*v)),
            AnyValue::UInt32(v) => Some(i64::from(*v)),
            AnyValue::String(s) => parse_integer(s),
            AnyValue::StringOwned(s) => parse_integer(s),
            _ => None,
        };
        parsed.ok_or_else(|| self.invalid(row, format!("'{column}' is not an integer: {value}")))
    }

    fn optional_text(&self, column: &str, row: usize) -> Result<Option<String>> {
        Ok(match self.cell(column, row)? {
            AnyValue::Null => None,
            AnyValue::String(s) => Some(s.to_string()),
            AnyValue::StringOwned(s) => Some(s.to_string()),
            other => Some(other.to_string()),
        })
    }

    fn text(&self, column: &str, row: usize) -> Result<String> {
        self.optional_text(column, row)?
            .ok_or_else(|| self.invalid(row, format!("'{column}' is null")))
    }
}

fn chemicals(tables: &NormalizedTables) -> Result<Vec<ChemicalEntity>> {
    let r = FrameReader::new(tables, TableKind::Chemical)?;
    r.rows()
        .map(|row| {
            let flags = ChemicalFlags {
                caac_ind: r.text("caac_ind", row)?,
                carc_ind: r.text("carc_ind", row)?,
                pfas_ind: r.text("pfas_ind", row)?,
                metal_ind: r.text("metal_ind", row)?,
            };
            Ok(ChemicalEntity::new(
                r.int("chemical_id", row)?,
                r.text("tri_chemical_id", row)?,
                r.text("chemical_name", row)?,
                flags,
            ))
        })
        .collect()
}

fn source_reduction_activities(
    tables: &NormalizedTables,
) -> Result<Vec<SourceReductionActivityEntity>> {
    let r = FrameReader::new(tables, TableKind::SourceReductionActivity)?;
    r.rows()
        .map(|row| {
            Ok(SourceReductionActivityEntity::new(
                r.int("source_reduction_activity_id", row)?,
                r.text("source_reduction_code", row)?,
                r.optional_text("source_reduction_description", row)?,
            ))
        })
        .collect()
}

fn reductions(tables: &NormalizedTables) -> Result<Vec<ReductionEntity>> {
    let r = FrameReader::new(tables, TableKind::Reduction)?;
    r.rows()
        .map(|row| {
            Ok(ReductionEntity::new(
                r.int("reduction_id", row)?,
                r.text("reduction_code", row)?,
                r.optional_text("reduction_description", row)?,
            ))
        })
        .collect()
}

fn records(tables: &NormalizedTables) -> Result<Vec<RecordFact>> {
    let r = FrameReader::new(tables, TableKind::Record)?;
    r.rows()
        .map(|row| {
            Ok(RecordFact {
                record_id: r.int("record_id", row)?,
                reporting_year: r.int("reporting_year", row)?,
                naics_code: r.int("naics_code", row)?,
                chemical_id: r.int("chemical_id", row)?,
                source_reduction_activity_id: r.int("source_reduction_activity_id", row)?,
                reduction_id: r.int("reduction_id", row)?,
            })
        })
        .collect()
}

/// Assembles the four output tables, dimensions first.
///
/// Fails if any record references a dimension row that was not emitted.
pub fn emit_batch(tables: &NormalizedTables) -> Result<TableBatch> {
    let batch = TableBatch {
        chemicals: chemicals(tables)?,
        source_reduction_activities: source_reduction_activities(tables)?,
        reductions: reductions(tables)?,
        records: records(tables)?,
    };
    let dangling = batch.dangling_references();
    if !dangling.is_empty() {
        return Err(TransformError::DanglingReferences {
            count: dangling.len(),
        });
    }
    Ok(batch)
}
