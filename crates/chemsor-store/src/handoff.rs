//! CSV hand-off files, one per output table.
//!
//! Files are named after the table (`chemical.csv`, `record.csv`, ...) and
//! always carry a header row, even when the table is empty. Writing the same
//! batch twice produces byte-identical files.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chemsor_model::{
    ChemicalEntity, RecordFact, ReductionEntity, SourceReductionActivityEntity, TableBatch,
    TableKind,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Result, StoreError};

/// Header of each hand-off file, in struct field order.
pub fn table_header(kind: TableKind) -> &'static [&'static str] {
    match kind {
        TableKind::Chemical => &[
            "chemical_id",
            "tri_chemical_id",
            "chemical_name",
            "caac_ind",
            "carc_ind",
            "pfas_ind",
            "metal_ind",
            "cas_number",
            "smiles",
            "cas_status",
            "smiles_status",
        ],
        other => other.required_columns(),
    }
}

pub fn table_path(dir: &Path, kind: TableKind) -> PathBuf {
    dir.join(format!("{}.csv", kind.name()))
}

/// Writes all four tables into `dir`, creating it if needed.
pub fn write_tables(dir: &Path, batch: &TableBatch) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(TableKind::ALL.len());
    for kind in TableKind::ALL {
        let path = table_path(dir, kind);
        match kind {
            TableKind::Chemical => write_rows(&path, kind, &batch.chemicals)?,
            TableKind::SourceReductionActivity => {
                write_rows(&path, kind, &batch.source_reduction_activities)?;
            }
            TableKind::Reduction => write_rows(&path, kind, &batch.reductions)?,
            TableKind::Record => write_rows(&path, kind, &batch.records)?,
        }
        debug!(table = %kind, rows = batch.row_count(kind), path = %path.display(), "wrote table");
        written.push(path);
    }
    Ok(written)
}

fn write_rows<T: Serialize>(path: &Path, kind: TableKind, rows: &[T]) -> Result<()> {
    let csv_error = |source| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.write_record(table_header(kind)).map_err(csv_error)?;
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    let file = writer.into_inner().map_err(|err| StoreError::Write {
        path: path.to_path_buf(),
        source: err.into_error(),
    })?;
    file.sync_all().map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the four tables written by [`write_tables`].
pub fn read_tables(dir: &Path) -> Result<TableBatch> {
    Ok(TableBatch {
        chemicals: read_rows::<ChemicalEntity>(&table_path(dir, TableKind::Chemical))?,
        source_reduction_activities: read_rows::<SourceReductionActivityEntity>(&table_path(
            dir,
            TableKind::SourceReductionActivity,
        ))?,
        reductions: read_rows::<ReductionEntity>(&table_path(dir, TableKind::Reduction))?,
        records: read_rows::<RecordFact>(&table_path(dir, TableKind::Record))?,
    })
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.is_file() {
        return Err(StoreError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let csv_error = |source| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(csv_error)?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(csv_error)
}
