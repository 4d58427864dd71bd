//! SQLite persistence for emitted batches.
//!
//! Every load drops and recreates the four tables inside one transaction, so
//! loading the same batch twice leaves the database with identical contents.
//! Facts are dropped before dimensions and created after them.

use std::path::Path;
use std::time::Instant;

use chemsor_model::{
    ChemicalEntity, LookupStatus, RecordFact, ReductionEntity, SourceReductionActivityEntity,
    TableBatch, TableKind,
};
use chemsor_schema::SchemaRegistry;
use rusqlite::{Connection, Transaction, params};
use tracing::{info, info_span};

use crate::error::{Result, StoreError};

const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON;";

const CREATE_CHEMICAL: &str = "
CREATE TABLE chemical (
    chemical_id     INTEGER PRIMARY KEY,
    tri_chemical_id TEXT NOT NULL,
    chemical_name   TEXT NOT NULL,
    caac_ind        TEXT NOT NULL,
    carc_ind        TEXT NOT NULL,
    pfas_ind        TEXT NOT NULL,
    metal_ind       TEXT NOT NULL,
    cas_number      TEXT,
    smiles          TEXT,
    -- 'found' | 'absent' | 'unresolved' | 'skipped'
    cas_status      TEXT NOT NULL DEFAULT 'skipped',
    smiles_status   TEXT NOT NULL DEFAULT 'skipped'
);
";

const CREATE_SOURCE_REDUCTION_ACTIVITY: &str = "
CREATE TABLE source_reduction_activity (
    source_reduction_activity_id INTEGER PRIMARY KEY,
    source_reduction_code        TEXT NOT NULL,
    source_reduction_description TEXT
);
";

const CREATE_REDUCTION: &str = "
CREATE TABLE reduction (
    reduction_id          INTEGER PRIMARY KEY,
    reduction_code        TEXT NOT NULL,
    reduction_description TEXT
);
";

const CREATE_RECORD: &str = "
CREATE TABLE record (
    record_id      INTEGER PRIMARY KEY,
    reporting_year INTEGER NOT NULL,
    naics_code     INTEGER NOT NULL,
    chemical_id    INTEGER NOT NULL
        REFERENCES chemical(chemical_id) ON DELETE CASCADE ON UPDATE CASCADE,
    source_reduction_activity_id INTEGER NOT NULL
        REFERENCES source_reduction_activity(source_reduction_activity_id)
        ON DELETE CASCADE ON UPDATE CASCADE,
    reduction_id   INTEGER NOT NULL
        REFERENCES reduction(reduction_id) ON DELETE CASCADE ON UPDATE CASCADE
);
CREATE INDEX record_chemical_idx ON record(chemical_id);
";

fn create_statement(kind: TableKind) -> &'static str {
    match kind {
        TableKind::Chemical => CREATE_CHEMICAL,
        TableKind::SourceReductionActivity => CREATE_SOURCE_REDUCTION_ACTIVITY,
        TableKind::Reduction => CREATE_REDUCTION,
        TableKind::Record => CREATE_RECORD,
    }
}

/// Rows written per table by one load, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub tables: Vec<(TableKind, usize)>,
}

impl LoadSummary {
    pub fn dimension_rows(&self) -> usize {
        self.rows_where(|kind| !kind.is_fact())
    }

    pub fn fact_rows(&self) -> usize {
        self.rows_where(TableKind::is_fact)
    }

    fn rows_where(&self, pick: impl Fn(TableKind) -> bool) -> usize {
        self.tables
            .iter()
            .filter(|(kind, _)| pick(*kind))
            .map(|(_, rows)| rows)
            .sum()
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Self::configure(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::configure(Connection::open_in_memory()?)
    }

    fn configure(conn: Connection) -> Result<Self> {
        conn.execute_batch(CONNECTION_PRAGMAS)?;
        Ok(Self { conn })
    }

    /// Replaces the database contents with `batch`.
    ///
    /// Table order comes from the registry, which lists dimensions before the
    /// facts that reference them. A batch with dangling foreign keys is
    /// rejected before anything is dropped.
    pub fn replace(
        &mut self,
        registry: &SchemaRegistry,
        batch: &TableBatch,
    ) -> Result<LoadSummary> {
        let dangling = batch.dangling_references();
        if !dangling.is_empty() {
            return Err(StoreError::DanglingReferences {
                count: dangling.len(),
            });
        }

        let order: Vec<TableKind> = registry.tables().iter().map(|table| table.kind).collect();
        for kind in TableKind::ALL {
            if !order.contains(&kind) {
                return Err(StoreError::MissingTable { table: kind });
            }
        }

        let span = info_span!("load", tables = order.len());
        let _guard = span.enter();
        let start = Instant::now();

        let tx = self.conn.transaction()?;
        for kind in order.iter().rev() {
            tx.execute_batch(&format!("DROP TABLE IF EXISTS {kind};"))?;
        }
        let mut summary = LoadSummary::default();
        for &kind in &order {
            tx.execute_batch(create_statement(kind))?;
            let rows = insert_rows(&tx, kind, batch)?;
            summary.tables.push((kind, rows));
        }
        tx.commit()?;

        info!(
            dimension_rows = summary.dimension_rows(),
            fact_rows = summary.fact_rows(),
            duration_ms = start.elapsed().as_millis(),
            "database reloaded"
        );
        Ok(summary)
    }

    pub fn row_count(&self, kind: TableKind) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {kind}"), [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Reads every table back, ordered by identifier.
    pub fn read_batch(&self) -> Result<TableBatch> {
        Ok(TableBatch {
            chemicals: self.read_chemicals()?,
            source_reduction_activities: self.read_source_reduction_activities()?,
            reductions: self.read_reductions()?,
            records: self.read_records()?,
        })
    }

    fn read_chemicals(&self) -> Result<Vec<ChemicalEntity>> {
        let mut stmt = self.conn.prepare(
            "SELECT chemical_id, tri_chemical_id, chemical_name, caac_ind, carc_ind, pfas_ind,
                    metal_ind, cas_number, smiles, cas_status, smiles_status
             FROM chemical ORDER BY chemical_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    ChemicalEntity {
                        chemical_id: row.get(0)?,
                        tri_chemical_id: row.get(1)?,
                        chemical_name: row.get(2)?,
                        caac_ind: row.get(3)?,
                        carc_ind: row.get(4)?,
                        pfas_ind: row.get(5)?,
                        metal_ind: row.get(6)?,
                        cas_number: row.get(7)?,
                        smiles: row.get(8)?,
                        cas_status: LookupStatus::Skipped,
                        smiles_status: LookupStatus::Skipped,
                    },
                    row.get::<_, String>(9)?,
                    row.get::<_, String>(10)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(mut chemical, cas_status, smiles_status)| {
                chemical.cas_status = parse_status("cas_status", cas_status)?;
                chemical.smiles_status = parse_status("smiles_status", smiles_status)?;
                Ok(chemical)
            })
            .collect()
    }

    fn read_source_reduction_activities(&self) -> Result<Vec<SourceReductionActivityEntity>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_reduction_activity_id, source_reduction_code, source_reduction_description
             FROM source_reduction_activity ORDER BY source_reduction_activity_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SourceReductionActivityEntity::new(
                    row.get(0)?,
                    row.get::<_, String>(1)?,
                    row.get(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn read_reductions(&self) -> Result<Vec<ReductionEntity>> {
        let mut stmt = self.conn.prepare(
            "SELECT reduction_id, reduction_code, reduction_description
             FROM reduction ORDER BY reduction_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ReductionEntity::new(
                    row.get(0)?,
                    row.get::<_, String>(1)?,
                    row.get(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn read_records(&self) -> Result<Vec<RecordFact>> {
        let mut stmt = self.conn.prepare(
            "SELECT record_id, reporting_year, naics_code, chemical_id,
                    source_reduction_activity_id, reduction_id
             FROM record ORDER BY record_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RecordFact {
                    record_id: row.get(0)?,
                    reporting_year: row.get(1)?,
                    naics_code: row.get(2)?,
                    chemical_id: row.get(3)?,
                    source_reduction_activity_id: row.get(4)?,
                    reduction_id: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    #[cfg(test)]
    fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn parse_status(column: &'static str, value: String) -> Result<LookupStatus> {
    value.parse().map_err(|_| StoreError::InvalidValue {
        table: TableKind::Chemical,
        column,
        value,
    })
}

fn insert_rows(tx: &Transaction<'_>, kind: TableKind, batch: &TableBatch) -> Result<usize> {
    match kind {
        TableKind::Chemical => {
            let mut stmt = tx.prepare(
                "INSERT INTO chemical (chemical_id, tri_chemical_id, chemical_name, caac_ind,
                     carc_ind, pfas_ind, metal_ind, cas_number, smiles, cas_status, smiles_status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for c in &batch.chemicals {
                stmt.execute(params![
                    c.chemical_id,
                    c.tri_chemical_id,
                    c.chemical_name,
                    c.caac_ind,
                    c.carc_ind,
                    c.pfas_ind,
                    c.metal_ind,
                    c.cas_number,
                    c.smiles,
                    c.cas_status.as_str(),
                    c.smiles_status.as_str(),
                ])?;
            }
        }
        TableKind::SourceReductionActivity => {
            let mut stmt = tx.prepare(
                "INSERT INTO source_reduction_activity (source_reduction_activity_id,
                     source_reduction_code, source_reduction_description)
                 VALUES (?1, ?2, ?3)",
            )?;
            for a in &batch.source_reduction_activities {
                stmt.execute(params![
                    a.source_reduction_activity_id,
                    a.source_reduction_code,
                    a.source_reduction_description,
                ])?;
            }
        }
        TableKind::Reduction => {
            let mut stmt = tx.prepare(
                "INSERT INTO reduction (reduction_id, reduction_code, reduction_description)
                 VALUES (?1, ?2, ?3)",
            )?;
            for r in &batch.reductions {
                stmt.execute(params![r.reduction_id, r.reduction_code, r.reduction_description])?;
            }
        }
        TableKind::Record => {
            let mut stmt = tx.prepare(
                "INSERT INTO record (record_id, reporting_year, naics_code, chemical_id,
                     source_reduction_activity_id, reduction_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for r in &batch.records {
                stmt.execute(params![
                    r.record_id,
                    r.reporting_year,
                    r.naics_code,
                    r.chemical_id,
                    r.source_reduction_activity_id,
                    r.reduction_id,
                ])?;
            }
        }
    }
    Ok(batch.row_count(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chemsor_model::ChemicalFlags;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::embedded().unwrap()
    }

    fn batch() -> TableBatch {
        let flags = || ChemicalFlags {
            caac_ind: "NO".to_string(),
            carc_ind: "NO".to_string(),
            pfas_ind: "NO".to_string(),
            metal_ind: "NO".to_string(),
        };
        let mut toluene = ChemicalEntity::new(2, "0000108883", "Toluene", flags());
        toluene.cas_number = Some("108-88-3".to_string());
        toluene.cas_status = LookupStatus::Found;
        toluene.smiles_status = LookupStatus::Unresolved;
        TableBatch {
            chemicals: vec![
                ChemicalEntity::new(1, "0000071432", "Benzene", flags()),
                toluene,
            ],
            source_reduction_activities: vec![SourceReductionActivityEntity::new(
                1,
                "S01",
                Some("Improved maintenance".to_string()),
            )],
            reductions: vec![ReductionEntity::new(1, "T01", Some("Internal audit".to_string()))],
            records: vec![
                RecordFact {
                    record_id: 1,
                    reporting_year: 2019,
                    naics_code: 325110,
                    chemical_id: 1,
                    source_reduction_activity_id: 1,
                    reduction_id: 1,
                },
                RecordFact {
                    record_id: 2,
                    reporting_year: 2020,
                    naics_code: 325110,
                    chemical_id: 2,
                    source_reduction_activity_id: 1,
                    reduction_id: 1,
                },
            ],
        }
    }

    #[test]
    fn reload_is_idempotent() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let summary = store.replace(&registry(), &batch()).unwrap();
        assert_eq!(
            summary.tables,
            vec![
                (TableKind::Chemical, 2),
                (TableKind::SourceReductionActivity, 1),
                (TableKind::Reduction, 1),
                (TableKind::Record, 2),
            ]
        );
        let first = store.read_batch().unwrap();
        store.replace(&registry(), &batch()).unwrap();
        let second = store.read_batch().unwrap();
        assert_eq!(first, second);
        assert_eq!(first, batch());
        assert_eq!(store.row_count(TableKind::Record).unwrap(), 2);
        assert_eq!(summary.dimension_rows(), 4);
        assert_eq!(summary.fact_rows(), 2);
    }

    #[test]
    fn dangling_batch_rejected_before_drop() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.replace(&registry(), &batch()).unwrap();

        let mut broken = batch();
        broken.records[0].chemical_id = 99;
        let err = store.replace(&registry(), &broken).unwrap_err();
        assert!(matches!(err, StoreError::DanglingReferences { count: 1 }));
        assert_eq!(store.read_batch().unwrap(), batch());
    }

    #[test]
    fn deleting_a_dimension_cascades_to_records() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.replace(&registry(), &batch()).unwrap();
        store
            .connection()
            .execute("DELETE FROM chemical WHERE chemical_id = 1", [])
            .unwrap();
        let records = store.read_batch().unwrap().records;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].chemical_id, 2);
    }

    #[test]
    fn unknown_status_is_an_error() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.replace(&registry(), &batch()).unwrap();
        store
            .connection()
            .execute("UPDATE chemical SET cas_status = 'maybe' WHERE chemical_id = 1", [])
            .unwrap();
        let err = store.read_batch().unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidValue {
                column: "cas_status",
                ..
            }
        ));
    }
}
