//! The immutable hand-off from the transform stage to persistence.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::entity::{
    ChemicalEntity, LookupStatus, RecordFact, ReductionEntity, SourceReductionActivityEntity,
    TableKind,
};

/// The four output tables of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBatch {
    pub chemicals: Vec<ChemicalEntity>,
    pub source_reduction_activities: Vec<SourceReductionActivityEntity>,
    pub reductions: Vec<ReductionEntity>,
    pub records: Vec<RecordFact>,
}

/// A fact whose foreign key has no matching dimension row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub record_id: i64,
    pub table: TableKind,
    pub key: i64,
}

impl TableBatch {
    pub fn row_count(&self, table: TableKind) -> usize {
        match table {
            TableKind::Chemical => self.chemicals.len(),
            TableKind::SourceReductionActivity => self.source_reduction_activities.len(),
            TableKind::Reduction => self.reductions.len(),
            TableKind::Record => self.records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        TableKind::ALL.iter().all(|kind| self.row_count(*kind) == 0)
    }

    /// Facts whose foreign keys do not resolve to a dimension row.
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let chemicals: BTreeSet<i64> = self.chemicals.iter().map(|c| c.chemical_id).collect();
        let activities: BTreeSet<i64> = self
            .source_reduction_activities
            .iter()
            .map(|a| a.source_reduction_activity_id)
            .collect();
        let reductions: BTreeSet<i64> = self.reductions.iter().map(|r| r.reduction_id).collect();

        let mut dangling = Vec::new();
        for record in &self.records {
            let checks = [
                (TableKind::Chemical, record.chemical_id, &chemicals),
                (
                    TableKind::SourceReductionActivity,
                    record.source_reduction_activity_id,
                    &activities,
                ),
                (TableKind::Reduction, record.reduction_id, &reductions),
            ];
            for (table, key, known) in checks {
                if !known.contains(&key) {
                    dangling.push(DanglingReference {
                        record_id: record.record_id,
                        table,
                        key,
                    });
                }
            }
        }
        dangling
    }

    /// Count chemicals per (registry number status, structure status) outcome.
    pub fn enrichment_counts(&self) -> EnrichmentCounts {
        let mut counts = EnrichmentCounts::default();
        for chemical in &self.chemicals {
            counts.cas.record(chemical.cas_status);
            counts.smiles.record(chemical.smiles_status);
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub found: usize,
    pub absent: usize,
    pub unresolved: usize,
    pub skipped: usize,
}

impl StatusCounts {
    fn record(&mut self, status: LookupStatus) {
        match status {
            LookupStatus::Found => self.found += 1,
            LookupStatus::Absent => self.absent += 1,
            LookupStatus::Unresolved => self.unresolved += 1,
            LookupStatus::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentCounts {
    pub cas: StatusCounts,
    pub smiles: StatusCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(record_id: i64, chemical_id: i64) -> RecordFact {
        RecordFact {
            record_id,
            reporting_year: 2020,
            naics_code: 325,
            chemical_id,
            source_reduction_activity_id: 1,
            reduction_id: 1,
        }
    }

    #[test]
    fn dangling_references_reported_per_key() {
        let batch = TableBatch {
            chemicals: vec![],
            source_reduction_activities: vec![SourceReductionActivityEntity::new(
                1, "S01", None,
            )],
            reductions: vec![ReductionEntity::new(1, "T01", None)],
            records: vec![record(1, 7)],
        };
        let dangling = batch.dangling_references();
        assert_eq!(
            dangling,
            vec![DanglingReference {
                record_id: 1,
                table: TableKind::Chemical,
                key: 7
            }]
        );
    }

    #[test]
    fn empty_batch() {
        assert!(TableBatch::default().is_empty());
    }
}
