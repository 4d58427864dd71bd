//! Long-form records produced by the reshaper.
//!
//! One [`LongRecord`] exists per (year, facility, chemical, activity, reduction)
//! tuple. The canonical column names listed in [`LONG_COLUMNS`] are the only
//! names the schema registry may map raw columns onto.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Storage kind of a long-form column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Integer,
    Text,
}

/// Canonical long-form column with its storage kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongColumn {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Whether the column comes from a repeating block (vs. a broadcast scalar).
    pub repeating: bool,
}

pub const REPORTING_YEAR: &str = "reporting_year";
pub const NAICS_CODE: &str = "naics_code";
pub const TRI_CHEMICAL_ID: &str = "tri_chemical_id";
pub const CHEMICAL_NAME: &str = "chemical_name";
pub const CAAC_IND: &str = "caac_ind";
pub const CARC_IND: &str = "carc_ind";
pub const PFAS_IND: &str = "pfas_ind";
pub const METAL_IND: &str = "metal_ind";
pub const SOURCE_REDUCTION_CODE: &str = "source_reduction_code";
pub const SOURCE_REDUCTION_DESCRIPTION: &str = "source_reduction_description";
pub const REDUCTION_CODE: &str = "reduction_code";
pub const REDUCTION_DESCRIPTION: &str = "reduction_description";

const fn scalar(name: &'static str, kind: ColumnKind) -> LongColumn {
    LongColumn {
        name,
        kind,
        repeating: false,
    }
}

const fn block(name: &'static str) -> LongColumn {
    LongColumn {
        name,
        kind: ColumnKind::Text,
        repeating: true,
    }
}

/// Every long-form column, in output order.
pub const LONG_COLUMNS: [LongColumn; 12] = [
    scalar(REPORTING_YEAR, ColumnKind::Integer),
    scalar(NAICS_CODE, ColumnKind::Integer),
    scalar(TRI_CHEMICAL_ID, ColumnKind::Text),
    scalar(CHEMICAL_NAME, ColumnKind::Text),
    scalar(CAAC_IND, ColumnKind::Text),
    scalar(CARC_IND, ColumnKind::Text),
    scalar(PFAS_IND, ColumnKind::Text),
    scalar(METAL_IND, ColumnKind::Text),
    block(SOURCE_REDUCTION_CODE),
    block(SOURCE_REDUCTION_DESCRIPTION),
    block(REDUCTION_CODE),
    block(REDUCTION_DESCRIPTION),
];

/// Look up a canonical long-form column by name.
pub fn long_column(name: &str) -> Result<LongColumn> {
    LONG_COLUMNS
        .iter()
        .find(|column| column.name == name)
        .copied()
        .ok_or_else(|| ModelError::UnknownColumn(name.to_string()))
}

/// Chemical and facility fields shared by every block of one wide row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarFields {
    pub reporting_year: i64,
    pub naics_code: i64,
    pub tri_chemical_id: String,
    pub chemical_name: String,
    pub caac_ind: String,
    pub carc_ind: String,
    pub pfas_ind: String,
    pub metal_ind: String,
}

/// One repeating source-reduction block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionBlock {
    pub source_reduction_code: Option<String>,
    pub source_reduction_description: Option<String>,
    pub reduction_code: Option<String>,
    pub reduction_description: Option<String>,
}

impl ReductionBlock {
    /// A block yields a long row only when both of its codes are present.
    pub fn is_complete(&self) -> bool {
        self.source_reduction_code.is_some() && self.reduction_code.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongRecord {
    pub reporting_year: i64,
    pub naics_code: i64,
    pub tri_chemical_id: String,
    pub chemical_name: String,
    pub caac_ind: String,
    pub carc_ind: String,
    pub pfas_ind: String,
    pub metal_ind: String,
    pub source_reduction_code: Option<String>,
    pub source_reduction_description: Option<String>,
    pub reduction_code: Option<String>,
    pub reduction_description: Option<String>,
}

impl LongRecord {
    /// Broadcast the scalar fields onto one block.
    pub fn new(scalars: &ScalarFields, block: ReductionBlock) -> Self {
        Self {
            reporting_year: scalars.reporting_year,
            naics_code: scalars.naics_code,
            tri_chemical_id: scalars.tri_chemical_id.clone(),
            chemical_name: scalars.chemical_name.clone(),
            caac_ind: scalars.caac_ind.clone(),
            carc_ind: scalars.carc_ind.clone(),
            pfas_ind: scalars.pfas_ind.clone(),
            metal_ind: scalars.metal_ind.clone(),
            source_reduction_code: block.source_reduction_code,
            source_reduction_description: block.source_reduction_description,
            reduction_code: block.reduction_code,
            reduction_description: block.reduction_description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_column_lookup() {
        assert_eq!(long_column("naics_code").unwrap().kind, ColumnKind::Integer);
        assert!(long_column("reduction_code").unwrap().repeating);
        assert!(matches!(
            long_column("NAICS"),
            Err(ModelError::UnknownColumn(_))
        ));
    }

    #[test]
    fn incomplete_block_detected() {
        let block = ReductionBlock {
            source_reduction_code: Some("S01".to_string()),
            ..ReductionBlock::default()
        };
        assert!(!block.is_complete());
    }
}
