//! Dimension entities and fact rows emitted by the transform stage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Output tables in dependency order (dimensions before facts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Chemical,
    SourceReductionActivity,
    Reduction,
    Record,
}

impl TableKind {
    pub const ALL: [TableKind; 4] = [
        TableKind::Chemical,
        TableKind::SourceReductionActivity,
        TableKind::Reduction,
        TableKind::Record,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Chemical => "chemical",
            Self::SourceReductionActivity => "source_reduction_activity",
            Self::Reduction => "reduction",
            Self::Record => "record",
        }
    }

    pub const fn is_fact(self) -> bool {
        matches!(self, Self::Record)
    }

    /// Columns the emitter reads from the projected frame.
    pub const fn required_columns(self) -> &'static [&'static str] {
        match self {
            Self::Chemical => &[
                "chemical_id",
                "tri_chemical_id",
                "chemical_name",
                "caac_ind",
                "carc_ind",
                "pfas_ind",
                "metal_ind",
            ],
            Self::SourceReductionActivity => &[
                "source_reduction_activity_id",
                "source_reduction_code",
                "source_reduction_description",
            ],
            Self::Reduction => &["reduction_id", "reduction_code", "reduction_description"],
            Self::Record => &[
                "record_id",
                "reporting_year",
                "naics_code",
                "chemical_id",
                "source_reduction_activity_id",
                "reduction_id",
            ],
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TableKind {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == value.trim())
            .ok_or_else(|| ModelError::UnknownTable(value.to_string()))
    }
}

/// Outcome of one external lookup.
///
/// `Absent` is a definitive "no match" from the service; `Unresolved` means
/// the call kept failing and the answer is unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStatus {
    Found,
    Absent,
    Unresolved,
    /// Lookup not attempted (enrichment disabled or no input to look up).
    #[default]
    Skipped,
}

impl LookupStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::Absent => "absent",
            Self::Unresolved => "unresolved",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for LookupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LookupStatus {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "found" => Ok(Self::Found),
            "absent" => Ok(Self::Absent),
            "unresolved" => Ok(Self::Unresolved),
            "skipped" => Ok(Self::Skipped),
            other => Err(ModelError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChemicalEntity {
    pub chemical_id: i64,
    pub tri_chemical_id: String,
    pub chemical_name: String,
    pub caac_ind: String,
    pub carc_ind: String,
    pub pfas_ind: String,
    pub metal_ind: String,
    pub cas_number: Option<String>,
    pub smiles: Option<String>,
    pub cas_status: LookupStatus,
    pub smiles_status: LookupStatus,
}

/// Chemical flags carried verbatim from the source (`YES`/`NO` style codes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChemicalFlags {
    pub caac_ind: String,
    pub carc_ind: String,
    pub pfas_ind: String,
    pub metal_ind: String,
}

impl ChemicalEntity {
    /// A chemical before enrichment: no registry number, no structure.
    pub fn new(
        chemical_id: i64,
        tri_chemical_id: impl Into<String>,
        chemical_name: impl Into<String>,
        flags: ChemicalFlags,
    ) -> Self {
        Self {
            chemical_id,
            tri_chemical_id: tri_chemical_id.into(),
            chemical_name: chemical_name.into(),
            caac_ind: flags.caac_ind,
            carc_ind: flags.carc_ind,
            pfas_ind: flags.pfas_ind,
            metal_ind: flags.metal_ind,
            cas_number: None,
            smiles: None,
            cas_status: LookupStatus::Skipped,
            smiles_status: LookupStatus::Skipped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReductionActivityEntity {
    pub source_reduction_activity_id: i64,
    pub source_reduction_code: String,
    pub source_reduction_description: Option<String>,
}

impl SourceReductionActivityEntity {
    pub fn new(
        source_reduction_activity_id: i64,
        source_reduction_code: impl Into<String>,
        source_reduction_description: Option<String>,
    ) -> Self {
        Self {
            source_reduction_activity_id,
            source_reduction_code: source_reduction_code.into(),
            source_reduction_description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionEntity {
    pub reduction_id: i64,
    pub reduction_code: String,
    pub reduction_description: Option<String>,
}

impl ReductionEntity {
    pub fn new(
        reduction_id: i64,
        reduction_code: impl Into<String>,
        reduction_description: Option<String>,
    ) -> Self {
        Self {
            reduction_id,
            reduction_code: reduction_code.into(),
            reduction_description,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFact {
    pub record_id: i64,
    pub reporting_year: i64,
    pub naics_code: i64,
    pub chemical_id: i64,
    pub source_reduction_activity_id: i64,
    pub reduction_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_kind_round_trips_through_name() {
        for kind in TableKind::ALL {
            assert_eq!(kind.name().parse::<TableKind>().unwrap(), kind);
        }
        assert!("facility".parse::<TableKind>().is_err());
    }

    #[test]
    fn only_record_is_fact() {
        assert!(TableKind::Record.is_fact());
        assert!(!TableKind::Chemical.is_fact());
    }

    #[test]
    fn new_chemical_is_unenriched() {
        let chemical = ChemicalEntity::new(
            1,
            "100-42-5",
            "Styrene",
            ChemicalFlags {
                caac_ind: "NO".to_string(),
                carc_ind: "NO".to_string(),
                pfas_ind: "NO".to_string(),
                metal_ind: "NO".to_string(),
            },
        );
        assert_eq!(chemical.cas_status, LookupStatus::Skipped);
        assert!(chemical.smiles.is_none());
    }

    #[test]
    fn lookup_status_serializes_snake_case() {
        let json = serde_json::to_string(&LookupStatus::Unresolved).unwrap();
        assert_eq!(json, "\"unresolved\"");
        assert_eq!("absent".parse::<LookupStatus>().unwrap(), LookupStatus::Absent);
    }
}
