//! Wide-to-long reshaping.
//!
//! Each wide row carries eight scalar columns and four repeating
//! source-reduction blocks. A row survives the row filters when its chemical
//! is reported and at least one block has a source-reduction code; it then
//! yields one long record per block whose two codes are both present.

use chemsor_model::long::{
    CAAC_IND, CARC_IND, CHEMICAL_NAME, METAL_IND, NAICS_CODE, PFAS_IND, REDUCTION_CODE,
    REDUCTION_DESCRIPTION, REPORTING_YEAR, SOURCE_REDUCTION_CODE, SOURCE_REDUCTION_DESCRIPTION,
    TRI_CHEMICAL_ID,
};
use chemsor_model::{LongRecord, ReductionBlock, ScalarFields};
use chemsor_schema::{ColumnMapping, SchemaRegistry};
use polars::prelude::*;

use crate::error::{Result, TransformError};
use crate::values::{capitalize, non_blank, parse_integer, string_column};

/// Row accounting for one reshaped table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReshapeStats {
    pub input_rows: usize,
    /// Rows whose chemical identifier is null or marked not reported.
    pub unreported_chemical: usize,
    /// Rows where every block lacks a source-reduction code.
    pub no_reduction_activity: usize,
    /// Rows with an unparseable year or NAICS code, or a missing name or flag.
    pub malformed: usize,
    /// Blocks of surviving rows dropped for a null code.
    pub blocks_dropped: usize,
    pub long_rows: usize,
}

impl ReshapeStats {
    pub fn merge(&mut self, other: &ReshapeStats) {
        self.input_rows += other.input_rows;
        self.unreported_chemical += other.unreported_chemical;
        self.no_reduction_activity += other.no_reduction_activity;
        self.malformed += other.malformed;
        self.blocks_dropped += other.blocks_dropped;
        self.long_rows += other.long_rows;
    }
}

fn mapped_column(
    df: &DataFrame,
    mappings: &[ColumnMapping],
    canonical: &str,
) -> Result<StringChunked> {
    let raw = SchemaRegistry::raw_name(mappings, canonical).ok_or_else(|| {
        TransformError::MissingWideColumn {
            column: canonical.to_string(),
        }
    })?;
    string_column(df, raw).map_err(|_| TransformError::MissingWideColumn {
        column: raw.to_string(),
    })
}

struct ScalarColumns {
    reporting_year: StringChunked,
    naics_code: StringChunked,
    tri_chemical_id: StringChunked,
    chemical_name: StringChunked,
    caac_ind: StringChunked,
    carc_ind: StringChunked,
    pfas_ind: StringChunked,
    metal_ind: StringChunked,
}

impl ScalarColumns {
    fn new(df: &DataFrame, mappings: &[ColumnMapping]) -> Result<Self> {
        Ok(Self {
            reporting_year: mapped_column(df, mappings, REPORTING_YEAR)?,
            naics_code: mapped_column(df, mappings, NAICS_CODE)?,
            tri_chemical_id: mapped_column(df, mappings, TRI_CHEMICAL_ID)?,
            chemical_name: mapped_column(df, mappings, CHEMICAL_NAME)?,
            caac_ind: mapped_column(df, mappings, CAAC_IND)?,
            carc_ind: mapped_column(df, mappings, CARC_IND)?,
            pfas_ind: mapped_column(df, mappings, PFAS_IND)?,
            metal_ind: mapped_column(df, mappings, METAL_IND)?,
        })
    }

    /// Parses the scalar fields of row `idx`; `None` marks a malformed row.
    fn parse(&self, idx: usize, tri_chemical_id: &str) -> Option<ScalarFields> {
        let text = |column: &StringChunked| non_blank(column.get(idx)).map(str::to_string);
        Some(ScalarFields {
            reporting_year: parse_integer(self.reporting_year.get(idx)?)?,
            naics_code: parse_integer(self.naics_code.get(idx)?)?,
            tri_chemical_id: tri_chemical_id.to_string(),
            chemical_name: text(&self.chemical_name)?,
            caac_ind: text(&self.caac_ind)?,
            carc_ind: text(&self.carc_ind)?,
            pfas_ind: text(&self.pfas_ind)?,
            metal_ind: text(&self.metal_ind)?,
        })
    }
}

struct BlockColumns {
    source_reduction_code: StringChunked,
    source_reduction_description: StringChunked,
    reduction_code: StringChunked,
    reduction_description: StringChunked,
}

impl BlockColumns {
    fn new(df: &DataFrame, mappings: &[ColumnMapping]) -> Result<Self> {
        Ok(Self {
            source_reduction_code: mapped_column(df, mappings, SOURCE_REDUCTION_CODE)?,
            source_reduction_description: mapped_column(
                df,
                mappings,
                SOURCE_REDUCTION_DESCRIPTION,
            )?,
            reduction_code: mapped_column(df, mappings, REDUCTION_CODE)?,
            reduction_description: mapped_column(df, mappings, REDUCTION_DESCRIPTION)?,
        })
    }

    fn read(&self, idx: usize) -> ReductionBlock {
        let text = |column: &StringChunked| non_blank(column.get(idx)).map(str::to_string);
        ReductionBlock {
            source_reduction_code: text(&self.source_reduction_code),
            source_reduction_description: non_blank(self.source_reduction_description.get(idx))
                .map(capitalize),
            reduction_code: text(&self.reduction_code),
            reduction_description: text(&self.reduction_description),
        }
    }
}

/// Reshapes one year's wide table into long records.
///
/// Output order is input row order, then block order.
pub fn reshape_wide(
    df: &DataFrame,
    registry: &SchemaRegistry,
) -> Result<(Vec<LongRecord>, ReshapeStats)> {
    let scalars = ScalarColumns::new(df, registry.scalars())?;
    let blocks = registry
        .blocks()
        .iter()
        .map(|mappings| BlockColumns::new(df, mappings))
        .collect::<Result<Vec<_>>>()?;
    let prefix = registry.not_reported_prefix();

    let mut stats = ReshapeStats::default();
    let mut records = Vec::new();
    for idx in 0..df.height() {
        stats.input_rows += 1;

        let Some(tri_chemical_id) = non_blank(scalars.tri_chemical_id.get(idx))
            .filter(|id| !id.starts_with(prefix))
        else {
            stats.unreported_chemical += 1;
            continue;
        };

        let row_blocks: Vec<ReductionBlock> = blocks.iter().map(|b| b.read(idx)).collect();
        if row_blocks
            .iter()
            .all(|b| b.source_reduction_code.is_none())
        {
            stats.no_reduction_activity += 1;
            continue;
        }

        let Some(fields) = scalars.parse(idx, tri_chemical_id) else {
            stats.malformed += 1;
            continue;
        };

        for block in row_blocks {
            if block.is_complete() {
                records.push(LongRecord::new(&fields, block));
                stats.long_rows += 1;
            } else {
                stats.blocks_dropped += 1;
            }
        }
    }
    Ok((records, stats))
}

fn text_column<'a>(name: &str, values: impl Iterator<Item = Option<&'a str>>) -> Column {
    Series::new(name.into(), values.collect::<Vec<_>>()).into()
}

fn integer_column(name: &str, values: impl Iterator<Item = i64>) -> Column {
    Series::new(name.into(), values.collect::<Vec<_>>()).into()
}

/// Builds the unified long table with canonical column names.
pub fn long_frame(records: &[LongRecord]) -> Result<DataFrame> {
    let columns = vec![
        integer_column(REPORTING_YEAR, records.iter().map(|r| r.reporting_year)),
        integer_column(NAICS_CODE, records.iter().map(|r| r.naics_code)),
        text_column(
            TRI_CHEMICAL_ID,
            records.iter().map(|r| Some(r.tri_chemical_id.as_str())),
        ),
        text_column(
            CHEMICAL_NAME,
            records.iter().map(|r| Some(r.chemical_name.as_str())),
        ),
        text_column(CAAC_IND, records.iter().map(|r| Some(r.caac_ind.as_str()))),
        text_column(CARC_IND, records.iter().map(|r| Some(r.carc_ind.as_str()))),
        text_column(PFAS_IND, records.iter().map(|r| Some(r.pfas_ind.as_str()))),
        text_column(METAL_IND, records.iter().map(|r| Some(r.metal_ind.as_str()))),
        text_column(
            SOURCE_REDUCTION_CODE,
            records.iter().map(|r| r.source_reduction_code.as_deref()),
        ),
        text_column(
            SOURCE_REDUCTION_DESCRIPTION,
            records
                .iter()
                .map(|r| r.source_reduction_description.as_deref()),
        ),
        text_column(
            REDUCTION_CODE,
            records.iter().map(|r| r.reduction_code.as_deref()),
        ),
        text_column(
            REDUCTION_DESCRIPTION,
            records.iter().map(|r| r.reduction_description.as_deref()),
        ),
    ];
    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chemsor_model::LONG_COLUMNS;

    fn wide_df(rows: &[[Option<&str>; 24]]) -> DataFrame {
        let registry = SchemaRegistry::embedded().unwrap();
        let columns = registry
            .raw_columns()
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let values: Vec<Option<&str>> = rows.iter().map(|row| row[i]).collect();
                Series::new(name.into(), values).into()
            })
            .collect();
        DataFrame::new(columns).unwrap()
    }

    type Block = Option<(&'static str, &'static str)>;

    fn row(tri_id: Option<&'static str>, blocks: [Block; 4]) -> [Option<&'static str>; 24] {
        let mut cells = [None; 24];
        cells[..8].copy_from_slice(&[
            Some("2020"),
            Some("325110"),
            tri_id,
            Some("Styrene"),
            Some("NO"),
            Some("YES"),
            Some("NO"),
            Some("NO"),
        ]);
        for (i, block) in blocks.into_iter().enumerate() {
            if let Some((code, reduction)) = block {
                let base = 8 + 4 * i;
                cells[base] = Some(code);
                cells[base + 1] = Some("IMPROVED maintenance");
                cells[base + 2] = Some(reduction);
                cells[base + 3] = Some("Internal audit");
            }
        }
        cells
    }

    #[test]
    fn only_complete_blocks_emitted() {
        let mut partial = row(Some("100425"), [None, Some(("W13", "T01")), None, None]);
        // Block 3 has a source-reduction code but no reduction code.
        partial[16] = Some("W14");
        let df = wide_df(&[partial]);
        let registry = SchemaRegistry::embedded().unwrap();

        let (records, stats) = reshape_wide(&df, &registry).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_reduction_code.as_deref(), Some("W13"));
        assert_eq!(
            records[0].source_reduction_description.as_deref(),
            Some("Improved maintenance")
        );
        assert_eq!(records[0].naics_code, 325_110);
        assert_eq!(stats.blocks_dropped, 3);
        assert_eq!(stats.long_rows, 1);
    }

    #[test]
    fn row_filters_counted() {
        let df = wide_df(&[
            row(None, [Some(("W13", "T01")), None, None, None]),
            row(Some("N982"), [Some(("W13", "T01")), None, None, None]),
            row(Some("100425"), [None, None, None, None]),
        ]);
        let registry = SchemaRegistry::embedded().unwrap();
        let (records, stats) = reshape_wide(&df, &registry).unwrap();
        assert!(records.is_empty());
        assert_eq!(stats.input_rows, 3);
        assert_eq!(stats.unreported_chemical, 2);
        assert_eq!(stats.no_reduction_activity, 1);
    }

    #[test]
    fn malformed_year_dropped() {
        let mut bad = row(Some("100425"), [Some(("W13", "T01")), None, None, None]);
        bad[0] = Some("twenty");
        let df = wide_df(&[bad]);
        let registry = SchemaRegistry::embedded().unwrap();
        let (records, stats) = reshape_wide(&df, &registry).unwrap();
        assert!(records.is_empty());
        assert_eq!(stats.malformed, 1);
    }

    #[test]
    fn missing_wide_column_is_an_error() {
        let df = DataFrame::new(vec![
            Series::new("REPORTING YEAR".into(), vec!["2020"]).into(),
        ])
        .unwrap();
        let registry = SchemaRegistry::embedded().unwrap();
        assert!(matches!(
            reshape_wide(&df, &registry),
            Err(TransformError::MissingWideColumn { .. })
        ));
    }

    #[test]
    fn long_frame_uses_canonical_order() {
        let frame = long_frame(&[]).unwrap();
        let names: Vec<&str> = frame.get_column_names().iter().map(|n| n.as_str()).collect();
        let expected: Vec<&str> = LONG_COLUMNS.iter().map(|c| c.name).collect();
        assert_eq!(names, expected);
    }
}
