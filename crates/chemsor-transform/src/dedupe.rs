//! Identifier assignment and distinct projection.
//!
//! Each table's grouping key is read row by row into [`KeyValue`] tuples.
//! Distinct tuples are numbered 1..K in ascending key order, so identifiers
//! depend only on the set of keys, not on row order.

use std::collections::BTreeSet;

use chemsor_model::TableKind;
use chemsor_schema::{SchemaRegistry, TableSpec};
use polars::prelude::{AnyValue, BooleanChunked, Column, DataFrame, NamedFrom, NewChunkedArray, Series};
use tracing::{debug, warn};

use crate::error::{Result, TransformError};

/// One cell of a natural key. Nulls order before any value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyValue {
    Null,
    Int(i64),
    Text(String),
}

impl KeyValue {
    pub fn from_any(value: AnyValue<'_>) -> Self {
        match value {
            AnyValue::Null => Self::Null,
            AnyValue::Int8(v) => Self::Int(i64::from(v)),
            AnyValue::Int16(v) => Self::Int(i64::from(v)),
            AnyValue::Int32(v) => Self::Int(i64::from(v)),
            AnyValue::Int64(v) => Self::Int(v),
            AnyValue::UInt8(v) => Self::Int(i64::from(v)),
            AnyValue::UInt16(v) => Self::Int(i64::from(v)),
            AnyValue::UInt32(v) => Self::Int(i64::from(v)),
            AnyValue::UInt64(v) => {
                i64::try_from(v).map_or_else(|_| Self::Text(v.to_string()), Self::Int)
            }
            AnyValue::String(s) => Self::Text(s.to_string()),
            AnyValue::StringOwned(s) => Self::Text(s.to_string()),
            other => Self::Text(other.to_string()),
        }
    }
}

fn table_columns<'a>(
    df: &'a DataFrame,
    table: TableKind,
    names: &[String],
) -> Result<Vec<&'a Column>> {
    names
        .iter()
        .map(|name| {
            df.column(name)
                .map_err(|_| TransformError::SchemaAssignment {
                    table,
                    column: name.clone(),
                })
        })
        .collect()
}

/// Reads the key tuple of every row over `names`.
pub fn key_tuples(
    df: &DataFrame,
    table: TableKind,
    names: &[String],
) -> Result<Vec<Vec<KeyValue>>> {
    let columns = table_columns(df, table, names)?;
    let mut keys = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let mut key = Vec::with_capacity(columns.len());
        for column in &columns {
            key.push(KeyValue::from_any(column.get(idx)?));
        }
        keys.push(key);
    }
    Ok(keys)
}

/// Dense ranks of `keys`: equal keys share a rank, ranks start at 1 and
/// follow ascending key order.
pub fn dense_ids(keys: &[Vec<KeyValue>]) -> (Vec<i64>, usize) {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));

    let mut ids = vec![0i64; keys.len()];
    let mut current = 0i64;
    let mut groups = 0usize;
    let mut previous: Option<&Vec<KeyValue>> = None;
    for row in order {
        if previous != Some(&keys[row]) {
            current += 1;
            groups += 1;
            previous = Some(&keys[row]);
        }
        ids[row] = current;
    }
    (ids, groups)
}

/// Adds the table's identifier column to `df`; returns the number of groups.
pub fn assign_ids(df: &mut DataFrame, table: &TableSpec) -> Result<usize> {
    let keys = key_tuples(df, table.kind, &table.grouping)?;
    let (ids, groups) = dense_ids(&keys);
    df.with_column(Series::new(table.id.as_str().into(), ids))?;
    Ok(groups)
}

/// Selects the table's columns and drops exact duplicate rows, keeping the
/// first occurrence of each.
pub fn project_distinct(df: &DataFrame, table: &TableSpec) -> Result<DataFrame> {
    table_columns(df, table.kind, &table.columns)?;
    let projected = df.select(table.columns.iter().map(String::as_str))?;
    let rows = key_tuples(&projected, table.kind, &table.columns)?;

    let mut seen = BTreeSet::new();
    let keep: Vec<bool> = rows.into_iter().map(|row| seen.insert(row)).collect();
    let mask = BooleanChunked::from_slice("distinct".into(), &keep);
    Ok(projected.filter(&mask)?)
}

/// One projected output table.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub kind: TableKind,
    pub frame: DataFrame,
    pub groups: usize,
}

/// The projected tables of one run, in registry order.
#[derive(Debug, Clone, Default)]
pub struct NormalizedTables {
    tables: Vec<NormalizedTable>,
}

impl NormalizedTables {
    pub fn get(&self, kind: TableKind) -> Option<&NormalizedTable> {
        self.tables.iter().find(|t| t.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalizedTable> {
        self.tables.iter()
    }
}

/// Assigns every table's identifiers over the long table and projects the
/// distinct rows. Later tables may group on earlier tables' identifiers.
pub fn normalize(mut long: DataFrame, registry: &SchemaRegistry) -> Result<NormalizedTables> {
    let mut tables = Vec::with_capacity(registry.tables().len());
    for table in registry.tables() {
        let groups = assign_ids(&mut long, table)?;
        let frame = project_distinct(&long, table)?;
        if frame.height() != groups {
            warn!(
                table = %table.kind,
                groups,
                rows = frame.height(),
                "projected rows differ from identifier groups"
            );
        }
        debug!(table = %table.kind, groups, rows = frame.height(), "table normalized");
        tables.push(NormalizedTable {
            kind: table.kind,
            frame,
            groups,
        });
    }
    Ok(NormalizedTables { tables })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kind: TableKind, id: &str, grouping: &[&str], columns: &[&str]) -> TableSpec {
        TableSpec {
            kind,
            id: id.to_string(),
            grouping: grouping.iter().map(|s| (*s).to_string()).collect(),
            columns: columns.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn reduction_df() -> DataFrame {
        DataFrame::new(vec![
            Series::new(
                "reduction_code".into(),
                vec![Some("T02"), Some("T01"), Some("T02"), Some("T01")],
            )
            .into(),
            Series::new(
                "reduction_description".into(),
                vec![Some("b"), None, Some("b"), Some("a")],
            )
            .into(),
        ])
        .unwrap()
    }

    #[test]
    fn ids_follow_key_order_with_nulls_first() {
        let mut df = reduction_df();
        let table = spec(
            TableKind::Reduction,
            "reduction_id",
            &["reduction_code", "reduction_description"],
            &["reduction_id", "reduction_code", "reduction_description"],
        );
        let groups = assign_ids(&mut df, &table).unwrap();
        assert_eq!(groups, 3);
        let ids: Vec<Option<i64>> = df
            .column("reduction_id")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        // (T01, null) < (T01, a) < (T02, b)
        assert_eq!(ids, vec![Some(3), Some(1), Some(3), Some(2)]);
    }

    #[test]
    fn projection_keeps_first_appearance_order() {
        let mut df = reduction_df();
        let table = spec(
            TableKind::Reduction,
            "reduction_id",
            &["reduction_code", "reduction_description"],
            &["reduction_id", "reduction_code"],
        );
        assign_ids(&mut df, &table).unwrap();
        let projected = project_distinct(&df, &table).unwrap();
        assert_eq!(projected.height(), 3);
        let codes = projected.column("reduction_code").unwrap().str().unwrap();
        assert_eq!(codes.get(0), Some("T02"));
        assert_eq!(codes.get(1), Some("T01"));
    }

    #[test]
    fn missing_grouping_column_is_schema_fault() {
        let mut df = reduction_df();
        let table = spec(
            TableKind::Reduction,
            "reduction_id",
            &["reduction_code", "method"],
            &["reduction_id"],
        );
        let result = assign_ids(&mut df, &table);
        assert!(matches!(
            result,
            Err(TransformError::SchemaAssignment {
                table: TableKind::Reduction,
                ref column,
            }) if column == "method"
        ));
    }

    #[test]
    fn integers_compare_numerically() {
        let keys = vec![
            vec![KeyValue::Int(10)],
            vec![KeyValue::Int(9)],
            vec![KeyValue::Null],
        ];
        let (ids, groups) = dense_ids(&keys);
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(groups, 3);
    }

    #[test]
    fn empty_input_assigns_nothing() {
        let (ids, groups) = dense_ids(&[]);
        assert!(ids.is_empty());
        assert_eq!(groups, 0);
    }
}
