//! End-to-end transform tests over raw yearly CSV files.

use std::path::Path;

use chemsor_model::TableKind;
use chemsor_schema::SchemaRegistry;
use chemsor_transform::{TransformError, run_transform};
use tempfile::TempDir;

type Block<'a> = Option<(&'a str, &'a str, &'a str, &'a str)>;

fn header(registry: &SchemaRegistry) -> String {
    registry.raw_columns().join(",")
}

fn wide_line(year: &str, chem: &str, name: &str, blocks: [Block<'_>; 4]) -> String {
    let mut cells = vec![
        year.to_string(),
        "325".to_string(),
        chem.to_string(),
        name.to_string(),
        "N".to_string(),
        "N".to_string(),
        "N".to_string(),
        "N".to_string(),
    ];
    for block in blocks {
        match block {
            Some((code, desc, reduction, reduction_desc)) => {
                cells.extend([code, desc, reduction, reduction_desc].map(str::to_string));
            }
            None => cells.extend(std::iter::repeat_n(String::new(), 4)),
        }
    }
    cells.join(",")
}

fn write_year(dir: &Path, year: i32, lines: &[String]) {
    let registry = SchemaRegistry::embedded().unwrap();
    let mut contents = header(&registry);
    for line in lines {
        contents.push('\n');
        contents.push_str(line);
    }
    contents.push('\n');
    std::fs::write(dir.join(format!("US_2a_{year}.csv")), contents).unwrap();
}

#[test]
fn two_populated_blocks_share_one_chemical() {
    let dir = TempDir::new().unwrap();
    write_year(
        dir.path(),
        2020,
        &[wide_line(
            "2020",
            "100-42-5",
            "Styrene",
            [
                Some(("A01", "x", "T01", "Internal audit")),
                None,
                Some(("B02", "y", "T02", "Vendor assistance")),
                None,
            ],
        )],
    );
    let registry = SchemaRegistry::embedded().unwrap();
    let output = run_transform(dir.path(), &registry).unwrap();
    let batch = &output.batch;

    assert_eq!(batch.chemicals.len(), 1);
    assert_eq!(batch.chemicals[0].chemical_id, 1);
    assert_eq!(batch.chemicals[0].tri_chemical_id, "100-42-5");
    assert_eq!(batch.records.len(), 2);
    assert!(batch.records.iter().all(|r| r.chemical_id == 1));

    let descriptions: Vec<Option<&str>> = batch
        .source_reduction_activities
        .iter()
        .map(|a| a.source_reduction_description.as_deref())
        .collect();
    assert_eq!(descriptions, vec![Some("X"), Some("Y")]);

    let totals = output.totals();
    assert_eq!(totals.input_rows, 1);
    assert_eq!(totals.long_rows, 2);
    assert_eq!(totals.blocks_dropped, 2);
}

#[test]
fn years_concatenate_in_ascending_order() {
    let dir = TempDir::new().unwrap();
    let block = [Some(("W13", "Improved maintenance", "T01", "Audit")), None, None, None];
    write_year(
        dir.path(),
        2021,
        &[wide_line("2021", "7440-47-3", "Chromium", block)],
    );
    write_year(
        dir.path(),
        2019,
        &[
            wide_line("2019", "7440-47-3", "Chromium", block),
            wide_line("2019", "N420", "Lead compounds", block),
        ],
    );

    let registry = SchemaRegistry::embedded().unwrap();
    let output = run_transform(dir.path(), &registry).unwrap();
    let years: Vec<i32> = output.years.iter().map(|y| y.year).collect();
    assert_eq!(years, vec![2019, 2021]);
    assert_eq!(output.years[0].stats.unreported_chemical, 1);

    let batch = output.batch;
    assert_eq!(batch.chemicals.len(), 1);
    assert_eq!(batch.source_reduction_activities.len(), 1);
    let facts: Vec<(i64, i64)> = batch
        .records
        .iter()
        .map(|r| (r.record_id, r.reporting_year))
        .collect();
    assert_eq!(facts, vec![(1, 2019), (2, 2021)]);
}

#[test]
fn every_fact_resolves_to_one_dimension_row() {
    let dir = TempDir::new().unwrap();
    write_year(
        dir.path(),
        2020,
        &[
            wide_line(
                "2020",
                "108-88-3",
                "Toluene",
                [
                    Some(("W13", "a", "T01", "Audit")),
                    Some(("W14", "b", "T02", "Vendor")),
                    Some(("W13", "a", "T02", "Vendor")),
                    None,
                ],
            ),
            wide_line(
                "2020",
                "100-42-5",
                "Styrene",
                [None, Some(("W13", "a", "T01", "Audit")), None, None],
            ),
        ],
    );
    let registry = SchemaRegistry::embedded().unwrap();
    let batch = run_transform(dir.path(), &registry).unwrap().batch;

    assert_eq!(batch.records.len(), 4);
    assert!(batch.dangling_references().is_empty());
    for kind in [
        TableKind::Chemical,
        TableKind::SourceReductionActivity,
        TableKind::Reduction,
    ] {
        assert_eq!(batch.row_count(kind), 2, "{kind}");
    }
    // "100-42-5" < "108-88-3"
    assert_eq!(batch.chemicals[0].tri_chemical_id, "108-88-3");
    assert_eq!(batch.chemicals[0].chemical_id, 2);
}

#[test]
fn rerun_is_identical() {
    let dir = TempDir::new().unwrap();
    write_year(
        dir.path(),
        2020,
        &[wide_line(
            "2020",
            "108-88-3",
            "Toluene",
            [Some(("W13", "a", "T01", "Audit")), None, None, None],
        )],
    );
    let registry = SchemaRegistry::embedded().unwrap();
    let first = run_transform(dir.path(), &registry).unwrap().batch;
    let second = run_transform(dir.path(), &registry).unwrap().batch;
    assert_eq!(first, second);
}

#[test]
fn missing_raw_column_names_the_year() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("US_2a_2020.csv"), "REPORTING YEAR\n2020\n").unwrap();
    let registry = SchemaRegistry::embedded().unwrap();
    let result = run_transform(dir.path(), &registry);
    assert!(matches!(result, Err(TransformError::Ingest { year: 2020, .. })));
}
