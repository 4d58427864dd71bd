//! End-to-end runs over a small raw directory with mocked lookup services.

use std::fs;
use std::path::Path;

use chemsor_cli::pipeline::Pipeline;
use chemsor_enrich::{RegistryNumberSource, Resolver, Result, RetryPolicy, StructureSource};
use chemsor_model::{LookupStatus, TableBatch, TableKind};
use chemsor_schema::{SchemaRegistry, Settings};
use chemsor_store::{SqliteStore, table_path};

struct Registry;

impl RegistryNumberSource for Registry {
    fn registry_number(
        &self,
        alternative_id: &str,
        _substance_name: &str,
    ) -> Result<Option<String>> {
        Ok(match alternative_id {
            "0000050000" => Some("50-00-0".to_string()),
            "0000108883" => Some("108-88-3".to_string()),
            _ => None,
        })
    }
}

/// Knows formaldehyde only.
struct Primary;

impl StructureSource for Primary {
    fn name(&self) -> &'static str {
        "primary"
    }

    fn structure(&self, registry_number: &str) -> Result<Option<String>> {
        Ok((registry_number == "50-00-0").then(|| "C=O".to_string()))
    }
}

/// Knows toluene only.
struct Secondary;

impl StructureSource for Secondary {
    fn name(&self) -> &'static str {
        "secondary"
    }

    fn structure(&self, registry_number: &str) -> Result<Option<String>> {
        Ok((registry_number == "108-88-3").then(|| "CC1=CC=CC=C1".to_string()))
    }
}

fn resolver() -> Resolver {
    Resolver::new(
        Box::new(Registry),
        Box::new(Primary),
        Box::new(Secondary),
        RetryPolicy::immediate(2),
        3,
    )
}

/// One wide row: scalars, then up to four (code, activity, method code, method) blocks.
fn wide_row(scalars: [&str; 8], blocks: &[[&str; 4]]) -> String {
    let mut cells: Vec<String> = scalars.iter().map(|v| (*v).to_string()).collect();
    for index in 0..4 {
        match blocks.get(index) {
            Some(block) => cells.extend(block.iter().map(|v| (*v).to_string())),
            None => cells.extend(std::iter::repeat_n(String::new(), 4)),
        }
    }
    cells.join(",")
}

fn write_year(raw_dir: &Path, registry: &SchemaRegistry, year: i32, rows: &[String]) {
    let mut contents = registry.raw_columns().join(",");
    contents.push('\n');
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    fs::write(raw_dir.join(format!("US_2a_{year}.csv")), contents).unwrap();
}

fn seed_raw_dir(raw_dir: &Path, registry: &SchemaRegistry) {
    fs::create_dir_all(raw_dir).unwrap();
    let formaldehyde = |year| {
        [year, "325110", "0000050000", "Formaldehyde", "NO", "YES", "NO", "NO"]
    };
    write_year(
        raw_dir,
        registry,
        2019,
        &[wide_row(
            formaldehyde("2019"),
            &[["S01", "IMPROVED MAINTENANCE", "T01", "internal audit"]],
        )],
    );
    write_year(
        raw_dir,
        registry,
        2020,
        &[
            wide_row(
                formaldehyde("2020"),
                &[
                    ["S02", "Changed catalyst", "T02", "Vendor assistance"],
                    ["S01", "improved maintenance", "T01", "Internal audit"],
                ],
            ),
            wide_row(
                ["2020", "324110", "0000108883", "Toluene", "NO", "NO", "NO", "NO"],
                &[["S01", "Improved maintenance", "T01", "Internal audit"]],
            ),
            wide_row(
                ["2020", "331410", "N982", "Zinc compounds", "NO", "NO", "NO", "YES"],
                &[["S03", "Recycling", "T01", "Internal audit"]],
            ),
        ],
    );
}

/// The batch with every table in identifier order, as the database returns it.
fn by_id(mut batch: TableBatch) -> TableBatch {
    batch.chemicals.sort_by_key(|c| c.chemical_id);
    batch
        .source_reduction_activities
        .sort_by_key(|a| a.source_reduction_activity_id);
    batch.reductions.sort_by_key(|r| r.reduction_id);
    batch.records.sort_by_key(|r| r.record_id);
    batch
}

fn pipeline(root: &Path, transformed: &str) -> Pipeline {
    let registry = SchemaRegistry::embedded().unwrap();
    let mut settings = Settings::default();
    settings.paths.raw_dir = root.join("raw");
    settings.paths.transformed_dir = root.join(transformed);
    settings.paths.database = root.join(transformed).join("chemsor.db");
    Pipeline::with_registry(settings, registry)
}

#[test]
fn transform_enrich_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path(), "out");
    seed_raw_dir(&pipeline.settings().paths.raw_dir, pipeline.registry());

    let resolver = resolver();
    let report = pipeline.transform(Some(&resolver), &()).unwrap();

    assert_eq!(report.years.len(), 2);
    let totals = report.totals();
    assert_eq!(totals.input_rows, 4);
    assert_eq!(totals.unreported_chemical, 1);
    assert_eq!(totals.long_rows, 4);

    let batch = &report.batch;
    assert_eq!(batch.row_count(TableKind::Chemical), 2);
    assert_eq!(batch.row_count(TableKind::Record), 4);
    assert!(batch.dangling_references().is_empty());

    let formaldehyde = &batch.chemicals[0];
    assert_eq!(formaldehyde.tri_chemical_id, "0000050000");
    assert_eq!(formaldehyde.smiles.as_deref(), Some("C=O"));
    let toluene = &batch.chemicals[1];
    assert_eq!(toluene.cas_number.as_deref(), Some("108-88-3"));
    assert_eq!(toluene.smiles.as_deref(), Some("CC1=CC=CC=C1"));
    assert_eq!(toluene.smiles_status, LookupStatus::Found);

    let counts = report.enrichment.unwrap();
    assert_eq!(counts.cas.found, 2);
    assert_eq!(counts.smiles.found, 2);

    let summary = pipeline.load().unwrap();
    assert_eq!(summary.tables.len(), 4);
    let store = SqliteStore::open(&pipeline.settings().paths.database).unwrap();
    assert_eq!(store.read_batch().unwrap(), by_id(report.batch));
}

#[test]
fn reruns_write_identical_tables() {
    let dir = tempfile::tempdir().unwrap();
    let first = pipeline(dir.path(), "first");
    let second = pipeline(dir.path(), "second");
    seed_raw_dir(&first.settings().paths.raw_dir, first.registry());

    first.transform(Some(&resolver()), &()).unwrap();
    second.transform(Some(&resolver()), &()).unwrap();

    for kind in TableKind::ALL {
        let a = fs::read(table_path(&first.settings().paths.transformed_dir, kind)).unwrap();
        let b = fs::read(table_path(&second.settings().paths.transformed_dir, kind)).unwrap();
        assert_eq!(a, b, "{kind} differs between runs");
    }
}

#[test]
fn reload_leaves_identical_database() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path(), "out");
    seed_raw_dir(&pipeline.settings().paths.raw_dir, pipeline.registry());
    pipeline.transform(None, &()).unwrap();

    pipeline.load().unwrap();
    let first = SqliteStore::open(&pipeline.settings().paths.database)
        .unwrap()
        .read_batch()
        .unwrap();
    pipeline.load().unwrap();
    let second = SqliteStore::open(&pipeline.settings().paths.database)
        .unwrap()
        .read_batch()
        .unwrap();
    assert_eq!(first, second);
    assert!(
        first
            .chemicals
            .iter()
            .all(|c| c.cas_status == LookupStatus::Skipped && c.cas_number.is_none())
    );
}
