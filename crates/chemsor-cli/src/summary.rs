use std::path::{Path, PathBuf};

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use chemsor_cli::pipeline::TransformReport;
use chemsor_model::{StatusCounts, TableKind};
use chemsor_store::LoadSummary;
use chemsor_transform::ReshapeStats;

pub fn print_acquired(paths: &[PathBuf]) {
    println!("Acquired {} yearly file(s):", paths.len());
    for path in paths {
        println!("  {}", path.display());
    }
}

pub fn print_transform_summary(report: &TransformReport) {
    let mut years = Table::new();
    years.set_header(vec![
        header_cell("Year"),
        header_cell("Input rows"),
        header_cell("Unreported"),
        header_cell("No activity"),
        header_cell("Malformed"),
        header_cell("Blocks dropped"),
        header_cell("Long rows"),
    ]);
    apply_summary_table_style(&mut years);
    for index in 1..=6 {
        align_column(&mut years, index, CellAlignment::Right);
    }
    for year in &report.years {
        years.add_row(stats_row(Cell::new(year.year), &year.stats, false));
    }
    years.add_row(stats_row(
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        &report.totals(),
        true,
    ));
    println!("{years}");

    let mut tables = Table::new();
    tables.set_header(vec![header_cell("Table"), header_cell("Rows")]);
    apply_table_style(&mut tables);
    align_column(&mut tables, 1, CellAlignment::Right);
    for kind in TableKind::ALL {
        tables.add_row(vec![
            Cell::new(kind.name()),
            Cell::new(report.batch.row_count(kind)),
        ]);
    }
    println!("{tables}");

    match &report.enrichment {
        Some(counts) => {
            let mut enrichment = Table::new();
            enrichment.set_header(vec![
                header_cell("Lookup"),
                header_cell("Found"),
                header_cell("Absent"),
                header_cell("Unresolved"),
                header_cell("Skipped"),
            ]);
            apply_table_style(&mut enrichment);
            for index in 1..=4 {
                align_column(&mut enrichment, index, CellAlignment::Right);
            }
            enrichment.add_row(status_row("CAS number", &counts.cas));
            enrichment.add_row(status_row("SMILES", &counts.smiles));
            println!("{enrichment}");
        }
        None => println!("Enrichment skipped."),
    }

    if let Some(first) = report.tables.first().and_then(|path| path.parent()) {
        println!("Tables: {}", first.display());
    }
}

pub fn print_load_summary(summary: &LoadSummary, database: &Path) {
    println!(
        "Loaded {} dimension and {} record rows into {} ({} tables).",
        summary.dimension_rows(),
        summary.fact_rows(),
        database.display(),
        summary.tables.len()
    );
}

fn stats_row(label: Cell, stats: &ReshapeStats, bold: bool) -> Vec<Cell> {
    let cell = |value: usize| {
        let cell = Cell::new(value);
        if bold {
            cell.add_attribute(Attribute::Bold)
        } else {
            cell
        }
    };
    vec![
        label,
        cell(stats.input_rows),
        dropped_cell(stats.unreported_chemical),
        dropped_cell(stats.no_reduction_activity),
        dropped_cell(stats.malformed),
        dropped_cell(stats.blocks_dropped),
        cell(stats.long_rows),
    ]
}

fn status_row(label: &str, counts: &StatusCounts) -> Vec<Cell> {
    vec![
        Cell::new(label),
        Cell::new(counts.found).fg(Color::Green),
        dim_cell(counts.absent),
        count_cell(counts.unresolved, Color::Red),
        dim_cell(counts.skipped),
    ]
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value.to_string()).fg(Color::DarkGrey)
}

fn dropped_cell(count: usize) -> Cell {
    count_cell(count, Color::Yellow)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}
