use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::Table;

use chemsor_cli::pipeline::{Pipeline, TransformReport, load_settings};
use chemsor_schema::Settings;

use crate::cli::{AcquireArgs, EnrichArgs, PathArgs, RunArgs, TransformArgs};
use crate::progress::EnrichBar;
use crate::summary::{
    apply_table_style, print_acquired, print_load_summary, print_transform_summary,
};

fn settings_for(
    config: Option<&Path>,
    paths: &PathArgs,
    enrich: Option<&EnrichArgs>,
) -> Result<Settings> {
    let mut settings = load_settings(config)?;
    if let Some(dir) = &paths.raw_dir {
        settings.paths.raw_dir = dir.clone();
    }
    if let Some(dir) = &paths.transformed_dir {
        settings.paths.transformed_dir = dir.clone();
    }
    if let Some(path) = &paths.database {
        settings.paths.database = path.clone();
    }
    if let Some(enrich) = enrich {
        if enrich.no_enrich {
            settings.enrichment.enabled = false;
        }
        if let Some(workers) = enrich.workers {
            settings.enrichment.workers = workers;
        }
    }
    settings.validate().context("invalid settings")?;
    Ok(settings)
}

fn transform(pipeline: &Pipeline) -> Result<TransformReport> {
    let resolver = pipeline.resolver()?;
    let bar = EnrichBar::for_stderr();
    let report = pipeline.transform(resolver.as_ref(), &bar);
    bar.finish();
    report
}

pub fn run_all(config: Option<&Path>, args: &RunArgs) -> Result<()> {
    let pipeline = Pipeline::new(settings_for(config, &args.paths, Some(&args.enrich))?)?;
    if !args.skip_acquire {
        let written = pipeline.acquire(&args.years)?;
        print_acquired(&written);
    }
    let report = transform(&pipeline)?;
    let loaded = pipeline.load_batch(&report.batch)?;
    print_transform_summary(&report);
    print_load_summary(&loaded, &pipeline.settings().paths.database);
    Ok(())
}

pub fn run_acquire(config: Option<&Path>, args: &AcquireArgs) -> Result<()> {
    let pipeline = Pipeline::new(settings_for(config, &args.paths, None)?)?;
    let written = pipeline.acquire(&args.years)?;
    print_acquired(&written);
    Ok(())
}

pub fn run_transform(config: Option<&Path>, args: &TransformArgs) -> Result<()> {
    let pipeline = Pipeline::new(settings_for(config, &args.paths, Some(&args.enrich))?)?;
    let report = transform(&pipeline)?;
    print_transform_summary(&report);
    Ok(())
}

pub fn run_load(config: Option<&Path>, args: &PathArgs) -> Result<()> {
    let pipeline = Pipeline::new(settings_for(config, args, None)?)?;
    let loaded = pipeline.load()?;
    print_load_summary(&loaded, &pipeline.settings().paths.database);
    Ok(())
}

pub fn run_schema(config: Option<&Path>) -> Result<()> {
    let pipeline = Pipeline::new(settings_for(config, &PathArgs::default(), None)?)?;
    let mut table = Table::new();
    table.set_header(vec!["Table", "Identifier", "Grouping key", "Columns"]);
    apply_table_style(&mut table);
    for spec in pipeline.registry().tables() {
        table.add_row(vec![
            spec.kind.to_string(),
            spec.id.clone(),
            spec.grouping.join(", "),
            spec.columns.join(", "),
        ]);
    }
    println!("{table}");
    Ok(())
}
