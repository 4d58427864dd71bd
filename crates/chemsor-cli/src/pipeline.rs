//! Stage orchestration shared by the subcommands.
//!
//! `acquire` fills the raw directory, `transform` turns it into the four CSV
//! tables (optionally enriching chemicals on the way), and `load` replaces the
//! SQLite database with the CSV contents.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::{info, info_span, warn};

use chemsor_enrich::{EnrichProgress, Resolver};
use chemsor_ingest::{Acquirer, ArchiveLink};
use chemsor_model::{EnrichmentCounts, TableBatch};
use chemsor_schema::{DEFAULT_CONFIG_FILE, SchemaRegistry, Settings};
use chemsor_store::{LoadSummary, SqliteStore, read_tables, write_tables};
use chemsor_transform::{ReshapeStats, YearSummary, run_transform};

/// Settings from `config`, or from `chemsor.toml` in the working directory
/// when it exists. An explicitly named file must exist.
pub fn load_settings(config: Option<&Path>) -> Result<Settings> {
    match config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("load settings from {}", path.display())),
        None => Settings::load_or_default(Path::new(DEFAULT_CONFIG_FILE))
            .context("load default settings"),
    }
}

/// Outcome of the transform stage.
#[derive(Debug, Clone)]
pub struct TransformReport {
    pub years: Vec<YearSummary>,
    pub batch: TableBatch,
    /// `None` when enrichment was skipped.
    pub enrichment: Option<EnrichmentCounts>,
    pub tables: Vec<PathBuf>,
}

impl TransformReport {
    pub fn totals(&self) -> ReshapeStats {
        let mut totals = ReshapeStats::default();
        for year in &self.years {
            totals.merge(&year.stats);
        }
        totals
    }
}

pub struct Pipeline {
    settings: Settings,
    registry: SchemaRegistry,
}

impl Pipeline {
    /// Builds the pipeline, loading the registry named in the settings.
    pub fn new(settings: Settings) -> Result<Self> {
        let registry = SchemaRegistry::load_or_embedded(settings.schema.path.as_deref())
            .context("load schema registry")?;
        Ok(Self { settings, registry })
    }

    pub fn with_registry(settings: Settings, registry: SchemaRegistry) -> Self {
        Self { settings, registry }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Resolver over the configured services, or `None` when disabled.
    pub fn resolver(&self) -> Result<Option<Resolver>> {
        if !self.settings.enrichment.enabled {
            return Ok(None);
        }
        let resolver = Resolver::from_settings(&self.settings.enrichment)
            .context("build enrichment clients")?;
        Ok(Some(resolver))
    }

    /// Downloads every advertised year (or only `years` when non-empty).
    pub fn acquire(&self, years: &[i32]) -> Result<Vec<PathBuf>> {
        let span = info_span!("acquire");
        let _guard = span.enter();
        let start = Instant::now();

        let acquirer = Acquirer::new(
            &self.settings.acquisition,
            &self.settings.enrichment.user_agent,
        )
        .context("prepare acquisition")?;
        let links: Vec<ArchiveLink> = acquirer
            .archive_links()
            .context("read archive index")?
            .into_iter()
            .filter(|link| years.is_empty() || years.contains(&link.year))
            .collect();
        if links.is_empty() {
            bail!("no yearly archives matched on {}", self.settings.acquisition.index_url);
        }
        for year in years {
            if !links.iter().any(|link| link.year == *year) {
                warn!(year, "year not advertised on the archive index");
            }
        }

        let raw_dir = &self.settings.paths.raw_dir;
        let mut written = Vec::with_capacity(links.len());
        for link in &links {
            let path = acquirer
                .acquire_year(link, raw_dir)
                .with_context(|| format!("acquire {} from {}", link.year, link.url))?;
            written.push(path);
        }
        info!(
            files = written.len(),
            raw_dir = %raw_dir.display(),
            duration_ms = start.elapsed().as_millis(),
            "acquisition complete"
        );
        Ok(written)
    }

    /// Raw directory to CSV tables, enriching chemicals when a resolver is given.
    pub fn transform(
        &self,
        resolver: Option<&Resolver>,
        progress: &dyn EnrichProgress,
    ) -> Result<TransformReport> {
        let raw_dir = &self.settings.paths.raw_dir;
        let output = run_transform(raw_dir, &self.registry)
            .with_context(|| format!("transform {}", raw_dir.display()))?;
        if output.years.is_empty() {
            warn!(raw_dir = %raw_dir.display(), "no yearly files found");
        }

        let mut batch = output.batch;
        let enrichment = resolver.map(|resolver| {
            resolver.enrich_with_progress(&mut batch.chemicals, progress);
            batch.enrichment_counts()
        });

        let transformed_dir = &self.settings.paths.transformed_dir;
        let tables = write_tables(transformed_dir, &batch)
            .with_context(|| format!("write tables to {}", transformed_dir.display()))?;
        info!(
            tables = tables.len(),
            transformed_dir = %transformed_dir.display(),
            "tables written"
        );

        Ok(TransformReport {
            years: output.years,
            batch,
            enrichment,
            tables,
        })
    }

    /// Replaces the database with the CSV tables in the transformed directory.
    pub fn load(&self) -> Result<LoadSummary> {
        let transformed_dir = &self.settings.paths.transformed_dir;
        let batch = read_tables(transformed_dir)
            .with_context(|| format!("read tables from {}", transformed_dir.display()))?;
        self.load_batch(&batch)
    }

    pub fn load_batch(&self, batch: &TableBatch) -> Result<LoadSummary> {
        let database = &self.settings.paths.database;
        let mut store = SqliteStore::open(database)
            .with_context(|| format!("open database {}", database.display()))?;
        store
            .replace(&self.registry, batch)
            .with_context(|| format!("load database {}", database.display()))
    }
}
