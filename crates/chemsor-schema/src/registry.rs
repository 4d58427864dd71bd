#![deny(unsafe_code)]

//! Schema registry: raw→canonical column mapping and output table declarations.
//!
//! The registry is plain data. The reshaper reads the column mapping, the
//! deduplicator reads the table declarations, and persistence uses the table
//! order. Everything is validated once at load time so configuration faults
//! surface before any row is processed.

use std::collections::BTreeSet;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use chemsor_model::{LONG_COLUMNS, TableKind, long_column};

use crate::error::{Result, SchemaError};

const REGISTRY_SCHEMA: &str = "chemsor.schema-registry";
const REGISTRY_SCHEMA_VERSION: u32 = 1;
const BLOCK_PLACEHOLDER: &str = "{n}";
const EMBEDDED_SCHEMA: &str = include_str!("../data/schema.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryFile {
    registry: RegistryHeader,
    wide: WideSection,
    tables: Vec<TableSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryHeader {
    schema: String,
    schema_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WideSection {
    file_pattern: String,
    #[serde(default = "default_not_reported_prefix")]
    not_reported_prefix: String,
    #[serde(default = "default_block_count")]
    block_count: usize,
    scalar: Vec<ColumnMapping>,
    block: Vec<ColumnMapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TableSection {
    name: String,
    id: String,
    grouping: Vec<String>,
    columns: Vec<String>,
}

fn default_not_reported_prefix() -> String {
    "N".to_string()
}

fn default_block_count() -> usize {
    4
}

/// One raw source column and the canonical long-form name it becomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub raw: String,
    pub canonical: String,
}

/// Declaration of one output table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub kind: TableKind,
    /// Surrogate identifier column assigned over `grouping`.
    pub id: String,
    /// Natural key columns.
    pub grouping: Vec<String>,
    /// Projected output columns (includes `id`).
    pub columns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    file_pattern: Regex,
    not_reported_prefix: String,
    scalars: Vec<ColumnMapping>,
    blocks: Vec<Vec<ColumnMapping>>,
    tables: Vec<TableSpec>,
}

impl SchemaRegistry {
    /// The registry compiled into the binary.
    pub fn embedded() -> Result<Self> {
        Self::from_toml_str(EMBEDDED_SCHEMA)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SchemaError::io(path, e))?;
        let file: RegistryFile = toml::from_str(&contents).map_err(|e| SchemaError::Toml {
            path: path.to_path_buf(),
            source: e,
        })?;
        let registry = Self::from_file(file)?;
        debug!(path = %path.display(), tables = registry.tables.len(), "loaded schema registry");
        Ok(registry)
    }

    /// Load from `path` when given, otherwise fall back to the embedded registry.
    pub fn load_or_embedded(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::embedded(),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: RegistryFile = toml::from_str(contents).map_err(|e| SchemaError::Toml {
            path: "<embedded>".into(),
            source: e,
        })?;
        Self::from_file(file)
    }

    fn from_file(file: RegistryFile) -> Result<Self> {
        validate_header(&file.registry)?;
        let file_pattern = compile_file_pattern(&file.wide.file_pattern)?;
        if file.wide.not_reported_prefix.is_empty() {
            return Err(SchemaError::invalid("not_reported_prefix must not be empty"));
        }
        if file.wide.block_count == 0 {
            return Err(SchemaError::invalid("block_count must be at least 1"));
        }

        validate_mappings(&file.wide.scalar, false)?;
        validate_mappings(&file.wide.block, true)?;
        let mapped: BTreeSet<&str> = file
            .wide
            .scalar
            .iter()
            .chain(&file.wide.block)
            .map(|m| m.canonical.as_str())
            .collect();
        for column in LONG_COLUMNS {
            if !mapped.contains(column.name) {
                return Err(SchemaError::invalid(format!(
                    "no raw column mapped to '{}'",
                    column.name
                )));
            }
        }

        let blocks = expand_blocks(&file.wide.block, file.wide.block_count)?;
        let tables = validate_tables(&file.tables)?;

        Ok(Self {
            file_pattern,
            not_reported_prefix: file.wide.not_reported_prefix,
            scalars: file.wide.scalar,
            blocks,
            tables,
        })
    }

    pub fn file_pattern(&self) -> &Regex {
        &self.file_pattern
    }

    /// Extract the reporting year from a raw file name matching the pattern.
    pub fn year_from_file_name(&self, file_name: &str) -> Option<i32> {
        self.file_pattern
            .captures(file_name)?
            .name("year")?
            .as_str()
            .parse()
            .ok()
    }

    pub fn not_reported_prefix(&self) -> &str {
        &self.not_reported_prefix
    }

    pub fn scalars(&self) -> &[ColumnMapping] {
        &self.scalars
    }

    /// Repeating blocks with `{n}` already expanded, in block order.
    pub fn blocks(&self) -> &[Vec<ColumnMapping>] {
        &self.blocks
    }

    /// Raw column name of `canonical` within `scalars` or the given block.
    pub fn raw_name<'a>(mappings: &'a [ColumnMapping], canonical: &str) -> Option<&'a str> {
        mappings
            .iter()
            .find(|m| m.canonical == canonical)
            .map(|m| m.raw.as_str())
    }

    /// Every raw column the reshaper reads, scalars first then blocks.
    pub fn raw_columns(&self) -> Vec<&str> {
        self.scalars
            .iter()
            .chain(self.blocks.iter().flatten())
            .map(|m| m.raw.as_str())
            .collect()
    }

    /// Tables in identifier-assignment order.
    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    pub fn table(&self, kind: TableKind) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.kind == kind)
    }
}

fn validate_header(header: &RegistryHeader) -> Result<()> {
    if header.schema != REGISTRY_SCHEMA {
        return Err(SchemaError::invalid(format!(
            "unsupported schema: {}",
            header.schema
        )));
    }
    if header.schema_version != REGISTRY_SCHEMA_VERSION {
        return Err(SchemaError::invalid(format!(
            "unsupported schema_version: {}",
            header.schema_version
        )));
    }
    Ok(())
}

fn compile_file_pattern(pattern: &str) -> Result<Regex> {
    let regex = Regex::new(pattern).map_err(|e| SchemaError::FilePattern {
        pattern: pattern.to_string(),
        source: e,
    })?;
    if !regex.capture_names().flatten().any(|name| name == "year") {
        return Err(SchemaError::invalid(format!(
            "file_pattern '{pattern}' has no named 'year' group"
        )));
    }
    Ok(regex)
}

fn validate_mappings(mappings: &[ColumnMapping], repeating: bool) -> Result<()> {
    let mut seen = BTreeSet::new();
    for mapping in mappings {
        let column = long_column(&mapping.canonical).map_err(|_| {
            SchemaError::invalid(format!(
                "unknown canonical column '{}'",
                mapping.canonical
            ))
        })?;
        if column.repeating != repeating {
            let section = if repeating { "block" } else { "scalar" };
            return Err(SchemaError::invalid(format!(
                "'{}' cannot be mapped in the {section} section",
                mapping.canonical
            )));
        }
        if repeating && !mapping.raw.contains(BLOCK_PLACEHOLDER) {
            return Err(SchemaError::invalid(format!(
                "block column '{}' lacks the {BLOCK_PLACEHOLDER} placeholder",
                mapping.raw
            )));
        }
        if !seen.insert(mapping.canonical.as_str()) {
            return Err(SchemaError::invalid(format!(
                "'{}' mapped more than once",
                mapping.canonical
            )));
        }
    }
    Ok(())
}

fn expand_blocks(template: &[ColumnMapping], count: usize) -> Result<Vec<Vec<ColumnMapping>>> {
    let blocks: Vec<Vec<ColumnMapping>> = (1..=count)
        .map(|n| {
            template
                .iter()
                .map(|m| ColumnMapping {
                    raw: m.raw.replace(BLOCK_PLACEHOLDER, &n.to_string()),
                    canonical: m.canonical.clone(),
                })
                .collect()
        })
        .collect();
    let mut raw = BTreeSet::new();
    for mapping in blocks.iter().flatten() {
        if !raw.insert(mapping.raw.as_str()) {
            return Err(SchemaError::invalid(format!(
                "raw block column '{}' is not unique",
                mapping.raw
            )));
        }
    }
    Ok(blocks)
}

fn validate_tables(sections: &[TableSection]) -> Result<Vec<TableSpec>> {
    let mut tables: Vec<TableSpec> = Vec::with_capacity(sections.len());
    // Long-form columns plus identifiers assigned by earlier tables.
    let mut available: BTreeSet<String> =
        LONG_COLUMNS.iter().map(|c| c.name.to_string()).collect();

    for section in sections {
        let kind = section
            .name
            .parse::<TableKind>()
            .map_err(|e| SchemaError::invalid(e.to_string()))?;
        if tables.iter().any(|t| t.kind == kind) {
            return Err(SchemaError::DuplicateTable {
                table: section.name.clone(),
            });
        }
        if section.grouping.is_empty() {
            return Err(SchemaError::invalid(format!(
                "table '{}' has an empty grouping key",
                section.name
            )));
        }
        if available.contains(&section.id) {
            return Err(SchemaError::invalid(format!(
                "identifier '{}' of table '{}' collides with an existing column",
                section.id, section.name
            )));
        }
        for column in &section.grouping {
            if !available.contains(column) {
                return Err(SchemaError::UnknownColumn {
                    table: section.name.clone(),
                    column: column.clone(),
                });
            }
        }
        if !section.columns.contains(&section.id) {
            return Err(SchemaError::invalid(format!(
                "table '{}' does not project its identifier '{}'",
                section.name, section.id
            )));
        }
        for column in &section.columns {
            if column != &section.id && !available.contains(column) {
                return Err(SchemaError::UnknownColumn {
                    table: section.name.clone(),
                    column: column.clone(),
                });
            }
        }
        for required in kind.required_columns() {
            if !section.columns.iter().any(|c| c == required) {
                return Err(SchemaError::invalid(format!(
                    "table '{}' must project column '{required}'",
                    section.name
                )));
            }
        }

        available.insert(section.id.clone());
        tables.push(TableSpec {
            kind,
            id: section.id.clone(),
            grouping: section.grouping.clone(),
            columns: section.columns.clone(),
        });
    }

    for kind in TableKind::ALL {
        if !tables.iter().any(|t| t.kind == kind) {
            return Err(SchemaError::MissingTable {
                table: kind.name().to_string(),
            });
        }
    }
    Ok(tables)
}
