//! Yearly file discovery in the raw directory.

use std::path::{Path, PathBuf};

use chemsor_schema::SchemaRegistry;
use tracing::debug;

use crate::error::{IngestError, Result};

/// A raw wide table for one reporting year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearFile {
    pub year: i32,
    pub path: PathBuf,
}

/// Lists the files in `dir` whose names match the registry's file pattern.
///
/// Returns files sorted by ascending year.
pub fn discover_year_files(dir: &Path, registry: &SchemaRegistry) -> Result<Vec<YearFile>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match registry.year_from_file_name(name) {
            Some(year) => files.push(YearFile { year, path }),
            None => debug!(file = name, "skipping file outside the year pattern"),
        }
    }

    files.sort_by(|a, b| a.year.cmp(&b.year).then_with(|| a.path.cmp(&b.path)));
    Ok(files)
}
