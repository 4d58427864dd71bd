//! Wide CSV loading.

use std::path::Path;

use polars::prelude::*;
use tracing::debug;

use crate::error::{IngestError, Result};

/// Reads one year's wide table, keeping only `raw_columns` in that order.
///
/// Every column is read as a string; typing happens at the reshaper's parse
/// boundary so malformed cells drop one row instead of failing the file.
pub fn read_wide_table(path: &Path, raw_columns: &[&str]) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .finish()
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let present: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
    if let Some(missing) = raw_columns.iter().find(|c| !present.contains(c)) {
        return Err(IngestError::MissingColumn {
            column: (*missing).to_string(),
            path: path.to_path_buf(),
        });
    }

    let selected = df.select(raw_columns.iter().copied())?;
    debug!(
        path = %path.display(),
        rows = selected.height(),
        columns = selected.width(),
        "read wide table"
    );
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn selects_requested_columns_as_strings() {
        let file = create_temp_csv("A,B,C\n1,x,3\n,y,6\n");
        let df = read_wide_table(file.path(), &["C", "A"]).unwrap();

        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["C", "A"]);
        let a = df.column("A").unwrap().str().unwrap();
        assert_eq!(a.get(0), Some("1"));
        assert_eq!(a.get(1), None);
    }

    #[test]
    fn missing_column_reported() {
        let file = create_temp_csv("A,B\n1,2\n");
        let result = read_wide_table(file.path(), &["A", "Z"]);
        assert!(matches!(
            result,
            Err(IngestError::MissingColumn { ref column, .. }) if column == "Z"
        ));
    }
}
