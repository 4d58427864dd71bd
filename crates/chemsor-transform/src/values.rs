//! Cell access and value normalization helpers.

use polars::prelude::*;

/// Reads column `name` as strings, casting non-string columns.
pub(crate) fn string_column(df: &DataFrame, name: &str) -> PolarsResult<StringChunked> {
    let column = df.column(name)?;
    let cast = column.cast(&DataType::String)?;
    Ok(cast.str()?.clone())
}

/// A present, non-blank cell value; blank cells count as null.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parses an integer cell, accepting an integral float rendering such as `325110.0`.
pub fn parse_integer(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = trimmed.parse::<i64>() {
        return Some(parsed);
    }
    let float = trimmed.parse::<f64>().ok()?;
    if float.is_finite() && float.fract() == 0.0 && float.abs() < 9.0e15 {
        Some(float as i64)
    } else {
        None
    }
}

/// Upper-cases the first character and lower-cases the rest.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
