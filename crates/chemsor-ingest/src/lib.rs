//! TRI source ingestion.
//!
//! - **Acquisition**: scrape the archive index, download yearly zips and
//!   rewrite the Latin-1 tab files as UTF-8 CSV
//! - **Discovery**: find the per-year wide tables in the raw directory
//! - **Wide loading**: read a year's table into a string-typed DataFrame

mod acquire;
mod discovery;
mod error;
mod wide;

// === Error Types ===
pub use error::{IngestError, Result};

// === Acquisition ===
pub use acquire::{
    Acquirer, ArchiveLink, convert_tab_file, extract_member, read_column_names,
    scrape_archive_links,
};

// === File Discovery ===
pub use discovery::{YearFile, discover_year_files};

// === Wide Loading ===
pub use wide::read_wide_table;
