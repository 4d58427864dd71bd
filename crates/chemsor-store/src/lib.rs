#![deny(unsafe_code)]

//! Persistence for ChemSoR batches: CSV hand-off files and SQLite.

mod error;
mod handoff;
mod sqlite;

pub use error::{Result, StoreError};
pub use handoff::{read_tables, table_header, table_path, write_tables};
pub use sqlite::{LoadSummary, SqliteStore};
