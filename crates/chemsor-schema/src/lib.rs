#![deny(unsafe_code)]

//! Schema registry and pipeline settings for ChemSoR.

pub mod error;
pub mod registry;
pub mod settings;

pub use error::{Result, SchemaError};
pub use registry::{ColumnMapping, SchemaRegistry, TableSpec};
pub use settings::{
    AcquisitionSettings, DEFAULT_CONFIG_FILE, EnrichmentSettings, PathSettings, SchemaSettings,
    Settings,
};
