//! Pipeline settings (`chemsor.toml`).
//!
//! Every field has a default, so an absent file or an empty table is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SchemaError};

pub const DEFAULT_CONFIG_FILE: &str = "chemsor.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub paths: PathSettings,
    pub schema: SchemaSettings,
    pub enrichment: EnrichmentSettings,
    pub acquisition: AcquisitionSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathSettings {
    /// Directory holding the per-year wide CSV files.
    pub raw_dir: PathBuf,
    /// Directory receiving the emitted CSV tables.
    pub transformed_dir: PathBuf,
    pub database: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            transformed_dir: PathBuf::from("data/transformed"),
            database: PathBuf::from("data/transformed/ChemSoR_database.db"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaSettings {
    /// Registry file; the embedded registry is used when unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnrichmentSettings {
    pub enabled: bool,
    pub workers: usize,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub srs_url: String,
    pub pubchem_url: String,
    pub nlm_url: String,
    pub user_agent: String,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            workers: 8,
            timeout_secs: 30,
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            srs_url: "https://cdxapp.epa.gov/oms-substance-registry-services/rest-api".to_string(),
            pubchem_url: "https://pubchem.ncbi.nlm.nih.gov/rest/pug".to_string(),
            nlm_url: "https://chem.nlm.nih.gov/api".to_string(),
            user_agent: concat!("chemsor/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl EnrichmentSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AcquisitionSettings {
    /// Page listing the yearly `US_<year>.zip` archives.
    pub index_url: String,
    /// Pattern matching archive links; must capture `year`.
    pub archive_pattern: String,
    /// Archive member to extract; `{year}` is substituted.
    pub member_template: String,
    /// Output file name; `{year}` is substituted.
    pub output_template: String,
    /// One raw column name per line; the tab file is truncated to this many columns.
    pub columns_file: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            index_url: "https://www.epa.gov/toxics-release-inventory-tri-program/tri-basic-plus-data-files-calendar-years-1987-present".to_string(),
            archive_pattern: r"https://[^\s'\x22<>]*/US_(?P<year>[0-9]{4})\.zip".to_string(),
            member_template: "US_2a_{year}.txt".to_string(),
            output_template: "US_2a_{year}.csv".to_string(),
            columns_file: None,
            timeout_secs: 300,
        }
    }
}

impl AcquisitionSettings {
    pub fn member_name(&self, year: i32) -> String {
        self.member_template.replace("{year}", &year.to_string())
    }

    pub fn output_name(&self, year: i32) -> String {
        self.output_template.replace("{year}", &year.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SchemaError::io(path, e))?;
        let settings: Settings = toml::from_str(&contents).map_err(|e| SchemaError::Toml {
            path: path.to_path_buf(),
            source: e,
        })?;
        settings.validate()?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Load `path` if it exists; defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.is_file() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "settings file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        let enrichment = &self.enrichment;
        if enrichment.workers == 0 {
            return Err(invalid("enrichment.workers must be at least 1"));
        }
        if enrichment.max_attempts == 0 {
            return Err(invalid("enrichment.max_attempts must be at least 1"));
        }
        if enrichment.timeout_secs == 0 {
            return Err(invalid("enrichment.timeout_secs must be at least 1"));
        }
        if enrichment.base_delay_ms > enrichment.max_delay_ms {
            return Err(invalid(
                "enrichment.base_delay_ms must not exceed enrichment.max_delay_ms",
            ));
        }
        if !self.acquisition.member_template.contains("{year}")
            || !self.acquisition.output_template.contains("{year}")
        {
            return Err(invalid(
                "acquisition templates must contain the {year} placeholder",
            ));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> SchemaError {
    SchemaError::InvalidSettings {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.enrichment.workers, 8);
        assert!(settings.enrichment.enabled);
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [paths]
            raw_dir = "input"

            [enrichment]
            enabled = false
            workers = 2
            "#,
        )
        .unwrap();
        assert_eq!(settings.paths.raw_dir, PathBuf::from("input"));
        assert_eq!(
            settings.paths.transformed_dir,
            PathBuf::from("data/transformed")
        );
        assert!(!settings.enrichment.enabled);
        assert_eq!(settings.enrichment.workers, 2);
        assert_eq!(settings.enrichment.max_attempts, 3);
    }

    #[test]
    fn unknown_keys_rejected() {
        let result: std::result::Result<Settings, _> = toml::from_str("[paths]\nraw = \"x\"");
        assert!(result.is_err());
    }

    #[test]
    fn zero_workers_invalid() {
        let mut settings = Settings::default();
        settings.enrichment.workers = 0;
        assert!(matches!(
            settings.validate(),
            Err(SchemaError::InvalidSettings { .. })
        ));
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_or_default(&dir.path().join("chemsor.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn acquisition_names_substitute_year() {
        let acquisition = AcquisitionSettings::default();
        assert_eq!(acquisition.member_name(2021), "US_2a_2021.txt");
        assert_eq!(acquisition.output_name(2021), "US_2a_2021.csv");
    }
}
