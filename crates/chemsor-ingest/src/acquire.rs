//! Acquisition of the yearly TRI 2a files.
//!
//! The archive index page links one `US_<year>.zip` per reporting year. Each
//! archive holds a Latin-1, tab-separated `US_2a_<year>.txt`. The member is
//! extracted in memory and rewritten as a UTF-8 CSV in the raw directory, so
//! no intermediate text file is left behind.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use chemsor_schema::AcquisitionSettings;
use encoding_rs::WINDOWS_1252;
use regex::Regex;
use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::error::{IngestError, Result};

/// One yearly archive advertised on the index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLink {
    pub year: i32,
    pub url: String,
}

/// Collects archive links from the index page, one per year.
///
/// A later link for the same year replaces an earlier one. Links come back
/// in ascending year order.
pub fn scrape_archive_links(html: &str, pattern: &Regex) -> Vec<ArchiveLink> {
    let mut by_year = BTreeMap::new();
    for captures in pattern.captures_iter(html) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let Some(year) = captures
            .name("year")
            .and_then(|m| m.as_str().parse::<i32>().ok())
        else {
            continue;
        };
        by_year.insert(year, whole.as_str().to_string());
    }
    by_year
        .into_iter()
        .map(|(year, url)| ArchiveLink { year, url })
        .collect()
}

/// Reads a column list: one raw column name per line, blank lines ignored.
pub fn read_column_names(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path).map_err(|e| IngestError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let columns: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        return Err(IngestError::EmptyColumnList {
            path: path.to_path_buf(),
        });
    }
    Ok(columns)
}

/// Extracts the member whose file name is `member` from a zip archive.
pub fn extract_member(archive: &[u8], member: &str, url: &str) -> Result<Vec<u8>> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;
    for i in 0..zip.len() {
        let mut file = zip.by_index(i)?;
        let matches = Path::new(file.name())
            .file_name()
            .is_some_and(|name| name == member);
        if !matches {
            continue;
        }
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| IngestError::Archive {
                message: format!("failed to read {member}: {e}"),
            })?;
        return Ok(bytes);
    }
    Err(IngestError::MemberNotFound {
        url: url.to_string(),
        member: member.to_string(),
    })
}

/// Rewrites a Latin-1 tab-separated TRI file as a UTF-8 CSV at `dest`.
///
/// With `columns`, the file's own header line is discarded and each row is
/// cut or padded to `columns.len()` fields. Without it, the header line is
/// kept (trimmed) and sets the width. Returns the number of data rows, after
/// the file has been flushed and synced.
pub fn convert_tab_file(raw: &[u8], columns: Option<&[String]>, dest: &Path) -> Result<usize> {
    let (text, _, had_errors) = WINDOWS_1252.decode(raw);
    if had_errors {
        debug!(path = %dest.display(), "replaced undecodable bytes");
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(text.as_bytes());
    let mut records = reader.records();

    let parse_error = |e: csv::Error| IngestError::CsvParse {
        path: dest.to_path_buf(),
        message: e.to_string(),
    };

    let first = records.next().transpose().map_err(parse_error)?;
    let header: Vec<String> = match (columns, first) {
        (Some(columns), _) => columns.to_vec(),
        (None, Some(first)) => first.iter().map(|f| f.trim().to_string()).collect(),
        (None, None) => {
            return Err(IngestError::CsvParse {
                path: dest.to_path_buf(),
                message: "source file has no header line".to_string(),
            });
        }
    };
    let width = header.len();

    let write_error = |e: csv::Error| IngestError::FileWrite {
        path: dest.to_path_buf(),
        source: e.into(),
    };
    let file = File::create(dest).map_err(|e| IngestError::FileWrite {
        path: dest.to_path_buf(),
        source: e,
    })?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(&header).map_err(write_error)?;

    let mut rows = 0usize;
    for record in records {
        let record = record.map_err(parse_error)?;
        writer
            .write_record((0..width).map(|i| record.get(i).unwrap_or("")))
            .map_err(write_error)?;
        rows += 1;
    }

    let file = writer.into_inner().map_err(|e| IngestError::FileWrite {
        path: dest.to_path_buf(),
        source: e.into_error(),
    })?;
    file.sync_all().map_err(|e| IngestError::FileWrite {
        path: dest.to_path_buf(),
        source: e,
    })?;
    Ok(rows)
}

/// Downloads the yearly archives and writes one wide CSV per year.
pub struct Acquirer {
    client: Client,
    settings: AcquisitionSettings,
    pattern: Regex,
    columns: Option<Vec<String>>,
}

impl Acquirer {
    pub fn new(settings: &AcquisitionSettings, user_agent: &str) -> Result<Self> {
        let pattern =
            Regex::new(&settings.archive_pattern).map_err(|e| IngestError::ArchivePattern {
                pattern: settings.archive_pattern.clone(),
                source: e,
            })?;
        let columns = settings
            .columns_file
            .as_deref()
            .map(read_column_names)
            .transpose()?;
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(user_agent)
            .build()
            .map_err(|e| IngestError::http(&settings.index_url, &e))?;
        Ok(Self {
            client,
            settings: settings.clone(),
            pattern,
            columns,
        })
    }

    /// Fetches the index page and returns the advertised archives.
    pub fn archive_links(&self) -> Result<Vec<ArchiveLink>> {
        let url = &self.settings.index_url;
        debug!(url = %url, "fetching archive index");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| IngestError::http(url, &e))?;
        if !response.status().is_success() {
            return Err(IngestError::HttpStatus {
                url: url.clone(),
                status: response.status().as_u16(),
            });
        }
        let html = response.text().map_err(|e| IngestError::http(url, &e))?;
        let links = scrape_archive_links(&html, &self.pattern);
        info!(archives = links.len(), "found yearly archives");
        Ok(links)
    }

    /// Downloads one archive and writes its wide CSV into `raw_dir`.
    pub fn acquire_year(&self, link: &ArchiveLink, raw_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(raw_dir).map_err(|e| IngestError::FileWrite {
            path: raw_dir.to_path_buf(),
            source: e,
        })?;

        debug!(year = link.year, url = %link.url, "downloading archive");
        let response = self
            .client
            .get(&link.url)
            .send()
            .map_err(|e| IngestError::http(&link.url, &e))?;
        if !response.status().is_success() {
            return Err(IngestError::HttpStatus {
                url: link.url.clone(),
                status: response.status().as_u16(),
            });
        }
        let archive = response
            .bytes()
            .map_err(|e| IngestError::http(&link.url, &e))?;

        let member = self.settings.member_name(link.year);
        let raw = extract_member(&archive, &member, &link.url)?;
        let dest = raw_dir.join(self.settings.output_name(link.year));
        let rows = convert_tab_file(&raw, self.columns.as_deref(), &dest)?;
        info!(year = link.year, rows, path = %dest.display(), "wrote wide table");
        Ok(dest)
    }
}
