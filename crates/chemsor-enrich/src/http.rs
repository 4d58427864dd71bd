//! HTTP clients for the substance registry and structure services.
//!
//! Every request goes through one blocking [`Client`] built with a timeout.
//! A 404 is a definitive miss; 429 and 5xx are transient.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use crate::error::{LookupError, Result};
use crate::source::{RegistryNumberSource, StructureSource};

const SRS: &str = "srs";
const PUBCHEM: &str = "pubchem";
const NLM: &str = "nlm";

/// Structure fields PubChem has used for the canonical SMILES property.
const PUBCHEM_SMILES_FIELDS: [&str; 4] = [
    "CanonicalSMILES",
    "SMILES",
    "ConnectivitySMILES",
    "IsomericSMILES",
];

/// Shared blocking client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| LookupError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// GETs `url` as JSON. A 404 or an empty body is `None`.
    fn get_json(&self, service: &'static str, url: Url) -> Result<Option<Value>> {
        debug!(service, url = %url, "lookup request");
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|e| LookupError::from_reqwest(service, &e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LookupError::Status {
                service,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .map_err(|e| LookupError::from_reqwest(service, &e))?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| LookupError::Malformed {
                service,
                message: e.to_string(),
            })
    }
}

/// Appends path segments (percent-encoded) and query pairs to `base`.
fn build_url(
    service: &'static str,
    base: &str,
    segments: &[&str],
    query: &[(&str, &str)],
) -> Result<Url> {
    let url_error = |message: String| LookupError::Url { service, message };
    let mut url = Url::parse(base).map_err(|e| url_error(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| url_error(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// EPA Substance Registry Services.
#[derive(Debug, Clone)]
pub struct SrsClient {
    http: HttpClient,
    base_url: String,
}

impl SrsClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

/// Reads the current CAS number from an SRS substance list.
pub fn parse_srs_response(body: &Value) -> Result<Option<String>> {
    let substances = match body {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => std::slice::from_ref(body),
        Value::Null => return Ok(None),
        other => {
            return Err(LookupError::Malformed {
                service: SRS,
                message: format!("expected a substance list, got {other}"),
            });
        }
    };
    Ok(substances
        .iter()
        .find_map(|substance| non_empty_str(substance.get("currentCasNumber"))))
}

impl RegistryNumberSource for SrsClient {
    fn registry_number(
        &self,
        alternative_id: &str,
        substance_name: &str,
    ) -> Result<Option<String>> {
        let url = build_url(
            SRS,
            &self.base_url,
            &["alternateId", alternative_id],
            &[("substanceName", substance_name)],
        )?;
        match self.http.get_json(SRS, url)? {
            Some(body) => parse_srs_response(&body),
            None => Ok(None),
        }
    }
}

/// PubChem PUG-REST, the primary structure source.
#[derive(Debug, Clone)]
pub struct PubChemClient {
    http: HttpClient,
    base_url: String,
}

impl PubChemClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

/// Reads the first SMILES from a PUG-REST property table.
pub fn parse_pubchem_response(body: &Value) -> Result<Option<String>> {
    let Some(properties) = body
        .pointer("/PropertyTable/Properties")
        .and_then(Value::as_array)
    else {
        return Err(LookupError::Malformed {
            service: PUBCHEM,
            message: "missing PropertyTable.Properties".to_string(),
        });
    };
    Ok(properties.iter().find_map(|entry| {
        PUBCHEM_SMILES_FIELDS
            .iter()
            .find_map(|field| non_empty_str(entry.get(*field)))
    }))
}

impl StructureSource for PubChemClient {
    fn name(&self) -> &'static str {
        PUBCHEM
    }

    fn structure(&self, registry_number: &str) -> Result<Option<String>> {
        let url = build_url(
            PUBCHEM,
            &self.base_url,
            &[
                "compound",
                "name",
                registry_number,
                "property",
                "CanonicalSMILES",
                "JSON",
            ],
            &[],
        )?;
        match self.http.get_json(PUBCHEM, url)? {
            Some(body) => parse_pubchem_response(&body),
            None => Ok(None),
        }
    }
}

/// NLM ChemIDplus, the secondary structure source.
#[derive(Debug, Clone)]
pub struct NlmClient {
    http: HttpClient,
    base_url: String,
}

impl NlmClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

/// Reads the first summary SMILES from a ChemIDplus search result.
pub fn parse_nlm_response(body: &Value) -> Result<Option<String>> {
    let Some(results) = body.get("results").and_then(Value::as_array) else {
        if body.get("total").and_then(Value::as_u64) == Some(0) {
            return Ok(None);
        }
        return Err(LookupError::Malformed {
            service: NLM,
            message: "missing results".to_string(),
        });
    };
    Ok(results
        .iter()
        .find_map(|result| non_empty_str(result.pointer("/summary/smiles"))))
}

impl StructureSource for NlmClient {
    fn name(&self) -> &'static str {
        NLM
    }

    fn structure(&self, registry_number: &str) -> Result<Option<String>> {
        let url = build_url(
            NLM,
            &self.base_url,
            &["data", "rn", "equals", registry_number],
            &[("data", "summary")],
        )?;
        match self.http.get_json(NLM, url)? {
            Some(body) => parse_nlm_response(&body),
            None => Ok(None),
        }
    }
}
