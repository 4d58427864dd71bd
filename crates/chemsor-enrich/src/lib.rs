#![deny(unsafe_code)]

//! External identifier resolution for ChemSoR chemicals.
//!
//! A chemical's TRI identifier and name resolve to a CAS registry number
//! through EPA SRS. A registry number resolves to a SMILES string through
//! PubChem, falling back to NLM ChemIDplus. Transient failures are retried
//! with backoff and, when attempts run out, recorded as unresolved.

mod cache;
mod error;
mod http;
mod resolver;
mod retry;
mod source;

pub use cache::LookupCache;
pub use error::{LookupError, Result};
pub use http::{
    HttpClient, NlmClient, PubChemClient, SrsClient, parse_nlm_response, parse_pubchem_response,
    parse_srs_response,
};
pub use resolver::{EnrichProgress, Lookup, Resolution, Resolver};
pub use retry::RetryPolicy;
pub use source::{RegistryNumberSource, StructureSource};
