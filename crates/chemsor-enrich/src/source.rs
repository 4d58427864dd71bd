//! Lookup service seams.
//!
//! `Ok(None)` is a definitive "no match". `Err` means the answer is unknown.

use crate::error::Result;

/// Alternative identifier (TRI chemical id + name) to registry (CAS) number.
pub trait RegistryNumberSource: Send + Sync {
    fn registry_number(&self, alternative_id: &str, substance_name: &str)
    -> Result<Option<String>>;
}

/// Registry number to structure descriptor (SMILES).
pub trait StructureSource: Send + Sync {
    /// Short service name used in logs.
    fn name(&self) -> &'static str;

    fn structure(&self, registry_number: &str) -> Result<Option<String>>;
}
