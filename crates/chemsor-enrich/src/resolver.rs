//! Chemical enrichment: registry number, then structure with fallback.
//!
//! Lookups run in two parallel passes over distinct keys: first every
//! distinct (TRI id, name) pair, then every distinct registry number found.
//! Answers are written back to the chemical rows by slot, so the result
//! equals a sequential run.

use std::collections::BTreeMap;
use std::time::Instant;

use chemsor_model::{ChemicalEntity, LookupStatus};
use chemsor_schema::EnrichmentSettings;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{info, info_span, warn};

use crate::cache::LookupCache;
use crate::error::Result;
use crate::http::{HttpClient, NlmClient, PubChemClient, SrsClient};
use crate::retry::RetryPolicy;
use crate::source::{RegistryNumberSource, StructureSource};

/// Outcome of one resolved value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Lookup {
    Found(String),
    Absent,
    #[default]
    Unresolved,
    Skipped,
}

impl Lookup {
    /// Blank answers count as misses.
    fn from_answer(answer: Option<String>) -> Self {
        match answer {
            Some(value) if !value.trim().is_empty() => Self::Found(value),
            _ => Self::Absent,
        }
    }

    pub fn status(&self) -> LookupStatus {
        match self {
            Self::Found(_) => LookupStatus::Found,
            Self::Absent => LookupStatus::Absent,
            Self::Unresolved => LookupStatus::Unresolved,
            Self::Skipped => LookupStatus::Skipped,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }
}

/// Enrichment result for one chemical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub registry_number: Lookup,
    pub structure: Lookup,
}

impl Resolution {
    pub fn apply(&self, chemical: &mut ChemicalEntity) {
        chemical.cas_number = self.registry_number.value().map(str::to_string);
        chemical.cas_status = self.registry_number.status();
        chemical.smiles = self.structure.value().map(str::to_string);
        chemical.smiles_status = self.structure.status();
    }
}

/// Progress hooks, called from worker threads.
pub trait EnrichProgress: Sync {
    fn start_pass(&self, _pass: &'static str, _total: usize) {}
    fn advance(&self) {}
}

impl EnrichProgress for () {}

type RegistryKey = (String, String);

pub struct Resolver {
    registry: Box<dyn RegistryNumberSource>,
    primary: Box<dyn StructureSource>,
    secondary: Box<dyn StructureSource>,
    retry: RetryPolicy,
    workers: usize,
    /// `None` when the dedicated pool could not be built; rayon's global pool runs instead.
    pool: Option<ThreadPool>,
    registry_cache: LookupCache<RegistryKey>,
    primary_cache: LookupCache<String>,
    secondary_cache: LookupCache<String>,
}

impl Resolver {
    pub fn new(
        registry: Box<dyn RegistryNumberSource>,
        primary: Box<dyn StructureSource>,
        secondary: Box<dyn StructureSource>,
        retry: RetryPolicy,
        workers: usize,
    ) -> Self {
        let workers = workers.max(1);
        let pool = match ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("chemsor-enrich-{index}"))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(err) => {
                warn!(workers, error = %err, "lookup pool unavailable, using global pool");
                None
            }
        };
        Self {
            registry,
            primary,
            secondary,
            retry,
            workers,
            pool,
            registry_cache: LookupCache::default(),
            primary_cache: LookupCache::default(),
            secondary_cache: LookupCache::default(),
        }
    }

    /// SRS for registry numbers, PubChem then NLM for structures.
    pub fn from_settings(settings: &EnrichmentSettings) -> Result<Self> {
        let http = HttpClient::new(settings.timeout(), &settings.user_agent)?;
        Ok(Self::new(
            Box::new(SrsClient::new(http.clone(), settings.srs_url.clone())),
            Box::new(PubChemClient::new(http.clone(), settings.pubchem_url.clone())),
            Box::new(NlmClient::new(http, settings.nlm_url.clone())),
            RetryPolicy::from_settings(settings),
            settings.workers,
        ))
    }

    fn registry_number(&self, key: &RegistryKey) -> Lookup {
        if let Some(answer) = self.registry_cache.get(key) {
            return Lookup::from_answer(answer);
        }
        let (alternative_id, substance_name) = key;
        let result = self.retry.run("srs", || {
            self.registry.registry_number(alternative_id, substance_name)
        });
        match result {
            Ok(answer) => {
                self.registry_cache.insert(key.clone(), answer.clone());
                Lookup::from_answer(answer)
            }
            Err(err) => {
                warn!(
                    tri_chemical_id = %alternative_id,
                    error = %err,
                    "registry number unresolved"
                );
                Lookup::Unresolved
            }
        }
    }

    fn structure_from(
        &self,
        source: &dyn StructureSource,
        cache: &LookupCache<String>,
        registry_number: &str,
    ) -> Lookup {
        let key = registry_number.to_string();
        if let Some(answer) = cache.get(&key) {
            return Lookup::from_answer(answer);
        }
        match self
            .retry
            .run(source.name(), || source.structure(registry_number))
        {
            Ok(answer) => {
                cache.insert(key, answer.clone());
                Lookup::from_answer(answer)
            }
            Err(err) => {
                warn!(
                    service = source.name(),
                    cas_number = %registry_number,
                    error = %err,
                    "structure unresolved"
                );
                Lookup::Unresolved
            }
        }
    }

    /// Primary source first; on any miss the secondary's answer decides.
    pub fn structure(&self, registry_number: &str) -> Lookup {
        let primary = self.structure_from(
            self.primary.as_ref(),
            &self.primary_cache,
            registry_number,
        );
        if let Lookup::Found(_) = primary {
            return primary;
        }
        let secondary = self.structure_from(
            self.secondary.as_ref(),
            &self.secondary_cache,
            registry_number,
        );
        match (primary, secondary) {
            (_, found @ Lookup::Found(_)) => found,
            (Lookup::Unresolved, _) | (_, Lookup::Unresolved) => Lookup::Unresolved,
            _ => Lookup::Absent,
        }
    }

    /// Resolves one chemical sequentially.
    pub fn resolve(&self, alternative_id: &str, substance_name: &str) -> Resolution {
        let registry_number =
            self.registry_number(&(alternative_id.to_string(), substance_name.to_string()));
        let structure = match &registry_number {
            Lookup::Found(cas) => self.structure(cas),
            _ => Lookup::Skipped,
        };
        Resolution {
            registry_number,
            structure,
        }
    }

    pub fn enrich(&self, chemicals: &mut [ChemicalEntity]) {
        self.enrich_with_progress(chemicals, &());
    }

    /// Fills `cas_number`, `smiles` and both statuses of every chemical.
    ///
    /// Chemical order and identifiers are unchanged.
    pub fn enrich_with_progress(
        &self,
        chemicals: &mut [ChemicalEntity],
        progress: &dyn EnrichProgress,
    ) {
        let span = info_span!("enrich", chemicals = chemicals.len(), workers = self.workers);
        let _guard = span.enter();
        let start = Instant::now();

        let registry_keys: Vec<RegistryKey> = distinct(
            chemicals
                .iter()
                .map(|c| (c.tri_chemical_id.clone(), c.chemical_name.clone())),
        );
        progress.start_pass("registry numbers", registry_keys.len());
        let registry_numbers: Vec<Lookup> = self.install(|| {
            registry_keys
                .par_iter()
                .map(|key| {
                    let lookup = self.registry_number(key);
                    progress.advance();
                    lookup
                })
                .collect()
        });
        let registry_by_key: BTreeMap<&RegistryKey, &Lookup> =
            registry_keys.iter().zip(&registry_numbers).collect();

        let registry_numbers_found: Vec<String> = distinct(
            registry_numbers
                .iter()
                .filter_map(|lookup| lookup.value().map(str::to_string)),
        );
        progress.start_pass("structures", registry_numbers_found.len());
        let structures: Vec<Lookup> = self.install(|| {
            registry_numbers_found
                .par_iter()
                .map(|cas| {
                    let lookup = self.structure(cas);
                    progress.advance();
                    lookup
                })
                .collect()
        });
        let structure_by_cas: BTreeMap<&str, &Lookup> = registry_numbers_found
            .iter()
            .map(String::as_str)
            .zip(&structures)
            .collect();

        for chemical in chemicals.iter_mut() {
            let key = (chemical.tri_chemical_id.clone(), chemical.chemical_name.clone());
            let registry_number = registry_by_key
                .get(&key)
                .map_or(Lookup::Unresolved, |lookup| (*lookup).clone());
            let structure = match registry_number.value() {
                Some(cas) => structure_by_cas
                    .get(cas)
                    .map_or(Lookup::Unresolved, |lookup| (*lookup).clone()),
                None => Lookup::Skipped,
            };
            Resolution {
                registry_number,
                structure,
            }
            .apply(chemical);
        }

        info!(
            registry_lookups = registry_keys.len(),
            structure_lookups = registry_numbers_found.len(),
            cache_hits = self.registry_cache.hits()
                + self.primary_cache.hits()
                + self.secondary_cache.hits(),
            duration_ms = start.elapsed().as_millis(),
            "enrichment complete"
        );
    }

    /// Runs `op` on the lookup pool, bounding concurrent requests to `workers`.
    fn install<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

/// Distinct values in first-appearance order.
fn distinct<T: Ord + Clone>(values: impl Iterator<Item = T>) -> Vec<T> {
    let mut seen = std::collections::BTreeSet::new();
    values.filter(|v| seen.insert(v.clone())).collect()
}
