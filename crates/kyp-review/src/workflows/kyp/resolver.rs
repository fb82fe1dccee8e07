use std::collections::HashSet;

use serde::Serialize;

use super::domain::{CandidateSource, MetricSet, Product, ProductCode, ProviderSelection};
use super::grading::{CriterionWeightSet, GradingEngine};
use super::session::ReviewError;
use crate::workflows::catalog::{CatalogEntry, ProductCatalog};

/// Product eligible for comparison, before advisor narrowing or grading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolCandidate {
    pub product: Product,
    pub metrics: MetricSet,
    pub source: CandidateSource,
}

impl PoolCandidate {
    fn from_entry(entry: &CatalogEntry, source: CandidateSource) -> Self {
        Self {
            product: entry.product.clone(),
            metrics: entry.metrics,
            source,
        }
    }
}

/// Resolved candidates. An empty pool means "no candidates found" and is not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandidatePool {
    pub candidates: Vec<PoolCandidate>,
}

impl CandidatePool {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn codes(&self) -> Vec<&ProductCode> {
        self.candidates
            .iter()
            .map(|candidate| &candidate.product.code)
            .collect()
    }

    pub fn contains(&self, code: &ProductCode) -> bool {
        self.candidates
            .iter()
            .any(|candidate| &candidate.product.code == code)
    }
}

/// Turns a provider selection into the list of products to compare against the reference.
pub struct CandidatePoolResolver<'a> {
    engine: &'a GradingEngine,
}

impl<'a> CandidatePoolResolver<'a> {
    pub fn new(engine: &'a GradingEngine) -> Self {
        Self { engine }
    }

    pub fn resolve(
        &self,
        reference: &Product,
        selection: &ProviderSelection,
        catalog: &ProductCatalog,
        weights: &CriterionWeightSet,
    ) -> Result<CandidatePool, ReviewError> {
        match selection {
            ProviderSelection::Manual { providers } => {
                if providers.is_empty() {
                    return Err(ReviewError::NoProvidersSelected);
                }

                let mut seen = HashSet::new();
                let candidates = catalog
                    .entries()
                    .iter()
                    .filter(|entry| providers.contains(&entry.product.provider))
                    .filter(|entry| entry.product.code != reference.code)
                    .filter(|entry| seen.insert(entry.product.code.clone()))
                    .map(|entry| PoolCandidate::from_entry(entry, CandidateSource::Provider))
                    .collect();

                Ok(CandidatePool { candidates })
            }
            ProviderSelection::Auto(limits) => {
                let eligible = catalog
                    .entries()
                    .iter()
                    .filter(|entry| entry.product.provider != reference.provider)
                    .filter(|entry| entry.product.code != reference.code)
                    .map(|entry| (&entry.product, &entry.metrics));
                let ranked = self.engine.rank(eligible, weights)?;

                let top_len = limits.better_count.min(ranked.len());
                let mut candidates: Vec<PoolCandidate> = ranked[..top_len]
                    .iter()
                    .map(|ranked| PoolCandidate {
                        product: ranked.product.clone(),
                        metrics: ranked.metrics,
                        source: CandidateSource::TopRanked,
                    })
                    .collect();

                let mut bottom: Vec<PoolCandidate> = ranked[top_len..]
                    .iter()
                    .rev()
                    .take(limits.worse_count)
                    .map(|ranked| PoolCandidate {
                        product: ranked.product.clone(),
                        metrics: ranked.metrics,
                        source: CandidateSource::BottomRanked,
                    })
                    .collect();
                bottom.reverse();
                candidates.extend(bottom);

                Ok(CandidatePool { candidates })
            }
        }
    }
}
