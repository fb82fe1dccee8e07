mod config;
mod policy;
mod rules;
mod weights;

pub use config::{GradingConfig, DEFAULT_PEER_MARGIN};
pub use policy::{classify, PeerTier};
pub use weights::{Criterion, CriterionWeightSet, WeightDraft};

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::domain::{MetricSet, Product};

/// Raised when grading inputs would produce a skewed or meaningless score.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GradingError {
    #[error("invalid grading configuration: {0}")]
    InvalidConfiguration(String),
}

/// Weighted grade of a single product, in composite points.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeScore(pub f64);

impl CompositeScore {
    pub fn value(self) -> f64 {
        self.0
    }
}

/// Discrete contribution of one criterion to a composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub criterion: Criterion,
    pub raw: f64,
    pub normalized: f64,
    pub weight: u8,
    pub contribution: f64,
}

/// Candidate grade relative to the reference product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub score: CompositeScore,
    pub reference_score: CompositeScore,
    pub delta: f64,
    pub tier: PeerTier,
    pub components: Vec<ScoreComponent>,
}

/// A catalog product paired with its score under a particular weight set.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedProduct<'a> {
    pub product: &'a Product,
    pub metrics: MetricSet,
    pub score: CompositeScore,
}

/// Computes the composite score for `metrics`, refusing weight sets that do not total 100.
pub fn score(
    metrics: &MetricSet,
    weights: &CriterionWeightSet,
) -> Result<CompositeScore, GradingError> {
    weights.validate()?;
    let (_, total) = rules::score_metrics(metrics, weights);
    Ok(total)
}

/// Score under a weight set, which is valid by construction.
pub(crate) fn composite(metrics: &MetricSet, weights: &CriterionWeightSet) -> CompositeScore {
    rules::score_metrics(metrics, weights).1
}

/// Stateless grader applying a validated configuration.
#[derive(Debug, Clone)]
pub struct GradingEngine {
    config: GradingConfig,
}

impl GradingEngine {
    pub fn new(config: GradingConfig) -> Result<Self, GradingError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GradingConfig {
        &self.config
    }

    pub fn margin(&self) -> f64 {
        self.config.peer_margin
    }

    pub fn default_weights(&self) -> CriterionWeightSet {
        self.config.default_weights
    }

    pub fn score(
        &self,
        metrics: &MetricSet,
        weights: &CriterionWeightSet,
    ) -> Result<CompositeScore, GradingError> {
        score(metrics, weights)
    }

    pub fn classify(&self, candidate: CompositeScore, reference: CompositeScore) -> PeerTier {
        classify(candidate, reference, self.config.peer_margin)
    }

    /// Scores a candidate and places it in a peer tier against the reference metrics.
    pub fn grade(
        &self,
        candidate: &MetricSet,
        reference: &MetricSet,
        weights: &CriterionWeightSet,
    ) -> Result<Grade, GradingError> {
        weights.validate()?;
        let (components, candidate_score) = rules::score_metrics(candidate, weights);
        let (_, reference_score) = rules::score_metrics(reference, weights);

        Ok(Grade {
            score: candidate_score,
            reference_score,
            delta: candidate_score.value() - reference_score.value(),
            tier: self.classify(candidate_score, reference_score),
            components,
        })
    }

    /// Orders products from highest to lowest score; ties fall back to product code.
    pub fn rank<'a, I>(
        &self,
        entries: I,
        weights: &CriterionWeightSet,
    ) -> Result<Vec<RankedProduct<'a>>, GradingError>
    where
        I: IntoIterator<Item = (&'a Product, &'a MetricSet)>,
    {
        weights.validate()?;
        let mut ranked: Vec<RankedProduct<'a>> = entries
            .into_iter()
            .map(|(product, metrics)| RankedProduct {
                product,
                metrics: *metrics,
                score: rules::score_metrics(metrics, weights).1,
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .value()
                .partial_cmp(&a.score.value())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.product.code.cmp(&b.product.code))
        });

        Ok(ranked)
    }
}
