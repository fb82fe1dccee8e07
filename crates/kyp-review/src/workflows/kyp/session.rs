use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::domain::{
    CandidateSource, DecisionStatus, MetricSet, Product, ProductCode, ProviderCode,
    ProviderSelection, ReviewDecision, ReviewStage, SessionId,
};
use super::grading::{self, CompositeScore, CriterionWeightSet, Grade, GradingError, PeerTier};
use super::resolver::PoolCandidate;
use crate::workflows::catalog::CatalogEntry;

/// Failures surfaced by the review workflow. None of them alter the session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReviewError {
    #[error(transparent)]
    InvalidConfiguration(#[from] GradingError),
    #[error("manual provider selection requires at least one provider")]
    NoProvidersSelected,
    #[error("cannot {action} during {stage}: {reason}")]
    InvalidTransition {
        stage: ReviewStage,
        action: &'static str,
        reason: String,
    },
    #[error("review session {0} not found")]
    SessionNotFound(SessionId),
    #[error("product {0} is not in the catalog")]
    UnknownProduct(ProductCode),
    #[error("product {0} is not a candidate in this review")]
    UnknownCandidate(ProductCode),
}

impl ReviewError {
    pub(crate) fn transition(
        stage: ReviewStage,
        action: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            stage,
            action,
            reason: reason.into(),
        }
    }
}

/// A candidate that has been scored and tiered against the reference product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradedCandidate {
    pub product: Product,
    pub metrics: MetricSet,
    pub source: CandidateSource,
    pub grade: Grade,
}

/// Aggregate root for one advisor's KYP review of a reference product.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    id: SessionId,
    reference: CatalogEntry,
    stage: ReviewStage,
    history: Vec<ReviewStage>,
    selection: Option<ProviderSelection>,
    pool: Vec<PoolCandidate>,
    selected: BTreeSet<ProductCode>,
    candidates: Vec<GradedCandidate>,
    decisions: BTreeMap<ProductCode, ReviewDecision>,
    review_note: Option<String>,
    weights: CriterionWeightSet,
}

impl ReviewSession {
    pub fn new(id: SessionId, reference: CatalogEntry, weights: CriterionWeightSet) -> Self {
        Self {
            id,
            reference,
            stage: ReviewStage::Initiated,
            history: Vec::new(),
            selection: None,
            pool: Vec::new(),
            selected: BTreeSet::new(),
            candidates: Vec::new(),
            decisions: BTreeMap::new(),
            review_note: None,
            weights,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn reference(&self) -> &Product {
        &self.reference.product
    }

    pub fn reference_metrics(&self) -> &MetricSet {
        &self.reference.metrics
    }

    pub fn stage(&self) -> ReviewStage {
        self.stage
    }

    /// Stages this session has left, oldest first.
    pub fn history(&self) -> &[ReviewStage] {
        &self.history
    }

    pub fn selection(&self) -> Option<&ProviderSelection> {
        self.selection.as_ref()
    }

    pub fn pool(&self) -> &[PoolCandidate] {
        &self.pool
    }

    pub fn selected_products(&self) -> &BTreeSet<ProductCode> {
        &self.selected
    }

    pub fn candidates(&self) -> &[GradedCandidate] {
        &self.candidates
    }

    pub fn candidate(&self, code: &ProductCode) -> Option<&GradedCandidate> {
        self.candidates
            .iter()
            .find(|candidate| &candidate.product.code == code)
    }

    pub fn decision(&self, code: &ProductCode) -> Option<&ReviewDecision> {
        self.decisions.get(code)
    }

    pub fn review_note(&self) -> Option<&str> {
        self.review_note.as_deref()
    }

    pub fn weights(&self) -> &CriterionWeightSet {
        &self.weights
    }

    /// Reference score under the session's current weights, with or without candidates.
    pub fn reference_score(&self) -> CompositeScore {
        grading::composite(&self.reference.metrics, &self.weights)
    }

    pub(crate) fn ensure_stage(
        &self,
        expected: ReviewStage,
        action: &'static str,
    ) -> Result<(), ReviewError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(ReviewError::transition(
                self.stage,
                action,
                format!("only allowed during {expected}"),
            ))
        }
    }

    pub(crate) fn move_to(&mut self, stage: ReviewStage) {
        self.history.push(self.stage);
        self.stage = stage;
    }

    pub(crate) fn set_selection(&mut self, selection: ProviderSelection) {
        self.selection = Some(selection);
    }

    pub(crate) fn set_pool(&mut self, pool: Vec<PoolCandidate>) {
        self.selected.clear();
        self.pool = pool;
    }

    pub(crate) fn set_weights(&mut self, weights: CriterionWeightSet) {
        self.weights = weights;
    }

    /// Installs a freshly graded comparison list, keeping decisions for candidates that remain.
    pub(crate) fn set_candidates(&mut self, candidates: Vec<GradedCandidate>) {
        let mut decisions = BTreeMap::new();
        for candidate in &candidates {
            let decision = self
                .decisions
                .remove(&candidate.product.code)
                .unwrap_or_default();
            decisions.insert(candidate.product.code.clone(), decision);
        }
        self.decisions = decisions;
        self.candidates = candidates;
    }

    pub(crate) fn push_candidate(&mut self, candidate: GradedCandidate) {
        self.decisions
            .insert(candidate.product.code.clone(), ReviewDecision::default());
        self.candidates.push(candidate);
    }

    pub(crate) fn take_candidate(&mut self, code: &ProductCode) -> Option<GradedCandidate> {
        let position = self
            .candidates
            .iter()
            .position(|candidate| &candidate.product.code == code)?;
        self.decisions.remove(code);
        Some(self.candidates.remove(position))
    }

    pub(crate) fn clear_comparison(&mut self) {
        self.candidates.clear();
        self.decisions.clear();
    }

    pub(crate) fn discard(&mut self) {
        self.pool.clear();
        self.selected.clear();
        self.clear_comparison();
        self.review_note = None;
    }

    /// Adds or removes one product from the narrowed subset.
    pub fn toggle_product(&mut self, code: &ProductCode) -> Result<bool, ReviewError> {
        self.ensure_stage(ReviewStage::ProductSelection, "select products")?;
        self.ensure_in_pool(code)?;

        if self.selected.remove(code) {
            Ok(false)
        } else {
            self.selected.insert(code.clone());
            Ok(true)
        }
    }

    /// Replaces the narrowed subset. Every code must belong to the resolved pool.
    pub fn select_products<'a, I>(&mut self, codes: I) -> Result<(), ReviewError>
    where
        I: IntoIterator<Item = &'a ProductCode>,
    {
        self.ensure_stage(ReviewStage::ProductSelection, "select products")?;
        let mut selected = BTreeSet::new();
        for code in codes {
            self.ensure_in_pool(code)?;
            selected.insert(code.clone());
        }
        self.selected = selected;
        Ok(())
    }

    /// Selects every pooled product of `provider`, or clears them when all are already selected.
    pub fn toggle_provider_products(&mut self, provider: &ProviderCode) -> Result<(), ReviewError> {
        self.ensure_stage(ReviewStage::ProductSelection, "select products")?;
        let codes: Vec<ProductCode> = self
            .pool
            .iter()
            .filter(|candidate| &candidate.product.provider == provider)
            .map(|candidate| candidate.product.code.clone())
            .collect();

        let all_selected =
            !codes.is_empty() && codes.iter().all(|code| self.selected.contains(code));
        for code in codes {
            if all_selected {
                self.selected.remove(&code);
            } else {
                self.selected.insert(code);
            }
        }
        Ok(())
    }

    fn ensure_in_pool(&self, code: &ProductCode) -> Result<(), ReviewError> {
        if self.pool.iter().any(|candidate| &candidate.product.code == code) {
            Ok(())
        } else {
            Err(ReviewError::UnknownCandidate(code.clone()))
        }
    }

    fn decision_mut(
        &mut self,
        code: &ProductCode,
        action: &'static str,
    ) -> Result<&mut ReviewDecision, ReviewError> {
        self.ensure_stage(ReviewStage::Comparison, action)?;
        self.decisions
            .get_mut(code)
            .ok_or_else(|| ReviewError::UnknownCandidate(code.clone()))
    }

    /// Accept/reject toggle: repeating a status clears it, the opposite status overwrites it.
    pub fn toggle_decision(
        &mut self,
        code: &ProductCode,
        status: DecisionStatus,
    ) -> Result<DecisionStatus, ReviewError> {
        let decision = self.decision_mut(code, "record a decision")?;
        decision.toggle(status);
        Ok(decision.status)
    }

    pub fn clear_decision(&mut self, code: &ProductCode) -> Result<(), ReviewError> {
        let decision = self.decision_mut(code, "clear a decision")?;
        decision.status = DecisionStatus::Undecided;
        Ok(())
    }

    pub fn set_candidate_note(
        &mut self,
        code: &ProductCode,
        note: &str,
    ) -> Result<(), ReviewError> {
        let decision = self.decision_mut(code, "annotate a candidate")?;
        decision.set_note(note);
        Ok(())
    }

    pub fn set_review_note(&mut self, note: &str) -> Result<(), ReviewError> {
        self.ensure_stage(ReviewStage::FinalReview, "edit the review note")?;
        self.review_note = if note.trim().is_empty() {
            None
        } else {
            Some(note.to_string())
        };
        Ok(())
    }

    pub fn summary(&self) -> ReviewSummary {
        let mut summary = ReviewSummary::default();
        for candidate in &self.candidates {
            match self
                .decisions
                .get(&candidate.product.code)
                .map(|decision| decision.status)
                .unwrap_or_default()
            {
                DecisionStatus::Accepted => summary.accepted += 1,
                DecisionStatus::Rejected => summary.rejected += 1,
                DecisionStatus::Undecided => summary.undecided += 1,
            }
            match candidate.grade.tier {
                PeerTier::Better => summary.better += 1,
                PeerTier::Comparable => summary.comparable += 1,
                PeerTier::Worse => summary.worse += 1,
            }
        }
        summary
    }

    /// Serializable snapshot for API responses and the final-review screen.
    pub fn view(&self) -> ReviewSessionView {
        let available_products = if self.stage == ReviewStage::ProductSelection {
            self.pool
                .iter()
                .map(|candidate| PoolProductView {
                    code: candidate.product.code.clone(),
                    name: candidate.product.name.clone(),
                    provider: candidate.product.provider.clone(),
                    selected: self.selected.contains(&candidate.product.code),
                })
                .collect()
        } else {
            Vec::new()
        };

        let candidates = self
            .candidates
            .iter()
            .map(|candidate| {
                let decision = self
                    .decisions
                    .get(&candidate.product.code)
                    .cloned()
                    .unwrap_or_default();
                CandidateView {
                    code: candidate.product.code.clone(),
                    name: candidate.product.name.clone(),
                    provider: candidate.product.provider.clone(),
                    classification: candidate.product.classification.clone(),
                    risk: candidate.product.risk.label(),
                    investment_objective: candidate.product.investment_objective.clone(),
                    source: candidate.source,
                    score: candidate.grade.score,
                    delta: candidate.grade.delta,
                    tier: candidate.grade.tier,
                    status: decision.status,
                    note: decision.note,
                }
            })
            .collect();

        let graded = matches!(
            self.stage,
            ReviewStage::Comparison | ReviewStage::FinalReview
        );

        ReviewSessionView {
            session_id: self.id.clone(),
            stage: self.stage,
            stage_label: self.stage.label(),
            reference: self.reference.product.clone(),
            reference_score: self.reference_score(),
            selection: self.selection.clone(),
            weights: self.weights,
            available_products,
            candidates,
            no_candidates_found: graded && self.candidates.is_empty(),
            summary: self.summary(),
            review_note: self.review_note.clone(),
        }
    }
}

/// Decision and tier tallies for the final-review cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReviewSummary {
    pub accepted: usize,
    pub rejected: usize,
    pub undecided: usize,
    pub better: usize,
    pub comparable: usize,
    pub worse: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolProductView {
    pub code: ProductCode,
    pub name: String,
    pub provider: ProviderCode,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateView {
    pub code: ProductCode,
    pub name: String,
    pub provider: ProviderCode,
    pub classification: String,
    pub risk: &'static str,
    pub investment_objective: String,
    pub source: CandidateSource,
    pub score: CompositeScore,
    pub delta: f64,
    pub tier: PeerTier,
    pub status: DecisionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewSessionView {
    pub session_id: SessionId,
    pub stage: ReviewStage,
    pub stage_label: &'static str,
    pub reference: Product,
    pub reference_score: CompositeScore,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<ProviderSelection>,
    pub weights: CriterionWeightSet,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_products: Vec<PoolProductView>,
    pub candidates: Vec<CandidateView>,
    pub no_candidates_found: bool,
    pub summary: ReviewSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_note: Option<String>,
}
