use chrono::{DateTime, Utc};

use super::domain::{CandidateSource, ProductCode, ProviderSelection, ReviewStage, SessionId};
use super::grading::{CriterionWeightSet, GradingEngine};
use super::record::ReviewRecord;
use super::resolver::{CandidatePoolResolver, PoolCandidate};
use super::session::{GradedCandidate, ReviewError, ReviewSession};
use crate::workflows::catalog::{CatalogEntry, ProductCatalog};

/// Legal stage transitions for a review session. Every rejected call leaves the session as it was.
#[derive(Debug, Clone)]
pub struct ReviewWorkflow {
    engine: GradingEngine,
}

impl ReviewWorkflow {
    pub fn new(engine: GradingEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &GradingEngine {
        &self.engine
    }

    /// Creates a session in `Initiated` using the engine's default weights.
    pub fn start(&self, id: SessionId, reference: CatalogEntry) -> ReviewSession {
        ReviewSession::new(id, reference, self.engine.default_weights())
    }

    pub fn open(&self, session: &mut ReviewSession) -> Result<(), ReviewError> {
        session.ensure_stage(ReviewStage::Initiated, "open the review")?;
        session.move_to(ReviewStage::ProviderSelection);
        Ok(())
    }

    /// Records the sourcing mode. The selection is only checked when the session advances.
    pub fn choose_providers(
        &self,
        session: &mut ReviewSession,
        selection: ProviderSelection,
    ) -> Result<(), ReviewError> {
        session.ensure_stage(ReviewStage::ProviderSelection, "choose providers")?;
        session.set_selection(selection);
        Ok(())
    }

    pub fn advance(
        &self,
        session: &mut ReviewSession,
        catalog: &ProductCatalog,
    ) -> Result<ReviewStage, ReviewError> {
        match session.stage() {
            ReviewStage::ProviderSelection => self.resolve_pool(session, catalog)?,
            ReviewStage::ProductSelection => {
                if session.selected_products().is_empty() {
                    return Err(ReviewError::transition(
                        session.stage(),
                        "advance",
                        "select at least one product to compare",
                    ));
                }
                let chosen: Vec<&PoolCandidate> = session
                    .pool()
                    .iter()
                    .filter(|candidate| {
                        session
                            .selected_products()
                            .contains(&candidate.product.code)
                    })
                    .collect();
                let graded = self.grade_all(session, chosen, session.weights())?;
                session.set_candidates(graded);
                session.move_to(ReviewStage::Comparison);
            }
            ReviewStage::Comparison => session.move_to(ReviewStage::FinalReview),
            ReviewStage::FinalReview => {
                return Err(ReviewError::transition(
                    session.stage(),
                    "advance",
                    "commit the review to finish it",
                ))
            }
            ReviewStage::Initiated => {
                return Err(ReviewError::transition(
                    session.stage(),
                    "advance",
                    "open the review first",
                ))
            }
            stage @ (ReviewStage::Committed | ReviewStage::Cancelled) => {
                return Err(ReviewError::transition(
                    stage,
                    "advance",
                    format!("review is already {}", stage.label().to_lowercase()),
                ))
            }
        }

        Ok(session.stage())
    }

    fn resolve_pool(
        &self,
        session: &mut ReviewSession,
        catalog: &ProductCatalog,
    ) -> Result<(), ReviewError> {
        let selection = session.selection().cloned().ok_or_else(|| {
            ReviewError::transition(
                session.stage(),
                "advance",
                "choose manual providers or auto selection first",
            )
        })?;

        let resolver = CandidatePoolResolver::new(&self.engine);
        let pool = resolver.resolve(session.reference(), &selection, catalog, session.weights())?;

        match selection {
            ProviderSelection::Manual { .. } => {
                session.set_pool(pool.candidates);
                session.move_to(ReviewStage::ProductSelection);
            }
            ProviderSelection::Auto(_) => {
                let graded = self.grade_all(session, pool.candidates.iter(), session.weights())?;
                session.set_pool(pool.candidates);
                session.set_candidates(graded);
                session.move_to(ReviewStage::Comparison);
            }
        }
        Ok(())
    }

    fn grade_all<'a, I>(
        &self,
        session: &ReviewSession,
        candidates: I,
        weights: &CriterionWeightSet,
    ) -> Result<Vec<GradedCandidate>, ReviewError>
    where
        I: IntoIterator<Item = &'a PoolCandidate>,
    {
        candidates
            .into_iter()
            .map(|candidate| -> Result<GradedCandidate, ReviewError> {
                let grade = self
                    .engine
                    .grade(&candidate.metrics, session.reference_metrics(), weights)?;
                Ok(GradedCandidate {
                    product: candidate.product.clone(),
                    metrics: candidate.metrics,
                    source: candidate.source,
                    grade,
                })
            })
            .collect()
    }

    /// Steps one stage backwards. Leaving Comparison discards the graded list.
    pub fn back(&self, session: &mut ReviewSession) -> Result<ReviewStage, ReviewError> {
        match session.stage() {
            ReviewStage::ProductSelection => {
                session.set_pool(Vec::new());
                session.move_to(ReviewStage::ProviderSelection);
            }
            ReviewStage::Comparison => {
                let auto = session.selection().is_some_and(ProviderSelection::is_auto);
                session.clear_comparison();
                if auto {
                    session.set_pool(Vec::new());
                    session.move_to(ReviewStage::ProviderSelection);
                } else {
                    session.move_to(ReviewStage::ProductSelection);
                }
            }
            ReviewStage::FinalReview => session.move_to(ReviewStage::Comparison),
            stage => {
                return Err(ReviewError::transition(
                    stage,
                    "go back",
                    "no earlier stage to return to",
                ))
            }
        }
        Ok(session.stage())
    }

    /// Regrades every candidate under `weights`. Decisions and notes are kept.
    pub fn reweight(
        &self,
        session: &mut ReviewSession,
        weights: CriterionWeightSet,
    ) -> Result<(), ReviewError> {
        session.ensure_stage(ReviewStage::Comparison, "change grading weights")?;
        weights.validate()?;

        let graded = session
            .candidates()
            .iter()
            .map(|candidate| -> Result<GradedCandidate, ReviewError> {
                let grade = self
                    .engine
                    .grade(&candidate.metrics, session.reference_metrics(), &weights)?;
                Ok(GradedCandidate {
                    grade,
                    ..candidate.clone()
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        session.set_weights(weights);
        session.set_candidates(graded);
        Ok(())
    }

    /// Pulls another catalog product into the comparison as an undecided candidate.
    pub fn add_candidate(
        &self,
        session: &mut ReviewSession,
        catalog: &ProductCatalog,
        code: &ProductCode,
    ) -> Result<(), ReviewError> {
        session.ensure_stage(ReviewStage::Comparison, "add a candidate")?;
        let entry = catalog
            .entry(code)
            .ok_or_else(|| ReviewError::UnknownProduct(code.clone()))?;
        if &session.reference().code == code {
            return Err(ReviewError::transition(
                session.stage(),
                "add a candidate",
                "the reference product cannot be compared with itself",
            ));
        }
        if session.candidate(code).is_some() {
            return Err(ReviewError::transition(
                session.stage(),
                "add a candidate",
                format!("{code} is already in the comparison"),
            ));
        }

        let grade = self
            .engine
            .grade(&entry.metrics, session.reference_metrics(), session.weights())?;
        session.push_candidate(GradedCandidate {
            product: entry.product.clone(),
            metrics: entry.metrics,
            source: CandidateSource::AddedByAdvisor,
            grade,
        });
        Ok(())
    }

    pub fn remove_candidate(
        &self,
        session: &mut ReviewSession,
        code: &ProductCode,
    ) -> Result<GradedCandidate, ReviewError> {
        session.ensure_stage(ReviewStage::Comparison, "remove a candidate")?;
        session
            .take_candidate(code)
            .ok_or_else(|| ReviewError::UnknownCandidate(code.clone()))
    }

    /// Finalizes the review. The record is built before the stage moves, so a failure
    /// commits nothing.
    pub fn commit(
        &self,
        session: &mut ReviewSession,
        now: DateTime<Utc>,
    ) -> Result<ReviewRecord, ReviewError> {
        if session.stage() == ReviewStage::Committed {
            return Err(ReviewError::transition(
                session.stage(),
                "commit",
                "review has already been committed",
            ));
        }
        session.ensure_stage(ReviewStage::FinalReview, "commit")?;

        let record = ReviewRecord::from_session(session, now);
        session.move_to(ReviewStage::Committed);
        Ok(record)
    }

    pub fn cancel(&self, session: &mut ReviewSession) -> Result<(), ReviewError> {
        if session.stage().is_terminal() {
            return Err(ReviewError::transition(
                session.stage(),
                "cancel",
                format!("review is already {}", session.stage().label().to_lowercase()),
            ));
        }
        session.discard();
        session.move_to(ReviewStage::Cancelled);
        Ok(())
    }
}
