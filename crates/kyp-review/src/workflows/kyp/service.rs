use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::domain::{
    DecisionStatus, ProductCode, ProviderCode, ProviderSelection, ReviewStage, SessionId,
};
use super::events::{PublishError, ReviewEventPublisher};
use super::export::{self, ExportError};
use super::grading::{CriterionWeightSet, GradingConfig, GradingEngine};
use super::record::ReviewRecord;
use super::repository::{RepositoryError, ReviewSessionRepository};
use super::session::{ReviewError, ReviewSession};
use super::workflow::ReviewWorkflow;
use crate::workflows::catalog::ProductCatalog;

/// Service composing the catalog, workflow, session repository, and review event stream.
pub struct KypReviewService<R, P> {
    catalog: Arc<ProductCatalog>,
    repository: Arc<R>,
    events: Arc<P>,
    workflow: Arc<ReviewWorkflow>,
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("kyp-{id:06}"))
}

impl<R, P> KypReviewService<R, P>
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    pub fn new(
        catalog: Arc<ProductCatalog>,
        repository: Arc<R>,
        events: Arc<P>,
        config: GradingConfig,
    ) -> Result<Self, ReviewServiceError> {
        let engine = GradingEngine::new(config).map_err(ReviewError::from)?;
        Ok(Self {
            catalog,
            repository,
            events,
            workflow: Arc::new(ReviewWorkflow::new(engine)),
        })
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    pub fn workflow(&self) -> &ReviewWorkflow {
        &self.workflow
    }

    /// Opens a review of `reference_code`, optionally recording the provider selection up front.
    pub fn start_review(
        &self,
        reference_code: &ProductCode,
        selection: Option<ProviderSelection>,
    ) -> Result<ReviewSession, ReviewServiceError> {
        let reference = self
            .catalog
            .entry(reference_code)
            .cloned()
            .ok_or_else(|| ReviewError::UnknownProduct(reference_code.clone()))?;

        let mut session = self.workflow.start(next_session_id(), reference);
        self.workflow.open(&mut session)?;
        if let Some(selection) = selection {
            self.workflow.choose_providers(&mut session, selection)?;
        }

        let stored = self.repository.insert(session)?;
        info!(
            session_id = %stored.id(),
            reference = %reference_code,
            "kyp review started"
        );
        Ok(stored)
    }

    /// Fetch a session; unknown ids fail closed.
    pub fn get(&self, session_id: &SessionId) -> Result<ReviewSession, ReviewServiceError> {
        let session = self
            .repository
            .fetch(session_id)?
            .ok_or_else(|| ReviewError::SessionNotFound(session_id.clone()))?;
        Ok(session)
    }

    /// Runs `operation` on a copy of the stored session and persists the copy only on success.
    fn modify<T, F>(
        &self,
        session_id: &SessionId,
        action: &'static str,
        operation: F,
    ) -> Result<(ReviewSession, T), ReviewServiceError>
    where
        F: FnOnce(&ReviewWorkflow, &mut ReviewSession) -> Result<T, ReviewError>,
    {
        let mut session = self.get(session_id)?;
        match operation(&self.workflow, &mut session) {
            Ok(outcome) => {
                self.repository.update(session.clone())?;
                Ok((session, outcome))
            }
            Err(err) => {
                warn!(
                    session_id = %session_id,
                    stage = %session.stage(),
                    action,
                    error = %err,
                    "kyp review operation rejected"
                );
                Err(err.into())
            }
        }
    }

    pub fn choose_providers(
        &self,
        session_id: &SessionId,
        selection: ProviderSelection,
    ) -> Result<ReviewSession, ReviewServiceError> {
        let (session, ()) = self.modify(session_id, "choose_providers", |workflow, session| {
            workflow.choose_providers(session, selection)
        })?;
        Ok(session)
    }

    pub fn select_products(
        &self,
        session_id: &SessionId,
        codes: &[ProductCode],
    ) -> Result<ReviewSession, ReviewServiceError> {
        let (session, ()) = self.modify(session_id, "select_products", |_, session| {
            session.select_products(codes)
        })?;
        Ok(session)
    }

    pub fn toggle_provider_products(
        &self,
        session_id: &SessionId,
        provider: &ProviderCode,
    ) -> Result<ReviewSession, ReviewServiceError> {
        let (session, ()) = self.modify(session_id, "toggle_provider_products", |_, session| {
            session.toggle_provider_products(provider)
        })?;
        Ok(session)
    }

    pub fn advance(&self, session_id: &SessionId) -> Result<ReviewSession, ReviewServiceError> {
        let catalog = Arc::clone(&self.catalog);
        let (session, stage) = self.modify(session_id, "advance", |workflow, session| {
            workflow.advance(session, &catalog)
        })?;
        debug!(
            session_id = %session_id,
            %stage,
            candidates = session.candidates().len(),
            pool = session.pool().len(),
            "kyp review advanced"
        );
        Ok(session)
    }

    pub fn back(&self, session_id: &SessionId) -> Result<ReviewSession, ReviewServiceError> {
        let (session, _) =
            self.modify(session_id, "back", |workflow, session| workflow.back(session))?;
        Ok(session)
    }

    pub fn reweight(
        &self,
        session_id: &SessionId,
        weights: CriterionWeightSet,
    ) -> Result<ReviewSession, ReviewServiceError> {
        let (session, ()) = self.modify(session_id, "reweight", |workflow, session| {
            workflow.reweight(session, weights)
        })?;
        Ok(session)
    }

    pub fn toggle_decision(
        &self,
        session_id: &SessionId,
        code: &ProductCode,
        status: DecisionStatus,
    ) -> Result<ReviewSession, ReviewServiceError> {
        let (session, _) = self.modify(session_id, "toggle_decision", |_, session| {
            session.toggle_decision(code, status)
        })?;
        Ok(session)
    }

    pub fn set_candidate_note(
        &self,
        session_id: &SessionId,
        code: &ProductCode,
        note: &str,
    ) -> Result<ReviewSession, ReviewServiceError> {
        let (session, ()) = self.modify(session_id, "set_candidate_note", |_, session| {
            session.set_candidate_note(code, note)
        })?;
        Ok(session)
    }

    pub fn add_candidate(
        &self,
        session_id: &SessionId,
        code: &ProductCode,
    ) -> Result<ReviewSession, ReviewServiceError> {
        let catalog = Arc::clone(&self.catalog);
        let (session, ()) = self.modify(session_id, "add_candidate", |workflow, session| {
            workflow.add_candidate(session, &catalog, code)
        })?;
        Ok(session)
    }

    pub fn remove_candidate(
        &self,
        session_id: &SessionId,
        code: &ProductCode,
    ) -> Result<ReviewSession, ReviewServiceError> {
        let (session, _) = self.modify(session_id, "remove_candidate", |workflow, session| {
            workflow.remove_candidate(session, code)
        })?;
        Ok(session)
    }

    pub fn set_review_note(
        &self,
        session_id: &SessionId,
        note: &str,
    ) -> Result<ReviewSession, ReviewServiceError> {
        let (session, ()) = self.modify(session_id, "set_review_note", |_, session| {
            session.set_review_note(note)
        })?;
        Ok(session)
    }

    /// Signals the catalog, then stores the record with the session. A failed publish stores
    /// nothing, so the commit can be retried; consumers apply one event per session id.
    pub fn commit(
        &self,
        session_id: &SessionId,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ReviewRecord, ReviewServiceError> {
        let mut session = self.get(session_id)?;
        let outcome = match note {
            Some(note) if session.stage() == ReviewStage::FinalReview => {
                session.set_review_note(note)
            }
            _ => Ok(()),
        }
        .and_then(|()| self.workflow.commit(&mut session, now));

        let record = match outcome {
            Ok(record) => record,
            Err(err) => {
                warn!(
                    session_id = %session_id,
                    stage = %session.stage(),
                    error = %err,
                    "kyp review commit rejected"
                );
                return Err(err.into());
            }
        };

        if let Err(err) = self.events.publish(record.reviewed_event()) {
            warn!(
                session_id = %session_id,
                error = %err,
                "kyp review event not delivered; commit not stored"
            );
            return Err(err.into());
        }
        self.repository.commit(session, record.clone())?;

        info!(
            session_id = %session_id,
            reference = %record.reference.code,
            accepted = record.accepted,
            rejected = record.rejected,
            undecided = record.undecided,
            "kyp review committed"
        );
        Ok(record)
    }

    pub fn cancel(&self, session_id: &SessionId) -> Result<ReviewSession, ReviewServiceError> {
        let (session, ()) =
            self.modify(session_id, "cancel", |workflow, session| workflow.cancel(session))?;
        info!(session_id = %session_id, "kyp review cancelled");
        Ok(session)
    }

    pub fn record(&self, session_id: &SessionId) -> Result<ReviewRecord, ReviewServiceError> {
        let record = self
            .repository
            .record(session_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Committed reviews of `product`, oldest first. Unknown products are rejected.
    pub fn records_for(
        &self,
        product: &ProductCode,
    ) -> Result<Vec<ReviewRecord>, ReviewServiceError> {
        if self.catalog.entry(product).is_none() {
            return Err(ReviewError::UnknownProduct(product.clone()).into());
        }
        Ok(self.repository.records_for(product)?)
    }

    /// CSV of the reference and every graded candidate. Only meaningful once candidates are graded.
    pub fn export(&self, session_id: &SessionId) -> Result<String, ReviewServiceError> {
        let session = self.get(session_id)?;
        if !matches!(
            session.stage(),
            ReviewStage::Comparison | ReviewStage::FinalReview
        ) {
            return Err(ReviewError::transition(
                session.stage(),
                "export the comparison",
                "candidates are only graded during Comparison and Final Review",
            )
            .into());
        }
        Ok(export::comparison_csv(&session)?)
    }
}

/// Error raised by the KYP review service.
#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
