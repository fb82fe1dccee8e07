use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::catalog::ProductCatalog;
use crate::workflows::kyp::domain::{
    DecisionStatus, ProductCode, ProviderSelection, ReviewStage, SessionId,
};
use crate::workflows::kyp::events::{ProductReviewed, PublishError, ReviewEventPublisher};
use crate::workflows::kyp::grading::{GradingConfig, GradingEngine};
use crate::workflows::kyp::record::ReviewRecord;
use crate::workflows::kyp::repository::{RepositoryError, ReviewSessionRepository};
use crate::workflows::kyp::session::ReviewSession;
use crate::workflows::kyp::workflow::ReviewWorkflow;
use crate::workflows::kyp::{review_router, KypReviewService};

pub(super) fn catalog() -> Arc<ProductCatalog> {
    Arc::new(ProductCatalog::sample().expect("sample catalog parses"))
}

pub(super) fn workflow() -> ReviewWorkflow {
    ReviewWorkflow::new(GradingEngine::new(GradingConfig::default()).expect("valid config"))
}

pub(super) fn code(raw: &str) -> ProductCode {
    ProductCode::new(raw)
}

/// Session for TDB909 already opened and sitting in provider selection.
pub(super) fn opened_session(workflow: &ReviewWorkflow, catalog: &ProductCatalog) -> ReviewSession {
    let reference = catalog.entry(&code("TDB909")).expect("reference").clone();
    let mut session = workflow.start(SessionId("kyp-test".to_string()), reference);
    workflow.open(&mut session).expect("opens");
    session
}

/// TDB909 compared against RBF556 and BMO200 through manual RBC + BMO selection.
pub(super) fn manual_comparison(
    workflow: &ReviewWorkflow,
    catalog: &ProductCatalog,
) -> ReviewSession {
    let mut session = opened_session(workflow, catalog);
    workflow
        .choose_providers(&mut session, ProviderSelection::manual(["RBC", "BMO"]))
        .expect("records selection");
    workflow.advance(&mut session, catalog).expect("resolves pool");
    session
        .select_products(&[code("RBF556"), code("BMO200")])
        .expect("selects products");
    workflow.advance(&mut session, catalog).expect("grades subset");
    assert_eq!(session.stage(), ReviewStage::Comparison);
    session
}

pub(super) fn build_service() -> (
    KypReviewService<MemoryRepository, MemoryEvents>,
    Arc<MemoryRepository>,
    Arc<MemoryEvents>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let events = Arc::new(MemoryEvents::default());
    let service = KypReviewService::new(
        catalog(),
        repository.clone(),
        events.clone(),
        GradingConfig::default(),
    )
    .expect("service builds");
    (service, repository, events)
}

/// Drives a service-backed manual review up to final review with decisions recorded.
pub(super) fn service_session_in_final_review<P>(
    service: &KypReviewService<MemoryRepository, P>,
) -> SessionId
where
    P: ReviewEventPublisher + 'static,
{
    let session = service
        .start_review(&code("TDB909"), Some(ProviderSelection::manual(["RBC", "BMO"])))
        .expect("starts");
    let id = session.id().clone();
    service.advance(&id).expect("pool");
    service
        .select_products(&id, &[code("RBF556"), code("BMO200")])
        .expect("select");
    service.advance(&id).expect("compare");
    service
        .toggle_decision(&id, &code("RBF556"), DecisionStatus::Accepted)
        .expect("accept");
    service
        .set_candidate_note(&id, &code("RBF556"), "Lower fees")
        .expect("note");
    service
        .toggle_decision(&id, &code("BMO200"), DecisionStatus::Rejected)
        .expect("reject");
    service.advance(&id).expect("final review");
    id
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) sessions: Arc<Mutex<HashMap<SessionId, ReviewSession>>>,
    pub(super) records: Arc<Mutex<Vec<ReviewRecord>>>,
}

impl ReviewSessionRepository for MemoryRepository {
    fn insert(&self, session: ReviewSession) -> Result<ReviewSession, RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        if guard.contains_key(session.id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(session.id().clone(), session.clone());
        Ok(session)
    }

    fn update(&self, session: ReviewSession) -> Result<(), RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        guard.insert(session.id().clone(), session);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<ReviewSession>, RepositoryError> {
        let guard = self.sessions.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn commit(&self, session: ReviewSession, record: ReviewRecord) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.lock().expect("repository mutex poisoned");
        let mut records = self.records.lock().expect("repository mutex poisoned");
        sessions.insert(session.id().clone(), session);
        records.push(record);
        Ok(())
    }

    fn record(&self, id: &SessionId) -> Result<Option<ReviewRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|record| &record.session_id == id).cloned())
    }

    fn records_for(&self, product: &ProductCode) -> Result<Vec<ReviewRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| &record.reference.code == product)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryEvents {
    events: Arc<Mutex<Vec<ProductReviewed>>>,
}

impl MemoryEvents {
    pub(super) fn events(&self) -> Vec<ProductReviewed> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl ReviewEventPublisher for MemoryEvents {
    fn publish(&self, event: ProductReviewed) -> Result<(), PublishError> {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .push(event);
        Ok(())
    }
}

/// Publisher whose first `failures` deliveries fail with a transport error.
#[derive(Default)]
pub(super) struct FlakyEvents {
    failures: AtomicUsize,
    delivered: MemoryEvents,
}

impl FlakyEvents {
    pub(super) fn failing(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            delivered: MemoryEvents::default(),
        }
    }

    pub(super) fn events(&self) -> Vec<ProductReviewed> {
        self.delivered.events()
    }
}

impl ReviewEventPublisher for FlakyEvents {
    fn publish(&self, event: ProductReviewed) -> Result<(), PublishError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(PublishError::Transport("down".to_string()));
        }
        self.delivered.publish(event)
    }
}

pub(super) struct ConflictRepository;

impl ReviewSessionRepository for ConflictRepository {
    fn insert(&self, _session: ReviewSession) -> Result<ReviewSession, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn update(&self, _session: ReviewSession) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<ReviewSession>, RepositoryError> {
        Ok(None)
    }

    fn commit(
        &self,
        _session: ReviewSession,
        _record: ReviewRecord,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn record(&self, _id: &SessionId) -> Result<Option<ReviewRecord>, RepositoryError> {
        Ok(None)
    }

    fn records_for(&self, _product: &ProductCode) -> Result<Vec<ReviewRecord>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableRepository;

impl ReviewSessionRepository for UnavailableRepository {
    fn insert(&self, _session: ReviewSession) -> Result<ReviewSession, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _session: ReviewSession) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<ReviewSession>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn commit(
        &self,
        _session: ReviewSession,
        _record: ReviewRecord,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn record(&self, _id: &SessionId) -> Result<Option<ReviewRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn records_for(&self, _product: &ProductCode) -> Result<Vec<ReviewRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn review_router_with_service(
    service: KypReviewService<MemoryRepository, MemoryEvents>,
) -> axum::Router {
    review_router(Arc::new(service))
}
