use kyp_review::config::CatalogConfig;
use kyp_review::workflows::catalog::{CatalogImportError, CatalogStatusBoard, ProductCatalog};
use kyp_review::workflows::kyp::{
    ProductCode, RepositoryError, ReviewEventQueue, ReviewRecord, ReviewSession,
    ReviewSessionRepository, SessionId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) catalog: Arc<ProductCatalog>,
    pub(crate) events: Arc<ReviewEventQueue>,
    pub(crate) board: Arc<Mutex<CatalogStatusBoard>>,
}

#[derive(Default)]
struct Store {
    sessions: HashMap<SessionId, ReviewSession>,
    records: Vec<ReviewRecord>,
}

/// Process-local session store. Sessions and records share one lock so commits are atomic.
#[derive(Default, Clone)]
pub(crate) struct InMemoryReviewRepository {
    store: Arc<Mutex<Store>>,
}

impl InMemoryReviewRepository {
    fn lock(&self) -> Result<MutexGuard<'_, Store>, RepositoryError> {
        self.store
            .lock()
            .map_err(|_| RepositoryError::Unavailable("session store lock poisoned".to_string()))
    }
}

impl ReviewSessionRepository for InMemoryReviewRepository {
    fn insert(&self, session: ReviewSession) -> Result<ReviewSession, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.sessions.contains_key(session.id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.sessions.insert(session.id().clone(), session.clone());
        Ok(session)
    }

    fn update(&self, session: ReviewSession) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        if guard.sessions.contains_key(session.id()) {
            guard.sessions.insert(session.id().clone(), session);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<ReviewSession>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.sessions.get(id).cloned())
    }

    fn commit(&self, session: ReviewSession, record: ReviewRecord) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        if !guard.sessions.contains_key(session.id()) {
            return Err(RepositoryError::NotFound);
        }
        if guard
            .records
            .iter()
            .any(|existing| existing.session_id == record.session_id)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.sessions.insert(session.id().clone(), session);
        guard.records.push(record);
        Ok(())
    }

    fn record(&self, id: &SessionId) -> Result<Option<ReviewRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .records
            .iter()
            .find(|record| &record.session_id == id)
            .cloned())
    }

    fn records_for(&self, product: &ProductCode) -> Result<Vec<ReviewRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .records
            .iter()
            .filter(|record| &record.reference.code == product)
            .cloned()
            .collect())
    }
}

/// Loads the configured catalog export, or the bundled sample when none is configured.
pub(crate) fn load_catalog(config: &CatalogConfig) -> Result<ProductCatalog, CatalogImportError> {
    match &config.csv_path {
        Some(path) => ProductCatalog::from_path(path),
        None => ProductCatalog::sample(),
    }
}
