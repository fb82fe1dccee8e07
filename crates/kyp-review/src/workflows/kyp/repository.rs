use super::domain::{ProductCode, SessionId};
use super::record::ReviewRecord;
use super::session::ReviewSession;

/// Storage abstraction so the service module can be exercised in isolation.
pub trait ReviewSessionRepository: Send + Sync {
    fn insert(&self, session: ReviewSession) -> Result<ReviewSession, RepositoryError>;
    fn update(&self, session: ReviewSession) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<ReviewSession>, RepositoryError>;
    /// Stores the committed session and its record together; neither is visible without the other.
    fn commit(&self, session: ReviewSession, record: ReviewRecord) -> Result<(), RepositoryError>;
    fn record(&self, id: &SessionId) -> Result<Option<ReviewRecord>, RepositoryError>;
    fn records_for(&self, product: &ProductCode) -> Result<Vec<ReviewRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
