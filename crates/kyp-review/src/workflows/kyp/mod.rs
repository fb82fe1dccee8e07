//! Know-Your-Product review workflow.
//!
//! A review takes a reference product, resolves peers from the catalog, grades them with a
//! weighted composite score, collects advisor decisions, and commits an immutable record plus a
//! `ProductReviewed` event for the catalog.

pub mod domain;
pub mod events;
pub mod export;
pub mod grading;
pub mod record;
pub mod repository;
pub mod resolver;
pub mod router;
pub mod service;
pub mod session;
pub mod workflow;

#[cfg(test)]
mod tests;

pub use domain::{
    AutoLimits, CandidateSource, DecisionStatus, MetricSet, Product, ProductCode, ProviderCode,
    ProviderSelection, ReviewDecision, ReviewStage, RiskRating, SessionId,
};
pub use events::{ProductReviewed, PublishError, ReviewEventPublisher, ReviewEventQueue};
pub use export::ExportError;
pub use grading::{
    CompositeScore, Criterion, CriterionWeightSet, Grade, GradingConfig, GradingEngine,
    GradingError, PeerTier, DEFAULT_PEER_MARGIN,
};
pub use record::{RecordEntry, ReviewRecord};
pub use repository::{RepositoryError, ReviewSessionRepository};
pub use resolver::{CandidatePool, CandidatePoolResolver, PoolCandidate};
pub use router::review_router;
pub use service::{KypReviewService, ReviewServiceError};
pub use session::{GradedCandidate, ReviewError, ReviewSession, ReviewSessionView, ReviewSummary};
pub use workflow::ReviewWorkflow;
