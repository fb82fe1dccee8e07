use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{CandidateSource, DecisionStatus, Product, SessionId};
use super::events::ProductReviewed;
use super::grading::{CompositeScore, CriterionWeightSet, PeerTier};
use super::session::{ReviewSession, ReviewSummary};

/// One graded candidate as it stood at commit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub product: Product,
    pub source: CandidateSource,
    pub tier: PeerTier,
    pub score: CompositeScore,
    pub status: DecisionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Immutable outcome of a committed review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub session_id: SessionId,
    pub reference: Product,
    pub reference_score: CompositeScore,
    pub committed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub weights: CriterionWeightSet,
    pub entries: Vec<RecordEntry>,
    pub accepted: usize,
    pub rejected: usize,
    pub undecided: usize,
}

impl ReviewRecord {
    pub(crate) fn from_session(session: &ReviewSession, committed_at: DateTime<Utc>) -> Self {
        let entries = session
            .candidates()
            .iter()
            .map(|candidate| {
                let decision = session
                    .decision(&candidate.product.code)
                    .cloned()
                    .unwrap_or_default();
                RecordEntry {
                    product: candidate.product.clone(),
                    source: candidate.source,
                    tier: candidate.grade.tier,
                    score: candidate.grade.score,
                    status: decision.status,
                    note: decision.note,
                }
            })
            .collect();
        let ReviewSummary {
            accepted,
            rejected,
            undecided,
            ..
        } = session.summary();

        Self {
            session_id: session.id().clone(),
            reference: session.reference().clone(),
            reference_score: session.reference_score(),
            committed_at,
            note: session.review_note().map(str::to_string),
            weights: *session.weights(),
            entries,
            accepted,
            rejected,
            undecided,
        }
    }

    /// Signal telling the catalog that the reference product has been reviewed.
    pub fn reviewed_event(&self) -> ProductReviewed {
        ProductReviewed {
            product_code: self.reference.code.clone(),
            session_id: self.session_id.clone(),
            reviewed_at: self.committed_at,
        }
    }

    pub fn entries_with_status(
        &self,
        status: DecisionStatus,
    ) -> impl Iterator<Item = &RecordEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.status == status)
    }
}
