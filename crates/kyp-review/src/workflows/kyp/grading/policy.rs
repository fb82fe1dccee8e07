use serde::{Deserialize, Serialize};

use super::CompositeScore;

/// Position of a candidate relative to the reference product's composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerTier {
    Better,
    Comparable,
    Worse,
}

impl PeerTier {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Better => "Better",
            Self::Comparable => "Comparable",
            Self::Worse => "Worse",
        }
    }
}

/// Classifies a candidate against the reference; gaps narrower than `margin` are comparable.
pub fn classify(candidate: CompositeScore, reference: CompositeScore, margin: f64) -> PeerTier {
    let delta = candidate.value() - reference.value();
    if delta.abs() < margin || delta == 0.0 {
        PeerTier::Comparable
    } else if delta > 0.0 {
        PeerTier::Better
    } else {
        PeerTier::Worse
    }
}
