use serde::{Deserialize, Serialize};

use super::weights::CriterionWeightSet;
use super::GradingError;

pub const DEFAULT_PEER_MARGIN: f64 = 0.5;

/// Grading dials shared by every session the engine serves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradingConfig {
    /// Minimum score gap, in composite points, before a peer counts as better or worse.
    pub peer_margin: f64,
    pub default_weights: CriterionWeightSet,
}

impl GradingConfig {
    pub fn validate(&self) -> Result<(), GradingError> {
        if !self.peer_margin.is_finite() || self.peer_margin <= 0.0 {
            return Err(GradingError::InvalidConfiguration(format!(
                "peer margin must be a positive number, found {}",
                self.peer_margin
            )));
        }
        self.default_weights.validate()
    }
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            peer_margin: DEFAULT_PEER_MARGIN,
            default_weights: CriterionWeightSet::default(),
        }
    }
}
