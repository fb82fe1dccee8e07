use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ProductCode, SessionId};

/// Emitted once per committed review so the catalog can flag the product as reviewed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductReviewed {
    pub product_code: ProductCode,
    pub session_id: SessionId,
    pub reviewed_at: DateTime<Utc>,
}

/// Outbound hook for review events (catalog views, audit feeds).
pub trait ReviewEventPublisher: Send + Sync {
    fn publish(&self, event: ProductReviewed) -> Result<(), PublishError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("review event transport unavailable: {0}")]
    Transport(String),
}

/// Append-only in-process event stream. Every commit adds an entry; nothing is overwritten.
#[derive(Debug, Default)]
pub struct ReviewEventQueue {
    events: Mutex<VecDeque<ProductReviewed>>,
}

impl ReviewEventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every pending event in commit order.
    pub fn drain(&self) -> Vec<ProductReviewed> {
        let mut guard = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        guard.drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl ReviewEventPublisher for ReviewEventQueue {
    fn publish(&self, event: ProductReviewed) -> Result<(), PublishError> {
        let mut guard = self
            .events
            .lock()
            .map_err(|_| PublishError::Transport("event queue lock poisoned".to_string()))?;
        guard.push_back(event);
        Ok(())
    }
}
