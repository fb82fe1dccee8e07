use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{CatalogEntry, ProductCatalog};
use crate::workflows::kyp::domain::{ProductCode, RiskRating, SessionId};
use crate::workflows::kyp::events::ProductReviewed;

/// Review status shown next to each product in the catalog view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Pending,
    Reviewed,
}

impl ProductStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ProductStatus::Pending => "Pending",
            ProductStatus::Reviewed => "Reviewed",
        }
    }
}

#[derive(Debug, Clone)]
struct ReviewMark {
    last_reviewed_at: DateTime<Utc>,
    review_count: u32,
}

/// Catalog-side projection of review events. Replaying an event is a no-op.
#[derive(Debug, Default)]
pub struct CatalogStatusBoard {
    marks: BTreeMap<ProductCode, ReviewMark>,
    applied: BTreeSet<SessionId>,
}

impl CatalogStatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event, returning `false` when the session was already recorded.
    pub fn apply(&mut self, event: &ProductReviewed) -> bool {
        if !self.applied.insert(event.session_id.clone()) {
            return false;
        }

        let mark = self
            .marks
            .entry(event.product_code.clone())
            .or_insert(ReviewMark {
                last_reviewed_at: event.reviewed_at,
                review_count: 0,
            });
        mark.review_count += 1;
        if event.reviewed_at > mark.last_reviewed_at {
            mark.last_reviewed_at = event.reviewed_at;
        }
        true
    }

    pub fn apply_all<'a, I>(&mut self, events: I) -> usize
    where
        I: IntoIterator<Item = &'a ProductReviewed>,
    {
        events
            .into_iter()
            .filter(|event| self.apply(event))
            .count()
    }

    pub fn status(&self, code: &ProductCode) -> ProductStatus {
        if self.marks.contains_key(code) {
            ProductStatus::Reviewed
        } else {
            ProductStatus::Pending
        }
    }

    pub fn listing(&self, catalog: &ProductCatalog) -> Vec<CatalogProductView> {
        catalog
            .entries()
            .iter()
            .map(|entry| self.view(catalog, entry))
            .collect()
    }

    /// Listing narrowed by the catalog search; a blank query lists everything.
    pub fn search(&self, catalog: &ProductCatalog, query: &str) -> Vec<CatalogProductView> {
        catalog
            .search(query)
            .into_iter()
            .map(|entry| self.view(catalog, entry))
            .collect()
    }

    fn view(&self, catalog: &ProductCatalog, entry: &CatalogEntry) -> CatalogProductView {
        let mark = self.marks.get(&entry.product.code);
        let status = self.status(&entry.product.code);
        CatalogProductView {
            code: entry.product.code.clone(),
            name: entry.product.name.clone(),
            provider: catalog
                .provider(&entry.product.provider)
                .map(|provider| provider.display_name())
                .unwrap_or_else(|| entry.product.provider.to_string()),
            classification: entry.product.classification.clone(),
            risk: entry.product.risk,
            status,
            status_label: status.label(),
            review_count: mark.map(|mark| mark.review_count).unwrap_or(0),
            last_reviewed_at: mark.map(|mark| mark.last_reviewed_at),
        }
    }

    pub fn summary(&self, catalog: &ProductCatalog) -> CatalogSummary {
        let reviewed = catalog
            .entries()
            .iter()
            .filter(|entry| self.marks.contains_key(&entry.product.code))
            .count();

        CatalogSummary {
            total_products: catalog.len(),
            reviewed,
            pending: catalog.len() - reviewed,
            providers: catalog.providers().count(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogProductView {
    pub code: ProductCode,
    pub name: String,
    pub provider: String,
    pub classification: String,
    pub risk: RiskRating,
    pub status: ProductStatus,
    pub status_label: &'static str,
    pub review_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

/// Headline counts for the catalog dashboard cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub total_products: usize,
    pub reviewed: usize,
    pub pending: usize,
    pub providers: usize,
}
