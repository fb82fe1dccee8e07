use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of an investment product (fund code).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct ProductCode(pub String);

impl ProductCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ProductCode {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Short code of the company issuing a product (e.g. `RBC`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct ProviderCode(pub String);

impl ProviderCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ProviderCode {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for ProviderCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for an in-flight review session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordinal risk label published with each fund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskRating {
    Low,
    LowToMedium,
    Medium,
    MediumToHigh,
    High,
}

impl RiskRating {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "L",
            Self::LowToMedium => "LM",
            Self::Medium => "M",
            Self::MediumToHigh => "MH",
            Self::High => "H",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().replace(['-', ' ', '_'], "").as_str() {
            "L" | "LOW" => Some(Self::Low),
            "LM" | "LOWMEDIUM" | "LOWTOMEDIUM" => Some(Self::LowToMedium),
            "M" | "MEDIUM" => Some(Self::Medium),
            "MH" | "MEDIUMHIGH" | "MEDIUMTOHIGH" => Some(Self::MediumToHigh),
            "H" | "HIGH" => Some(Self::High),
            _ => None,
        }
    }
}

/// Reference data describing a product offered through the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub code: ProductCode,
    pub name: String,
    pub provider: ProviderCode,
    pub classification: String,
    pub risk: RiskRating,
    pub investment_objective: String,
}

/// Raw grading inputs for one product. Values are decimals (0.0215 == 2.15%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    pub mer: f64,
    pub return_1y: f64,
    pub return_3y: f64,
    pub return_5y: f64,
}

/// How the advisor wants comparison candidates sourced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ProviderSelection {
    Manual { providers: BTreeSet<ProviderCode> },
    Auto(AutoLimits),
}

impl ProviderSelection {
    pub fn manual<I, S>(providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Manual {
            providers: providers.into_iter().map(ProviderCode::new).collect(),
        }
    }

    pub fn auto(better_count: usize, worse_count: usize) -> Self {
        Self::Auto(AutoLimits {
            better_count,
            worse_count,
        })
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto(_))
    }
}

/// Target bucket sizes for auto-selected peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoLimits {
    pub better_count: usize,
    pub worse_count: usize,
}

impl Default for AutoLimits {
    fn default() -> Self {
        Self {
            better_count: 3,
            worse_count: 3,
        }
    }
}

/// Bucket an auto-resolved candidate was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Provider,
    TopRanked,
    BottomRanked,
    AddedByAdvisor,
}

/// Workflow stages of a KYP review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStage {
    Initiated,
    ProviderSelection,
    ProductSelection,
    Comparison,
    FinalReview,
    Committed,
    Cancelled,
}

impl ReviewStage {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Initiated => "Initiated",
            Self::ProviderSelection => "Provider Selection",
            Self::ProductSelection => "Product Selection",
            Self::Comparison => "Comparison",
            Self::FinalReview => "Final Review",
            Self::Committed => "Committed",
            Self::Cancelled => "Cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Cancelled)
    }
}

impl fmt::Display for ReviewStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Advisor verdict on a single candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Accepted,
    Rejected,
    #[default]
    Undecided,
}

impl DecisionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Undecided => "undecided",
        }
    }
}

/// Decision plus free-text note recorded against a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub status: DecisionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ReviewDecision {
    /// Selecting the current status again clears it; the opposite status overwrites.
    pub fn toggle(&mut self, status: DecisionStatus) {
        self.status = if self.status == status {
            DecisionStatus::Undecided
        } else {
            status
        };
    }

    pub fn set_note(&mut self, note: &str) {
        self.note = if note.trim().is_empty() {
            None
        } else {
            Some(note.to_string())
        };
    }
}
