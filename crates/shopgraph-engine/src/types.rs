//! Engine types.

use serde::{Deserialize, Serialize};

/// Which subsystem produced a recommendation. Recorded on every result for
/// explainability and evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Co-purchase graph ("bought together").
    Graph,
    /// Embedding similarity ("looks like").
    Content,
    /// Global popularity fallback.
    Trending,
}

/// One ranked recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub item_id: String,
    pub score: f64,
    pub strategy: Strategy,
}

/// User actions reported through the feedback loop, with tiered weights —
/// stronger actions carry stronger behavioral signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackAction {
    Viewed,
    AddedToCart,
    Purchased,
}

impl FeedbackAction {
    pub fn weight(self) -> f64 {
        match self {
            Self::Viewed => 1.0,
            Self::AddedToCart | Self::Purchased => 5.0,
        }
    }
}
