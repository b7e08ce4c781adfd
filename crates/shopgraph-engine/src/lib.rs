//! ShopGraph Engine — the recommendation decision engine.
//!
//! Chooses between collaborative (edge graph), content (vector similarity),
//! and trending strategies depending on how much signal the store holds for
//! the anchor item, and feeds live user actions back into the graph.

pub mod content;
pub mod feedback;
pub mod recommend;
pub mod types;

pub use content::ContentIndex;
pub use feedback::record_feedback;
pub use recommend::SwitchingRecommender;
pub use types::*;
