//! Per-user basket accumulation and pair counting.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::warn;

/// One line of the interaction log.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionRecord {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub item_id: Option<String>,
}

/// Canonicalize an unordered pair by sorting the IDs. Self-pairs collapse
/// to `None`.
pub fn canonical_pair(a: &str, b: &str) -> Option<(String, String)> {
    if a == b {
        return None;
    }
    if a < b {
        Some((a.to_string(), b.to_string()))
    } else {
        Some((b.to_string(), a.to_string()))
    }
}

/// Accumulates the set of distinct items each user interacted with.
///
/// Set semantics dedupe repeat interactions; the whole map must fit in
/// memory, which is the scaling limit of the offline job.
#[derive(Debug, Default)]
pub struct BasketAccumulator {
    baskets: HashMap<String, HashSet<String>>,
    interactions: u64,
}

impl BasketAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one user-item interaction.
    pub fn record(&mut self, user_id: &str, item_id: &str) {
        self.baskets
            .entry(user_id.to_string())
            .or_default()
            .insert(item_id.to_string());
        self.interactions += 1;
    }

    /// Number of distinct users seen.
    pub fn user_count(&self) -> usize {
        self.baskets.len()
    }

    /// Total interactions recorded (before dedup).
    pub fn interaction_count(&self) -> u64 {
        self.interactions
    }

    /// Enumerate all unordered 2-combinations per basket and count each
    /// canonical pair across users.
    ///
    /// A basket of N items produces N*(N-1)/2 pairs, so baskets larger than
    /// `max_basket_size` are skipped entirely. Returns the pair counts and
    /// the number of baskets skipped by the cap.
    pub fn count_pairs(&self, max_basket_size: usize) -> (HashMap<(String, String), u64>, u64) {
        let mut counts: HashMap<(String, String), u64> = HashMap::new();
        let mut oversized = 0u64;

        for (user_id, items) in &self.baskets {
            if items.len() < 2 {
                continue;
            }
            if items.len() > max_basket_size {
                warn!(
                    "Skipping basket of {} items for user {} (cap {})",
                    items.len(),
                    user_id,
                    max_basket_size
                );
                oversized += 1;
                continue;
            }

            let items: Vec<&String> = items.iter().collect();
            for i in 0..items.len() {
                for j in (i + 1)..items.len() {
                    if let Some(pair) = canonical_pair(items[i], items[j]) {
                        *counts.entry(pair).or_insert(0) += 1;
                    }
                }
            }
        }

        (counts, oversized)
    }
}
