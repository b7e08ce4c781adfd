//! Switching hybrid recommender — the central strategy chain.

use tracing::{debug, warn};

use crate::content::ContentIndex;
use crate::types::{Recommendation, Strategy};
use shopgraph_core::RecommenderSettings;
use shopgraph_store::SqliteStore;

/// Deterministically picks one recommendation strategy per request based on
/// data sufficiency: graph when the anchor has enough collaborative signal,
/// content similarity for cold-start items, global trending as last resort.
///
/// Never returns an error — store or index failures at any stage are logged
/// and treated as empty, letting the chain proceed to the next fallback.
pub struct SwitchingRecommender {
    settings: RecommenderSettings,
    content: ContentIndex,
}

impl SwitchingRecommender {
    pub fn new(settings: RecommenderSettings) -> Self {
        let content = ContentIndex::new(settings.content_threshold);
        Self { settings, content }
    }

    pub fn settings(&self) -> &RecommenderSettings {
        &self.settings
    }

    /// Recommend up to `k` items related to the anchor.
    ///
    /// Strategy chain, first non-empty result wins:
    /// 1. Graph — enough edges exist to trust social proof.
    /// 2. Content — the anchor has an embedding but no purchase history.
    /// 3. Trending — globally most-connected items.
    ///
    /// All three empty → empty vec; the caller decides the message.
    pub fn recommend(&self, store: &SqliteStore, anchor: &str, k: usize) -> Vec<Recommendation> {
        let edge_count = match store.count_edges(anchor) {
            Ok(c) => c,
            Err(e) => {
                warn!("Edge count failed for {}: {}", anchor, e);
                0
            }
        };

        if edge_count >= self.settings.graph_threshold {
            let edges = match store.top_edges(anchor, k) {
                Ok(edges) => edges,
                Err(e) => {
                    warn!("Edge fetch failed for {}: {}", anchor, e);
                    Vec::new()
                }
            };
            if !edges.is_empty() {
                debug!(
                    "Strategy graph for {} ({} edges above threshold {})",
                    anchor, edge_count, self.settings.graph_threshold
                );
                return edges
                    .into_iter()
                    .map(|e| Recommendation {
                        item_id: e.item_id,
                        score: e.score,
                        strategy: Strategy::Graph,
                    })
                    .collect();
            }
            // The count is predictive of non-emptiness, not a guarantee:
            // a concurrent replace can empty the fetch. Fall through.
            debug!(
                "Edge count {} for {} but fetch came back empty; trying content",
                edge_count, anchor
            );
        }

        let candidates = self.content.query_by_item_id(store, anchor, k);
        if !candidates.is_empty() {
            debug!("Strategy content for {} (cold start)", anchor);
            return candidates
                .into_iter()
                .map(|c| Recommendation {
                    item_id: c.item_id,
                    score: c.similarity,
                    strategy: Strategy::Content,
                })
                .collect();
        }

        debug!("Strategy trending for {} (no personal signal)", anchor);
        self.trending(store, k, None)
    }

    /// Globally most-connected items by aggregate edge score.
    pub fn trending(
        &self,
        store: &SqliteStore,
        k: usize,
        item_type: Option<&str>,
    ) -> Vec<Recommendation> {
        let hits = match store.trending(k, item_type) {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Trending query failed: {}", e);
                Vec::new()
            }
        };
        hits.into_iter()
            .map(|h| Recommendation {
                item_id: h.item_id,
                score: h.score,
                strategy: Strategy::Trending,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use shopgraph_store::{CatalogItem, Edge};
    use tempfile::TempDir;

    fn test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path(), 4).unwrap();
        (store, dir)
    }

    fn recommender() -> SwitchingRecommender {
        SwitchingRecommender::new(RecommenderSettings::default())
    }

    fn add_embedded(store: &SqliteStore, id: &str, embedding: [f32; 4]) {
        store
            .add_item(
                &CatalogItem::Fashion {
                    id: id.into(),
                    title: id.into(),
                    brand: None,
                    categories: Vec::new(),
                    price: None,
                    description: None,
                    image_base64: None,
                },
                None,
            )
            .unwrap();
        store
            .add_item_embedding(id, &Array1::from_vec(embedding.to_vec()))
            .unwrap();
    }

    #[test]
    fn test_graph_strategy_wins_with_enough_edges() {
        let (store, _dir) = test_store();
        store
            .upsert_edges(&[
                Edge::new("anchor", "p1", 9.0),
                Edge::new("anchor", "p2", 7.0),
                Edge::new("anchor", "p3", 7.0),
                Edge::new("anchor", "p4", 2.0),
                Edge::new("anchor", "p5", 1.0),
            ])
            .unwrap();
        // Content candidates exist too; graph must still win
        add_embedded(&store, "anchor", [1.0, 0.0, 0.0, 0.0]);
        add_embedded(&store, "lookalike", [0.95, 0.05, 0.0, 0.0]);

        let recs = recommender().recommend(&store, "anchor", 3);
        assert_eq!(recs.len(), 3);
        assert!(recs.iter().all(|r| r.strategy == Strategy::Graph));
        assert_eq!(recs[0].item_id, "p1");
        // Tie at 7.0 breaks by ID ascending
        assert_eq!(recs[1].item_id, "p2");
        assert_eq!(recs[2].item_id, "p3");
    }

    #[test]
    fn test_cold_start_uses_content() {
        let (store, _dir) = test_store();
        add_embedded(&store, "anchor", [1.0, 0.0, 0.0, 0.0]);
        add_embedded(&store, "similar", [0.9, 0.1, 0.0, 0.0]);

        let recs = recommender().recommend(&store, "anchor", 5);
        assert!(!recs.is_empty());
        assert!(recs.iter().all(|r| r.strategy == Strategy::Content));
        assert_eq!(recs[0].item_id, "similar");
    }

    #[test]
    fn test_below_threshold_count_skips_graph() {
        let (store, _dir) = test_store();
        // One edge < graph_threshold (2): collaborative signal too weak
        store.upsert_edges(&[Edge::new("anchor", "p1", 50.0)]).unwrap();
        add_embedded(&store, "anchor", [1.0, 0.0, 0.0, 0.0]);
        add_embedded(&store, "similar", [0.9, 0.1, 0.0, 0.0]);

        let recs = recommender().recommend(&store, "anchor", 5);
        assert!(recs.iter().all(|r| r.strategy == Strategy::Content));
    }

    #[test]
    fn test_empty_graph_and_content_falls_to_trending() {
        let (store, _dir) = test_store();
        // Edges exist, but none anchored at "cold" and no embeddings at all
        store
            .upsert_edges(&[
                Edge::new("A", "B", 9.0),
                Edge::new("B", "A", 9.0),
                Edge::new("C", "B", 3.0),
            ])
            .unwrap();

        let recs = recommender().recommend(&store, "cold", 5);
        assert!(!recs.is_empty());
        assert!(recs.iter().all(|r| r.strategy == Strategy::Trending));
        // B carries the largest aggregate incoming score (12)
        assert_eq!(recs[0].item_id, "B");
    }

    #[test]
    fn test_totally_empty_store_returns_empty() {
        let (store, _dir) = test_store();
        let recs = recommender().recommend(&store, "anything", 5);
        assert!(recs.is_empty());
    }

    #[test]
    fn test_empty_graph_fetch_falls_through_to_content() {
        let (store, _dir) = test_store();
        // graph_threshold of 0 puts every anchor "above threshold", so the
        // empty fetch must fall through instead of returning empty.
        let settings = RecommenderSettings {
            graph_threshold: 0,
            ..Default::default()
        };
        add_embedded(&store, "anchor", [1.0, 0.0, 0.0, 0.0]);
        add_embedded(&store, "similar", [0.9, 0.1, 0.0, 0.0]);

        let recs = SwitchingRecommender::new(settings).recommend(&store, "anchor", 5);
        assert!(!recs.is_empty());
        assert!(recs.iter().all(|r| r.strategy == Strategy::Content));
    }

    #[test]
    fn test_trending_respects_type_filter() {
        let (store, _dir) = test_store();
        add_embedded(&store, "f1", [1.0, 0.0, 0.0, 0.0]);
        store
            .add_item(
                &CatalogItem::Book {
                    id: "b1".into(),
                    title: "Dune".into(),
                    author: None,
                    categories: Vec::new(),
                    description: None,
                    image_base64: None,
                },
                None,
            )
            .unwrap();
        store
            .upsert_edges(&[Edge::new("f1", "b1", 5.0), Edge::new("b1", "f1", 5.0)])
            .unwrap();

        let books = recommender().trending(&store, 5, Some("book"));
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].item_id, "b1");
        assert_eq!(books[0].strategy, Strategy::Trending);
    }
}
