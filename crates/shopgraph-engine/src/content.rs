//! Content similarity index — vector search over catalog embeddings.

use ndarray::Array1;
use tracing::warn;

use shopgraph_store::{CandidateHit, SqliteStore};

/// Wraps the store's vector search with the engine's similarity threshold
/// and anchor exclusion.
///
/// Every query degrades to an empty vec — a missing embedding or a store
/// failure is not an error here, the caller decides how to fall back.
pub struct ContentIndex {
    threshold: f64,
}

impl ContentIndex {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Nearest catalog items to an arbitrary query vector.
    pub fn query_by_vector(
        &self,
        store: &SqliteStore,
        vector: &Array1<f32>,
        limit: usize,
    ) -> Vec<CandidateHit> {
        match store.vector_search(vector, self.threshold, limit) {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Vector search failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Nearest catalog items to an item's own stored embedding, excluding
    /// the item itself.
    pub fn query_by_item_id(
        &self,
        store: &SqliteStore,
        item_id: &str,
        limit: usize,
    ) -> Vec<CandidateHit> {
        let embedding = match store.embedding_for_item(item_id) {
            Ok(Some(e)) => e,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Embedding lookup failed for {}: {}", item_id, e);
                return Vec::new();
            }
        };

        // Over-fetch by one: the anchor matches itself at similarity ~1.0
        let mut hits = self.query_by_vector(store, &embedding, limit + 1);
        hits.retain(|h| h.item_id != item_id);
        hits.truncate(limit);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopgraph_store::CatalogItem;
    use tempfile::TempDir;

    fn test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path(), 4).unwrap();
        (store, dir)
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
    fn test_query_by_item_excludes_anchor() {
        let (store, _dir) = test_store();
        add_embedded(&store, "anchor", [1.0, 0.0, 0.0, 0.0]);
        add_embedded(&store, "similar", [0.9, 0.1, 0.0, 0.0]);
        add_embedded(&store, "unrelated", [0.0, 0.0, 0.0, 1.0]);

        let index = ContentIndex::new(0.4);
        let hits = index.query_by_item_id(&store, "anchor", 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item_id, "similar");
    }

    #[test]
    fn test_missing_embedding_yields_empty() {
        let (store, _dir) = test_store();
        add_embedded(&store, "other", [1.0, 0.0, 0.0, 0.0]);

        let index = ContentIndex::new(0.4);
        assert!(index.query_by_item_id(&store, "no-such-item", 5).is_empty());
    }

    #[test]
    fn test_limit_respected_after_anchor_removed() {
        let (store, _dir) = test_store();
        add_embedded(&store, "anchor", [1.0, 0.0, 0.0, 0.0]);
        add_embedded(&store, "n1", [0.9, 0.1, 0.0, 0.0]);
        add_embedded(&store, "n2", [0.8, 0.2, 0.0, 0.0]);
        add_embedded(&store, "n3", [0.7, 0.3, 0.0, 0.0]);

        let index = ContentIndex::new(0.0);
        let hits = index.query_by_item_id(&store, "anchor", 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].item_id, "n1");
        assert_eq!(hits[1].item_id, "n2");
    }
}
