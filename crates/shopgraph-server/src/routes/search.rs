//! Multimodal catalog search — text or image query → similar items.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use base64::Engine;
use serde::Deserialize;
use tracing::warn;

use crate::state::AppState;
use shopgraph_store::CatalogItem;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/search", post(search))
}

fn default_top_k() -> usize {
    10
}

fn default_threshold() -> f64 {
    0.2
}

/// How many candidates to pull before the category filter trims them.
const OVERFETCH: usize = 50;

#[derive(Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    image_base64: Option<String>,
    #[serde(default = "default_top_k")]
    top_k: usize,
    #[serde(default = "default_threshold")]
    threshold: f64,
    #[serde(default)]
    category: Option<String>,
}

/// POST /api/search — embed the query (image takes priority over text) and
/// rank catalog items by similarity. Embedding failures degrade to an empty
/// result set, never an error.
async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Json<serde_json::Value> {
    let image_bytes = req.image_base64.as_deref().and_then(|encoded| {
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| warn!("Invalid image payload: {}", e))
            .ok()
    });
    let query_text = req.query.clone().unwrap_or_default();

    let embedder = state.embedder.clone();
    let text = query_text.clone();
    let embedding = tokio::task::spawn_blocking(move || match image_bytes {
        Some(bytes) => embedder.embed_image(&bytes),
        None if !text.trim().is_empty() => embedder.embed_text(&text),
        None => None,
    })
    .await
    .ok()
    .flatten();

    let Some(result) = embedding else {
        return Json(serde_json::json!({
            "results": [],
            "total": 0,
            "query": query_text,
            "search_type": "content",
        }));
    };

    let hits = state
        .store
        .vector_search(&result.embedding, req.threshold, OVERFETCH)
        .unwrap_or_else(|e| {
            warn!("Vector search failed: {}", e);
            Vec::new()
        });

    let category = req.category.as_deref().map(str::to_lowercase);
    let mut results = Vec::new();
    for hit in hits {
        let Some(item) = state.store.get_item(&hit.item_id).ok().flatten() else {
            continue;
        };
        // Hard filter: when a category is requested, the item must carry it
        if let Some(cat) = &category {
            if !matches_category(&item, cat) {
                continue;
            }
        }
        results.push(serde_json::json!({
            "item_id": hit.item_id,
            "similarity": hit.similarity,
            "item": item,
        }));
        if results.len() >= req.top_k {
            break;
        }
    }

    Json(serde_json::json!({
        "total": results.len(),
        "results": results,
        "query": query_text,
        "search_type": "content",
    }))
}

fn matches_category(item: &CatalogItem, category_lower: &str) -> bool {
    item.title().to_lowercase().contains(category_lower)
        || item
            .categories()
            .iter()
            .any(|c| c.to_lowercase().contains(category_lower))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_matches_title_or_categories() {
        let item = CatalogItem::Fashion {
            id: "f1".into(),
            title: "Summer Dress".into(),
            brand: None,
            categories: vec!["Women".into(), "Dresses".into()],
            price: None,
            description: None,
            image_base64: None,
        };
        assert!(matches_category(&item, "dress"));
        assert!(matches_category(&item, "women"));
        assert!(!matches_category(&item, "watch"));
    }
}
