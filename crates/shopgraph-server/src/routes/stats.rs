//! Stats and health routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/health", get(get_health))
}

/// GET /api/health — liveness and headline counts.
async fn get_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let stats = state.store.get_stats().ok();
    Json(serde_json::json!({
        "status": "healthy",
        "service": "shopgraph",
        "items": stats.as_ref().map(|s| s.total_items).unwrap_or(0),
        "edges": stats.as_ref().map(|s| s.total_edges).unwrap_or(0),
        "embedderAvailable": state.embedder.is_available(),
    }))
}

/// GET /api/stats — storage and engine statistics.
async fn get_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let store_stats = state.store.get_stats().unwrap_or_else(|_| {
        shopgraph_store::StoreStats {
            total_items: 0,
            fashion_items: 0,
            book_items: 0,
            embeddings_stored: 0,
            total_edges: 0,
            distinct_anchors: 0,
            embedding_dimension: state.config.embedding_dim,
            db_path: String::new(),
            db_size_mb: 0.0,
            matrix_loaded: false,
            matrix_rows: 0,
        }
    });

    let settings = state.recommender.settings();

    Json(serde_json::json!({
        "items": store_stats.total_items,
        "fashionItems": store_stats.fashion_items,
        "bookItems": store_stats.book_items,
        "embeddings": store_stats.embeddings_stored,
        "embeddingDimension": store_stats.embedding_dimension,
        "edges": store_stats.total_edges,
        "distinctAnchors": store_stats.distinct_anchors,
        "dbSizeMb": store_stats.db_size_mb,
        "matrixLoaded": store_stats.matrix_loaded,
        "matrixRows": store_stats.matrix_rows,
        "settings": {
            "minCoOccurrence": settings.min_co_occurrence,
            "graphThreshold": settings.graph_threshold,
            "contentThreshold": settings.content_threshold,
        },
    }))
}
