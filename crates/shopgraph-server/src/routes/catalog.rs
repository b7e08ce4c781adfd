//! Catalog item routes — add, fetch, list, delete.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::state::AppState;
use shopgraph_aggregate::CatalogIngester;
use shopgraph_core::Error;
use shopgraph_store::CatalogItem;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/catalog/items", post(add_item).get(list_items))
        .route("/catalog/items/batch", post(batch_add_items))
        .route(
            "/catalog/items/{id}",
            get(get_item).delete(delete_item),
        )
}

/// Parse an item payload: a tagged catalog item, optionally carrying an
/// inline `embedding` array.
fn parse_item_payload(
    value: &serde_json::Value,
) -> Result<(CatalogItem, Option<Vec<f32>>), String> {
    let item: CatalogItem =
        serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
    let embedding = value.get("embedding").and_then(|e| e.as_array()).map(|arr| {
        arr.iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect()
    });
    Ok((item, embedding))
}

/// Ingest one item off the async thread (embedding may block on HTTP).
async fn ingest_item(
    state: Arc<AppState>,
    item: CatalogItem,
    embedding: Option<Vec<f32>>,
) -> Result<bool, Error> {
    tokio::task::spawn_blocking(move || {
        let batch_size = state.config.settings.write_batch_size;
        let ingester = CatalogIngester::new(&state.store, state.embedder.as_ref(), batch_size);
        ingester.ingest_item(&item, embedding)
    })
    .await
    .map_err(|e| Error::Internal(e.to_string()))?
}

async fn add_item(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<serde_json::Value>,
) -> impl IntoResponse {
    let (item, embedding) = match parse_item_payload(&payload) {
        Ok(parsed) => parsed,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e })),
            );
        }
    };
    let id = item.id().to_string();

    match ingest_item(state, item, embedding).await {
        Ok(embedded) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": id,
                "embedded": embedded,
                "status": "added",
            })),
        ),
        Err(Error::DuplicateItem(hash)) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": "Duplicate item",
                "content_hash": hash,
            })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}

#[derive(Deserialize)]
struct BatchAddRequest {
    items: Vec<serde_json::Value>,
}

async fn batch_add_items(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchAddRequest>,
) -> Json<serde_json::Value> {
    let mut added = Vec::new();
    let mut errors = Vec::new();
    let mut duplicates = 0;

    for payload in req.items {
        let (item, embedding) = match parse_item_payload(&payload) {
            Ok(parsed) => parsed,
            Err(e) => {
                errors.push(serde_json::json!({ "error": e }));
                continue;
            }
        };
        let id = item.id().to_string();

        match ingest_item(state.clone(), item, embedding).await {
            Ok(embedded) => {
                added.push(serde_json::json!({ "id": id, "embedded": embedded }));
            }
            Err(Error::DuplicateItem(_)) => {
                duplicates += 1;
            }
            Err(e) => {
                errors.push(serde_json::json!({ "id": id, "error": e.to_string() }));
            }
        }
    }

    Json(serde_json::json!({
        "added": added.len(),
        "duplicates": duplicates,
        "errors": errors.len(),
        "results": added,
        "errorDetails": errors,
    }))
}

#[derive(Deserialize)]
struct ListItemsQuery {
    page: Option<usize>,
    page_size: Option<usize>,
}

async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListItemsQuery>,
) -> Json<serde_json::Value> {
    let page = params.page.unwrap_or(1);
    let page_size = params.page_size.unwrap_or(10);

    match state.store.items_paginated(page, page_size) {
        Ok((items, total)) => Json(serde_json::json!({
            "items": items,
            "total": total,
            "page": page,
            "pageSize": page_size,
            "totalPages": (total as f64 / page_size as f64).ceil() as i64,
        })),
        Err(e) => Json(serde_json::json!({ "error": e.to_string() })),
    }
}

async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_item(&id) {
        Ok(Some(item)) => {
            let edge_count = state.store.count_edges(&id).unwrap_or(0);
            let has_embedding = state
                .store
                .embedding_for_item(&id)
                .map(|e| e.is_some())
                .unwrap_or(false);
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "item": item,
                    "edge_count": edge_count,
                    "has_embedding": has_embedding,
                })),
            )
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Item not found" })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}

async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_item(&id) {
        Ok(true) => (
            StatusCode::OK,
            Json(serde_json::json!({ "deleted": true, "id": id })),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Item not found" })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}
