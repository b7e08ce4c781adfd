//! Recommendation and feedback routes.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::state::AppState;
use shopgraph_engine::{record_feedback, FeedbackAction, Recommendation};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/recommend", post(recommend))
        .route("/recommend/trending", get(trending))
        .route("/feedback", post(feedback))
}

fn default_k() -> usize {
    4
}

#[derive(Deserialize)]
struct RecommendRequest {
    anchor_id: String,
    #[serde(default = "default_k")]
    k: usize,
}

/// POST /api/recommend — run the switching strategy chain for an anchor.
async fn recommend(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecommendRequest>,
) -> Json<serde_json::Value> {
    let recs = state.recommender.recommend(&state.store, &req.anchor_id, req.k);
    Json(render_results(&state, &req.anchor_id, recs))
}

#[derive(Deserialize)]
struct TrendingQuery {
    #[serde(default = "default_k")]
    k: usize,
    item_type: Option<String>,
}

/// GET /api/recommend/trending — global popularity ranking.
async fn trending(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TrendingQuery>,
) -> Json<serde_json::Value> {
    let recs = state
        .recommender
        .trending(&state.store, params.k, params.item_type.as_deref());
    Json(render_results(&state, "", recs))
}

/// Join recommendations against catalog details and build the response.
fn render_results(
    state: &AppState,
    anchor_id: &str,
    recs: Vec<Recommendation>,
) -> serde_json::Value {
    let strategy = recs.first().map(|r| r.strategy);

    let results: Vec<serde_json::Value> = recs
        .iter()
        .map(|rec| {
            let item = state.store.get_item(&rec.item_id).ok().flatten();
            serde_json::json!({
                "item_id": rec.item_id,
                "score": rec.score,
                "strategy": rec.strategy,
                "item": item,
            })
        })
        .collect();

    serde_json::json!({
        "anchor_id": anchor_id,
        "results": results,
        "total": results.len(),
        "strategy": strategy,
    })
}

#[derive(Deserialize)]
struct FeedbackRequest {
    anchor_id: String,
    target_id: String,
    #[serde(default)]
    action: Option<FeedbackAction>,
    #[serde(default)]
    weight: Option<f64>,
}

/// POST /api/feedback — reinforce an edge from a live user action.
///
/// Always 200: a failed feedback write is invisible to the end user.
async fn feedback(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FeedbackRequest>,
) -> Json<serde_json::Value> {
    let weight = req
        .weight
        .or_else(|| req.action.map(|a| a.weight()))
        .unwrap_or_else(|| FeedbackAction::Viewed.weight());

    let recorded = record_feedback(&state.store, &req.anchor_id, &req.target_id, weight);

    Json(serde_json::json!({
        "recorded": recorded,
        "anchor_id": req.anchor_id,
        "target_id": req.target_id,
        "weight": weight,
    }))
}
