//! Shared application state.

use std::sync::Arc;

use shopgraph_core::ShopGraphConfig;
use shopgraph_engine::SwitchingRecommender;
use shopgraph_infer::EmbedderBackend;
use shopgraph_store::SqliteStore;

/// Shared application state accessible from all route handlers.
///
/// Everything is constructed once at startup and injected here — no
/// process-wide singletons.
pub struct AppState {
    pub config: ShopGraphConfig,
    pub store: SqliteStore,
    pub embedder: Arc<dyn EmbedderBackend>,
    pub recommender: SwitchingRecommender,
}

impl AppState {
    pub fn new(
        config: ShopGraphConfig,
        store: SqliteStore,
        embedder: Arc<dyn EmbedderBackend>,
    ) -> Self {
        let recommender = SwitchingRecommender::new(config.settings.clone());
        Self {
            config,
            store,
            embedder,
            recommender,
        }
    }
}
