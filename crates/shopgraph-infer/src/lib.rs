//! ShopGraph Infer — embedding service client and query cache.
//!
//! Provides the `EmbedderBackend` trait for turning text or images into
//! fixed-length vectors. `RemoteEmbedder` talks to a configured embedding
//! service over HTTP; without one, `NoopEmbedder` is used and the
//! recommender runs on the co-purchase graph alone.

pub mod cache;
pub mod embedder;
pub mod remote;

pub use cache::QueryCache;
pub use embedder::{EmbedderBackend, EmbeddingResult, NoopEmbedder};
pub use remote::RemoteEmbedder;

use std::sync::Arc;

use shopgraph_core::ShopGraphConfig;

/// Create the best available embedder for the given configuration.
///
/// Uses the remote embedding service when a URL is configured, otherwise
/// falls back to `NoopEmbedder`.
pub fn create_embedder(config: &ShopGraphConfig) -> Arc<dyn EmbedderBackend> {
    if let Some(url) = &config.embed_service_url {
        match RemoteEmbedder::new(url, config.embedding_dim) {
            Ok(embedder) => {
                tracing::info!("Using embedding service at {} (dim={})", url, config.embedding_dim);
                return Arc::new(embedder);
            }
            Err(e) => {
                tracing::warn!("Embedding service unavailable: {}. Falling back to graph-only.", e);
            }
        }
    } else {
        tracing::info!("No embedding service configured. Content search disabled.");
    }

    Arc::new(NoopEmbedder::new(config.embedding_dim))
}
