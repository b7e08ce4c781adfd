//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Paths to all ShopGraph data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// SQLite database directory (`data/graphdb/`).
    pub graphdb: PathBuf,
    /// Interaction logs queued for aggregation (`data/interactions/`).
    pub interactions: PathBuf,
    /// Catalog export files awaiting ingestion (`data/catalog/`).
    pub catalog: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            graphdb: root.join("graphdb"),
            interactions: root.join("interactions"),
            catalog: root.join("catalog"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.graphdb)?;
        std::fs::create_dir_all(&self.interactions)?;
        std::fs::create_dir_all(&self.catalog)?;
        Ok(())
    }
}

/// Tuning knobs shared by the offline aggregator and the online engine.
///
/// Centralized here so thresholds are set once at startup instead of being
/// re-derived at every call site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommenderSettings {
    /// Minimum co-occurrence count for a pair to become an edge.
    pub min_co_occurrence: u64,
    /// Minimum edge count for the graph strategy to be trusted.
    pub graph_threshold: i64,
    /// Minimum cosine similarity for content candidates.
    pub content_threshold: f64,
    /// Baskets larger than this are skipped during pair counting
    /// (pair count grows as N*(N-1)/2).
    pub max_basket_size: usize,
    /// Rows per prepared-statement batch during bulk edge writes.
    pub write_batch_size: usize,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            min_co_occurrence: 5,
            graph_threshold: 2,
            content_threshold: 0.4,
            max_basket_size: 500,
            write_batch_size: 500,
        }
    }
}

/// Top-level ShopGraph configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopGraphConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Embedding dimension (512 for CLIP ViT-B/32).
    pub embedding_dim: usize,
    /// Base URL of the embedding service, if one is configured.
    pub embed_service_url: Option<String>,
    /// Recommender tuning knobs.
    pub settings: RecommenderSettings,
}

impl ShopGraphConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3010);

        let embed_service_url = std::env::var("SHOPGRAPH_EMBED_URL").ok();

        let mut settings = RecommenderSettings::default();
        if let Some(v) = env_parse("SHOPGRAPH_MIN_CO_OCCURRENCE") {
            settings.min_co_occurrence = v;
        }
        if let Some(v) = env_parse("SHOPGRAPH_GRAPH_THRESHOLD") {
            settings.graph_threshold = v;
        }
        if let Some(v) = env_parse("SHOPGRAPH_CONTENT_THRESHOLD") {
            settings.content_threshold = v;
        }
        if let Some(v) = env_parse("SHOPGRAPH_MAX_BASKET_SIZE") {
            settings.max_basket_size = v;
        }

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            port,
            data_paths,
            embedding_dim: 512,
            embed_service_url,
            settings,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let s = RecommenderSettings::default();
        assert_eq!(s.min_co_occurrence, 5);
        assert_eq!(s.graph_threshold, 2);
        assert!(s.content_threshold > 0.0 && s.content_threshold < 1.0);
    }
}
