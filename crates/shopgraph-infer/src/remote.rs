//! HTTP client for an external embedding service.
//!
//! The service exposes a single `POST /embed` endpoint accepting either
//! `{"text": "..."}` or `{"image_base64": "..."}` and returning
//! `{"embedding": [f32, ...]}`. Any transport or shape failure is logged
//! and surfaced as `None` so the recommender chain can degrade.

use std::time::Duration;

use base64::Engine;
use ndarray::Array1;
use serde::Deserialize;
use tracing::warn;

use crate::cache::QueryCache;
use crate::embedder::{EmbedderBackend, EmbeddingResult};
use shopgraph_core::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Embedder backed by a remote embedding service.
pub struct RemoteEmbedder {
    client: reqwest::blocking::Client,
    endpoint: String,
    dim: usize,
    cache: QueryCache,
}

impl RemoteEmbedder {
    /// Build a client for the service at `base_url`.
    pub fn new(base_url: &str, dim: usize) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/embed", base_url.trim_end_matches('/')),
            dim,
            cache: QueryCache::default_cache(),
        })
    }

    fn request(&self, body: serde_json::Value) -> Option<Array1<f32>> {
        let response = match self.client.post(&self.endpoint).json(&body).send() {
            Ok(r) => r,
            Err(e) => {
                warn!("Embedding request failed: {}", e);
                return None;
            }
        };
        if !response.status().is_success() {
            warn!("Embedding service returned {}", response.status());
            return None;
        }
        let parsed: EmbedResponse = match response.json() {
            Ok(p) => p,
            Err(e) => {
                warn!("Embedding response malformed: {}", e);
                return None;
            }
        };
        if parsed.embedding.len() != self.dim {
            warn!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dim,
                parsed.embedding.len()
            );
            return None;
        }
        Some(Array1::from_vec(parsed.embedding))
    }
}

impl EmbedderBackend for RemoteEmbedder {
    fn embed_text(&self, text: &str) -> Option<EmbeddingResult> {
        if let Some(embedding) = self.cache.get(text) {
            return Some(EmbeddingResult {
                embedding,
                cached: true,
            });
        }

        let embedding = self.request(serde_json::json!({ "text": text }))?;
        self.cache.put(text.to_string(), embedding.clone());
        Some(EmbeddingResult {
            embedding,
            cached: false,
        })
    }

    fn embed_image(&self, image: &[u8]) -> Option<EmbeddingResult> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let embedding = self.request(serde_json::json!({ "image_base64": encoded }))?;
        Some(EmbeddingResult {
            embedding,
            cached: false,
        })
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn is_available(&self) -> bool {
        true
    }
}
