//! Embedding backend trait and the no-op fallback.

use ndarray::Array1;

/// Result of an embedding operation.
pub struct EmbeddingResult {
    /// Float32 embedding vector (512-dim for CLIP ViT-B/32).
    pub embedding: Array1<f32>,
    /// Whether this was served from cache.
    pub cached: bool,
}

/// Trait for embedding backends.
///
/// All methods return `None` on failure — callers degrade to the next
/// recommendation strategy instead of propagating an error.
pub trait EmbedderBackend: Send + Sync {
    /// Embed a text query or item description.
    fn embed_text(&self, text: &str) -> Option<EmbeddingResult>;

    /// Embed a batch of texts.
    fn embed_text_batch(&self, texts: &[&str]) -> Vec<Option<EmbeddingResult>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }

    /// Embed a raw image (e.g., an uploaded product photo).
    fn embed_image(&self, image: &[u8]) -> Option<EmbeddingResult>;

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Check if the embedder is available.
    fn is_available(&self) -> bool;
}

/// Placeholder embedder that always returns None (graph-only mode).
pub struct NoopEmbedder {
    dim: usize,
}

impl NoopEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl EmbedderBackend for NoopEmbedder {
    fn embed_text(&self, _text: &str) -> Option<EmbeddingResult> {
        None
    }

    fn embed_image(&self, _image: &[u8]) -> Option<EmbeddingResult> {
        None
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn is_available(&self) -> bool {
        false
    }
}
