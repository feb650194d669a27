use async_trait::async_trait;
use ember_core::Embedder;

/// Placeholder embedder emitting a fixed-length all-zero vector.
///
/// Real embedding and similarity retrieval are intentionally deferred;
/// memory retrieval is purely recency based for now, but facts are stored
/// with an embedding slot so a future embedder can fill it in.
pub struct ZeroEmbedder {
    dimension: usize,
}

impl ZeroEmbedder {
    pub const DEFAULT_DIMENSION: usize = 1536;

    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for ZeroEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl Embedder for ZeroEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(vec![0.0; self.dimension])
    }
}
