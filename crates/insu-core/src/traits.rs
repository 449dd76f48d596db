use async_trait::async_trait;

use crate::error::Result;

/// Text to fixed-length vector.
///
/// Implementations return the raw vector of the upstream model; callers are
/// responsible for dimension reconciliation and normalization.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `upstage:solar-embedding-1-large-query`).
    fn embedder_id(&self) -> &str;

    /// Embed a single query text. Fails with `Error::EmbeddingService` when the
    /// upstream call errors or returns an empty vector.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}
