//! insu-embed
//!
//! Embedding providers: the Upstage HTTP embedder used in production, a
//! deterministic fake for tests and offline development, and the process-wide
//! cache that fronts either of them.

use std::sync::Arc;

use insu_core::config::{EmbeddingProviderKind, EmbeddingSettings};
use insu_core::traits::Embedder;
use insu_core::Result;
use tracing::info;

pub mod cache;
pub mod fake;
pub mod upstage;

pub use cache::CachedEmbedder;
pub use fake::FakeEmbedder;
pub use upstage::UpstageEmbedder;

/// `APP_USE_FAKE_EMBEDDINGS=1` forces the fake embedder regardless of settings.
pub fn fake_forced_by_env() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Build the configured provider wrapped in the query cache.
pub fn build_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let inner: Box<dyn Embedder> = if fake_forced_by_env() || settings.provider == EmbeddingProviderKind::Fake {
        info!(dim = settings.fake_dim, "using fake embedder");
        Box::new(FakeEmbedder::new(settings.fake_dim))
    } else {
        Box::new(UpstageEmbedder::new(&settings.base_url, &settings.model, &settings.api_key)?)
    };
    Ok(Arc::new(CachedEmbedder::new(inner)))
}
