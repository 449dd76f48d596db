//! Query-embedding cache keyed by exact text.
//!
//! Unbounded and process-wide: query volume is low and keys are literal
//! question texts. Failed calls are not cached.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use insu_core::traits::Embedder;
use insu_core::Result;

pub struct CachedEmbedder {
    inner: Box<dyn Embedder>,
    cache: Mutex<HashMap<String, Vec<f32>>>,
}

impl CachedEmbedder {
    pub fn new(inner: Box<dyn Embedder>) -> Self {
        Self { inner, cache: Mutex::new(HashMap::new()) }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    fn get(&self, text: &str) -> Option<Vec<f32>> {
        self.cache.lock().unwrap_or_else(|p| p.into_inner()).get(text).cloned()
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    fn embedder_id(&self) -> &str {
        self.inner.embedder_id()
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(hit) = self.get(text) {
            debug!(embedder = self.inner.embedder_id(), "embedding cache hit");
            return Ok(hit);
        }
        let vector = self.inner.embed_query(text).await?;
        self.cache
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(text.to_string(), vector.clone());
        Ok(vector)
    }
}
