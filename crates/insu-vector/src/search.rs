//! Multi-collection retrieval: embed once, search every targeted collection,
//! reconcile hits with metadata and merge.
//!
//! Scores are cosine distances in `[0, 1]` (`(1 - sim) / 2`), so the merged
//! list is sorted ascending and its first element is the closest hit.
//! Sentinels carry 1.0.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use insu_core::config::SearchSettings;
use insu_core::traits::Embedder;
use insu_core::types::{
    metadata_miss_message, CollectionFailure, SearchReport, SearchResult, MSG_NO_LOADED_COLLECTIONS,
    MSG_NO_RESULTS, MSG_NO_TARGET_COLLECTIONS,
};
use insu_core::{Error, Result};

use crate::faiss::{Neighbor, VectorIndex};
use crate::store::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub embed_timeout: Duration,
    pub collection_timeout: Duration,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from(&SearchSettings::default())
    }
}

impl From<&SearchSettings> for SearchOptions {
    fn from(s: &SearchSettings) -> Self {
        Self { embed_timeout: s.embed_timeout(), collection_timeout: s.collection_timeout() }
    }
}

pub struct VectorSearchEngine {
    embedder: Arc<dyn Embedder>,
    options: SearchOptions,
}

impl VectorSearchEngine {
    pub fn new(embedder: Arc<dyn Embedder>, options: SearchOptions) -> Self {
        Self { embedder, options }
    }

    pub fn options(&self) -> SearchOptions {
        self.options
    }

    /// Search the loaded collections named in `targets`, `top_k` hits each.
    ///
    /// Returns a one-element sentinel list without calling the embedder when
    /// nothing is loaded or no loaded collection is targeted. An embedding
    /// failure aborts the call; a failing collection is reported in
    /// `SearchReport::failures` and the others are still merged.
    pub async fn search(
        &self,
        question: &str,
        loaded: &[Arc<Collection>],
        targets: &BTreeSet<String>,
        top_k: usize,
    ) -> Result<SearchReport> {
        if loaded.is_empty() {
            info!("no collections loaded; returning fallback");
            return Ok(SearchReport { results: SearchResult::fallback(MSG_NO_LOADED_COLLECTIONS), failures: Vec::new() });
        }
        let selected: Vec<Arc<Collection>> =
            loaded.iter().filter(|c| targets.contains(c.name())).cloned().collect();
        if selected.is_empty() {
            info!(?targets, "no loaded collection matches the targets; returning fallback");
            return Ok(SearchReport { results: SearchResult::fallback(MSG_NO_TARGET_COLLECTIONS), failures: Vec::new() });
        }

        let query: Arc<[f32]> = self.embed(question).await?.into();
        let mut report = SearchReport::default();

        for collection in selected {
            let name = collection.name().to_string();
            let q = Arc::clone(&query);
            let task = tokio::task::spawn_blocking(move || search_collection(&collection, &q, top_k));
            let reason = match timeout(self.options.collection_timeout, task).await {
                Ok(Ok(Ok(hits))) => {
                    debug!(collection = %name, hits = hits.len(), "collection searched");
                    report.results.extend(hits);
                    continue;
                }
                Ok(Ok(Err(e))) => e.to_string(),
                Ok(Err(join)) => format!("search task failed: {join}"),
                Err(_) => format!("search timed out after {:?}", self.options.collection_timeout),
            };
            warn!(collection = %name, %reason, "collection search failed; skipping");
            report.failures.push(CollectionFailure { collection: name, reason });
        }

        report.results.sort_by(|a, b| a.score.total_cmp(&b.score));
        if report.results.is_empty() {
            report.results = SearchResult::fallback(MSG_NO_RESULTS);
        }
        info!(results = report.results.len(), failures = report.failures.len(), "vector search complete");
        Ok(report)
    }

    async fn embed(&self, question: &str) -> Result<Vec<f32>> {
        let vector = match timeout(self.options.embed_timeout, self.embedder.embed_query(question)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::EmbeddingService(format!(
                    "embedding timed out after {:?}",
                    self.options.embed_timeout
                )))
            }
        };
        if vector.is_empty() {
            return Err(Error::EmbeddingService("embedder returned a zero-length vector".into()));
        }
        Ok(vector)
    }
}

/// Fit `query` to `index_dim`: zero-pad when shorter, truncate when longer.
///
/// Differing dimensions make relevance approximate; the index stays searchable.
pub fn pad_embedding(query: &[f32], index_dim: usize) -> Vec<f32> {
    let mut out = query.to_vec();
    out.resize(index_dim, 0.0);
    out
}

/// Scale `v` to unit length in place. A zero vector is left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Reconcile, normalize and search; similarities are clipped to at most 1.0.
pub fn search_index_by_query(index: &dyn VectorIndex, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
    let mut q = pad_embedding(query, index.dim());
    l2_normalize(&mut q);
    let mut hits = index.search(&q, k)?;
    for hit in &mut hits {
        if hit.similarity > 1.0 {
            warn!(ordinal = hit.ordinal, similarity = hit.similarity, "clipping similarity to 1.0");
            hit.similarity = 1.0;
        }
    }
    Ok(hits)
}

/// Cosine distance in `[0, 1]`; NaN maps to the maximum.
pub fn similarity_to_score(similarity: f32) -> f32 {
    if similarity.is_nan() {
        return 1.0;
    }
    (1.0 - similarity.clamp(-1.0, 1.0)) / 2.0
}

/// Search one collection and attach metadata to every hit.
///
/// Ordinal `-1` and ordinals without metadata become sentinels tagged with
/// this collection's name.
pub fn search_collection(collection: &Collection, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
    let index = collection.index();
    if query.len() != index.dim() {
        warn!(
            collection = collection.name(),
            query_dim = query.len(),
            index_dim = index.dim(),
            "query dimension differs from index; padding/truncating"
        );
    }
    let hits = search_index_by_query(index, query, top_k)?;
    Ok(hits
        .into_iter()
        .map(|hit| {
            let doc_id = hit.ordinal.to_string();
            if hit.ordinal < 0 {
                return SearchResult::sentinel(collection.name(), doc_id, metadata_miss_message(hit.ordinal));
            }
            let score = similarity_to_score(hit.similarity);
            match collection.lookup(&doc_id) {
                Some(record) => SearchResult {
                    collection: collection.name().to_string(),
                    doc_id,
                    score,
                    metadata: record.clone(),
                },
                None => {
                    warn!(collection = collection.name(), ordinal = hit.ordinal, "no metadata for hit");
                    SearchResult { score, ..SearchResult::sentinel(collection.name(), doc_id, metadata_miss_message(hit.ordinal)) }
                }
            }
        })
        .collect())
}
