//! Policy-terms questions: resolve, load, search, synthesize.

use anyhow::Context as _;
use std::sync::Arc;
use tracing::warn;

use insu_core::types::{CollectionFailure, SearchReport};
use insu_route::{CollectionResolver, Resolution};
use insu_vector::{CollectionStore, VectorSearchEngine};

use crate::answer::AnswerSynthesizer;

#[derive(Debug, Clone)]
pub struct PolicyAnswer {
    pub answer: String,
    pub resolution: Resolution,
    pub report: SearchReport,
    /// Targeted collections that could not be loaded.
    pub load_failures: Vec<CollectionFailure>,
}

pub struct PolicyModule {
    store: Arc<CollectionStore>,
    resolver: CollectionResolver,
    engine: VectorSearchEngine,
    synthesizer: Arc<dyn AnswerSynthesizer>,
    top_k: usize,
}

impl PolicyModule {
    pub fn new(
        store: Arc<CollectionStore>,
        resolver: CollectionResolver,
        engine: VectorSearchEngine,
        synthesizer: Arc<dyn AnswerSynthesizer>,
        top_k: usize,
    ) -> Self {
        Self { store, resolver, engine, synthesizer, top_k }
    }

    pub async fn respond(&self, question: &str) -> anyhow::Result<PolicyAnswer> {
        let available = self.store.available();
        let resolution = self.resolver.analyze(question, &available)?;
        let load_failures = self.load_targets(&resolution).await?;

        let report = self
            .engine
            .search(question, &self.store.loaded(), &resolution.collections, self.top_k)
            .await
            .context("vector search failed")?;
        let answer = self
            .synthesizer
            .generate_answer(question, &report.results)
            .await
            .context("answer generation failed")?;
        Ok(PolicyAnswer { answer, resolution, report, load_failures })
    }

    /// Load every targeted collection on the blocking pool. A collection that
    /// fails to load is reported and skipped; the first error is returned
    /// only when none of the targets could be loaded.
    async fn load_targets(&self, resolution: &Resolution) -> anyhow::Result<Vec<CollectionFailure>> {
        let mut failures = Vec::new();
        let mut first_error = None;
        for name in &resolution.collections {
            let store = Arc::clone(&self.store);
            let owned = name.clone();
            let loaded = tokio::task::spawn_blocking(move || store.load(&owned))
                .await
                .context("collection load task failed")?;
            if let Err(e) = loaded {
                warn!(collection = %name, error = %e, "failed to load collection");
                failures.push(CollectionFailure { collection: name.clone(), reason: e.to_string() });
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) if failures.len() == resolution.collections.len() => {
                Err(anyhow::Error::new(e).context("no targeted collection could be loaded"))
            }
            _ => Ok(failures),
        }
    }
}
