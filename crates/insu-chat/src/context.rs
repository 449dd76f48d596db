//! Owned service handles, built once at startup and torn down explicitly.

use anyhow::Context as _;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::sync::Arc;
use tracing::info;

use insu_core::config::Settings;
use insu_core::registry::InsurerRegistry;
use insu_core::traits::Embedder;
use insu_embed::build_embedder;
use insu_vector::CollectionStore;

use crate::llm::{ChatModel, OpenAiChat};
use crate::prompts::PromptEngine;

pub struct ServiceContext {
    pub settings: Settings,
    pub registry: InsurerRegistry,
    pub embedder: Arc<dyn Embedder>,
    pub chat: Arc<dyn ChatModel>,
    pub prompts: Arc<PromptEngine>,
    pub store: Arc<CollectionStore>,
    pub db: Option<MySqlPool>,
}

impl ServiceContext {
    /// Build every handle from validated settings. The database pool is
    /// created lazily and only when `database` is configured.
    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let registry = InsurerRegistry::builtin();
        let embedder = build_embedder(&settings.embedding).context("failed to build embedder")?;
        let chat: Arc<dyn ChatModel> =
            Arc::new(OpenAiChat::new(&settings.llm.base_url, &settings.llm.api_key).context("failed to build chat client")?);
        let db = match &settings.database {
            Some(db) => Some(
                MySqlPoolOptions::new()
                    .max_connections(4)
                    .connect_lazy(&db.url())
                    .context("invalid database settings")?,
            ),
            None => None,
        };
        Self::new(settings, registry, embedder, chat, db)
    }

    /// Assemble from already constructed handles.
    pub fn new(
        settings: Settings,
        registry: InsurerRegistry,
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
        db: Option<MySqlPool>,
    ) -> anyhow::Result<Self> {
        let store = Arc::new(CollectionStore::from_settings(&settings.data, registry.clone()));
        let prompts = Arc::new(PromptEngine::new()?);
        info!(
            vector_root = %store.root().display(),
            embedder = embedder.embedder_id(),
            database = db.is_some(),
            "service context ready"
        );
        Ok(Self { settings, registry, embedder, chat, prompts, store, db })
    }

    /// Close the database pool. Other handles are released on drop.
    pub async fn close(self) {
        if let Some(pool) = self.db {
            pool.close().await;
            info!("database pool closed");
        }
    }
}
