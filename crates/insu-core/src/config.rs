//! Configuration loader, the frozen `Settings` struct and path helpers.
//!
//! Uses Figment to merge serialized defaults + `config.toml` +
//! `config.<env>.toml` + `APP_*` env vars (nested keys split on `__`, e.g.
//! `APP_SEARCH__TOP_K=4`). Settings are extracted and validated once at
//! startup and never mutated afterwards.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{ProductType, Sex};

/// Index file extensions the collection store accepts.
pub const INDEX_EXTENSIONS: &[&str] = &["faiss", "index", "bin"];

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        debug!(env = %env_name, "configuration sources merged");

        Ok(Self { figment })
    }

    /// Wrap an already assembled figment (tests, embedding callers).
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract, fill API keys from their conventional env vars, and validate.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings: Settings = self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if settings.embedding.api_key.is_empty() {
            settings.embedding.api_key = env::var("UPSTAGE_API_KEY").unwrap_or_default();
        }
        if settings.llm.api_key.is_empty() {
            settings.llm.api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        }
        settings.validate().inspect_err(|e| warn!(error = %e, "configuration rejected"))?;
        debug!(
            vector_path = %settings.data.vector_path,
            top_k = settings.search.top_k,
            provider = ?settings.embedding.provider,
            database = settings.database.is_some(),
            "settings loaded"
        );
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub search: SearchSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub database: Option<DatabaseSettings>,
    pub profile: ProfileSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if !INDEX_EXTENSIONS.contains(&self.data.index_extension.as_str()) {
            return Err(Error::InvalidConfig(format!(
                "data.index_extension must be one of {:?}, got '{}'",
                INDEX_EXTENSIONS, self.data.index_extension
            )));
        }
        if self.data.index_name.trim().is_empty() {
            return Err(Error::InvalidConfig("data.index_name must not be empty".into()));
        }
        if self.search.top_k == 0 {
            return Err(Error::InvalidConfig("search.top_k must be greater than zero".into()));
        }
        if self.search.embed_timeout_secs == 0 || self.search.collection_timeout_secs == 0 {
            return Err(Error::InvalidConfig("search timeouts must be greater than zero".into()));
        }
        if self.embedding.provider == EmbeddingProviderKind::Fake && self.embedding.fake_dim == 0 {
            return Err(Error::InvalidConfig("embedding.fake_dim must be greater than zero".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::InvalidConfig(format!("llm.temperature out of range: {}", self.llm.temperature)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Directory holding one sub-directory per collection.
    pub vector_path: String,
    pub index_name: String,
    pub index_extension: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { vector_path: "insu_data".into(), index_name: "faiss".into(), index_extension: "index".into() }
    }
}

impl DataSettings {
    /// `vector_path` expanded and resolved against the working directory.
    pub fn vector_root(&self) -> PathBuf {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        resolve_with_base(&cwd, &self.vector_path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Hits requested from every searched collection.
    pub top_k: usize,
    pub embed_timeout_secs: u64,
    pub collection_timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { top_k: 2, embed_timeout_secs: 30, collection_timeout_secs: 10 }
    }
}

impl SearchSettings {
    pub fn embed_timeout(&self) -> Duration {
        Duration::from_secs(self.embed_timeout_secs)
    }

    pub fn collection_timeout(&self) -> Duration {
        Duration::from_secs(self.collection_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    Upstage,
    Fake,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    /// Output dimension of the fake embedder.
    pub fake_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Upstage,
            base_url: "https://api.upstage.ai/v1/solar".into(),
            model: "solar-embedding-1-large-query".into(),
            api_key: String::new(),
            fake_dim: 4096,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: String,
    /// Model used for intent classification, SQL generation and JSON reshaping.
    pub model: String,
    /// Model used for policy answers.
    pub answer_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: String::new(),
            model: "gpt-4-turbo".into(),
            answer_model: "gpt-4o-mini".into(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 3306,
            user: "root".into(),
            password: String::new(),
            database: "insu".into(),
        }
    }
}

impl DatabaseSettings {
    pub fn url(&self) -> String {
        format!("mysql://{}:{}@{}:{}/{}", self.user, self.password, self.host, self.port, self.database)
    }
}

/// Defaults for the insured person used by the premium-comparison path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSettings {
    pub custom_name: String,
    pub insured_age: u32,
    pub sex: Sex,
    pub product_type: ProductType,
    /// Payment period in years.
    pub expiry: u32,
    /// Coverage age limit.
    pub duration: u32,
    /// Insurer canonical name assumed when a question names none.
    pub default_insurer: Option<String>,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            custom_name: "홍길동".into(),
            insured_age: 25,
            sex: Sex::Male,
            product_type: ProductType::NonRefund,
            expiry: 20,
            duration: 100,
            default_insurer: None,
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
