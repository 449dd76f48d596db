//! Premium comparison: question to SQL, SQL to rows, rows to presentation JSON.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::{Column, Row};
use std::sync::Arc;
use tracing::{debug, info};

use insu_core::{Error, Result};
use insu_route::InsuredProfile;

use crate::llm::{strip_fences, ChatModel, ChatRequest};
use crate::prompts::PromptEngine;

const CONVERTER_SYSTEM_PROMPT: &str = "당신은 JSON 데이터 변환 전문가입니다. 주어진 예시 형식에 맞게 데이터를 변환해주세요.";

pub type JsonRow = Map<String, Value>;

pub struct SqlGenerator {
    chat: Arc<dyn ChatModel>,
    prompts: Arc<PromptEngine>,
    model: String,
}

impl SqlGenerator {
    pub fn new(chat: Arc<dyn ChatModel>, prompts: Arc<PromptEngine>, model: impl Into<String>) -> Self {
        Self { chat, prompts, model: model.into() }
    }

    pub async fn generate(&self, question: &str, profile: &InsuredProfile) -> Result<String> {
        let system = self.prompts.render_sql_prompt(profile)?;
        let request = ChatRequest::new(&self.model, system, question).temperature(0.0);
        let sql = strip_fences(&self.chat.complete(&request).await?, "sql");
        debug!(%sql, "generated SQL");
        Ok(sql)
    }
}

/// Runs one generated statement and returns its rows as JSON objects.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<JsonRow>>;
}

pub struct MySqlExecutor {
    pool: MySqlPool,
}

impl MySqlExecutor {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SqlExecutor for MySqlExecutor {
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<JsonRow>> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.iter().map(row_to_json).collect())
    }
}

fn row_to_json(row: &MySqlRow) -> JsonRow {
    row.columns()
        .iter()
        .map(|col| (col.name().to_string(), column_value(row, col.ordinal())))
        .collect()
}

/// Decode one column by trying the common MySQL value shapes in turn.
/// DECIMAL arrives as text and is turned into a number when it parses.
fn column_value(row: &MySqlRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return v.map_or(Value::Null, |f| Value::from(f64::from(f)));
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map_or(Value::Null, Value::String);
    }
    match row.try_get_unchecked::<Option<String>, _>(idx) {
        Ok(Some(text)) => text
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| text.parse::<f64>().map(Value::from))
            .unwrap_or(Value::String(text)),
        _ => Value::Null,
    }
}

/// Reshapes query results into the presentation JSON with the chat model.
pub struct JsonConverter {
    chat: Arc<dyn ChatModel>,
    prompts: Arc<PromptEngine>,
    model: String,
}

#[derive(Serialize)]
struct ConversionInput<'a> {
    #[serde(rename = "설정값")]
    settings: &'a InsuredProfile,
    #[serde(rename = "쿼리")]
    query: &'a str,
    #[serde(rename = "결과")]
    results: &'a [JsonRow],
}

impl JsonConverter {
    pub fn new(chat: Arc<dyn ChatModel>, prompts: Arc<PromptEngine>, model: impl Into<String>) -> Self {
        Self { chat, prompts, model: model.into() }
    }

    /// `[]` without a model call when there are no rows.
    pub async fn convert(&self, profile: &InsuredProfile, sql: &str, rows: &[JsonRow]) -> Result<String> {
        if rows.is_empty() {
            return Ok(json!([]).to_string());
        }
        let data = serde_json::to_string_pretty(&ConversionInput { settings: profile, query: sql, results: rows })
            .map_err(|e| Error::Chat(format!("failed to encode conversion input: {e}")))?;
        let prompt = self.prompts.render_converter_prompt(&data)?;
        let request = ChatRequest::new(&self.model, CONVERTER_SYSTEM_PROMPT, prompt).temperature(0.0);
        Ok(strip_fences(&self.chat.complete(&request).await?, "json"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonOutcome {
    /// Profile after applying the question; carried into the next turn.
    pub profile: InsuredProfile,
    pub sql: String,
    pub rows: usize,
    pub json: String,
}

pub struct PremiumComparison {
    generator: SqlGenerator,
    executor: Arc<dyn SqlExecutor>,
    converter: JsonConverter,
}

impl PremiumComparison {
    pub fn new(generator: SqlGenerator, executor: Arc<dyn SqlExecutor>, converter: JsonConverter) -> Self {
        Self { generator, executor, converter }
    }

    pub async fn compare(&self, question: &str, base: &InsuredProfile) -> Result<ComparisonOutcome> {
        let profile = base.apply_question(question);
        let sql = self.generator.generate(question, &profile).await?;
        let rows = self.executor.fetch_rows(&sql).await?;
        info!(rows = rows.len(), "premium query executed");
        let json = self.converter.convert(&profile, &sql, &rows).await?;
        Ok(ComparisonOutcome { profile, sql, rows: rows.len(), json })
    }
}
