//! Upstage Solar embeddings over HTTP.
//!
//! Calls `{base_url}/embeddings` with an OpenAI-compatible body. Errors are
//! surfaced as `Error::EmbeddingService` and never retried here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use insu_core::traits::Embedder;
use insu_core::{Error, Result};

pub struct UpstageEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    id: String,
}

impl UpstageEmbedder {
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Result<Self> {
        // Upstage keys are long opaque tokens; anything this short is a placeholder.
        if api_key.len() < 10 {
            return Err(Error::EmbeddingService(
                "a valid Upstage API key is required (embedding.api_key or UPSTAGE_API_KEY)".into(),
            ));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key: api_key.to_string(),
            id: format!("upstage:{model}"),
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Extract the first embedding from a response body; empty or missing
/// vectors count as a malformed payload.
pub fn parse_embedding_response(body: &str) -> Result<Vec<f32>> {
    let parsed: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| Error::EmbeddingService(format!("malformed embedding payload: {e}")))?;
    let vector = parsed
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| Error::EmbeddingService("embedding payload has no data".into()))?;
    if vector.is_empty() {
        return Err(Error::EmbeddingService("embedding payload has a zero-length vector".into()));
    }
    Ok(vector)
}

#[async_trait]
impl Embedder for UpstageEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        debug!(model = %self.model, text_len = text.len(), "requesting query embedding");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest { model: &self.model, input: text })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "embedding request failed");
                Error::EmbeddingService(format!("request failed: {e}"))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::EmbeddingService(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
            error!(%status, "embedding API error");
            return Err(Error::EmbeddingService(format!("API returned {status}: {detail}")));
        }
        parse_embedding_response(&body)
    }
}
