//! Chat-completion client behind a small trait.
//!
//! `OpenAiChat` speaks the OpenAI `/chat/completions` protocol; tests and
//! offline runs substitute their own `ChatModel`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use insu_core::{Error, Result};

/// One system + user exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self { model: model.into(), system: system.into(), user: user.into(), temperature: None, max_tokens: None }
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// The assistant message content for `request`.
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

pub struct OpenAiChat {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiChat {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Chat("an API key is required (llm.api_key or OPENAI_API_KEY)".into()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        })
    }
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

pub fn parse_completion(body: &str) -> Result<String> {
    let parsed: CompletionResponse =
        serde_json::from_str(body).map_err(|e| Error::Chat(format!("malformed completion payload: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| Error::Chat("completion has no message content".into()))
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let body = CompletionBody {
            model: &request.model,
            messages: vec![
                Message { role: "system", content: &request.system },
                Message { role: "user", content: &request.user },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        debug!(model = %request.model, prompt_len = request.user.len(), "chat completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "chat request failed");
                Error::Chat(format!("request failed: {e}"))
            })?;
        let status = response.status();
        let text = response.text().await.map_err(|e| Error::Chat(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&text).map(|e| e.error.message).unwrap_or(text);
            error!(%status, "chat API error");
            return Err(Error::Chat(format!("API returned {status}: {detail}")));
        }
        parse_completion(&text)
    }
}

/// Drop Markdown code fences (```` ```sql ````, ```` ``` ````) around model output.
pub fn strip_fences(text: &str, lang: &str) -> String {
    text.replace(&format!("```{lang}"), "").replace("```", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"비교설계 질문"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "비교설계 질문");
        assert!(matches!(parse_completion(r#"{"choices":[]}"#), Err(Error::Chat(_))));
    }

    #[test]
    fn strips_code_fences() {
        assert_eq!(strip_fences("```sql\nSELECT 1;\n```", "sql"), "SELECT 1;");
        assert_eq!(strip_fences("```json\n[]\n```\n", "json"), "[]");
        assert_eq!(strip_fences("  SELECT 2 ", "sql"), "SELECT 2");
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(OpenAiChat::new("https://api.openai.com/v1", " ").is_err());
    }
}
