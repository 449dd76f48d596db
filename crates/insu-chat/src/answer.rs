//! Natural-language answers from retrieved policy passages.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use insu_core::registry::InsurerRegistry;
use insu_core::types::SearchResult;
use insu_core::Result;

use crate::llm::{ChatModel, ChatRequest};
use crate::prompts::PromptEngine;

pub const MSG_NO_SEARCH_RESULTS: &str = "검색 결과가 없습니다. 다른 질문을 시도해보세요.";
pub const MSG_NO_CONTEXT: &str =
    "관련 정보를 찾을 수 없습니다. 더 구체적인 질문을 해주시거나, 다른 키워드를 사용해보세요.";

const SYSTEM_PROMPT: &str = "너는 보험 약관 전문가야. 항상 한국어로 대답해.";
const COMPARE_INSTRUCTION: &str = " 사용자 질문에 '비교 | 차이 | 다른 | 다른점 | 비교해 | 비교해줘 | 차이점 | 알려줘 | 뭐가 더 나은가' \
키워드가 있다면, 여러 보험사의 약관을 비교 분석하여 차이점과 공통점을 명확하게 설명해주세요. 표 형식으로 정리하면 좋습니다.";

#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn generate_answer(&self, question: &str, results: &[SearchResult]) -> Result<String>;
}

/// Retrieved text grouped per collection, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerContext {
    pub text: String,
    pub insurers: usize,
}

/// Group result texts by collection. Placeholder results that belong to no
/// collection are skipped; with several insurers each block gets a header
/// naming the insurer.
pub fn build_context(results: &[SearchResult], registry: &InsurerRegistry) -> AnswerContext {
    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    for r in results.iter().filter(|r| !r.is_default_sentinel()) {
        match groups.iter_mut().find(|(c, _)| *c == r.collection) {
            Some((_, texts)) => texts.push(r.metadata.text.as_str()),
            None => groups.push((r.collection.as_str(), vec![r.metadata.text.as_str()])),
        }
    }
    let multiple = groups.len() > 1;

    let mut text = String::new();
    for (collection, texts) in &groups {
        if multiple {
            let name = registry.canonical_for(collection).unwrap_or(*collection);
            text.push_str(&format!("\n\n## {name} 정보:\n"));
        }
        for t in texts.iter().filter(|t| !t.trim().is_empty()) {
            text.push_str("\n---\n");
            text.push_str(t);
        }
    }
    AnswerContext { text, insurers: groups.len() }
}

pub struct LlmAnswerSynthesizer {
    chat: Arc<dyn ChatModel>,
    prompts: Arc<PromptEngine>,
    registry: InsurerRegistry,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmAnswerSynthesizer {
    pub fn new(chat: Arc<dyn ChatModel>, prompts: Arc<PromptEngine>, registry: InsurerRegistry, model: impl Into<String>) -> Self {
        Self { chat, prompts, registry, model: model.into(), temperature: 0.7, max_tokens: 2000 }
    }

    pub fn sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl AnswerSynthesizer for LlmAnswerSynthesizer {
    async fn generate_answer(&self, question: &str, results: &[SearchResult]) -> Result<String> {
        if results.is_empty() {
            return Ok(MSG_NO_SEARCH_RESULTS.to_string());
        }
        let context = build_context(results, &self.registry);
        if context.text.trim().is_empty() {
            return Ok(MSG_NO_CONTEXT.to_string());
        }
        info!(results = results.len(), insurers = context.insurers, "generating answer");

        let mut system = SYSTEM_PROMPT.to_string();
        if context.insurers > 1 {
            system.push_str(COMPARE_INSTRUCTION);
        }
        let user = self.prompts.render_policy_prompt(question, &context.text)?;
        debug!(context_len = context.text.len(), "answer prompt rendered");
        let request = ChatRequest::new(&self.model, system, user)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);
        self.chat.complete(&request).await
    }
}
