use std::sync::Arc;
use tracing::info;

use insu_core::Result;
use insu_route::Intent;

use crate::llm::{ChatModel, ChatRequest};
use crate::prompts::PromptEngine;

const SYSTEM_PROMPT: &str = "너는 GA 보험설계사들이 사용하는 보험전문 챗봇이야.";

/// Asks the chat model whether a question is a premium comparison or a
/// policy-terms question.
pub struct IntentClassifier {
    chat: Arc<dyn ChatModel>,
    prompts: Arc<PromptEngine>,
    model: String,
}

impl IntentClassifier {
    pub fn new(chat: Arc<dyn ChatModel>, prompts: Arc<PromptEngine>, model: impl Into<String>) -> Self {
        Self { chat, prompts, model: model.into() }
    }

    pub async fn classify(&self, question: &str) -> Result<Intent> {
        let prompt = self.prompts.render_intent_prompt(question)?;
        let label = self.chat.complete(&ChatRequest::new(&self.model, SYSTEM_PROMPT, prompt)).await?;
        let intent = Intent::from_label(&label);
        info!(label = label.trim(), ?intent, "classified question");
        Ok(intent)
    }
}
