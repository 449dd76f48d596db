//! insu-chat
//!
//! The conversational layer: intent classification, the policy-terms path
//! over the vector core, the premium-comparison path over MySQL, and the
//! `Assistant` that dispatches between them.

use std::sync::{Arc, Mutex};
use tracing::info;

use insu_route::{CollectionResolver, InsuredProfile, Intent};
use insu_vector::{SearchOptions, VectorSearchEngine};

pub mod answer;
pub mod compare;
pub mod context;
pub mod intent;
pub mod llm;
pub mod policy;
pub mod prompts;

pub use answer::{AnswerSynthesizer, LlmAnswerSynthesizer};
pub use compare::{ComparisonOutcome, JsonConverter, MySqlExecutor, PremiumComparison, SqlExecutor, SqlGenerator};
pub use context::ServiceContext;
pub use intent::IntentClassifier;
pub use llm::{ChatModel, ChatRequest, OpenAiChat};
pub use policy::{PolicyAnswer, PolicyModule};
pub use prompts::PromptEngine;

pub const MSG_COMPARISON_UNAVAILABLE: &str =
    "보험료 비교설계를 하려면 데이터베이스 설정이 필요합니다. 약관 관련 질문은 계속 이용하실 수 있습니다.";

/// What one turn produced.
#[derive(Debug, Clone)]
pub enum Reply {
    Comparison(ComparisonOutcome),
    Policy(PolicyAnswer),
    /// Comparison was requested but no database is configured.
    ComparisonUnavailable,
}

impl Reply {
    /// The text shown to the user.
    pub fn text(&self) -> &str {
        match self {
            Reply::Comparison(c) => &c.json,
            Reply::Policy(p) => &p.answer,
            Reply::ComparisonUnavailable => MSG_COMPARISON_UNAVAILABLE,
        }
    }
}

pub struct Assistant {
    classifier: IntentClassifier,
    policy: PolicyModule,
    comparison: Option<PremiumComparison>,
    profile: Mutex<InsuredProfile>,
}

impl Assistant {
    pub fn new(
        classifier: IntentClassifier,
        policy: PolicyModule,
        comparison: Option<PremiumComparison>,
        profile: InsuredProfile,
    ) -> Self {
        Self { classifier, policy, comparison, profile: Mutex::new(profile) }
    }

    /// Wire every collaborator from a service context.
    pub fn from_context(ctx: &ServiceContext) -> Self {
        let s = &ctx.settings;
        let classifier = IntentClassifier::new(Arc::clone(&ctx.chat), Arc::clone(&ctx.prompts), &s.llm.model);
        let synthesizer = LlmAnswerSynthesizer::new(
            Arc::clone(&ctx.chat),
            Arc::clone(&ctx.prompts),
            ctx.registry.clone(),
            &s.llm.answer_model,
        )
        .sampling(s.llm.temperature, s.llm.max_tokens);
        let engine = VectorSearchEngine::new(Arc::clone(&ctx.embedder), SearchOptions::from(&s.search));
        let policy = PolicyModule::new(
            Arc::clone(&ctx.store),
            CollectionResolver::new(ctx.registry.clone()),
            engine,
            Arc::new(synthesizer),
            s.search.top_k,
        );
        let comparison = ctx.db.as_ref().map(|pool| {
            PremiumComparison::new(
                SqlGenerator::new(Arc::clone(&ctx.chat), Arc::clone(&ctx.prompts), &s.llm.model),
                Arc::new(MySqlExecutor::new(pool.clone())),
                JsonConverter::new(Arc::clone(&ctx.chat), Arc::clone(&ctx.prompts), &s.llm.model),
            )
        });
        Self::new(classifier, policy, comparison, InsuredProfile::from(&s.profile))
    }

    pub fn profile(&self) -> InsuredProfile {
        self.profile.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Classify the question and answer it on the matching path.
    pub async fn respond(&self, question: &str) -> anyhow::Result<Reply> {
        let intent = self.classifier.classify(question).await?;
        match intent {
            Intent::Compare => {
                let Some(comparison) = &self.comparison else {
                    info!("comparison requested without a database");
                    return Ok(Reply::ComparisonUnavailable);
                };
                let outcome = comparison.compare(question, &self.profile()).await?;
                *self.profile.lock().unwrap_or_else(|p| p.into_inner()) = outcome.profile.clone();
                Ok(Reply::Comparison(outcome))
            }
            Intent::Policy => Ok(Reply::Policy(self.policy.respond(question).await?)),
        }
    }
}
