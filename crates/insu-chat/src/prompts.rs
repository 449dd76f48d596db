//! Prompt templates rendered with minijinja.
//!
//! Templates are compiled into the binary from `prompts/`; the premium
//! schema can be swapped for tests or other databases.

use minijinja::{context, Environment};
use serde::Serialize;

use insu_core::{Error, Result};
use insu_route::InsuredProfile;

const INTENT: &str = "intent_prompt.jinja";
const SQL: &str = "base_prompt.jinja";
const CONVERTER: &str = "example_prompt.jinja";
const POLICY: &str = "policy_answer.jinja";

pub const DEFAULT_SCHEMA: &str = include_str!("../prompts/schema.sql");

pub struct PromptEngine {
    env: Environment<'static>,
    schema: String,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        for (name, source) in [
            (INTENT, include_str!("../prompts/intent_prompt.jinja")),
            (SQL, include_str!("../prompts/base_prompt.jinja")),
            (CONVERTER, include_str!("../prompts/example_prompt.jinja")),
            (POLICY, include_str!("../prompts/policy_answer.jinja")),
        ] {
            env.add_template(name, source).map_err(template_error)?;
        }
        Ok(Self { env, schema: DEFAULT_SCHEMA.to_string() })
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn render_intent_prompt(&self, question: &str) -> Result<String> {
        self.render(INTENT, context! { question })
    }

    /// System prompt for SQL generation, filled with the insured profile.
    pub fn render_sql_prompt(&self, profile: &InsuredProfile) -> Result<String> {
        self.render(
            SQL,
            context! {
                schema => &self.schema,
                name => &profile.custom_name,
                age => profile.insured_age,
                sex => profile.sex.label(),
                sex_num => profile.sex.code(),
                product_type => profile.product_type.code(),
                product_type_label => profile.product_type.label(),
                expiry_year => profile.expiry_year(),
                default_insurer => &profile.default_insurer,
            },
        )
    }

    pub fn render_converter_prompt(&self, data: &str) -> Result<String> {
        self.render(CONVERTER, context! { data })
    }

    pub fn render_policy_prompt(&self, query: &str, context: &str) -> Result<String> {
        self.render(POLICY, context! { query, context })
    }

    fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String> {
        self.env.get_template(name).and_then(|t| t.render(ctx)).map_err(template_error)
    }
}

fn template_error(e: minijinja::Error) -> Error {
    Error::Chat(format!("prompt template error: {e}"))
}
