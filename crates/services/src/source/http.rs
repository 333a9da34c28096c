use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use quiz_core::QuestionCatalog;
use quiz_core::model::RawQuestion;

use super::{QuestionSource, StaticSource};
use crate::config::GeneratorConfig;
use crate::error::GenerationError;

/// Generates questions through an OpenAI-compatible chat completions API.
///
/// The static catalog is delegated to an inner [`StaticSource`].
#[derive(Clone)]
pub struct HttpQuestionSource {
    client: Client,
    config: Option<GeneratorConfig>,
    catalog: StaticSource,
}

impl HttpQuestionSource {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(GeneratorConfig::from_env(), StaticSource::from_env())
    }

    #[must_use]
    pub fn new(config: Option<GeneratorConfig>, catalog: StaticSource) -> Self {
        Self {
            client: Client::new(),
            config,
            catalog,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl QuestionSource for HttpQuestionSource {
    fn load_default(&self) -> QuestionCatalog {
        self.catalog.load_default()
    }

    async fn generate(
        &self,
        topic: &str,
        count: usize,
    ) -> Result<Vec<RawQuestion>, GenerationError> {
        let config = self.config.as_ref().ok_or(GenerationError::Unavailable)?;

        let prompt = GenerationPrompt { topic, count }.to_string();
        let payload = CompletionRequest::new(&config.model, &prompt);

        debug!(topic, count, model = %config.model, "requesting generated questions");
        let response = self
            .client
            .post(config.completions_url())
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        let body: CompletionResponse = response.json().await?;
        let content = body
            .into_content()
            .ok_or_else(|| GenerationError::Malformed("empty completion".into()))?;

        parse_records(&content)
    }
}

const SYSTEM_PROMPT: &str =
    "You write multiple-choice quiz questions and reply with a JSON array only.";

/// The user turn asking for one batch of questions.
struct GenerationPrompt<'a> {
    topic: &'a str,
    count: usize,
}

impl fmt::Display for GenerationPrompt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { topic, count } = self;
        writeln!(f, "Generate {count} multiple-choice quiz questions about {topic}.")?;
        writeln!(f, "Each question must have exactly 4 options and indicate the correct answer.")?;
        writeln!(f, "Format each question as a JSON object with these fields:")?;
        writeln!(f, "  \"question\": the question text,")?;
        writeln!(f, "  \"options\": an array of 4 strings,")?;
        writeln!(f, "  \"answer\": the 0-based index of the correct option,")?;
        writeln!(f, "  \"difficulty\": one of Easy, Medium, Hard, Expert,")?;
        writeln!(f, "  \"explanation\": one sentence.")?;
        f.write_str("Return only the JSON array of questions.")
    }
}

fn status_error(status: StatusCode) -> GenerationError {
    if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
        GenerationError::Timeout
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        GenerationError::Transport(format!("status {status}"))
    } else {
        GenerationError::Unavailable
    }
}

/// Parse a model reply into raw records, tolerating a fenced code block.
fn parse_records(content: &str) -> Result<Vec<RawQuestion>, GenerationError> {
    let body = strip_code_fence(content);
    let value: Value =
        serde_json::from_str(body).map_err(|e| GenerationError::Malformed(e.to_string()))?;
    let Value::Array(items) = value else {
        return Err(GenerationError::Malformed(
            "expected a JSON array of questions".into(),
        ));
    };
    items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item).map_err(|e| GenerationError::Malformed(e.to_string()))
        })
        .collect()
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum Role {
    System,
    User,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
}

impl<'a> CompletionRequest<'a> {
    fn new(model: &'a str, prompt: &'a str) -> Self {
        Self {
            model,
            messages: [
                Message {
                    role: Role::System,
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: Role::User,
                    content: prompt,
                },
            ],
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Reply,
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionResponse {
    /// Text of the first choice, if the model produced any.
    fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
    }
}
