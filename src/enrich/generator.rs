//! Text generation providers: trait + OpenAI / Claude / mock / disabled.
//!
//! Providers only move text; prompt building and parsing live in `prompt.rs`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AiConfig;
use crate::error::GenerateError;

const USER_AGENT: &str = "ai-trends-aggregator/0.1";
const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Black-box generation capability: prompt in, text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynGenerator = Arc<dyn TextGenerator>;

/// Build a generator according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock.
/// * Else if `config.enabled == false`, returns a disabled generator.
/// * Else builds the configured provider.
pub fn build_generator(config: &AiConfig) -> anyhow::Result<DynGenerator> {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Arc::new(MockGenerator::default()));
    }

    if !config.enabled {
        return Ok(Arc::new(DisabledGenerator));
    }

    let timeout = Duration::from_secs(config.timeout_secs);
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiGenerator::new(
            config.api_key.clone(),
            config.model.as_deref(),
            config.max_tokens,
            timeout,
        )?)),
        "claude" | "anthropic" => Ok(Arc::new(ClaudeGenerator::new(
            config.api_key.clone(),
            config.model.as_deref(),
            config.max_tokens,
            timeout,
        )?)),
        other => {
            tracing::warn!(target: "enrich", provider = other, "unknown AI provider; enrichment disabled");
            Ok(Arc::new(DisabledGenerator))
        }
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, GenerateError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(4))
        .timeout(timeout)
        .build()?)
}

// ------------------------------------------------------------
// OpenAI (Chat Completions)
// ------------------------------------------------------------

pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiGenerator {
    /// `model_override`: defaults to gpt-4o-mini.
    pub fn new(
        api_key: String,
        model_override: Option<&str>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, GenerateError> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key,
            model: model_override.unwrap_or("gpt-4o-mini").to_string(),
            max_tokens,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        if self.api_key.is_empty() {
            return Err(GenerateError::MissingApiKey("openai"));
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: Option<String>,
        }

        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: 0.3,
            max_tokens: self.max_tokens,
        };

        let resp = self
            .http
            .post(OPENAI_URL)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(GenerateError::Status(resp.status().as_u16()));
        }
        let body: Resp = resp.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|s| !s.trim().is_empty())
            .ok_or(GenerateError::EmptyResponse)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Anthropic (Messages API)
// ------------------------------------------------------------

pub struct ClaudeGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ClaudeGenerator {
    /// `model_override`: defaults to claude-sonnet-4-20250514.
    pub fn new(
        api_key: String,
        model_override: Option<&str>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, GenerateError> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key,
            model: model_override
                .unwrap_or("claude-sonnet-4-20250514")
                .to_string(),
            max_tokens,
        })
    }
}

#[async_trait]
impl TextGenerator for ClaudeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        if self.api_key.is_empty() {
            return Err(GenerateError::MissingApiKey("claude"));
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            max_tokens: u32,
            messages: Vec<Msg<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            content: Vec<Block>,
        }
        #[derive(Deserialize)]
        struct Block {
            #[serde(default)]
            text: Option<String>,
        }

        let req = Req {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
        };

        let resp = self
            .http
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(GenerateError::Status(resp.status().as_u16()));
        }
        let body: Resp = resp.json().await?;
        let text: String = body
            .content
            .into_iter()
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join("\n");
        if text.trim().is_empty() {
            Err(GenerateError::EmptyResponse)
        } else {
            Ok(text)
        }
    }

    fn provider_name(&self) -> &'static str {
        "claude"
    }
}

// ------------------------------------------------------------
// Disabled + mock
// ------------------------------------------------------------

/// Always fails; every item ends up with fallback values.
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
        Err(GenerateError::Disabled)
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic generator for tests/local runs.
#[derive(Clone)]
pub struct MockGenerator {
    pub fixed: String,
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self {
            fixed: "SUMMARY: A project drawing attention in the AI/ML community (mock).\n\
                    TRENDING: It combines a clear use case with fresh activity. \
                    Developers are starring and sharing it quickly."
                .to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
        Ok(self.fixed.clone())
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
