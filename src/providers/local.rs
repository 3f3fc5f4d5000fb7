use std::{env, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::LLMError,
    providers::LLMProvider,
    types::{ChatMessage, CompletionRequest, CompletionResponse, TokenUsage},
};

// llama-server / ollama style OpenAI-compatible endpoint.
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080/v1";

/// Locally hosted model behind an OpenAI-compatible chat endpoint. No
/// credential required; generation is slow, so the timeout is generous.
#[derive(Debug, Clone)]
pub struct LocalConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl LocalConfig {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct LocalModel {
    client: Client,
    config: LocalConfig,
}

impl LocalModel {
    pub fn from_env() -> Result<Self, LLMError> {
        let mut config = LocalConfig::new();
        if let Ok(base_url) = env::var("LOCAL_LLM_BASE_URL") {
            config.base_url = base_url;
        }
        Self::from_config(config)
    }

    pub fn from_config(config: LocalConfig) -> Result<Self, LLMError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Serialize)]
struct LocalRequestBody {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ResponseChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    message: ChatMessage,
}

#[async_trait]
impl LLMProvider for LocalModel {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
        let body = LocalRequestBody {
            model: request.model,
            messages: request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: request.response_format,
        };

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(LLMError::Provider(format!("{status}: {detail}")));
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(LLMError::InvalidResponse("no choices in completion"))?;

        Ok(CompletionResponse {
            message: choice.message,
            usage: parsed.usage,
        })
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
