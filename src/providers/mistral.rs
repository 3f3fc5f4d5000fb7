use std::{env, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{
    error::LLMError,
    providers::LLMProvider,
    types::{ChatMessage, CompletionRequest, CompletionResponse, TokenUsage},
};

const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";

// Back-off ladder for HTTP 429 before the error is surfaced to the agent.
const RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(5),
    Duration::from_secs(15),
    Duration::from_secs(30),
];

#[derive(Debug, Clone)]
pub struct MistralConfig {
    pub api_key: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl MistralConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(60),
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

#[derive(Debug, Clone)]
pub struct Mistral {
    client: Client,
    config: MistralConfig,
}

impl Mistral {
    pub fn new(api_key: impl Into<String>) -> Result<Self, LLMError> {
        Self::from_config(MistralConfig::new(api_key))
    }

    pub fn from_env() -> Result<Self, LLMError> {
        let api_key =
            env::var("MISTRAL_API_KEY").map_err(|_| LLMError::MissingApiKey("MISTRAL_API_KEY"))?;
        let mut config = MistralConfig::new(api_key);

        if let Ok(base_url) = env::var("MISTRAL_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(timeout_ms) = env::var("MISTRAL_REQUEST_TIMEOUT_MS") {
            if let Ok(ms) = timeout_ms.parse::<u64>() {
                config.request_timeout = Duration::from_millis(ms);
            }
        }

        Self::from_config(config)
    }

    pub fn from_config(config: MistralConfig) -> Result<Self, LLMError> {
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
struct MistralRequestBody {
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
impl LLMProvider for Mistral {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
        let body = MistralRequestBody {
            model: request.model,
            messages: request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: request.response_format,
        };

        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(self.endpoint("chat/completions"))
                .bearer_auth(&self.config.api_key)
                .json(&body)
                .send()
                .await?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS && attempt < RETRY_DELAYS.len() {
                let delay = RETRY_DELAYS[attempt];
                attempt += 1;
                warn!(
                    delay_s = delay.as_secs(),
                    attempt,
                    total = RETRY_DELAYS.len(),
                    "rate limited by Mistral, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

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

            return Ok(CompletionResponse {
                message: choice.message,
                usage: parsed.usage,
            });
        }
    }

    fn name(&self) -> &'static str {
        "mistral"
    }
}
