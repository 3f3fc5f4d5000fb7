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

// HuggingFace inference router, OpenAI-compatible chat surface.
const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/v1";

#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub token: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl HuggingFaceConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(120),
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

/// Serverless HuggingFace inference. Routed models can cold-start, so the
/// default timeout is longer than Mistral's.
#[derive(Debug, Clone)]
pub struct HuggingFace {
    client: Client,
    config: HuggingFaceConfig,
}

impl HuggingFace {
    pub fn new(token: impl Into<String>) -> Result<Self, LLMError> {
        Self::from_config(HuggingFaceConfig::new(token))
    }

    pub fn from_env() -> Result<Self, LLMError> {
        let token = env::var("HF_TOKEN").map_err(|_| LLMError::MissingApiKey("HF_TOKEN"))?;
        let mut config = HuggingFaceConfig::new(token);

        if let Ok(base_url) = env::var("HF_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(timeout_ms) = env::var("HF_REQUEST_TIMEOUT_MS") {
            if let Ok(ms) = timeout_ms.parse::<u64>() {
                config.request_timeout = Duration::from_millis(ms);
            }
        }

        Self::from_config(config)
    }

    pub fn from_config(config: HuggingFaceConfig) -> Result<Self, LLMError> {
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
struct HfRequestBody {
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
impl LLMProvider for HuggingFace {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
        let body = HfRequestBody {
            model: request.model,
            messages: request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: request.response_format,
        };

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.config.token)
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
        "huggingface"
    }
}
