use async_trait::async_trait;

use crate::types::{CompletionRequest, CompletionResponse};
use crate::LLMError;

pub mod hf;
pub mod local;
pub mod mistral;
pub mod scripted;

/// A model backend: role-tagged messages in, response text out. Auth and
/// transport retries live behind this trait; callers only see "text or
/// error".
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError>;

    fn name(&self) -> &'static str;
}
