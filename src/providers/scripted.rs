use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    providers::LLMProvider,
    types::{ChatMessage, CompletionRequest, CompletionResponse},
    LLMError,
};

/// Replays a canned sequence of responses; errors once exhausted. Test
/// double for any [`LLMProvider`] consumer.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }

    /// Repeats one response indefinitely by refilling on take.
    pub fn repeating(response: impl Into<String>) -> RepeatingProvider {
        RepeatingProvider {
            response: response.into(),
        }
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
        let next = self
            .responses
            .lock()
            .map_err(|_| LLMError::Provider("scripted provider poisoned".to_string()))?
            .pop_front();
        match next {
            Some(response) => Ok(CompletionResponse {
                message: ChatMessage::assistant(response),
                usage: None,
            }),
            None => Err(LLMError::Provider("no more scripted responses".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

pub struct RepeatingProvider {
    response: String,
}

#[async_trait]
impl LLMProvider for RepeatingProvider {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
        Ok(CompletionResponse {
            message: ChatMessage::assistant(self.response.clone()),
            usage: None,
        })
    }

    fn name(&self) -> &'static str {
        "repeating"
    }
}

/// Always fails; exercises the backend-failure fallback path.
pub struct FailingProvider;

#[async_trait]
impl LLMProvider for FailingProvider {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
        Err(LLMError::Provider("simulated backend outage".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}
