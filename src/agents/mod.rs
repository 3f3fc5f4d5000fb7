use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::bench::report::TurnStat;
use crate::bench::BenchError;
use crate::parser::ResponseParser;
use crate::providers::hf::HuggingFace;
use crate::providers::local::LocalModel;
use crate::providers::mistral::Mistral;
use crate::state::{Action, StateSnapshot};

pub mod llm;
pub mod prompt;

pub use llm::{LlmAgent, LlmAgentConfig};

/// A pluggable decision-maker. One decision per turn; `name` identifies the
/// agent in reports and must stay stable for the whole run.
#[async_trait]
pub trait DecisionAgent: Send {
    fn name(&self) -> &str;

    /// Choose an action for one decision point. Must always return a legal
    /// action (or the forced default); per-turn failures are handled
    /// internally, never surfaced to the match loop.
    async fn decide(&mut self, battle_id: &str, snapshot: &StateSnapshot) -> Action;

    /// Hand over telemetry accumulated since the last drain. Agents without
    /// telemetry return nothing.
    fn drain_turn_stats(&mut self) -> Vec<TurnStat> {
        Vec::new()
    }
}

/// Uniformly samples the legal action set. No state, no telemetry.
pub struct RandomAgent {
    name: String,
    parser: ResponseParser,
}

impl RandomAgent {
    pub fn new() -> Self {
        Self {
            name: "random".to_string(),
            parser: ResponseParser::new(),
        }
    }
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecisionAgent for RandomAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn decide(&mut self, _battle_id: &str, snapshot: &StateSnapshot) -> Action {
        self.parser.random_fallback(snapshot)
    }
}

/// Agent registry: `random`, `mistral:<model-id>`, `hf:<model-id>`,
/// `local:<model-id>`.
///
/// Configuration errors (unknown id, missing credential) surface here,
/// before any battle starts. `throttle` overrides the default minimum
/// spacing between backend calls for LLM agents.
pub fn build_agent(
    spec: &str,
    throttle: Option<Duration>,
) -> Result<Box<dyn DecisionAgent>, BenchError> {
    if spec == "random" {
        return Ok(Box::new(RandomAgent::new()));
    }
    if let Some(model) = spec.strip_prefix("mistral:") {
        let provider = Arc::new(Mistral::from_env()?);
        let mut agent = LlmAgent::new(provider, model);
        if let Some(interval) = throttle {
            agent = agent.with_min_call_interval(interval);
        }
        return Ok(Box::new(agent));
    }
    if let Some(model) = spec.strip_prefix("hf:") {
        let provider = Arc::new(HuggingFace::from_env()?);
        let mut agent = LlmAgent::new(provider, model);
        if let Some(interval) = throttle {
            agent = agent.with_min_call_interval(interval);
        }
        return Ok(Box::new(agent));
    }
    if let Some(model) = spec.strip_prefix("local:") {
        let provider = Arc::new(LocalModel::from_env()?);
        let mut agent = LlmAgent::new(provider, model);
        if let Some(interval) = throttle {
            agent = agent.with_min_call_interval(interval);
        }
        return Ok(Box::new(agent));
    }
    Err(BenchError::UnknownAgent(spec.to_string()))
}
