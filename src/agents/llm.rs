use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::agents::prompt::{build_prompt, SYSTEM_PROMPT};
use crate::agents::DecisionAgent;
use crate::bench::report::TurnStat;
use crate::parser::{Decision, ResponseParser};
use crate::providers::LLMProvider;
use crate::state::{Action, StateSnapshot};
use crate::types::{ChatMessage, CompletionRequest};

#[derive(Debug, Clone)]
pub struct LlmAgentConfig {
    /// Minimum spacing between backend calls, measured from the end of the
    /// previous call to the start of the next.
    pub min_call_interval: Duration,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl Default for LlmAgentConfig {
    fn default() -> Self {
        Self {
            min_call_interval: Duration::from_secs(3),
            max_tokens: 200,
            temperature: None,
        }
    }
}

// One cached exchange, keyed by the battle it belongs to.
struct Exchange {
    battle_id: String,
    prompt: String,
    reply: String,
}

/// Model-backed agent. Keeps exactly one prior exchange per battle as
/// conversational memory, throttles backend calls, and records one
/// [`TurnStat`] per decision. Backend failures degrade to the random
/// fallback; they never reach the match loop.
pub struct LlmAgent {
    name: String,
    model: String,
    provider: Arc<dyn LLMProvider>,
    config: LlmAgentConfig,
    parser: ResponseParser,
    memory: Option<Exchange>,
    last_call_end: Option<Instant>,
    turn_stats: Vec<TurnStat>,
}

impl LlmAgent {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        let model = model.into();
        // Short random suffix so mirrored match-ups stay distinguishable.
        let suffix: u32 = rand::thread_rng().gen_range(0..0x0100_0000);
        Self {
            name: format!("{model}-{suffix:06x}"),
            model,
            provider,
            config: LlmAgentConfig::default(),
            parser: ResponseParser::new(),
            memory: None,
            last_call_end: None,
            turn_stats: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: LlmAgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_min_call_interval(mut self, interval: Duration) -> Self {
        self.config.min_call_interval = interval;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn throttle(&self) {
        if let Some(previous) = self.last_call_end {
            let elapsed = previous.elapsed();
            if elapsed < self.config.min_call_interval {
                tokio::time::sleep(self.config.min_call_interval - elapsed).await;
            }
        }
    }

    fn messages_for(&self, battle_id: &str, prompt: &str) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
        if let Some(memory) = &self.memory {
            if memory.battle_id == battle_id {
                messages.push(ChatMessage::user(memory.prompt.clone()));
                messages.push(ChatMessage::assistant(memory.reply.clone()));
            }
        }
        messages.push(ChatMessage::user(prompt.to_string()));
        messages
    }

    #[cfg(test)]
    fn memory_battle_id(&self) -> Option<&str> {
        self.memory.as_ref().map(|memory| memory.battle_id.as_str())
    }
}

#[async_trait]
impl DecisionAgent for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn decide(&mut self, battle_id: &str, snapshot: &StateSnapshot) -> Action {
        // Memory belongs to one battle; a new battle id resets it.
        if self
            .memory
            .as_ref()
            .is_some_and(|memory| memory.battle_id != battle_id)
        {
            self.memory = None;
        }

        self.throttle().await;

        let prompt = build_prompt(snapshot);
        let messages = self.messages_for(battle_id, &prompt);
        let request = CompletionRequest::new(self.model.clone(), messages)
            .with_max_tokens(self.config.max_tokens)
            .with_response_format(json!({"type": "json_object"}));
        let request = match self.config.temperature {
            Some(temperature) => request.with_temperature(temperature),
            None => request,
        };
        let context_chars = request.content_chars();

        let start = Instant::now();
        let result = self.provider.complete(request).await;
        let now = Instant::now();
        self.last_call_end = Some(now);
        let decision_ms = now.duration_since(start).as_millis() as u64;

        let decision = match result {
            Ok(response) => {
                let raw = response.message.text().unwrap_or_default().to_string();
                debug!(agent = %self.name, raw = %raw, "model response");
                let decision = self.parser.parse(&raw, snapshot, &self.name);
                self.memory = Some(Exchange {
                    battle_id: battle_id.to_string(),
                    prompt,
                    reply: raw,
                });
                decision
            }
            Err(err) => {
                warn!(agent = %self.name, %err, "backend call failed, falling back");
                Decision {
                    action: self.parser.random_fallback(snapshot),
                    used_fallback: true,
                }
            }
        };

        let reasoning = decision.action.reasoning();
        self.turn_stats.push(TurnStat {
            game_id: battle_id.to_string(),
            turn: snapshot.turn,
            agent: self.name.clone(),
            decision_ms,
            used_fallback: decision.used_fallback,
            context_chars,
            action_kind: decision.action.kind().to_string(),
            reasoning: (!reasoning.is_empty()).then(|| reasoning.to_string()),
            move_id: decision.action.move_id().map(str::to_string),
            effectiveness: None,
        });

        decision.action
    }

    fn drain_turn_stats(&mut self) -> Vec<TurnStat> {
        std::mem::take(&mut self.turn_stats)
    }
}
