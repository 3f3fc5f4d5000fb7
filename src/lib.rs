pub mod agents;
pub mod bench;
pub mod error;
pub mod extract;
pub mod parser;
pub mod providers;
pub mod showdown;
pub mod state;
pub mod translate;
pub mod types;

pub use agents::{build_agent, DecisionAgent, LlmAgent, LlmAgentConfig, RandomAgent};
pub use bench::report::{write_report, BattleResult, BenchmarkReport, TurnStat};
pub use bench::runner::{sanitize_username, MatchRunner};
pub use bench::BenchError;
pub use error::LLMError;
pub use extract::StateExtractor;
pub use parser::{Decision, ResponseParser};
pub use providers::LLMProvider;
pub use showdown::{BattleServer, BattleView, Outcome, PlayerSlot, ServerCommand, ServerEvent};
pub use state::{Action, ActivePokemonState, PokemonState, SideConditions, StateSnapshot};
pub use translate::ActionTranslator;
pub use types::{
    ChatMessage, CompletionRequest, CompletionResponse, MessageRole, TokenUsage,
};
