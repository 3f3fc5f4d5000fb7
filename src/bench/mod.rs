use thiserror::Error;

use crate::showdown::ServerError;
use crate::LLMError;

pub mod report;
pub mod runner;

/// Configuration-time and run-level failures. Per-turn anomalies never show
/// up here; they are recovered inside the agents and translators.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("unknown agent '{0}': available agents are random, mistral:<model-id>, hf:<model-id>, local:<model-id>")]
    UnknownAgent(String),

    #[error(transparent)]
    Llm(#[from] LLMError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
