use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::{Boosts, StatusCondition};

pub mod sim;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("unknown battle: {0}")]
    UnknownBattle(String),

    #[error("no battle in progress")]
    NoBattle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerSlot {
    P1,
    P2,
}

impl PlayerSlot {
    pub fn opponent(&self) -> PlayerSlot {
        match self {
            PlayerSlot::P1 => PlayerSlot::P2,
            PlayerSlot::P2 => PlayerSlot::P1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    P1,
    P2,
    Draw,
}

/// One unit as the server reports it to this client. The opponent's side
/// only ever carries fields the server has revealed; the extractor strips
/// the rest down to the snapshot schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMon {
    pub species: String,
    pub hp: f32,
    pub fainted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusCondition>,
    #[serde(default)]
    pub boosts: Boosts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tera_type: Option<String>,
    #[serde(default)]
    pub terastallized: bool,
    #[serde(default)]
    pub moves: Vec<String>,
}

impl ServerMon {
    pub fn new(species: impl Into<String>) -> Self {
        Self {
            species: species.into(),
            hp: 1.0,
            fainted: false,
            status: None,
            boosts: Boosts::default(),
            ability: None,
            item: None,
            tera_type: None,
            terastallized: false,
            moves: Vec::new(),
        }
    }
}

/// One side of the field as the server reports it. `bench` excludes the
/// active unit. `conditions` maps raw condition tokens (e.g. "stealthrock",
/// "spikes") to their stack counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideState {
    pub active: Option<ServerMon>,
    #[serde(default)]
    pub bench: Vec<ServerMon>,
    #[serde(default)]
    pub conditions: HashMap<String, u8>,
}

/// The per-turn state object the server hands this client before a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleView {
    pub battle_id: String,
    pub turn: u32,
    /// The viewing player's own side, fully populated.
    pub side: SideState,
    /// The opponent's side, revealed information only.
    pub opponent: SideState,
    /// Raw field-effect tokens active this turn (weather, terrain, room
    /// effects), in server order.
    #[serde(default)]
    pub effects: Vec<String>,
    pub can_tera: bool,
    pub legal_moves: Vec<String>,
    pub legal_switches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ServerCommand {
    Move { move_id: String, tera: bool },
    Switch { species: String },
    /// Ask the server to pick any currently legal command.
    RandomLegal,
}

#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A side must submit a command for the given view.
    TurnRequest { slot: PlayerSlot, view: BattleView },
    /// Authoritative end-of-battle result.
    BattleEnd {
        battle_id: String,
        outcome: Outcome,
        turns: u32,
    },
}

/// Boundary to the authoritative battle simulator.
///
/// Implementations are connection-stateful and must be driven from a single
/// task: launch a battle, pull events, submit one command per turn request.
#[async_trait]
pub trait BattleServer: Send {
    /// Claim a session identity for one player slot. Identifiers must
    /// already satisfy the server's constraints (see
    /// [`crate::bench::runner::sanitize_username`]).
    async fn register(&mut self, slot: PlayerSlot, username: &str) -> Result<(), ServerError>;

    /// Start one battle in the given format and return its id.
    async fn start_battle(&mut self, format: &str) -> Result<String, ServerError>;

    /// Block until the next event for the battle in progress.
    async fn next_event(&mut self) -> Result<ServerEvent, ServerError>;

    /// Submit a command for one side of a battle.
    async fn submit(
        &mut self,
        battle_id: &str,
        slot: PlayerSlot,
        command: ServerCommand,
    ) -> Result<(), ServerError>;
}
