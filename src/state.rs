use serde::{Deserialize, Serialize};

/// Move id submitted when no legal move or switch exists.
pub const DEFAULT_MOVE: &str = "struggle";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCondition {
    #[serde(rename = "brn")]
    Burn,
    #[serde(rename = "par")]
    Paralysis,
    #[serde(rename = "slp")]
    Sleep,
    #[serde(rename = "frz")]
    Freeze,
    #[serde(rename = "psn")]
    Poison,
    #[serde(rename = "tox")]
    Toxic,
}

impl StatusCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCondition::Burn => "brn",
            StatusCondition::Paralysis => "par",
            StatusCondition::Sleep => "slp",
            StatusCondition::Freeze => "frz",
            StatusCondition::Poison => "psn",
            StatusCondition::Toxic => "tox",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    #[default]
    None,
    Rain,
    Sun,
    Sand,
    Snow,
}

impl Weather {
    pub fn as_str(&self) -> &'static str {
        match self {
            Weather::None => "none",
            Weather::Rain => "rain",
            Weather::Sun => "sun",
            Weather::Sand => "sand",
            Weather::Snow => "snow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    #[default]
    None,
    Electric,
    Grassy,
    Psychic,
    Misty,
}

impl Terrain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Terrain::None => "none",
            Terrain::Electric => "electric",
            Terrain::Grassy => "grassy",
            Terrain::Psychic => "psychic",
            Terrain::Misty => "misty",
        }
    }
}

/// Stat-boost stages. All five stats are always present; unset stats are 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Boosts {
    #[serde(default)]
    pub atk: i8,
    #[serde(default)]
    pub def: i8,
    #[serde(default)]
    pub spa: i8,
    #[serde(default)]
    pub spd: i8,
    #[serde(default)]
    pub spe: i8,
}

impl Boosts {
    pub fn entries(&self) -> [(&'static str, i8); 5] {
        [
            ("atk", self.atk),
            ("def", self.def),
            ("spa", self.spa),
            ("spd", self.spd),
            ("spe", self.spe),
        ]
    }

    pub fn is_neutral(&self) -> bool {
        self.entries().iter().all(|(_, stage)| *stage == 0)
    }
}

/// A revealed unit on the bench: species plus public condition only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonState {
    pub species: String,
    /// Health fraction in [0.0, 1.0].
    pub hp: f32,
    pub fainted: bool,
    pub status: Option<StatusCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivePokemonState {
    pub species: String,
    pub hp: f32,
    pub fainted: bool,
    pub status: Option<StatusCondition>,
    pub boosts: Boosts,
    pub ability: Option<String>,
    pub item: Option<String>,
    pub tera_type: Option<String>,
    pub terastallized: bool,
    /// Known move ids. May be incomplete for the opponent.
    pub moves: Vec<String>,
}

impl ActivePokemonState {
    /// Placeholder for decision points where no active unit exists yet.
    pub fn unknown() -> Self {
        Self {
            species: "unknown".to_string(),
            hp: 0.0,
            fainted: true,
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SideConditions {
    pub stealth_rock: bool,
    /// 0..=3
    pub spikes: u8,
    /// 0..=2
    pub toxic_spikes: u8,
    pub reflect: bool,
    pub light_screen: bool,
    pub tailwind: bool,
}

/// The revealed-only description of one decision point.
///
/// Built fresh per decision and never mutated afterwards. `moves` and
/// `switches` together are the exhaustive legal action set for the turn;
/// when both are empty the only legal action is the forced default move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub turn: u32,
    pub active: ActivePokemonState,
    pub opp_active: ActivePokemonState,
    pub team: Vec<PokemonState>,
    pub opp_team: Vec<PokemonState>,
    pub weather: Weather,
    pub terrain: Terrain,
    pub field: Vec<String>,
    pub my_side: SideConditions,
    pub opp_side: SideConditions,
    pub can_tera: bool,
    pub moves: Vec<String>,
    pub switches: Vec<String>,
}

impl StateSnapshot {
    pub fn has_legal_actions(&self) -> bool {
        !self.moves.is_empty() || !self.switches.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action_type", rename_all = "lowercase")]
pub enum Action {
    Move {
        move_id: String,
        #[serde(default)]
        tera: bool,
        #[serde(default)]
        reasoning: String,
    },
    Switch {
        switch_to: String,
        #[serde(default)]
        reasoning: String,
    },
}

impl Action {
    pub fn move_to(move_id: impl Into<String>) -> Self {
        Action::Move {
            move_id: move_id.into(),
            tera: false,
            reasoning: String::new(),
        }
    }

    pub fn switch_to(species: impl Into<String>) -> Self {
        Action::Switch {
            switch_to: species.into(),
            reasoning: String::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::Move { .. } => "move",
            Action::Switch { .. } => "switch",
        }
    }

    pub fn move_id(&self) -> Option<&str> {
        match self {
            Action::Move { move_id, .. } => Some(move_id),
            Action::Switch { .. } => None,
        }
    }

    pub fn reasoning(&self) -> &str {
        match self {
            Action::Move { reasoning, .. } => reasoning,
            Action::Switch { reasoning, .. } => reasoning,
        }
    }
}
