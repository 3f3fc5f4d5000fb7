use std::collections::VecDeque;

use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::showdown::{
    BattleServer, BattleView, Outcome, PlayerSlot, ServerCommand, ServerError, ServerEvent,
    ServerMon, SideState,
};

const MAX_TURNS: u32 = 60;

/// In-process stand-in for a live battle server.
///
/// Not a rules engine: it hands out legal action lists, decays HP on moves
/// and declares an authoritative outcome, which is all the match loop needs.
/// Used by the integration tests and the CLI's offline mode.
pub struct SimServer {
    rng: SmallRng,
    usernames: [Option<String>; 2],
    battle: Option<SimBattle>,
    battle_seq: u32,
    queue: VecDeque<ServerEvent>,
}

struct SimBattle {
    id: String,
    turn: u32,
    sides: [SimSide; 2],
}

struct SimSide {
    team: Vec<SimMon>,
    active: usize,
    tera_used: bool,
    pending: Option<ServerCommand>,
}

#[derive(Clone)]
struct SimMon {
    species: String,
    hp: f32,
    fainted: bool,
    moves: Vec<String>,
}

impl SimMon {
    fn new(species: &str, moves: [&str; 4]) -> Self {
        Self {
            species: species.to_string(),
            hp: 1.0,
            fainted: false,
            moves: moves.iter().map(|m| m.to_string()).collect(),
        }
    }
}

fn default_team(slot: PlayerSlot) -> Vec<SimMon> {
    match slot {
        PlayerSlot::P1 => vec![
            SimMon::new("pikachu", ["thunderbolt", "quickattack", "irontail", "tackle"]),
            SimMon::new("charizard", ["flamethrower", "airslash", "dragonclaw", "tackle"]),
            SimMon::new("blastoise", ["surf", "icebeam", "rapidspin", "tackle"]),
        ],
        PlayerSlot::P2 => vec![
            SimMon::new("gengar", ["shadowball", "sludgebomb", "hex", "tackle"]),
            SimMon::new("snorlax", ["bodyslam", "rest", "crunch", "tackle"]),
            SimMon::new("garchomp", ["earthquake", "dragonclaw", "stoneedge", "tackle"]),
        ],
    }
}

impl SimServer {
    pub fn new() -> Self {
        Self::from_rng(SmallRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(SmallRng::seed_from_u64(seed))
    }

    fn from_rng(rng: SmallRng) -> Self {
        Self {
            rng,
            usernames: [None, None],
            battle: None,
            battle_seq: 0,
            queue: VecDeque::new(),
        }
    }

    fn slot_index(slot: PlayerSlot) -> usize {
        match slot {
            PlayerSlot::P1 => 0,
            PlayerSlot::P2 => 1,
        }
    }

    fn view_for(battle: &SimBattle, slot: PlayerSlot) -> BattleView {
        let me = &battle.sides[Self::slot_index(slot)];
        let them = &battle.sides[Self::slot_index(slot.opponent())];

        let own_active = me.team.get(me.active).map(|mon| ServerMon {
            species: mon.species.clone(),
            hp: mon.hp,
            fainted: mon.fainted,
            moves: mon.moves.clone(),
            ..ServerMon::new(&mon.species)
        });
        let own_bench = me
            .team
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != me.active)
            .map(|(_, mon)| ServerMon {
                species: mon.species.clone(),
                hp: mon.hp,
                fainted: mon.fainted,
                moves: mon.moves.clone(),
                ..ServerMon::new(&mon.species)
            })
            .collect();

        // The sim only ever reveals the opponent's active unit.
        let opp_active = them.team.get(them.active).map(|mon| ServerMon {
            species: mon.species.clone(),
            hp: mon.hp,
            fainted: mon.fainted,
            ..ServerMon::new(&mon.species)
        });

        let legal_moves = match me.team.get(me.active) {
            Some(mon) if !mon.fainted => mon.moves.clone(),
            _ => Vec::new(),
        };
        let legal_switches = me
            .team
            .iter()
            .enumerate()
            .filter(|(i, mon)| *i != me.active && !mon.fainted)
            .map(|(_, mon)| mon.species.clone())
            .collect();

        BattleView {
            battle_id: battle.id.clone(),
            turn: battle.turn,
            side: SideState {
                active: own_active,
                bench: own_bench,
                conditions: Default::default(),
            },
            opponent: SideState {
                active: opp_active,
                bench: Vec::new(),
                conditions: Default::default(),
            },
            effects: Vec::new(),
            can_tera: !me.tera_used,
            legal_moves,
            legal_switches,
        }
    }

    fn enqueue_turn_requests(&mut self) {
        if let Some(battle) = &self.battle {
            for slot in [PlayerSlot::P1, PlayerSlot::P2] {
                self.queue.push_back(ServerEvent::TurnRequest {
                    slot,
                    view: Self::view_for(battle, slot),
                });
            }
        }
    }

    fn resolve_turn(&mut self) {
        let Some(battle) = &mut self.battle else {
            return;
        };

        for idx in 0..2 {
            let command = battle.sides[idx].pending.take();
            let command = Self::materialize(&mut self.rng, &battle.sides[idx], command);
            match command {
                ServerCommand::Switch { species } => {
                    let side = &mut battle.sides[idx];
                    if let Some(target) = side
                        .team
                        .iter()
                        .position(|mon| mon.species == species && !mon.fainted)
                    {
                        side.active = target;
                    }
                }
                ServerCommand::Move { tera, .. } => {
                    if tera {
                        battle.sides[idx].tera_used = true;
                    }
                    let damage = 0.25 + self.rng.gen_range(0.0..0.15);
                    let defender = &mut battle.sides[1 - idx];
                    if let Some(mon) = defender.team.get_mut(defender.active) {
                        mon.hp = (mon.hp - damage).max(0.0);
                    }
                }
                ServerCommand::RandomLegal => {}
            }
        }

        // Faint check and automatic replacement.
        let mut out = [false, false];
        for (idx, side) in battle.sides.iter_mut().enumerate() {
            if let Some(mon) = side.team.get_mut(side.active) {
                if mon.hp <= 0.0 {
                    mon.fainted = true;
                }
            }
            if side.team.get(side.active).map_or(true, |m| m.fainted) {
                match side.team.iter().position(|mon| !mon.fainted) {
                    Some(next) => side.active = next,
                    None => out[idx] = true,
                }
            }
        }

        battle.turn += 1;

        let outcome = match out {
            [true, true] => Some(Outcome::Draw),
            [true, false] => Some(Outcome::P2),
            [false, true] => Some(Outcome::P1),
            [false, false] if battle.turn > MAX_TURNS => Some(Outcome::Draw),
            _ => None,
        };

        if let Some(outcome) = outcome {
            let turns = battle.turn - 1;
            let battle_id = battle.id.clone();
            debug!(
                battle = %battle_id,
                ?outcome,
                turns,
                p1 = self.usernames[0].as_deref().unwrap_or("?"),
                p2 = self.usernames[1].as_deref().unwrap_or("?"),
                "sim battle finished"
            );
            self.battle = None;
            self.queue.push_back(ServerEvent::BattleEnd {
                battle_id,
                outcome,
                turns,
            });
        } else {
            self.enqueue_turn_requests();
        }
    }

    /// Resolve RandomLegal and illegal commands into a concrete legal one.
    fn materialize(
        rng: &mut SmallRng,
        side: &SimSide,
        command: Option<ServerCommand>,
    ) -> ServerCommand {
        let legal_moves: Vec<&String> = side
            .team
            .get(side.active)
            .filter(|mon| !mon.fainted)
            .map(|mon| mon.moves.iter().collect())
            .unwrap_or_default();
        let legal = |command: &ServerCommand| match command {
            ServerCommand::Move { move_id, .. } => legal_moves.iter().any(|m| *m == move_id),
            ServerCommand::Switch { species } => side
                .team
                .iter()
                .enumerate()
                .any(|(i, mon)| i != side.active && !mon.fainted && mon.species == *species),
            ServerCommand::RandomLegal => false,
        };

        match command {
            Some(command) if legal(&command) => command,
            _ => match legal_moves.choose(rng) {
                Some(move_id) => ServerCommand::Move {
                    move_id: (*move_id).clone(),
                    tera: false,
                },
                None => ServerCommand::Move {
                    move_id: crate::state::DEFAULT_MOVE.to_string(),
                    tera: false,
                },
            },
        }
    }
}

impl Default for SimServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BattleServer for SimServer {
    async fn register(&mut self, slot: PlayerSlot, username: &str) -> Result<(), ServerError> {
        self.usernames[Self::slot_index(slot)] = Some(username.to_string());
        Ok(())
    }

    async fn start_battle(&mut self, format: &str) -> Result<String, ServerError> {
        if self.battle.is_some() {
            return Err(ServerError::Protocol("battle already in progress".into()));
        }
        self.battle_seq += 1;
        let id = format!("battle-{format}-{}", self.battle_seq);
        self.battle = Some(SimBattle {
            id: id.clone(),
            turn: 1,
            sides: [
                SimSide {
                    team: default_team(PlayerSlot::P1),
                    active: 0,
                    tera_used: false,
                    pending: None,
                },
                SimSide {
                    team: default_team(PlayerSlot::P2),
                    active: 0,
                    tera_used: false,
                    pending: None,
                },
            ],
        });
        self.queue.clear();
        self.enqueue_turn_requests();
        Ok(id)
    }

    async fn next_event(&mut self) -> Result<ServerEvent, ServerError> {
        self.queue.pop_front().ok_or(ServerError::NoBattle)
    }

    async fn submit(
        &mut self,
        battle_id: &str,
        slot: PlayerSlot,
        command: ServerCommand,
    ) -> Result<(), ServerError> {
        let battle = self.battle.as_mut().ok_or(ServerError::NoBattle)?;
        if battle.id != battle_id {
            return Err(ServerError::UnknownBattle(battle_id.to_string()));
        }
        battle.sides[Self::slot_index(slot)].pending = Some(command);
        if battle.sides.iter().all(|side| side.pending.is_some()) {
            self.resolve_turn();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn battle_runs_to_completion_on_random_commands() {
        let mut server = SimServer::with_seed(7);
        server.register(PlayerSlot::P1, "alice").await.unwrap();
        server.register(PlayerSlot::P2, "bob").await.unwrap();
        let id = server.start_battle("gen9randombattle").await.unwrap();

        let mut guard = 0;
        loop {
            guard += 1;
            assert!(guard < 1000, "battle did not terminate");
            match server.next_event().await.unwrap() {
                ServerEvent::TurnRequest { slot, view } => {
                    assert_eq!(view.battle_id, id);
                    assert!(!view.legal_moves.is_empty() || !view.legal_switches.is_empty());
                    server
                        .submit(&view.battle_id, slot, ServerCommand::RandomLegal)
                        .await
                        .unwrap();
                }
                ServerEvent::BattleEnd { turns, .. } => {
                    assert!(turns > 0);
                    break;
                }
            }
        }
    }

    #[tokio::test]
    async fn opponent_view_carries_no_hidden_fields() {
        let mut server = SimServer::with_seed(1);
        server.start_battle("gen9randombattle").await.unwrap();
        let event = server.next_event().await.unwrap();
        let ServerEvent::TurnRequest { view, .. } = event else {
            panic!("expected turn request");
        };
        let opp = view.opponent.active.expect("opponent active");
        assert!(opp.moves.is_empty());
        assert!(opp.ability.is_none());
        assert!(opp.item.is_none());
        assert!(view.opponent.bench.is_empty());
    }
}
