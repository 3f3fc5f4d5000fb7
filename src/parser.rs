use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::state::{Action, StateSnapshot, DEFAULT_MOVE};

// Outermost object-shaped span, for answers wrapped in code fences or prose.
static JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// A parsed decision plus whether it came from the fallback path. The flag
/// feeds the `used_fallback` telemetry column, which the reliability
/// metrics are computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: Action,
    pub used_fallback: bool,
}

impl Decision {
    fn chosen(action: Action) -> Self {
        Self {
            action,
            used_fallback: false,
        }
    }

    fn fallback(action: Action) -> Self {
        Self {
            action,
            used_fallback: true,
        }
    }
}

/// Converts free-form decision text into a legal [`Action`].
///
/// Never errors: anything unparseable or illegal degrades to a uniformly
/// random choice over the snapshot's legal action set, or the fixed default
/// move when that set is empty.
#[derive(Debug, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, raw: &str, snapshot: &StateSnapshot, agent: &str) -> Decision {
        let Some(value) = Self::extract_object(raw) else {
            warn!(agent, "no JSON object in response, falling back");
            return Decision::fallback(self.random_fallback(snapshot));
        };

        let action = match serde_json::from_value::<Action>(value) {
            Ok(action) => action,
            Err(err) => {
                warn!(agent, %err, "unrecognized action shape, falling back");
                return Decision::fallback(self.random_fallback(snapshot));
            }
        };

        match action {
            Action::Move {
                move_id,
                tera,
                reasoning,
            } => {
                let move_id = move_id.trim().to_string();
                if !snapshot.moves.iter().any(|m| *m == move_id) {
                    warn!(
                        agent,
                        chosen = %move_id,
                        legal = ?snapshot.moves,
                        "illegal move choice, falling back"
                    );
                    return Decision::fallback(self.random_fallback(snapshot));
                }
                // Tera requested on a turn where it is unavailable is a
                // recoverable slip, not a reason to discard the move.
                Decision::chosen(Action::Move {
                    move_id,
                    tera: tera && snapshot.can_tera,
                    reasoning,
                })
            }
            Action::Switch {
                switch_to,
                reasoning,
            } => {
                let switch_to = switch_to.trim().to_string();
                if !snapshot.switches.iter().any(|s| *s == switch_to) {
                    warn!(
                        agent,
                        chosen = %switch_to,
                        legal = ?snapshot.switches,
                        "illegal switch target, falling back"
                    );
                    return Decision::fallback(self.random_fallback(snapshot));
                }
                Decision::chosen(Action::Switch {
                    switch_to,
                    reasoning,
                })
            }
        }
    }

    /// Uniform draw from the legal action set, or the forced default move.
    pub fn random_fallback(&self, snapshot: &StateSnapshot) -> Action {
        if !snapshot.has_legal_actions() {
            return Action::move_to(DEFAULT_MOVE);
        }
        let options: Vec<Action> = snapshot
            .moves
            .iter()
            .map(|m| Action::move_to(m.clone()))
            .chain(snapshot.switches.iter().map(|s| Action::switch_to(s.clone())))
            .collect();

        options
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| Action::move_to(DEFAULT_MOVE))
    }

    fn extract_object(raw: &str) -> Option<Value> {
        if let Ok(value) = serde_json::from_str::<Value>(raw) {
            if value.is_object() {
                return Some(value);
            }
        }
        let span = JSON_OBJECT.find(raw)?;
        serde_json::from_str::<Value>(span.as_str())
            .ok()
            .filter(Value::is_object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ActivePokemonState, SideConditions, Terrain, Weather};

    fn snapshot(moves: &[&str], switches: &[&str], can_tera: bool) -> StateSnapshot {
        StateSnapshot {
            turn: 1,
            active: ActivePokemonState::unknown(),
            opp_active: ActivePokemonState::unknown(),
            team: Vec::new(),
            opp_team: Vec::new(),
            weather: Weather::None,
            terrain: Terrain::None,
            field: Vec::new(),
            my_side: SideConditions::default(),
            opp_side: SideConditions::default(),
            can_tera,
            moves: moves.iter().map(|m| m.to_string()).collect(),
            switches: switches.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn is_legal(action: &Action, snapshot: &StateSnapshot) -> bool {
        match action {
            Action::Move { move_id, .. } => snapshot.moves.iter().any(|m| m == move_id),
            Action::Switch { switch_to, .. } => {
                snapshot.switches.iter().any(|s| s == switch_to)
            }
        }
    }

    #[test]
    fn well_formed_move_round_trips() {
        let snapshot = snapshot(&["thunderbolt", "surf"], &["charizard"], true);
        let raw = r#"{"action_type": "move", "move_id": "surf", "tera": false, "reasoning": "coverage"}"#;
        let decision = ResponseParser::new().parse(raw, &snapshot, "test");
        assert!(!decision.used_fallback);
        assert_eq!(
            decision.action,
            Action::Move {
                move_id: "surf".into(),
                tera: false,
                reasoning: "coverage".into(),
            }
        );
    }

    #[test]
    fn well_formed_switch_round_trips() {
        let snapshot = snapshot(&["tackle"], &["charizard", "blastoise"], false);
        let raw = r#"{"action_type": "switch", "switch_to": "blastoise", "reasoning": "bad matchup"}"#;
        let decision = ResponseParser::new().parse(raw, &snapshot, "test");
        assert!(!decision.used_fallback);
        assert_eq!(
            decision.action,
            Action::Switch {
                switch_to: "blastoise".into(),
                reasoning: "bad matchup".into(),
            }
        );
    }

    #[test]
    fn object_is_recovered_from_surrounding_prose() {
        let snapshot = snapshot(&["tackle"], &[], true);
        let raw = "Sure! Here is my pick:\n```json\n{\"action_type\": \"move\", \"move_id\": \"tackle\"}\n```";
        let decision = ResponseParser::new().parse(raw, &snapshot, "test");
        assert!(!decision.used_fallback);
        assert_eq!(decision.action.move_id(), Some("tackle"));
    }

    #[test]
    fn unavailable_tera_is_cleared_silently() {
        let snapshot = snapshot(&["tackle"], &[], false);
        let raw = r#"{"action_type": "move", "move_id": "tackle", "tera": true}"#;
        let decision = ResponseParser::new().parse(raw, &snapshot, "test");
        assert!(!decision.used_fallback);
        assert_eq!(
            decision.action,
            Action::Move {
                move_id: "tackle".into(),
                tera: false,
                reasoning: String::new(),
            }
        );
    }

    #[test]
    fn malformed_inputs_fall_back_to_a_legal_action() {
        let snapshot = snapshot(&["tackle", "surf"], &["snorlax"], true);
        let cases = [
            "",
            "I think tackle is the best move here.",
            r#"[{"action_type": "move"}]"#,
            r#"{"move_id": "tackle"}"#,
            r#"{"action_type": "move", "move_id": "hyperbeam"}"#,
            r#"{"action_type": "switch", "switch_to": "mewtwo"}"#,
            r#"{"action_type": "dance"}"#,
            r#"{"action_type": "move", "move_id": 42}"#,
        ];
        let parser = ResponseParser::new();
        for raw in cases {
            let decision = parser.parse(raw, &snapshot, "test");
            assert!(decision.used_fallback, "input {raw:?} should fall back");
            assert!(
                is_legal(&decision.action, &snapshot),
                "fallback for {raw:?} must be legal, got {:?}",
                decision.action
            );
        }
    }

    #[test]
    fn json_array_still_yields_embedded_object() {
        // Greedy object extraction digs the object out of an array wrapper.
        let snapshot = snapshot(&["tackle"], &[], true);
        let raw = r#"[{"action_type": "move", "move_id": "tackle"}]"#;
        let decision = ResponseParser::new().parse(raw, &snapshot, "test");
        assert!(!decision.used_fallback);
        assert_eq!(decision.action.move_id(), Some("tackle"));
    }

    #[test]
    fn empty_legal_set_forces_default_move() {
        let snapshot = snapshot(&[], &[], true);
        assert!(!snapshot.has_legal_actions());
        let decision = ResponseParser::new().parse("garbage", &snapshot, "test");
        assert!(decision.used_fallback);
        assert_eq!(decision.action, Action::move_to(DEFAULT_MOVE));
    }

    #[test]
    fn fallback_stays_inside_the_legal_set() {
        let snapshot = snapshot(&["tackle"], &["snorlax", "gengar"], true);
        let parser = ResponseParser::new();
        for _ in 0..50 {
            let action = parser.random_fallback(&snapshot);
            assert!(is_legal(&action, &snapshot));
        }
    }
}
