use tracing::warn;

use crate::showdown::{BattleView, ServerCommand};
use crate::state::Action;

/// Converts a validated [`Action`] into a server command, re-validating it
/// against the *current* view first. The parser already validated against
/// the snapshot at decision time, but the legal set may have moved on by
/// submission time, so this second layer exists independently. A stale or
/// illegal choice degrades to [`ServerCommand::RandomLegal`].
#[derive(Debug, Default)]
pub struct ActionTranslator;

impl ActionTranslator {
    pub fn new() -> Self {
        Self
    }

    pub fn translate(&self, action: &Action, view: &BattleView, agent: &str) -> ServerCommand {
        match action {
            Action::Move { move_id, tera, .. } => {
                if !view.legal_moves.iter().any(|m| m == move_id) {
                    warn!(
                        agent,
                        chosen = %move_id,
                        legal = ?view.legal_moves,
                        "move no longer legal at submission, requesting random command"
                    );
                    return ServerCommand::RandomLegal;
                }
                ServerCommand::Move {
                    move_id: move_id.clone(),
                    tera: *tera && view.can_tera,
                }
            }
            Action::Switch { switch_to, .. } => {
                if !view.legal_switches.iter().any(|s| s == switch_to) {
                    warn!(
                        agent,
                        chosen = %switch_to,
                        legal = ?view.legal_switches,
                        "switch no longer legal at submission, requesting random command"
                    );
                    return ServerCommand::RandomLegal;
                }
                ServerCommand::Switch {
                    species: switch_to.clone(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::showdown::SideState;

    fn view(moves: &[&str], switches: &[&str], can_tera: bool) -> BattleView {
        BattleView {
            battle_id: "battle-1".into(),
            turn: 1,
            side: SideState::default(),
            opponent: SideState::default(),
            effects: Vec::new(),
            can_tera,
            legal_moves: moves.iter().map(|m| m.to_string()).collect(),
            legal_switches: switches.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn legal_move_passes_through() {
        let command = ActionTranslator::new().translate(
            &Action::Move {
                move_id: "surf".into(),
                tera: true,
                reasoning: String::new(),
            },
            &view(&["surf"], &[], true),
            "test",
        );
        assert_eq!(
            command,
            ServerCommand::Move {
                move_id: "surf".into(),
                tera: true,
            }
        );
    }

    #[test]
    fn stale_move_degrades_to_random_command() {
        let command = ActionTranslator::new().translate(
            &Action::move_to("surf"),
            &view(&["tackle"], &["snorlax"], true),
            "test",
        );
        assert_eq!(command, ServerCommand::RandomLegal);
    }

    #[test]
    fn stale_switch_degrades_to_random_command() {
        let command = ActionTranslator::new().translate(
            &Action::switch_to("gengar"),
            &view(&["tackle"], &["snorlax"], true),
            "test",
        );
        assert_eq!(command, ServerCommand::RandomLegal);
    }

    #[test]
    fn tera_is_dropped_when_no_longer_available() {
        let command = ActionTranslator::new().translate(
            &Action::Move {
                move_id: "surf".into(),
                tera: true,
                reasoning: String::new(),
            },
            &view(&["surf"], &[], false),
            "test",
        );
        assert_eq!(
            command,
            ServerCommand::Move {
                move_id: "surf".into(),
                tera: false,
            }
        );
    }
}
