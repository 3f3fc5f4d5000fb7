use std::fmt::Write;

use crate::state::{ActivePokemonState, PokemonState, SideConditions, StateSnapshot};

pub const SYSTEM_PROMPT: &str = "\
You are an expert competitive Pokémon player. Each turn you receive a \
description of the current battle state and a list of legal actions. You \
must choose exactly one action and explain your reasoning briefly.

Decision priorities, highest first: secure a knockout when one is \
available; escape a losing type matchup by switching to a resistant \
teammate; use a super-effective move; set up stat boosts only when safe; \
apply status when far ahead; otherwise use your highest-power move. \
Terastallize only to secure an otherwise unreachable knockout or to remove \
an otherwise fatal weakness.

Always respond with a single JSON object — nothing else.";

/// Renders the full snapshot as the per-turn user prompt.
pub fn build_prompt(state: &StateSnapshot) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Turn {}", state.turn);
    out.push('\n');

    out.push_str(&active_line("Your active", &state.active, state.can_tera));
    out.push('\n');
    out.push_str(&active_line("Opponent active", &state.opp_active, false));
    out.push('\n');
    out.push('\n');

    if !state.team.is_empty() {
        let bench: Vec<String> = state.team.iter().map(bench_entry).collect();
        let _ = writeln!(out, "Your bench: {}", bench.join(", "));
    }
    if !state.opp_team.is_empty() {
        let bench: Vec<String> = state.opp_team.iter().map(bench_entry).collect();
        let _ = writeln!(out, "Opponent revealed bench: {}", bench.join(", "));
    }

    out.push('\n');
    let _ = writeln!(
        out,
        "Weather: {}  Terrain: {}",
        state.weather.as_str(),
        state.terrain.as_str()
    );
    if !state.field.is_empty() {
        let _ = writeln!(out, "Field conditions: {}", state.field.join(", "));
    }
    let _ = writeln!(out, "Your side: {}", side_line(&state.my_side));
    let _ = writeln!(out, "Opponent side: {}", side_line(&state.opp_side));

    out.push('\n');
    if state.moves.is_empty() {
        out.push_str("Available moves: (none)\n");
    } else {
        let _ = writeln!(out, "Available moves: {:?}", state.moves);
    }
    if state.switches.is_empty() {
        out.push_str("Available switches: (none)\n");
    } else {
        let _ = writeln!(out, "Available switches: {:?}", state.switches);
    }

    out.push('\n');
    out.push_str(
        "Choose one action. Respond ONLY with a JSON object matching one of these shapes:\n\
         \u{20} {\"action_type\": \"move\", \"move_id\": \"<id>\", \"tera\": false, \"reasoning\": \"...\"}\n\
         \u{20} {\"action_type\": \"switch\", \"switch_to\": \"<species>\", \"reasoning\": \"...\"}",
    );

    out
}

fn active_line(label: &str, mon: &ActivePokemonState, can_tera: bool) -> String {
    let mut line = format!("{label}: {} {:.0}%HP", mon.species, mon.hp * 100.0);
    if let Some(status) = mon.status {
        let _ = write!(line, " [{}]", status.as_str());
    }
    if !mon.boosts.is_neutral() {
        let boosts: Vec<String> = mon
            .boosts
            .entries()
            .iter()
            .filter(|(_, stage)| *stage != 0)
            .map(|(stat, stage)| format!("{stat}:{stage:+}"))
            .collect();
        let _ = write!(line, " boosts={}", boosts.join(", "));
    }
    if let Some(ability) = &mon.ability {
        let _ = write!(line, " ability={ability}");
    }
    if let Some(item) = &mon.item {
        let _ = write!(line, " item={item}");
    }
    if mon.terastallized {
        if let Some(tera) = &mon.tera_type {
            let _ = write!(line, " [terastallized:{tera}]");
        }
    } else if can_tera {
        if let Some(tera) = &mon.tera_type {
            let _ = write!(line, " (can tera:{tera})");
        }
    }
    if !mon.moves.is_empty() {
        let _ = write!(line, " known_moves={:?}", mon.moves);
    }
    line
}

fn bench_entry(mon: &PokemonState) -> String {
    if mon.fainted {
        return format!("{} [fainted]", mon.species);
    }
    let mut entry = format!("{} {:.0}%HP", mon.species, mon.hp * 100.0);
    if let Some(status) = mon.status {
        let _ = write!(entry, " [{}]", status.as_str());
    }
    entry
}

fn side_line(side: &SideConditions) -> String {
    let mut parts = Vec::new();
    if side.stealth_rock {
        parts.push("stealth_rock".to_string());
    }
    if side.spikes > 0 {
        parts.push(format!("spikes×{}", side.spikes));
    }
    if side.toxic_spikes > 0 {
        parts.push(format!("toxic_spikes×{}", side.toxic_spikes));
    }
    if side.reflect {
        parts.push("reflect".to_string());
    }
    if side.light_screen {
        parts.push("light_screen".to_string());
    }
    if side.tailwind {
        parts.push("tailwind".to_string());
    }
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        Boosts, SideConditions, StatusCondition, Terrain, Weather,
    };

    fn snapshot() -> StateSnapshot {
        StateSnapshot {
            turn: 7,
            active: ActivePokemonState {
                species: "pikachu".into(),
                hp: 0.625,
                fainted: false,
                status: Some(StatusCondition::Paralysis),
                boosts: Boosts {
                    spe: -1,
                    ..Default::default()
                },
                ability: Some("static".into()),
                item: None,
                tera_type: Some("electric".into()),
                terastallized: false,
                moves: vec!["thunderbolt".into()],
            },
            opp_active: ActivePokemonState {
                species: "gengar".into(),
                hp: 1.0,
                fainted: false,
                status: None,
                boosts: Boosts::default(),
                ability: None,
                item: None,
                tera_type: None,
                terastallized: false,
                moves: Vec::new(),
            },
            team: vec![PokemonState {
                species: "charizard".into(),
                hp: 0.0,
                fainted: true,
                status: None,
            }],
            opp_team: Vec::new(),
            weather: Weather::Rain,
            terrain: Terrain::None,
            field: vec!["trick_room".into()],
            my_side: SideConditions {
                spikes: 2,
                ..Default::default()
            },
            opp_side: SideConditions::default(),
            can_tera: true,
            moves: vec!["thunderbolt".into()],
            switches: Vec::new(),
        }
    }

    #[test]
    fn neutral_boosts_are_omitted_from_the_prompt() {
        let mut state = snapshot();
        state.active.boosts = Boosts::default();
        let prompt = build_prompt(&state);
        assert!(!prompt.contains("boosts="));
    }

    #[test]
    fn prompt_carries_every_snapshot_section() {
        let prompt = build_prompt(&snapshot());
        assert!(prompt.contains("Turn 7"));
        assert!(prompt.contains("Your active: pikachu 62%HP [par] boosts=spe:-1"));
        assert!(prompt.contains("(can tera:electric)"));
        assert!(prompt.contains("Opponent active: gengar 100%HP"));
        assert!(prompt.contains("Your bench: charizard [fainted]"));
        assert!(prompt.contains("Weather: rain  Terrain: none"));
        assert!(prompt.contains("Field conditions: trick_room"));
        assert!(prompt.contains("Your side: spikes×2"));
        assert!(prompt.contains("Available moves: [\"thunderbolt\"]"));
        assert!(prompt.contains("Available switches: (none)"));
        assert!(prompt.contains("\"action_type\": \"switch\""));
    }
}
