use std::collections::HashMap;

use crate::showdown::{BattleView, ServerMon, SideState};
use crate::state::{
    ActivePokemonState, PokemonState, SideConditions, StateSnapshot, Terrain, Weather,
};

// Priority tables for the per-turn effect list. Only one weather and one
// terrain are representable at a time; the first matching token wins.
const WEATHER_TABLE: &[(&str, Weather)] = &[
    ("raindance", Weather::Rain),
    ("sunnyday", Weather::Sun),
    ("sandstorm", Weather::Sand),
    ("snowscape", Weather::Snow),
    ("hail", Weather::Snow),
];

const TERRAIN_TABLE: &[(&str, Terrain)] = &[
    ("electricterrain", Terrain::Electric),
    ("grassyterrain", Terrain::Grassy),
    ("psychicterrain", Terrain::Psychic),
    ("mistyterrain", Terrain::Misty),
];

const FIELD_TABLE: &[(&str, &str)] = &[("trickroom", "trick_room"), ("gravity", "gravity")];

/// Converts a server-side [`BattleView`] into a [`StateSnapshot`].
///
/// Pure and infallible: a structurally impossible input (no active unit)
/// yields a fainted placeholder instead of an error. Everything the server
/// has not revealed about the opponent is stripped here; the opponent bench
/// is reduced to species, health and status no matter what the view carries.
#[derive(Debug, Default)]
pub struct StateExtractor;

impl StateExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, view: &BattleView) -> StateSnapshot {
        StateSnapshot {
            turn: view.turn,
            active: Self::extract_active(view.side.active.as_ref()),
            opp_active: Self::extract_active(view.opponent.active.as_ref()),
            team: Self::extract_bench(&view.side),
            opp_team: Self::extract_bench(&view.opponent),
            weather: Self::extract_weather(&view.effects),
            terrain: Self::extract_terrain(&view.effects),
            field: Self::extract_field(&view.effects),
            my_side: Self::extract_side(&view.side.conditions),
            opp_side: Self::extract_side(&view.opponent.conditions),
            can_tera: view.can_tera,
            moves: view.legal_moves.clone(),
            switches: view.legal_switches.clone(),
        }
    }

    fn extract_active(mon: Option<&ServerMon>) -> ActivePokemonState {
        let Some(mon) = mon else {
            return ActivePokemonState::unknown();
        };
        ActivePokemonState {
            species: mon.species.clone(),
            hp: mon.hp.clamp(0.0, 1.0),
            fainted: mon.fainted,
            status: mon.status,
            boosts: mon.boosts,
            ability: mon.ability.clone(),
            item: mon.item.clone(),
            tera_type: mon.tera_type.clone(),
            terastallized: mon.terastallized,
            moves: mon.moves.clone(),
        }
    }

    fn extract_bench(side: &SideState) -> Vec<PokemonState> {
        side.bench
            .iter()
            .map(|mon| PokemonState {
                species: mon.species.clone(),
                hp: mon.hp.clamp(0.0, 1.0),
                fainted: mon.fainted,
                status: mon.status,
            })
            .collect()
    }

    fn extract_weather(effects: &[String]) -> Weather {
        effects
            .iter()
            .find_map(|token| {
                WEATHER_TABLE
                    .iter()
                    .find(|(name, _)| name == token)
                    .map(|(_, weather)| *weather)
            })
            .unwrap_or_default()
    }

    fn extract_terrain(effects: &[String]) -> Terrain {
        effects
            .iter()
            .find_map(|token| {
                TERRAIN_TABLE
                    .iter()
                    .find(|(name, _)| name == token)
                    .map(|(_, terrain)| *terrain)
            })
            .unwrap_or_default()
    }

    fn extract_field(effects: &[String]) -> Vec<String> {
        effects
            .iter()
            .filter_map(|token| {
                FIELD_TABLE
                    .iter()
                    .find(|(name, _)| name == token)
                    .map(|(_, tag)| tag.to_string())
            })
            .collect()
    }

    fn extract_side(conditions: &HashMap<String, u8>) -> SideConditions {
        SideConditions {
            stealth_rock: conditions.contains_key("stealthrock"),
            spikes: conditions.get("spikes").copied().unwrap_or(0).min(3),
            toxic_spikes: conditions.get("toxicspikes").copied().unwrap_or(0).min(2),
            reflect: conditions.contains_key("reflect"),
            light_screen: conditions.contains_key("lightscreen"),
            tailwind: conditions.contains_key("tailwind"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Boosts;

    fn view() -> BattleView {
        BattleView {
            battle_id: "battle-test-1".into(),
            turn: 4,
            side: SideState {
                active: Some(ServerMon {
                    hp: 0.62,
                    boosts: Boosts {
                        atk: 2,
                        ..Default::default()
                    },
                    ability: Some("static".into()),
                    item: Some("lightball".into()),
                    moves: vec!["thunderbolt".into(), "quickattack".into()],
                    ..ServerMon::new("pikachu")
                }),
                bench: vec![ServerMon {
                    hp: 0.0,
                    fainted: true,
                    ..ServerMon::new("charizard")
                }],
                conditions: HashMap::from([("spikes".to_string(), 2)]),
            },
            opponent: SideState {
                active: Some(ServerMon::new("gengar")),
                bench: vec![ServerMon {
                    // Fields the server should not have sent for a bench
                    // unit must not survive extraction.
                    item: Some("leftovers".into()),
                    ability: Some("thickfat".into()),
                    moves: vec!["bodyslam".into()],
                    ..ServerMon::new("snorlax")
                }],
                conditions: HashMap::from([("stealthrock".to_string(), 1)]),
            },
            effects: vec!["trickroom".into(), "hail".into(), "electricterrain".into()],
            can_tera: true,
            legal_moves: vec!["thunderbolt".into(), "quickattack".into()],
            legal_switches: vec![],
        }
    }

    #[test]
    fn extracts_full_snapshot() {
        let snapshot = StateExtractor::new().extract(&view());
        assert_eq!(snapshot.turn, 4);
        assert_eq!(snapshot.active.species, "pikachu");
        assert_eq!(snapshot.active.boosts.atk, 2);
        assert_eq!(snapshot.weather, Weather::Snow);
        assert_eq!(snapshot.terrain, Terrain::Electric);
        assert_eq!(snapshot.field, vec!["trick_room".to_string()]);
        assert_eq!(snapshot.my_side.spikes, 2);
        assert!(snapshot.opp_side.stealth_rock);
        assert!(snapshot.can_tera);
    }

    #[test]
    fn opponent_bench_is_reduced_to_public_fields() {
        let snapshot = StateExtractor::new().extract(&view());
        assert_eq!(snapshot.opp_team.len(), 1);
        let mon = &snapshot.opp_team[0];
        assert_eq!(mon.species, "snorlax");
        assert_eq!(mon.hp, 1.0);
        assert!(!mon.fainted);
        // PokemonState has no item/ability/move fields, so the leak is
        // structurally impossible; the assertion documents the projection.
        assert!(mon.status.is_none());
    }

    #[test]
    fn missing_active_becomes_fainted_placeholder() {
        let mut view = view();
        view.side.active = None;
        let snapshot = StateExtractor::new().extract(&view);
        assert_eq!(snapshot.active.species, "unknown");
        assert_eq!(snapshot.active.hp, 0.0);
        assert!(snapshot.active.fainted);
        assert_eq!(snapshot.active.boosts, Boosts::default());
    }

    #[test]
    fn extraction_is_idempotent() {
        let view = view();
        let extractor = StateExtractor::new();
        assert_eq!(extractor.extract(&view), extractor.extract(&view));
    }

    #[test]
    fn first_matching_weather_wins() {
        let mut view = view();
        view.effects = vec!["raindance".into(), "sunnyday".into()];
        let snapshot = StateExtractor::new().extract(&view);
        assert_eq!(snapshot.weather, Weather::Rain);
        assert_eq!(snapshot.terrain, Terrain::None);
    }

    #[test]
    fn spike_counts_are_clamped() {
        let mut view = view();
        view.side
            .conditions
            .insert("toxicspikes".to_string(), 5);
        view.side.conditions.insert("spikes".to_string(), 9);
        let snapshot = StateExtractor::new().extract(&view);
        assert_eq!(snapshot.my_side.spikes, 3);
        assert_eq!(snapshot.my_side.toxic_spikes, 2);
    }
}
