use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::bench::BenchError;
use crate::showdown::Outcome;

/// One telemetry row per decision an instrumented agent makes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnStat {
    pub game_id: String,
    pub turn: u32,
    pub agent: String,
    pub decision_ms: u64,
    pub used_fallback: bool,
    /// Characters of conversational context entering this turn.
    pub context_chars: usize,
    pub action_kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub move_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effectiveness: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleResult {
    pub game_id: String,
    pub p1_agent: String,
    pub p2_agent: String,
    pub winner: Outcome,
    pub n_turns: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub p1_agent: String,
    pub p2_agent: String,
    pub n_games: usize,
    pub p1_wins: usize,
    pub p2_wins: usize,
    pub draws: usize,
    pub results: Vec<BattleResult>,
    pub turn_stats: Vec<TurnStat>,
    pub total_duration_s: f64,
}

impl BenchmarkReport {
    pub fn p1_win_rate(&self) -> f64 {
        if self.n_games == 0 {
            return 0.0;
        }
        self.p1_wins as f64 / self.n_games as f64
    }

    pub fn avg_game_length(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        let total: u64 = self.results.iter().map(|r| r.n_turns as u64).sum();
        total as f64 / self.results.len() as f64
    }

    /// Mean decision latency for one side, or `None` when that side
    /// produced no telemetry (a random agent, for instance).
    pub fn avg_decision_ms(&self, agent: &str) -> Option<f64> {
        let rows: Vec<&TurnStat> = self
            .turn_stats
            .iter()
            .filter(|stat| stat.agent == agent)
            .collect();
        if rows.is_empty() {
            return None;
        }
        let total: u64 = rows.iter().map(|stat| stat.decision_ms).sum();
        Some(total as f64 / rows.len() as f64)
    }

    /// Share of decisions that fell back, or `None` without telemetry.
    pub fn fallback_rate(&self, agent: &str) -> Option<f64> {
        let rows: Vec<&TurnStat> = self
            .turn_stats
            .iter()
            .filter(|stat| stat.agent == agent)
            .collect();
        if rows.is_empty() {
            return None;
        }
        let fallbacks = rows.iter().filter(|stat| stat.used_fallback).count();
        Some(fallbacks as f64 / rows.len() as f64)
    }
}

/// Writes the run artifact consumed by the report renderer. The layout
/// (summary object, `battles` array, `turn_stats` array) is a stable
/// hand-off format; extend it, don't reshape it.
pub fn write_report(report: &BenchmarkReport, path: impl AsRef<Path>) -> Result<(), BenchError> {
    let path = path.as_ref();
    let document = json!({
        "summary": {
            "p1_agent": report.p1_agent,
            "p2_agent": report.p2_agent,
            "n_games": report.n_games,
            "p1_wins": report.p1_wins,
            "p2_wins": report.p2_wins,
            "draws": report.draws,
            "p1_win_rate": report.p1_win_rate(),
            "avg_game_length": report.avg_game_length(),
            "total_duration_s": report.total_duration_s,
            "p1_avg_decision_ms": report.avg_decision_ms(&report.p1_agent),
            "p2_avg_decision_ms": report.avg_decision_ms(&report.p2_agent),
            "p1_fallback_rate": report.fallback_rate(&report.p1_agent),
            "p2_fallback_rate": report.fallback_rate(&report.p2_agent),
        },
        "battles": report.results,
        "turn_stats": report.turn_stats,
    });

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(&document)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(agent: &str, decision_ms: u64, used_fallback: bool) -> TurnStat {
        TurnStat {
            game_id: "battle-1".into(),
            turn: 1,
            agent: agent.into(),
            decision_ms,
            used_fallback,
            context_chars: 100,
            action_kind: "move".into(),
            reasoning: None,
            move_id: None,
            effectiveness: None,
        }
    }

    fn result(winner: Outcome, n_turns: u32) -> BattleResult {
        BattleResult {
            game_id: "battle-1".into(),
            p1_agent: "A".into(),
            p2_agent: "B".into(),
            winner,
            n_turns,
            timestamp: Utc::now(),
        }
    }

    fn report() -> BenchmarkReport {
        BenchmarkReport {
            p1_agent: "A".into(),
            p2_agent: "B".into(),
            n_games: 0,
            p1_wins: 0,
            p2_wins: 0,
            draws: 0,
            results: Vec::new(),
            turn_stats: Vec::new(),
            total_duration_s: 0.0,
        }
    }

    #[test]
    fn win_rate_arithmetic() {
        let mut r = report();
        r.n_games = 10;
        r.p1_wins = 7;
        r.p2_wins = 2;
        r.draws = 1;
        assert_eq!(r.p1_win_rate(), 0.7);
        assert_eq!(r.p1_wins + r.p2_wins + r.draws, r.n_games);
    }

    #[test]
    fn win_rate_of_empty_run_is_zero() {
        assert_eq!(report().p1_win_rate(), 0.0);
    }

    #[test]
    fn avg_game_length_over_completed_battles() {
        let mut r = report();
        r.results = vec![result(Outcome::P1, 10), result(Outcome::P2, 20)];
        assert_eq!(r.avg_game_length(), 15.0);
        assert_eq!(report().avg_game_length(), 0.0);
    }

    #[test]
    fn per_side_latency_and_fallback_rates() {
        let mut r = report();
        r.turn_stats = vec![
            stat("A", 100, false),
            stat("A", 200, true),
            stat("A", 300, false),
        ];
        assert_eq!(r.avg_decision_ms("A"), Some(200.0));
        assert_eq!(r.fallback_rate("A"), Some(1.0 / 3.0));
        // No rows for B means undefined, not zero.
        assert_eq!(r.avg_decision_ms("B"), None);
        assert_eq!(r.fallback_rate("B"), None);
    }

    #[test]
    fn report_document_layout_is_stable() {
        let mut r = report();
        r.n_games = 1;
        r.p1_wins = 1;
        r.results = vec![result(Outcome::P1, 12)];
        r.turn_stats = vec![stat("A", 50, false)];

        let dir = std::env::temp_dir().join("battle-bench-report-test");
        let path = dir.join("report.json");
        write_report(&r, &path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["summary"]["n_games"], 1);
        assert_eq!(value["summary"]["p1_win_rate"], 1.0);
        assert!(value["summary"]["p2_avg_decision_ms"].is_null());
        assert_eq!(value["battles"].as_array().unwrap().len(), 1);
        assert_eq!(value["turn_stats"][0]["agent"], "A");
        fs::remove_dir_all(&dir).ok();
    }
}
