use std::sync::Arc;
use std::time::Duration;

use battle_bench::providers::scripted::{FailingProvider, ScriptedProvider};
use battle_bench::providers::LLMProvider;
use battle_bench::showdown::sim::SimServer;
use battle_bench::{LlmAgent, MatchRunner, Outcome, RandomAgent};

#[tokio::test]
async fn random_vs_random_session_completes() {
    let mut runner = MatchRunner::new(SimServer::with_seed(7), "gen9randombattle");
    let mut p1 = RandomAgent::new();
    let mut p2 = RandomAgent::new();

    let report = runner.run(&mut p1, &mut p2, 5).await.unwrap();

    assert_eq!(report.n_games, 5);
    assert_eq!(report.p1_wins + report.p2_wins + report.draws, 5);
    assert_eq!(report.results.len(), 5);
    assert!(report.avg_game_length() > 0.0);
    for result in &report.results {
        assert!(result.n_turns > 0);
        assert_eq!(result.p1_agent, "random");
    }
    // Random agents carry no telemetry.
    assert!(report.turn_stats.is_empty());
    assert!(report.avg_decision_ms("random").is_none());
}

#[tokio::test]
async fn llm_agent_with_dead_backend_still_finishes_battles() {
    let provider: Arc<dyn LLMProvider> = Arc::new(FailingProvider);
    let mut p1 = LlmAgent::new(provider, "test-model").with_min_call_interval(Duration::ZERO);
    let mut p2 = RandomAgent::new();

    let mut runner = MatchRunner::new(SimServer::with_seed(11), "gen9randombattle");
    let report = runner.run(&mut p1, &mut p2, 2).await.unwrap();

    assert_eq!(report.results.len(), 2);
    assert!(matches!(
        report.results[0].winner,
        Outcome::P1 | Outcome::P2 | Outcome::Draw
    ));

    // Every decision the LLM side made fell back, and every one was recorded.
    assert!(!report.turn_stats.is_empty());
    assert!(report.turn_stats.iter().all(|stat| stat.used_fallback));
    assert_eq!(report.fallback_rate(&report.p1_agent), Some(1.0));
}

#[tokio::test]
async fn llm_agent_with_scripted_backend_plays_its_move() {
    // Every simulated roster mon knows tackle, so the scripted choice is
    // always legal and never falls back.
    let provider: Arc<dyn LLMProvider> = Arc::new(ScriptedProvider::repeating(
        r#"{"action_type": "move", "move_id": "tackle", "reasoning": "keep it simple"}"#,
    ));
    let mut p1 = LlmAgent::new(provider, "test-model").with_min_call_interval(Duration::ZERO);
    let mut p2 = RandomAgent::new();

    let mut runner = MatchRunner::new(SimServer::with_seed(23), "gen9randombattle");
    let report = runner.run(&mut p1, &mut p2, 1).await.unwrap();

    assert_eq!(report.results.len(), 1);
    assert!(!report.turn_stats.is_empty());
    for stat in &report.turn_stats {
        assert!(!stat.used_fallback);
        assert_eq!(stat.action_kind, "move");
        assert_eq!(stat.move_id.as_deref(), Some("tackle"));
        assert_eq!(stat.reasoning.as_deref(), Some("keep it simple"));
        assert!(stat.context_chars > 0);
    }
}
