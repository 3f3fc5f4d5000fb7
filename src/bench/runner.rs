use std::time::Duration;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::time::Instant;
use tracing::info;

use crate::agents::DecisionAgent;
use crate::bench::report::{BattleResult, BenchmarkReport, TurnStat};
use crate::bench::BenchError;
use crate::extract::StateExtractor;
use crate::showdown::{BattleServer, Outcome, PlayerSlot, ServerEvent};
use crate::translate::ActionTranslator;

const USERNAME_MAX: usize = 18;
const PREFIX_MAX: usize = 11;
const BATTLE_PACING: Duration = Duration::from_secs(1);

static NON_ID_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9-]").unwrap());
static TRAILING_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*)-([0-9a-f]{6})$").unwrap());

/// Shapes an agent name into a server-acceptable session identifier:
/// alphanumeric/hyphen, at most 18 characters. A trailing 6-hex
/// disambiguation tag survives by compressing interior hyphen-separated
/// segments before anything gets truncated.
pub fn sanitize_username(name: &str) -> String {
    let safe = NON_ID_CHARS.replace_all(name, "-").into_owned();
    if safe.len() <= USERNAME_MAX {
        return safe.trim_matches('-').to_string();
    }

    if let Some(caps) = TRAILING_TAG.captures(&safe) {
        let mut prefix = caps[1].to_string();
        let tag = caps[2].to_string();
        if prefix.len() > PREFIX_MAX {
            prefix = prefix
                .split('-')
                .filter(|part| !part.is_empty())
                .map(|part| &part[..part.len().min(3)])
                .collect::<Vec<_>>()
                .join("-");
            if prefix.len() > PREFIX_MAX {
                prefix = prefix[..PREFIX_MAX].trim_end_matches('-').to_string();
            }
        }
        return format!("{prefix}-{tag}").trim_matches('-').to_string();
    }

    safe[..USERNAME_MAX].trim_matches('-').to_string()
}

/// Drives N battles between two agents over one server connection and
/// aggregates the outcome. All server traffic happens from the caller's
/// task; the connection is stateful and must not be shared.
pub struct MatchRunner<S> {
    server: S,
    format: String,
    move_delay: Duration,
}

impl<S: BattleServer> MatchRunner<S> {
    pub fn new(server: S, format: impl Into<String>) -> Self {
        Self {
            server,
            format: format.into(),
            move_delay: Duration::ZERO,
        }
    }

    /// Extra wait before each submission, for live spectating or to go easy
    /// on a shared server.
    pub fn with_move_delay(mut self, move_delay: Duration) -> Self {
        self.move_delay = move_delay;
        self
    }

    pub async fn run(
        &mut self,
        p1: &mut dyn DecisionAgent,
        p2: &mut dyn DecisionAgent,
        n_battles: usize,
    ) -> Result<BenchmarkReport, BenchError> {
        let p1_name = p1.name().to_string();
        let p2_name = p2.name().to_string();
        let p1_user = sanitize_username(&p1_name);
        let p2_user = sanitize_username(&p2_name);
        self.server.register(PlayerSlot::P1, &p1_user).await?;
        self.server.register(PlayerSlot::P2, &p2_user).await?;

        info!(
            p1 = %p1_name,
            p1_user = %p1_user,
            p2 = %p2_name,
            p2_user = %p2_user,
            n_battles,
            format = %self.format,
            "battle session starting"
        );

        let extractor = StateExtractor::new();
        let translator = ActionTranslator::new();

        let start = Instant::now();
        let mut results: Vec<BattleResult> = Vec::with_capacity(n_battles);
        let (mut p1_wins, mut p2_wins, mut draws) = (0, 0, 0);

        for i in 0..n_battles {
            if i > 0 {
                tokio::time::sleep(BATTLE_PACING).await;
            }
            self.server.start_battle(&self.format).await?;

            loop {
                match self.server.next_event().await? {
                    ServerEvent::TurnRequest { slot, view } => {
                        let agent: &mut dyn DecisionAgent = match slot {
                            PlayerSlot::P1 => &mut *p1,
                            PlayerSlot::P2 => &mut *p2,
                        };
                        let snapshot = extractor.extract(&view);
                        let action = agent.decide(&view.battle_id, &snapshot).await;
                        if !self.move_delay.is_zero() {
                            tokio::time::sleep(self.move_delay).await;
                        }
                        let command = translator.translate(&action, &view, agent.name());
                        self.server.submit(&view.battle_id, slot, command).await?;
                    }
                    ServerEvent::BattleEnd {
                        battle_id: id,
                        outcome,
                        turns,
                    } => {
                        match outcome {
                            Outcome::P1 => p1_wins += 1,
                            Outcome::P2 => p2_wins += 1,
                            Outcome::Draw => draws += 1,
                        }
                        results.push(BattleResult {
                            game_id: id,
                            p1_agent: p1_name.clone(),
                            p2_agent: p2_name.clone(),
                            winner: outcome,
                            n_turns: turns,
                            timestamp: Utc::now(),
                        });
                        break;
                    }
                }
            }
        }

        let mut turn_stats: Vec<TurnStat> = p1.drain_turn_stats();
        turn_stats.extend(p2.drain_turn_stats());

        let report = BenchmarkReport {
            p1_agent: p1_name.clone(),
            p2_agent: p2_name,
            n_games: n_battles,
            p1_wins,
            p2_wins,
            draws,
            results,
            turn_stats,
            total_duration_s: start.elapsed().as_secs_f64(),
        };

        info!(
            n_battles,
            elapsed_s = format!("{:.1}", report.total_duration_s),
            p1 = %p1_name,
            wins = p1_wins,
            losses = p2_wins,
            win_rate = format!("{:.1}%", report.p1_win_rate() * 100.0),
            avg_turns = format!("{:.1}", report.avg_game_length()),
            "battle session done"
        );

        Ok(report)
    }
}
