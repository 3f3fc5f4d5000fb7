use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use rand::Rng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use battle_bench::bench::report::write_report;
use battle_bench::showdown::sim::SimServer;
use battle_bench::{build_agent, BenchError, MatchRunner};

#[derive(Parser)]
#[command(name = "battle-bench")]
#[command(about = "Run benchmark battles between two decision agents")]
struct Args {
    /// Agent for player 1: random, mistral:<model-id>, hf:<model-id>, local:<model-id>
    #[arg(long, default_value = "random")]
    p1: String,

    /// Agent for player 2
    #[arg(long, default_value = "random")]
    p2: String,

    /// Number of battles
    #[arg(long, default_value_t = 1)]
    n: usize,

    /// Battle format string
    #[arg(long, default_value = "gen9randombattle")]
    format: String,

    /// Seconds to wait before submitting each move. Pass 0 to also disable
    /// the LLM rate-limit throttle.
    #[arg(long)]
    move_delay: Option<f64>,

    /// Write the JSON report here (default: runs/<p1>_vs_<p2>_n<n>_<tag>.json)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    if let Err(err) = run(args).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), BenchError> {
    // --move-delay 0 is an explicit "as fast as possible": it also lifts
    // the per-agent backend throttle.
    let throttle = match args.move_delay {
        Some(delay) if delay == 0.0 => Some(Duration::ZERO),
        _ => None,
    };
    let mut p1 = build_agent(&args.p1, throttle)?;
    let mut p2 = build_agent(&args.p2, throttle)?;

    println!(
        "battle-bench — {} vs {} · {} battle(s) · {}",
        args.p1, args.p2, args.n, args.format
    );

    let move_delay = Duration::from_secs_f64(args.move_delay.unwrap_or(0.0));
    let mut runner =
        MatchRunner::new(SimServer::new(), &args.format).with_move_delay(move_delay);
    let report = runner.run(p1.as_mut(), p2.as_mut(), args.n).await?;

    println!(
        "  {} {}W / {}L · win rate {:.1}% · avg {:.1} turns",
        report.p1_agent,
        report.p1_wins,
        report.p2_wins,
        report.p1_win_rate() * 100.0,
        report.avg_game_length()
    );

    let out = args
        .output
        .unwrap_or_else(|| default_output(&args.p1, &args.p2, args.n));
    write_report(&report, &out)?;
    println!("  Report saved to {}", out.display());
    Ok(())
}

fn default_output(p1: &str, p2: &str, n: usize) -> PathBuf {
    let tag: u32 = rand::thread_rng().gen_range(0..0x0100_0000);
    PathBuf::from("runs").join(format!(
        "{}_vs_{}_n{n}_{tag:06x}.json",
        filename_safe(p1),
        filename_safe(p2)
    ))
}

fn filename_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}
