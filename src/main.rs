use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use snake_rl::agent::QAgent;
use snake_rl::config::Config;
use snake_rl::persist::PolicyStore;
use snake_rl::session::Session;
use snake_rl::world::{GridWorld, TickOutcome};

#[derive(Parser, Debug)]
#[command(name = "snake-rl", about = "Grid snake driven by a tabular Q-learning agent")]
struct Args {
    /// Total ticks to run (0 = run until interrupted).
    #[arg(long, default_value_t = 200_000)]
    steps: u64,

    /// Tick period in milliseconds (0 = unthrottled).
    #[arg(long, default_value_t = 0)]
    tick_ms: u64,

    /// Grid width in cells.
    #[arg(long, default_value_t = 40)]
    width: i32,

    /// Grid height in cells.
    #[arg(long, default_value_t = 30)]
    height: i32,

    /// Path of the saved policy record.
    #[arg(long, default_value = "snake-brain.json")]
    model: PathBuf,

    /// Save the policy every N ticks (0 = never).
    #[arg(long, default_value_t = 1000)]
    save_every: u64,

    /// Log a progress line every N ticks (0 = only the final summary).
    #[arg(long, default_value_t = 5000)]
    report_every: u64,

    /// Seed for the world RNG. Omit for entropy.
    #[arg(long)]
    seed: Option<u64>,

    /// Sideline the agent: the snake only follows buffered commands and the
    /// saved policy state is left untouched.
    #[arg(long)]
    bypass: bool,

    /// JSON config file; overrides the grid and cadence flags entirely.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<Config> {
    match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read config {path:?}"))?;
            serde_json::from_str(&text).with_context(|| format!("parse config {path:?}"))
        }
        None => Ok(Config {
            grid_width: args.width,
            grid_height: args.height,
            save_every: args.save_every,
            ..Config::default()
        }),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let world = match args.seed {
        Some(seed) => GridWorld::with_rng(&config, SmallRng::seed_from_u64(seed)),
        None => GridWorld::new(&config),
    };
    let mut session = Session::with_world(&config, world);
    session.attach_policy(Box::new(QAgent::new()));
    session.attach_store(PolicyStore::new(&args.model));
    session.set_bypass(args.bypass);
    session.restore();

    info!(
        width = config.grid_width,
        height = config.grid_height,
        iterations = session.iterations(),
        model = ?args.model,
        "session ready"
    );

    let tick = Duration::from_millis(args.tick_ms);
    let started = Instant::now();
    let mut ticks: u64 = 0;
    let mut apples: u64 = 0;
    let mut best_len = session.world.target_len;

    while args.steps == 0 || ticks < args.steps {
        let Some(report) = session.step()? else {
            // Paused: the clock keeps firing but nothing advances.
            if !tick.is_zero() {
                std::thread::sleep(tick);
            }
            continue;
        };
        ticks += 1;

        if report.outcome == TickOutcome::AppleCaptured {
            apples += 1;
            best_len = best_len.max(session.world.target_len);
        }

        if args.report_every > 0 && ticks % args.report_every == 0 {
            info!(
                ticks,
                episodes = session.episodes(),
                apples,
                best_len,
                "progress"
            );
        }

        if !tick.is_zero() {
            std::thread::sleep(tick);
        }
    }

    info!(
        ticks,
        episodes = session.episodes(),
        apples,
        best_len,
        elapsed_s = started.elapsed().as_secs_f32(),
        "done"
    );
    Ok(())
}
