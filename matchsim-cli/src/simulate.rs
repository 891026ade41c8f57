//! Run command - simulate matchmaking over a synthetic population
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: build_config(), simulate(), report_results()
//! - Level 3: (delegated to matchsim-core RoundScheduler)
//! - Level 4: rng and population helpers

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use matchsim_core::{generate_population, Player, PopulationConfig, RoundScheduler, SimConfig};

use crate::report::{self, HistoryRecorder, RunReport};

/// Players shown in the text summary
const TOP_PLAYERS: usize = 10;

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct RunArgs {
    /// Load simulation settings from a JSON file (overrides the flags below)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Players per team
    #[arg(long, default_value = "5")]
    pub team_size: usize,

    /// Teams per game
    #[arg(long, default_value = "2")]
    pub team_number: usize,

    /// Simulated game length in milliseconds
    #[arg(long, default_value = "10")]
    pub game_duration_ms: u64,

    /// ELO update scale
    #[arg(long, default_value = "20")]
    pub k_factor: f64,

    /// Latent skill drift per game (enables true-rating outcomes)
    #[arg(long)]
    pub nudge: Option<u32>,

    /// Team strength multiplier per god player
    #[arg(long, default_value = "2")]
    pub god_boost: f64,

    /// Stop once more than this many games have completed
    #[arg(long, default_value = "1000")]
    pub max_round: u64,

    /// Moving-average window for the ELO history
    #[arg(long, default_value = "100")]
    pub smoothing: usize,

    /// Scheduler tick in milliseconds
    #[arg(long, default_value = "10")]
    pub tick_ms: u64,

    /// Population size (default: five games' worth plus one)
    #[arg(long)]
    pub players: Option<usize>,

    /// Number of god players
    #[arg(long, default_value = "5")]
    pub gods: usize,

    /// Hide the progress bar
    #[arg(long)]
    pub quiet: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Directory to save the JSON report into
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run simulation command
///
/// This function reads like a table of contents:
/// 1. Build configuration and population
/// 2. Run the scheduler to completion
/// 3. Report (and optionally save) results
pub fn run(args: RunArgs, seed: Option<u64>) -> Result<()> {
    let config = build_config(&args, seed)?;
    let population = build_population(&args, &config);
    let mut rng = create_rng(config.seed);
    let players = generate_population(&population, &mut rng);

    tracing::info!(
        "Simulating {} players: {} teams of {}, k={}, nudge={:?}",
        players.len(),
        config.team_number,
        config.team_size,
        config.k_factor,
        config.nudge
    );

    let report = simulate(config, players, !args.quiet)?;

    if let Some(dir) = &args.output {
        let path = report::save_report(&report, dir)?;
        tracing::info!("Saved report to {}", path.display());
    }

    report_results(&report, &args);
    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Build simulation settings from a config file or the command flags
fn build_config(args: &RunArgs, seed: Option<u64>) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => SimConfig {
            team_size: args.team_size,
            team_number: args.team_number,
            game_duration_ms: args.game_duration_ms,
            k_factor: args.k_factor,
            nudge: args.nudge,
            god_boost: args.god_boost,
            max_round: args.max_round,
            smoothing: args.smoothing,
            tick_interval_ms: args.tick_ms,
            seed: None,
        },
    };

    if seed.is_some() {
        config.seed = seed;
    }
    config.validate()?;
    Ok(config)
}

/// Run the scheduler on a single-threaded runtime and collect the report
fn simulate(config: SimConfig, players: Vec<Player>, progress: bool) -> Result<RunReport> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let mut recorder = HistoryRecorder::new();
    if progress {
        recorder = recorder.with_progress(config.max_round);
    }

    let (summary, standings) = runtime.block_on(async {
        let mut scheduler = RoundScheduler::with_observer(config.clone(), players, &mut recorder)?;
        let summary = scheduler.run().await?;
        anyhow::Ok((summary, report::standings(scheduler.registry())))
    })?;

    Ok(recorder.finish(&config, &summary, standings))
}

/// Report results
fn report_results(report: &RunReport, args: &RunArgs) {
    if args.json {
        report::print_json_report(report);
    } else {
        report::print_text_report(report, TOP_PLAYERS);
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn build_population(args: &RunArgs, config: &SimConfig) -> PopulationConfig {
    let mut population = PopulationConfig::for_game(config.team_size, config.team_number);
    if let Some(size) = args.players {
        population.size = size;
    }
    population.gods = args.gods.min(population.size);
    population
}

/// Create RNG from seed or random
fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
