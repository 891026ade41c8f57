//! MatchSim CLI - Command-line interface
//!
//! Commands:
//! - run: Simulate matchmaking and report final ratings
//! - config: Print the default simulation settings as JSON

mod report;
mod simulate;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use matchsim_core::SimConfig;

#[derive(Parser)]
#[command(name = "matchsim")]
#[command(about = "Skill-based matchmaking simulator")]
#[command(version)]
struct Cli {
    /// Random seed for reproducible runs
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate matchmaking over a generated population
    Run(simulate::RunArgs),
    /// Print the default configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => simulate::run(args, cli.seed),
        Commands::Config => {
            let config = SimConfig {
                seed: cli.seed,
                ..SimConfig::default()
            };
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
