//! Void Skirmish - Development Tools

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skirmish_core::replay::{Replay, ReplayPlayer};
use skirmish_tools::error::Result;
use skirmish_tools::scenario::Scenario;

#[derive(Parser)]
#[command(name = "skirmish-tools")]
#[command(about = "Development tools for Void Skirmish")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to data directory
        #[arg(default_value = "data")]
        path: PathBuf,
    },
    /// Play a scenario headlessly and print its turn log
    Simulate {
        /// Scenario RON file
        scenario: PathBuf,
        /// Maximum number of turns to resolve
        #[arg(short, long, default_value_t = 20)]
        turns: u32,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Save the run as a replay file
        #[arg(long)]
        record: Option<PathBuf>,
    },
    /// Play back a replay file and verify its final state hash
    Replay {
        /// Replay file
        path: PathBuf,
    },
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Validate { path } => {
            tracing::info!("Validating data files in: {}", path.display());
            let summary = skirmish_tools::validate::validate_data_directory(&path)?;
            tracing::info!(
                rulesets = summary.rulesets,
                scenarios = summary.scenarios,
                "Validation passed"
            );
        }
        Commands::Simulate {
            scenario,
            turns,
            format,
            record,
        } => {
            let scenario = Scenario::load(&scenario)?;
            let report = skirmish_tools::simulate::run_scenario(&scenario, turns)?;
            match format {
                OutputFormat::Text => print!("{}", report.to_text()),
                OutputFormat::Json => println!("{}", report.to_json()?),
            }
            if let (Some(path), Some(replay)) = (record, &report.replay) {
                replay.save(&path)?;
                tracing::info!("Replay written to {}", path.display());
            }
        }
        Commands::Replay { path } => {
            let replay = Replay::load(&path)?;
            tracing::info!(
                battle = %replay.battle_name,
                commands = replay.command_count(),
                "Replay loaded"
            );
            let mut player = ReplayPlayer::new(replay)?;
            player.verify()?;
            tracing::info!(turn = player.battle().turn(), "Replay verified");
        }
    }
    Ok(())
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
