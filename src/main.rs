use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use fogsim::orchestrator;
use fogsim::preview;

/// Scenario compiler for fog/edge computing simulations
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Number of parallel workers for seed sweeps (0 = auto-detect)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a scenario and report every defect
    Check {
        /// Path to the scenario YAML file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Compile a scenario and write the simulation-ready artifact
    Compile {
        /// Path to the scenario YAML file
        #[arg(short, long)]
        config: PathBuf,

        /// Output directory or .json file
        #[arg(short, long, default_value = "compiled_scenario.json")]
        output: PathBuf,
    },

    /// Preview message generation for one or more seeds
    Preview {
        /// Path to the scenario YAML file
        #[arg(short, long)]
        config: PathBuf,

        /// Seeds to preview; defaults to the scenario seed, or 0
        #[arg(short, long, value_delimiter = ',')]
        seeds: Vec<u64>,

        /// Horizon in time units; defaults to the scenario stop_time
        #[arg(long)]
        horizon: Option<f64>,

        /// Print every generation event of the first seed
        #[arg(long)]
        events: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .wrap_err("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Check { config } => {
            let scenario = orchestrator::compile_file(&config)?;
            info!(
                "Scenario '{}' is valid: {} device(s) host module instances",
                scenario.name(),
                scenario.busy_devices().count()
            );
        }
        Commands::Compile { config, output } => {
            let written = orchestrator::generate_compiled_scenario(&config, &output)?;
            info!("Ready to simulate with: {:?}", written);
        }
        Commands::Preview {
            config,
            seeds,
            horizon,
            events,
        } => {
            let scenario = orchestrator::compile_file(&config)?;
            let horizon = horizon
                .or_else(|| scenario.horizon())
                .ok_or_else(|| eyre!("No horizon: pass --horizon or set general.stop_time"))?;
            let horizon = preview::check_horizon(horizon)?;
            let seeds = if seeds.is_empty() {
                vec![scenario.seed().unwrap_or(0)]
            } else {
                seeds
            };

            if events {
                for event in preview::generation_schedule(&scenario, seeds[0], horizon) {
                    println!("{}", serde_json::to_string(&event)?);
                }
            } else {
                let runs = preview::sweep(&scenario, &seeds, horizon);
                println!("{}", serde_json::to_string_pretty(&runs)?);
            }
        }
    }

    Ok(())
}
