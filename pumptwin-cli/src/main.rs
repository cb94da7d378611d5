// Pump Twin CLI - Command-line front end
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Pump Twin CLI
//!
//! Generate datasets from the pump twin and monitor them.
//!
//! ## Usage
//!
//! ```bash
//! # Generate the default 3000-step dataset
//! pumptwin generate --output data/generated_run_3000steps.csv
//!
//! # Monitor an existing dataset with one worker per channel
//! pumptwin monitor --input data/generated_run_3000steps.csv --workers
//!
//! # Generate and monitor in one go
//! pumptwin run --seed 7 --alerts logs/alerts.txt
//!
//! # Print the default configuration
//! pumptwin config
//! ```

mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// Hydraulic pump digital twin
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a dataset and write it as CSV
    Generate(GenerateArgs),
    /// Monitor a dataset CSV and write the alert log
    Monitor(MonitorArgs),
    /// Generate, then monitor the generated rows
    Run(RunArgs),
    /// Print the default configuration, or validate a configuration file
    Config(ConfigArgs),
}

/// Options shared by every command that builds a configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// JSON configuration file (defaults apply to missing fields)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Random seed
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Number of simulation steps
    #[arg(long)]
    pub steps: Option<usize>,

    /// Stop early when filtered speed or temperature exceeds the safety limits
    #[arg(long)]
    pub safety_stop: bool,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Dataset CSV path (default: data/generated_run_<steps>steps.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Dataset CSV to monitor
    #[arg(short, long)]
    pub input: PathBuf,

    /// JSON configuration file for the monitor settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Alert log path
    #[arg(short, long, default_value = "logs/alerts.txt")]
    pub alerts: PathBuf,

    /// Run one worker thread per channel
    #[arg(short, long)]
    pub workers: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Dataset CSV path (default: data/generated_run_<steps>steps.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Alert log path
    #[arg(short, long, default_value = "logs/alerts.txt")]
    pub alerts: PathBuf,

    /// Run one worker thread per channel
    #[arg(short, long)]
    pub workers: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Validate this file instead of printing the defaults
    #[arg(long)]
    pub check: Option<PathBuf>,

    /// Write the defaults to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match cli.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Pump Twin v{}", pumptwin::VERSION);

    let result = match cli.command {
        Command::Generate(args) => commands::generate(&args),
        Command::Monitor(args) => commands::monitor(&args),
        Command::Run(args) => commands::run(&args),
        Command::Config(args) => commands::config(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
