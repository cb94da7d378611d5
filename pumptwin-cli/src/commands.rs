// Pump Twin CLI - Commands
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Subcommand implementations.

use crate::{ConfigArgs, ConfigOverrides, GenerateArgs, MonitorArgs, RunArgs};
use pumptwin::{Channel, SafetyLimits, Termination, TwinConfig, TwinError};
use pumptwin_monitor::{
    run_monitor, Execution, Monitor, MonitorError, MonitorReport, TextSink,
};
use pumptwin_sim::{generate as generate_rows, Dataset, DatasetError, GenerationReport, SimError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Twin(#[from] TwinError),

    #[error("Generation failed: {0}")]
    Sim(#[from] SimError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Monitoring failed: {0}")]
    Monitor(#[from] MonitorError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Defaults, then the config file, then command-line flags.
pub fn build_config(overrides: &ConfigOverrides) -> Result<TwinConfig> {
    let mut config = match &overrides.config {
        Some(path) => TwinConfig::load(path)?,
        None => TwinConfig::default(),
    };
    if let Some(seed) = overrides.seed {
        config = config.with_seed(seed);
    }
    if let Some(steps) = overrides.steps {
        config = config.with_steps(steps);
    }
    if overrides.safety_stop && config.simulation.termination == Termination::RunToCompletion {
        config = config.with_termination(Termination::SafetyStop(SafetyLimits::default()));
    }
    config.validate().map_err(TwinError::from)?;
    Ok(config)
}

fn dataset_path(output: &Option<PathBuf>, config: &TwinConfig) -> PathBuf {
    output.clone().unwrap_or_else(|| {
        PathBuf::from(format!(
            "data/generated_run_{}steps.csv",
            config.simulation.steps
        ))
    })
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn execution(workers: bool) -> Execution {
    if workers {
        Execution::PerChannelWorkers
    } else {
        Execution::Sequential
    }
}

fn generate_to(config: &TwinConfig, path: &Path) -> Result<GenerationReport> {
    let report = generate_rows(config)?;
    ensure_parent(path)?;
    report.dataset.to_csv(path)?;
    info!("Dataset written to {}", path.display());
    Ok(report)
}

fn print_generation(report: &GenerationReport, path: &Path) {
    let counts = report.dataset.label_counts();
    println!("Simulation complete: {} steps generated.", report.dataset.len());
    println!("Data saved to: {}", path.display());
    println!(
        "Labels: {} spike, {} drift, {} dropout",
        counts.spike, counts.drift, counts.dropout
    );
    if let Some(stop) = &report.stop {
        println!("Simulation stopped at {}", stop);
    }
}

fn print_monitoring(report: &MonitorReport, alerts_path: &Path) {
    println!("Alerts log     : {}", alerts_path.display());
    println!("Total alerts   : {}", report.alerts.total());
    for channel in Channel::ALL {
        let record = report.baseline.get(channel);
        println!(
            "  {:<12} mean={:>10.3} std={:>8.3} thr={:>10.3} ({})",
            channel.as_str(),
            record.mean,
            record.std,
            record.threshold,
            record.quality.as_str()
        );
    }
    if report.sink_failures > 0 {
        warn!("{} alert rows could not be written", report.sink_failures);
    }
}

pub fn generate(args: &GenerateArgs) -> Result<()> {
    let config = build_config(&args.overrides)?;
    let path = dataset_path(&args.output, &config);
    let report = generate_to(&config, &path)?;
    print_generation(&report, &path);
    Ok(())
}

pub fn monitor(args: &MonitorArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => TwinConfig::load(path)?,
        None => TwinConfig::default(),
    };
    let dataset = Dataset::from_csv(&args.input)?;
    info!("Loaded {} rows from {}", dataset.len(), args.input.display());

    let report = run_monitor(dataset.rows(), &config.monitor, execution(args.workers))?;
    ensure_parent(&args.alerts)?;
    report.alerts.save(&args.alerts)?;

    println!("Monitoring complete.");
    print_monitoring(&report, &args.alerts);
    Ok(())
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = build_config(&args.overrides)?;
    let path = dataset_path(&args.output, &config);
    let generated = generate_to(&config, &path)?;

    ensure_parent(&args.alerts)?;
    let report = if args.workers {
        let report = run_monitor(generated.rows(), &config.monitor, Execution::PerChannelWorkers)?;
        report.alerts.save(&args.alerts)?;
        report
    } else {
        // Alerts are streamed to the log file as rows are monitored
        let sink = TextSink::create(&args.alerts)?;
        let mut monitor = Monitor::new(config.monitor.clone())?.with_sink(Box::new(sink));
        for row in generated.rows() {
            monitor.push(row.clone())?;
        }
        monitor.finish()?
    };

    println!("Simulation & monitoring complete.");
    print_generation(&generated, &path);
    print_monitoring(&report, &args.alerts);
    Ok(())
}

pub fn config(args: &ConfigArgs) -> Result<()> {
    if let Some(path) = &args.check {
        let config = TwinConfig::load(path)?;
        println!(
            "{}: valid ({} steps, seed {})",
            path.display(),
            config.simulation.steps,
            config.simulation.seed
        );
        return Ok(());
    }

    let config = TwinConfig::default();
    match &args.output {
        Some(path) => {
            ensure_parent(path)?;
            config.save(path)?;
            println!("Default configuration written to {}", path.display());
        }
        None => println!("{}", config.to_json_pretty()?),
    }
    Ok(())
}
