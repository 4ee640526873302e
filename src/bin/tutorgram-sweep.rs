//! Hybrid threshold sweep.
//!
//! Runs the hybrid strategy once per (dataset, threshold) and reports which
//! threshold gave the best test accuracy for each dataset. Results land in
//! `<runs-dir>/<timestamp>_sweep/sweep.json`, next to the individual runs.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;

use tutorgram::config::Config;
use tutorgram::evaluation::run_threshold_sweep;
use tutorgram::rendering::report::{render_sweep, rule};

/// Sweep the hybrid acceptance threshold
///
/// Examples:
///   tutorgram-sweep                                 # thresholds from config
///   tutorgram-sweep --thresholds 0.5,0.7,0.9 --dataset race
#[derive(Parser, Debug)]
#[command(name = "tutorgram-sweep")]
#[command(version)]
#[command(about, long_about = None)]
struct Cli {
    /// Config file (default: tutorgram.toml, searched upwards)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Datasets to sweep (default: sweep.datasets, else dataset.name)
    #[arg(short, long)]
    dataset: Vec<String>,

    /// Thresholds for every dataset, replacing the configured lists
    #[arg(short, long, value_delimiter = ',')]
    thresholds: Vec<f64>,

    /// Override the runs directory
    #[arg(long, value_name = "DIR")]
    runs_dir: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    tutorgram::logging::init(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::from_path(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::load(&std::env::current_dir()?)?,
    };
    if !cli.thresholds.is_empty() {
        config.sweep.thresholds = cli.thresholds.clone();
        config.sweep.dataset_specific.clear();
    }
    if let Some(dir) = &cli.runs_dir {
        config.logging.runs_dir = dir.clone();
    }
    config.validate()?;

    let datasets = if cli.dataset.is_empty() {
        config.sweep_datasets()
    } else {
        cli.dataset.clone()
    };

    eprintln!("{} tutorgram-sweep v{}", "▸".bright_blue().bold(), env!("CARGO_PKG_VERSION"));
    eprintln!("{}", config.display_summary());
    for dataset in &datasets {
        let thresholds: Vec<String> = config
            .sweep_thresholds(dataset)
            .iter()
            .map(|t| format!("{:.2}", t))
            .collect();
        eprintln!("   Sweep:     {} @ {}", dataset, thresholds.join(", "));
    }

    let report = run_threshold_sweep(&config, &datasets)?;

    println!("{}", rule());
    println!("{}", render_sweep(&report));
    println!("{}", rule());
    for (dataset, best) in report.best_by_dataset() {
        println!(
            "{} {}: threshold {:.2} (test acc {})",
            "★".bright_yellow().bold(),
            dataset,
            best.threshold,
            best.test_accuracy
                .map(|a| format!("{:.3}", a))
                .unwrap_or_else(|| "-".to_string())
        );
    }

    if report.points.iter().any(|p| !p.success) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
