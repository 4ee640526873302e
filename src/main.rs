//! tutorgram CLI - MCQ strategy evaluation and tutoring-prompt evolution
//!
//! Runs every requested (dataset, mode) pair in sequence:
//!
//! 1. Load config (tutorgram.toml, walked up from the working directory)
//! 2. Apply command-line overrides
//! 3. For each cell: load splits, run the mode, write the run directory
//! 4. Print a per-run summary and a matrix table
//!
//! A failing cell does not stop the others; the exit code reports whether
//! every cell succeeded.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;

use tutorgram::config::Config;
use tutorgram::evaluation::{Mode, run_matrix};
use tutorgram::rendering::report::{render_matrix, render_summary, rule};

/// Evaluate answer strategies on multiple-choice datasets
///
/// Examples:
///   tutorgram                                   # baseline on the configured dataset
///   tutorgram --mode hybrid --threshold 0.7     # hybrid arbitration
///   tutorgram --mode baseline,self_refine,hybrid --dataset race --dataset logiqa
///   tutorgram --mode evolve                     # reflect, mutate, select
#[derive(Parser, Debug)]
#[command(name = "tutorgram")]
#[command(version)]
#[command(about, long_about = None)]
struct Cli {
    /// Config file (default: tutorgram.toml, searched upwards)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Modes to run: baseline, self_refine, distill_from_self_refine, hybrid, evolve (alias gepa)
    #[arg(short, long, value_delimiter = ',', default_value = "baseline")]
    mode: Vec<String>,

    /// Datasets to run (default: dataset.name from config)
    #[arg(short, long)]
    dataset: Vec<String>,

    /// Override the provider (openai, anthropic, mock, always_a, cli:<agent>)
    #[arg(long)]
    provider: Option<String>,

    /// Override the hybrid acceptance threshold
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Override the global seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the runs directory
    #[arg(long, value_name = "DIR")]
    runs_dir: Option<PathBuf>,

    /// Debug-level logging (per-example outcomes)
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_path(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::load(&std::env::current_dir()?)?,
    };

    if let Some(provider) = &cli.provider {
        config.model.provider = provider.clone();
    }
    if let Some(threshold) = cli.threshold {
        config.hybrid.threshold = threshold;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(dir) = &cli.runs_dir {
        config.logging.runs_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    tutorgram::logging::init(cli.verbose);

    let config = load_config(&cli)?;
    let modes = cli
        .mode
        .iter()
        .map(|m| m.parse::<Mode>())
        .collect::<Result<Vec<_>, _>>()?;
    let datasets = if cli.dataset.is_empty() {
        vec![config.dataset.name.clone()]
    } else {
        cli.dataset.clone()
    };

    eprintln!("{} tutorgram v{}", "▸".bright_blue().bold(), env!("CARGO_PKG_VERSION"));
    eprintln!("{}", config.display_summary());
    eprintln!(
        "   Modes:     {}",
        modes.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ")
    );
    eprintln!("   Datasets:  {}", datasets.join(", "));

    let cells = run_matrix(&config, &datasets, &modes)?;

    println!("{}", rule());
    for cell in &cells {
        if let Ok(run) = &cell.outcome {
            println!("{}", render_summary(&run.summary));
            println!("   {}", run.run_dir.display().dimmed());
        }
    }
    println!("{}", rule());
    println!("{}", render_matrix(&cells));

    let failed = cells.iter().filter(|c| c.outcome.is_err()).count();
    if failed > 0 {
        eprintln!("{} {} of {} runs failed", "✗".red().bold(), failed, cells.len());
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
