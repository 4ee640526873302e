//! Orchestrator: configs in, run directories out.
//!
//! - Plain modes run one strategy over dev, then test.
//! - `evolve` (alias `gepa`) runs the round-0 baseline over dev, one
//!   evolution round, and a confirmatory test evaluation of the winner.
//!
//! Everything is sequential: one example at a time, one call at a time.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::ledger::{RunLedger, SUMMARY_FILE, run_name};
use super::metrics::{EvalResult, OverrideStats};
use crate::config::Config;
use crate::dataset::{load_split, present};
use crate::error::{EvalError, Result};
use crate::evolution::{RoundInputs, Variant, run_round};
use crate::generator::{Backend, Generator};
use crate::strategy::{Strategy, StrategyContext, StrategyRecord, execute};
use crate::types::Example;

pub const BASE_PROMPT_FILE: &str = "base_prompt.txt";

/// What a run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// One strategy over dev and test
    Plain(Strategy),
    /// Failure harvest, reflection, variant selection
    Evolve,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Plain(s) => s.as_str(),
            Mode::Evolve => "evolve",
        }
    }
}

impl FromStr for Mode {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "evolve" | "gepa" => Ok(Mode::Evolve),
            other => other
                .parse::<Strategy>()
                .map(Mode::Plain)
                .map_err(|_| EvalError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How examples are shown to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presentation {
    pub seed: u64,
    pub shuffle: bool,
}

impl Presentation {
    pub fn from_config(config: &Config) -> Self {
        Self {
            seed: config.seed,
            shuffle: config.evaluation.shuffle_choices,
        }
    }
}

/// One strategy over one split.
#[derive(Debug, Clone)]
pub struct SplitRun {
    pub result: EvalResult,
    /// In input order
    pub records: Vec<StrategyRecord>,
    /// Examples as presented, parallel to `records`
    pub presented: Vec<Example>,
}

/// Evaluate `examples` with `strategy`, streaming records to `<dir>/records.jsonl`.
///
/// A permutation consistency failure aborts the split; records written so
/// far stay on disk.
pub fn evaluate_split<G: Generator + ?Sized>(
    generator: &mut G,
    strategy: Strategy,
    ctx: &StrategyContext<'_>,
    examples: &[Example],
    presentation: Presentation,
    ledger: &RunLedger,
    dir: &Path,
) -> Result<SplitRun> {
    info!(
        strategy = strategy.as_str(),
        split = %dir.display(),
        examples = examples.len(),
        calls = examples.len() * strategy.calls(),
        "evaluating split"
    );

    let mut writer = ledger.records(dir)?;
    let mut records = Vec::with_capacity(examples.len());
    let mut presented = Vec::with_capacity(examples.len());

    for example in examples {
        let shown = present(example, presentation.seed, presentation.shuffle)?;
        let record = execute(strategy, generator, ctx, &shown);
        writer.append(&record)?;
        records.push(record);
        presented.push(shown);
    }

    let result = EvalResult::aggregate(&records, writer.path().to_path_buf());
    info!(
        strategy = strategy.as_str(),
        split = %dir.display(),
        accuracy = result.accuracy,
        avg_tokens_out = ?result.avg_tokens_out,
        avg_latency_sec = result.avg_latency_sec,
        "split complete"
    );

    Ok(SplitRun {
        result,
        records,
        presented,
    })
}

/// Override statistics for both splits of a hybrid run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitOverrideStats {
    pub dev: OverrideStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<OverrideStats>,
}

/// Contents of `summary.json`. Undefined fields are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub mode: String,
    pub dataset: String,
    pub generator: String,
    pub dev_accuracy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_avg_tokens_out: Option<f64>,
    pub dev_avg_latency_sec: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_avg_tokens_out: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_avg_latency_sec: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round1_best: Option<Variant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_stats: Option<SplitOverrideStats>,
}

impl RunSummary {
    fn new(mode: Mode, dataset: &str, generator: String, dev: &EvalResult, test: Option<&EvalResult>) -> Self {
        Self {
            mode: mode.as_str().to_string(),
            dataset: dataset.to_string(),
            generator,
            dev_accuracy: dev.accuracy,
            dev_avg_tokens_out: dev.avg_tokens_out,
            dev_avg_latency_sec: dev.avg_latency_sec,
            test_accuracy: test.map(|t| t.accuracy),
            test_avg_tokens_out: test.and_then(|t| t.avg_tokens_out),
            test_avg_latency_sec: test.map(|t| t.avg_latency_sec),
            round1_best: None,
            override_stats: None,
        }
    }
}

/// A finished run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_dir: PathBuf,
    pub summary: RunSummary,
}

/// Which optional parts go into the run directory name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTags {
    pub dataset: bool,
    pub threshold: bool,
}

/// Drop test examples whose id also appears in dev.
pub fn disjoint_test(dev: &[Example], test: Vec<Example>) -> Vec<Example> {
    let dev_ids: HashSet<&str> = dev.iter().map(|e| e.id.as_str()).collect();
    let before = test.len();
    let test: Vec<Example> = test.into_iter().filter(|e| !dev_ids.contains(e.id.as_str())).collect();
    if test.len() < before {
        warn!(
            dropped = before - test.len(),
            "test examples overlapping dev were dropped"
        );
    }
    test
}

/// Run `mode` with the backend named in the config.
pub fn run_mode(config: &Config, mode: Mode) -> Result<RunOutcome> {
    let mut generator = Backend::from_config(&config.model, config.seed)?;
    run_mode_with(config, mode, &mut generator, RunTags::default())
}

/// Run `mode` against an explicit generator.
pub fn run_mode_with<G: Generator + ?Sized>(
    config: &Config,
    mode: Mode,
    generator: &mut G,
    tags: RunTags,
) -> Result<RunOutcome> {
    let descriptor = config.descriptor()?;
    let base_prompt = config.base_prompt()?;
    let dev = load_split(&descriptor, "dev", config.dataset.n_dev)?;
    let test = disjoint_test(&dev, load_split(&descriptor, "test", config.dataset.n_test)?);

    let name = run_name(
        mode.as_str(),
        tags.dataset.then_some(descriptor.name.as_str()),
        tags.threshold.then_some(config.hybrid.threshold),
    );
    let ledger = RunLedger::create(&config.logging.runs_dir, &name)?;
    ledger.write_text(BASE_PROMPT_FILE, &base_prompt)?;

    info!(
        mode = mode.as_str(),
        dataset = %descriptor.name,
        family = %descriptor.family,
        generator = %generator.name(),
        run_dir = %ledger.root().display(),
        "run started"
    );

    let presentation = Presentation::from_config(config);
    let ctx = StrategyContext {
        base_prompt: &base_prompt,
        family: descriptor.family,
        threshold: config.hybrid.threshold,
    };

    let summary = match mode {
        Mode::Plain(strategy) => {
            let dev_run = evaluate_split(generator, strategy, &ctx, &dev, presentation, &ledger, Path::new("dev"))?;
            let test_run =
                evaluate_split(generator, strategy, &ctx, &test, presentation, &ledger, Path::new("test"))?;

            let mut summary = RunSummary::new(
                mode,
                &descriptor.name,
                generator.name(),
                &dev_run.result,
                Some(&test_run.result),
            );
            if strategy == Strategy::Hybrid {
                summary.override_stats =
                    OverrideStats::from_records(&dev_run.records).map(|dev| SplitOverrideStats {
                        dev,
                        test: OverrideStats::from_records(&test_run.records),
                    });
            }
            summary
        }
        Mode::Evolve => {
            let baseline = evaluate_split(
                generator,
                Strategy::Baseline,
                &ctx,
                &dev,
                presentation,
                &ledger,
                Path::new("round0/dev"),
            )?;

            let round_dir = Path::new("round1");
            let round = run_round(
                generator,
                &ledger,
                &RoundInputs {
                    round_dir,
                    base_prompt: &base_prompt,
                    family: descriptor.family,
                    evolution: &config.evolution,
                    dev: &dev,
                    baseline: &baseline,
                    presentation,
                },
            )?;

            let test_run = match &round.best {
                Some(best) => {
                    let best_ctx = StrategyContext {
                        base_prompt: &best.prompt,
                        ..ctx
                    };
                    Some(evaluate_split(
                        generator,
                        Strategy::Baseline,
                        &best_ctx,
                        &test,
                        presentation,
                        &ledger,
                        &round_dir.join("test"),
                    )?)
                }
                None => None,
            };

            let mut summary = RunSummary::new(
                mode,
                &descriptor.name,
                generator.name(),
                &baseline.result,
                test_run.as_ref().map(|t| &t.result),
            );
            summary.round1_best = round.best;
            summary
        }
    };

    ledger.write_json(SUMMARY_FILE, &summary)?;
    info!(
        mode = mode.as_str(),
        dataset = %descriptor.name,
        dev_accuracy = summary.dev_accuracy,
        test_accuracy = ?summary.test_accuracy,
        "run complete"
    );

    Ok(RunOutcome {
        run_dir: ledger.root().to_path_buf(),
        summary,
    })
}

/// One (dataset, mode) cell of a matrix run.
#[derive(Debug)]
pub struct MatrixCell {
    pub dataset: String,
    pub mode: Mode,
    /// Error message when the cell failed
    pub outcome: std::result::Result<RunOutcome, String>,
}

/// Run every (dataset, mode) pair with the configured backend.
pub fn run_matrix(config: &Config, datasets: &[String], modes: &[Mode]) -> Result<Vec<MatrixCell>> {
    run_matrix_with(config, datasets, modes, |cfg| {
        Backend::from_config(&cfg.model, cfg.seed)
    })
}

/// Run every (dataset, mode) pair, each with a fresh generator from `make`.
///
/// A failing cell is logged and recorded and the rest still run.
/// Configuration errors abort the whole matrix.
pub fn run_matrix_with<G, F>(
    config: &Config,
    datasets: &[String],
    modes: &[Mode],
    mut make: F,
) -> Result<Vec<MatrixCell>>
where
    G: Generator,
    F: FnMut(&Config) -> Result<G>,
{
    let mut cells = Vec::with_capacity(datasets.len() * modes.len());
    let tags = RunTags {
        dataset: true,
        threshold: false,
    };

    for dataset in datasets {
        let cell_config = config.with_dataset(dataset);
        for &mode in modes {
            let outcome = make(&cell_config)
                .and_then(|mut generator| run_mode_with(&cell_config, mode, &mut generator, tags));

            let outcome = match outcome {
                Ok(run) => Ok(run),
                Err(e) if e.is_config() => return Err(e),
                Err(e) => {
                    error!(dataset = %dataset, mode = mode.as_str(), error = %e, "run failed");
                    Err(e.to_string())
                }
            };
            cells.push(MatrixCell {
                dataset: dataset.clone(),
                mode,
                outcome,
            });
        }
    }
    Ok(cells)
}
