//! In-process hybrid threshold sweep.
//!
//! Each (dataset, threshold) cell derives its config in memory and runs the
//! hybrid mode directly, so nothing temporary touches the disk. Points are
//! rewritten to `<runs-dir>/<ts>_sweep/sweep.json` after every cell.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::ledger::{RunLedger, timestamp};
use super::runner::{Mode, RunTags, SplitOverrideStats, run_mode_with};
use crate::config::Config;
use crate::error::Result;
use crate::generator::{Backend, Generator};
use crate::strategy::Strategy;

pub const SWEEP_FILE: &str = "sweep.json";

/// Outcome of one hybrid run at one threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub dataset: String,
    pub threshold: f64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_avg_tokens_out: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_avg_tokens_out: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_stats: Option<SplitOverrideStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SweepPoint {
    fn failed(dataset: &str, threshold: f64, error: String) -> Self {
        Self {
            dataset: dataset.to_string(),
            threshold,
            success: false,
            dev_accuracy: None,
            test_accuracy: None,
            dev_avg_tokens_out: None,
            test_avg_tokens_out: None,
            override_stats: None,
            run_dir: None,
            error: Some(error),
        }
    }
}

/// All points of a sweep and where they were written.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub dir: PathBuf,
    pub points: Vec<SweepPoint>,
}

impl SweepReport {
    /// Best successful point per dataset by test accuracy; the lower
    /// threshold wins ties.
    pub fn best_by_dataset(&self) -> BTreeMap<String, &SweepPoint> {
        let mut best: BTreeMap<String, &SweepPoint> = BTreeMap::new();
        for point in self.points.iter().filter(|p| p.success) {
            let score = point.test_accuracy.unwrap_or(0.0);
            let replace = match best.get(&point.dataset) {
                None => true,
                Some(current) => {
                    let current_score = current.test_accuracy.unwrap_or(0.0);
                    score > current_score || (score == current_score && point.threshold < current.threshold)
                }
            };
            if replace {
                best.insert(point.dataset.clone(), point);
            }
        }
        best
    }
}

/// Sweep with the configured backend.
pub fn run_threshold_sweep(config: &Config, datasets: &[String]) -> Result<SweepReport> {
    run_threshold_sweep_with(config, datasets, |cfg| {
        Backend::from_config(&cfg.model, cfg.seed)
    })
}

/// Sweep with a fresh generator per cell from `make`.
///
/// Failed cells become `success = false` points; configuration errors abort.
pub fn run_threshold_sweep_with<G, F>(config: &Config, datasets: &[String], mut make: F) -> Result<SweepReport>
where
    G: Generator,
    F: FnMut(&Config) -> Result<G>,
{
    let ledger = RunLedger::create(&config.logging.runs_dir, &format!("{}_sweep", timestamp()))?;
    let tags = RunTags {
        dataset: true,
        threshold: true,
    };
    let mut points = Vec::new();

    for dataset in datasets {
        let dataset_config = config.with_dataset(dataset);
        for threshold in config.sweep_thresholds(dataset) {
            let cell_config = dataset_config.with_threshold(threshold);
            info!(dataset = %dataset, threshold, "sweep cell");

            let outcome = make(&cell_config).and_then(|mut generator| {
                run_mode_with(&cell_config, Mode::Plain(Strategy::Hybrid), &mut generator, tags)
            });

            let point = match outcome {
                Ok(run) => SweepPoint {
                    dataset: dataset.clone(),
                    threshold,
                    success: true,
                    dev_accuracy: Some(run.summary.dev_accuracy),
                    test_accuracy: run.summary.test_accuracy,
                    dev_avg_tokens_out: run.summary.dev_avg_tokens_out,
                    test_avg_tokens_out: run.summary.test_avg_tokens_out,
                    override_stats: run.summary.override_stats,
                    run_dir: Some(run.run_dir),
                    error: None,
                },
                Err(e) if e.is_config() => return Err(e),
                Err(e) => {
                    error!(dataset = %dataset, threshold, error = %e, "sweep cell failed");
                    SweepPoint::failed(dataset, threshold, e.to_string())
                }
            };
            points.push(point);
            ledger.write_json(SWEEP_FILE, &points)?;
        }
    }

    Ok(SweepReport {
        dir: ledger.root().to_path_buf(),
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(dataset: &str, threshold: f64, test_accuracy: f64) -> SweepPoint {
        SweepPoint {
            success: true,
            test_accuracy: Some(test_accuracy),
            error: None,
            ..SweepPoint::failed(dataset, threshold, String::new())
        }
    }

    #[test]
    fn test_best_by_dataset() {
        let report = SweepReport {
            dir: PathBuf::from("runs/x_sweep"),
            points: vec![
                point("race", 0.3, 0.6),
                point("race", 0.7, 0.8),
                point("race", 0.9, 0.8),
                point("logiqa", 0.5, 0.4),
                SweepPoint::failed("logiqa", 0.9, "boom".into()),
            ],
        };
        let best = report.best_by_dataset();
        assert_eq!(best["race"].threshold, 0.7);
        assert_eq!(best["logiqa"].threshold, 0.5);
    }

    #[test]
    fn test_failed_point_serializes_error() {
        let json = serde_json::to_value(SweepPoint::failed("race", 0.5, "missing split".into())).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "missing split");
        assert!(json.get("dev_accuracy").is_none());
    }
}
