//! Evaluation: running strategies over splits and recording what happened.
//!
//! - [`metrics`]: accuracy / tokens / latency aggregation and override statistics
//! - [`ledger`]: run directories, JSON Lines records, JSON summaries
//! - [`runner`]: plain and evolution modes, multi-dataset matrix
//! - [`sweep`]: hybrid acceptance-threshold sweep

pub mod ledger;
pub mod metrics;
pub mod runner;
pub mod sweep;

pub use ledger::{JsonlWriter, RunLedger, read_jsonl};
pub use metrics::{EvalResult, OverrideStats};
pub use runner::{
    MatrixCell, Mode, Presentation, RunOutcome, RunSummary, RunTags, SplitOverrideStats, SplitRun,
    evaluate_split, run_matrix, run_matrix_with, run_mode, run_mode_with,
};
pub use sweep::{SweepPoint, SweepReport, run_threshold_sweep, run_threshold_sweep_with};
