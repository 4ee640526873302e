//! tutorgram - MCQ strategy evaluation and tutoring-prompt evolution
//!
//! Compares answer-production strategies for multiple-choice questions
//! against a language model, and evolves the tutoring prompt from its own
//! failures.
//!
//! # Architecture
//!
//! ```text
//! Dataset → Choice Shuffle → Prompt Render → Strategy (1-4 calls) → Extract/Validate → Record
//!                                                                                       ↓
//!                     Pareto Select ← Variant Eval ← Reflection ← Failure Harvest ← Metrics
//! ```
//!
//! # Strategies
//!
//! - `baseline`: one call
//! - `self_refine`: answer, then critique and revise
//! - `distill_from_self_refine`: self-refine, distill rules, re-answer with them
//! - `hybrid`: producer answers, auditor may override on a confident disagreement

pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod evolution;
pub mod extraction;
pub mod generator;
pub mod logging;
pub mod rendering;
pub mod strategy;
pub mod types;

// Re-export core types
pub use types::{Choice, DatasetDescriptor, Example, Generation, LabelSet, PromptFamily, Usage};

pub use config::Config;
pub use error::{EvalError, Result};
pub use evaluation::{Mode, RunOutcome, RunSummary, run_matrix, run_mode, run_threshold_sweep};
pub use generator::{Backend, Generator};
pub use strategy::{Strategy, StrategyContext, StrategyRecord, execute};
