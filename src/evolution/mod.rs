//! Prompt evolution: harvest failures → reflect → mutate → evaluate → select.
//!
//! One round, given the round-0 baseline over dev:
//!
//! ```text
//! round0 failures ──► reflect (1 call) ──► edits ──► variants
//!                                                      │ baseline strategy on dev
//!                                                      ▼
//!                                   variants.json ◄── Pareto frontier ──► best
//! ```
//!
//! A round with no usable edits produces no variants and no winner; the
//! caller then skips the confirmatory test evaluation.

pub mod pareto;
pub mod reflection;
pub mod variants;

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::EvolutionConfig;
use crate::error::Result;
use crate::evaluation::{Presentation, RunLedger, SplitRun, evaluate_split};
use crate::generator::Generator;
use crate::strategy::{Strategy, StrategyContext};
use crate::types::{Example, PromptFamily};

pub use pareto::{pareto_frontier, select_best};
pub use reflection::{
    Edit, FailureSnippet, Reflection, ReflectionArtifact, build_reflection_prompt, harvest_failures,
    parse_reflection, reflect,
};
pub use variants::{Candidate, Variant, materialize};

pub const REFLECTION_FILE: &str = "reflection.json";
pub const VARIANTS_FILE: &str = "variants.json";

/// Everything one round produced.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub reflection: ReflectionArtifact,
    pub variants: Vec<Variant>,
    pub pareto: Vec<Variant>,
    pub best: Option<Variant>,
}

#[derive(Serialize)]
struct VariantLedger<'a> {
    variants: &'a [Variant],
    pareto: &'a [Variant],
}

/// Inputs a round needs beyond the generator and ledger.
pub struct RoundInputs<'a> {
    pub round_dir: &'a Path,
    pub base_prompt: &'a str,
    pub family: PromptFamily,
    pub evolution: &'a EvolutionConfig,
    /// Dev split as loaded (unpermuted)
    pub dev: &'a [Example],
    /// Round-0 baseline over `dev`
    pub baseline: &'a SplitRun,
    pub presentation: Presentation,
}

/// Run one evolution round, persisting reflection and variant artifacts.
pub fn run_round<G: Generator + ?Sized>(
    generator: &mut G,
    ledger: &RunLedger,
    inputs: &RoundInputs<'_>,
) -> Result<RoundOutcome> {
    let evolution = inputs.evolution;
    let failures = harvest_failures(
        &inputs.baseline.presented,
        &inputs.baseline.records,
        evolution.num_reflection_examples,
    );
    info!(failures = failures.len(), "harvested failures for reflection");

    let reflection = reflect(
        generator,
        inputs.base_prompt,
        &failures,
        evolution.num_edits,
        evolution.max_edit_lines,
    );
    ledger.write_json(inputs.round_dir.join(REFLECTION_FILE), &reflection)?;

    let candidates = materialize(
        inputs.base_prompt,
        &reflection.parsed.edits,
        &evolution.separator,
        evolution.max_edit_lines,
    );

    let mut variants = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let variant_dir = inputs.round_dir.join(format!("variant_{}", candidate.name));
        let prompt_path = ledger.write_text(variant_dir.join("prompt.txt"), &candidate.prompt)?;

        let ctx = StrategyContext {
            base_prompt: &candidate.prompt,
            family: inputs.family,
            threshold: 0.0,
        };
        let run = match evaluate_split(
            generator,
            Strategy::Baseline,
            &ctx,
            inputs.dev,
            inputs.presentation,
            ledger,
            &variant_dir.join("dev"),
        ) {
            Ok(run) => run,
            Err(e) => {
                warn!(variant = %candidate.name, error = %e, "variant evaluation failed, skipping");
                continue;
            }
        };

        info!(
            variant = %candidate.name,
            accuracy = run.result.accuracy,
            avg_tokens_out = ?run.result.avg_tokens_out,
            "variant evaluated"
        );
        variants.push(Variant {
            name: candidate.name,
            accuracy: run.result.accuracy,
            avg_tokens_out: run.result.avg_tokens_out.unwrap_or(0.0),
            avg_latency_sec: run.result.avg_latency_sec,
            prompt_path,
            prompt: candidate.prompt,
        });
    }

    let pareto = pareto_frontier(&variants);
    ledger.write_json(
        inputs.round_dir.join(VARIANTS_FILE),
        &VariantLedger {
            variants: &variants,
            pareto: &pareto,
        },
    )?;

    let best = select_best(&pareto, &variants).cloned();
    match &best {
        Some(b) => info!(variant = %b.name, accuracy = b.accuracy, "selected round winner"),
        None => warn!("no variants to select from, skipping test evaluation"),
    }

    Ok(RoundOutcome {
        reflection,
        variants,
        pareto,
        best,
    })
}
