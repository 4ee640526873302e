//! Strategy Executor: one named strategy, one example, one record.
//!
//! | Strategy                   | Calls | Prediction                                  |
//! |----------------------------|-------|---------------------------------------------|
//! | `baseline`                 | 1     | the single response                         |
//! | `self_refine`              | 2     | revision, else initial                      |
//! | `distill_from_self_refine` | 4     | final re-answer, else revision              |
//! | `hybrid`                   | 2     | producer, unless the auditor override holds |
//!
//! Calls within a chain are strictly sequential. The example passed in is
//! the *presented* example (already permuted and relabeled).

pub mod hybrid;
pub mod record;

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::EvalError;
use crate::extraction::{extract_answer, final_answer, is_format_compliant};
use crate::generator::Generator;
use crate::rendering::{
    render_auditor_prompt, render_critique_prompt, render_distill_prompt, render_final_prompt,
    render_mcq_prompt, render_producer_prompt,
};
use crate::types::{Example, Generation, LabelSet, MAX_CHOICES, PromptFamily};

pub use hybrid::{Decision, arbitrate, audit_confidence};
pub use record::{Arbitration, Branch, StageTrace, StrategyRecord, StrategyUsage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Baseline,
    SelfRefine,
    DistillFromSelfRefine,
    Hybrid,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Baseline => "baseline",
            Strategy::SelfRefine => "self_refine",
            Strategy::DistillFromSelfRefine => "distill_from_self_refine",
            Strategy::Hybrid => "hybrid",
        }
    }

    /// Generator calls per example.
    pub fn calls(&self) -> usize {
        match self {
            Strategy::Baseline => 1,
            Strategy::SelfRefine | Strategy::Hybrid => 2,
            Strategy::DistillFromSelfRefine => 4,
        }
    }
}

impl FromStr for Strategy {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "baseline" => Ok(Strategy::Baseline),
            "self_refine" => Ok(Strategy::SelfRefine),
            "distill_from_self_refine" => Ok(Strategy::DistillFromSelfRefine),
            "hybrid" => Ok(Strategy::Hybrid),
            _ => Err(EvalError::UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a strategy needs besides the example and the generator.
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    pub base_prompt: &'a str,
    pub family: PromptFamily,
    /// Hybrid acceptance threshold
    pub threshold: f64,
}

/// A finished chain before scoring.
struct Outcome {
    prompt: String,
    pred: Option<char>,
    /// Index into `calls` of the deciding response
    deciding: usize,
    calls: Vec<(&'static str, Generation)>,
    arbitration: Option<Arbitration>,
}

/// First candidate with a letter wins; otherwise the last call decides.
fn first_letter(candidates: &[(usize, Option<char>)], last: usize) -> (Option<char>, usize) {
    candidates
        .iter()
        .find_map(|&(idx, letter)| letter.map(|l| (Some(l), idx)))
        .unwrap_or((None, last))
}

/// Run `strategy` on one presented example.
pub fn execute<G: Generator + ?Sized>(
    strategy: Strategy,
    generator: &mut G,
    ctx: &StrategyContext<'_>,
    example: &Example,
) -> StrategyRecord {
    let allowed = example.label_set();
    let outcome = match strategy {
        Strategy::Baseline => run_baseline(generator, ctx, example, &allowed),
        Strategy::SelfRefine => run_self_refine(generator, ctx, example, &allowed),
        Strategy::DistillFromSelfRefine => run_distill(generator, ctx, example, &allowed),
        Strategy::Hybrid => run_hybrid(generator, ctx, example, &allowed),
    };
    score(strategy, example, &allowed, outcome)
}

fn run_baseline<G: Generator + ?Sized>(
    generator: &mut G,
    ctx: &StrategyContext<'_>,
    example: &Example,
    allowed: &LabelSet,
) -> Outcome {
    let prompt = render_mcq_prompt(ctx.base_prompt, ctx.family, example);
    let answer = generator.generate(&prompt, None);
    let pred = extract_answer(&answer.text, allowed);
    Outcome {
        prompt,
        pred,
        deciding: 0,
        calls: vec![("answer", answer)],
        arbitration: None,
    }
}

fn run_self_refine<G: Generator + ?Sized>(
    generator: &mut G,
    ctx: &StrategyContext<'_>,
    example: &Example,
    allowed: &LabelSet,
) -> Outcome {
    let prompt = render_mcq_prompt(ctx.base_prompt, ctx.family, example);
    let initial = generator.generate(&prompt, None);
    let revision = generator.generate(&render_critique_prompt(&prompt, &initial.text), None);

    let (pred, deciding) = first_letter(
        &[
            (1, extract_answer(&revision.text, allowed)),
            (0, extract_answer(&initial.text, allowed)),
        ],
        1,
    );
    Outcome {
        prompt,
        pred,
        deciding,
        calls: vec![("initial", initial), ("revision", revision)],
        arbitration: None,
    }
}

fn run_distill<G: Generator + ?Sized>(
    generator: &mut G,
    ctx: &StrategyContext<'_>,
    example: &Example,
    allowed: &LabelSet,
) -> Outcome {
    let prompt = render_mcq_prompt(ctx.base_prompt, ctx.family, example);
    let initial = generator.generate(&prompt, None);
    let revision = generator.generate(&render_critique_prompt(&prompt, &initial.text), None);
    let rules = generator.generate(&render_distill_prompt(&revision.text), None);
    let reanswer = generator.generate(
        &render_final_prompt(ctx.base_prompt, ctx.family, example, &rules.text),
        None,
    );

    let (pred, deciding) = first_letter(
        &[
            (3, extract_answer(&reanswer.text, allowed)),
            (1, extract_answer(&revision.text, allowed)),
        ],
        3,
    );
    Outcome {
        prompt,
        pred,
        deciding,
        calls: vec![
            ("initial", initial),
            ("revision", revision),
            ("distill", rules),
            ("final", reanswer),
        ],
        arbitration: None,
    }
}

fn run_hybrid<G: Generator + ?Sized>(
    generator: &mut G,
    ctx: &StrategyContext<'_>,
    example: &Example,
    allowed: &LabelSet,
) -> Outcome {
    let prompt = render_producer_prompt(ctx.base_prompt, ctx.family, example);
    let producer = generator.generate(&prompt, None);
    let auditor = generator.generate(
        &render_auditor_prompt(ctx.family, example, &producer.text),
        None,
    );

    let producer_pred = extract_answer(&producer.text, allowed);
    // Full alphabet so an out-of-range letter reads as invalid, not absent
    let auditor_pred = extract_answer(&auditor.text, &LabelSet::positional(MAX_CHOICES));
    let decision = arbitrate(producer_pred, auditor_pred, &auditor.text, allowed, ctx.threshold);

    let deciding = match (decision.overridden(), decision.letter) {
        (true, _) | (false, None) => 1,
        (false, Some(_)) => 0,
    };

    Outcome {
        prompt,
        pred: decision.letter,
        deciding,
        calls: vec![("producer", producer), ("auditor", auditor)],
        arbitration: Some(Arbitration {
            producer_pred: producer_pred.map(String::from),
            auditor_pred: auditor_pred.map(String::from),
            confidence: decision.confidence,
            threshold: ctx.threshold,
            branch: decision.branch,
        }),
    }
}

fn score(strategy: Strategy, example: &Example, allowed: &LabelSet, outcome: Outcome) -> StrategyRecord {
    let pairs: Vec<(&str, &Generation)> = outcome.calls.iter().map(|(s, g)| (*s, g)).collect();
    let mut usage = StrategyUsage::from_calls(&pairs);
    if let Some(arbitration) = outcome.arbitration {
        usage = usage.with_arbitration(arbitration);
    }

    let raw_text = outcome.calls[outcome.deciding].1.text.clone();
    let format_compliant = is_format_compliant(&raw_text, allowed);
    // The final line must declare the predicted letter itself
    let declared_last = format_compliant && final_answer(&raw_text, allowed) == outcome.pred;
    let answer_pred = outcome.pred.map(String::from);
    let correct = declared_last && answer_pred.as_deref() == Some(example.answer.as_str());
    let latency_sec: f64 = outcome.calls.iter().map(|(_, g)| g.latency_sec).sum();

    debug!(
        example_id = %example.id,
        strategy = strategy.as_str(),
        pred = answer_pred.as_deref().unwrap_or("-"),
        gold = %example.answer,
        correct,
        format_compliant,
        "example scored"
    );

    StrategyRecord {
        id: example.id.clone(),
        strategy: strategy.as_str().to_string(),
        answer_gold: example.answer.clone(),
        answer_pred,
        correct: u8::from(correct),
        format_compliant,
        latency_sec,
        usage,
        raw_text,
        prompt_rendered: outcome.prompt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Choice, Usage};

    /// Replays canned responses in order.
    struct Scripted {
        responses: Vec<Generation>,
        prompts: Vec<String>,
    }

    impl Scripted {
        fn new(texts: &[(&str, u64, u64)]) -> Self {
            Self {
                responses: texts
                    .iter()
                    .rev()
                    .map(|(t, i, o)| Generation::new(*t, Usage::new(Some(*i), Some(*o)), 0.1))
                    .collect(),
                prompts: Vec::new(),
            }
        }
    }

    impl Generator for Scripted {
        fn generate(&mut self, prompt: &str, _stop: Option<&[String]>) -> Generation {
            self.prompts.push(prompt.to_string());
            self.responses.pop().expect("script exhausted")
        }

        fn name(&self) -> String {
            "scripted".to_string()
        }
    }

    fn example() -> Example {
        Example {
            id: "q1".to_string(),
            context: String::new(),
            question: "Pick the second letter.".to_string(),
            choices: ["w", "x", "y", "z"]
                .iter()
                .zip(['A', 'B', 'C', 'D'])
                .map(|(t, l)| Choice::new(l.to_string(), *t))
                .collect(),
            answer: "B".to_string(),
        }
    }

    fn ctx() -> StrategyContext<'static> {
        StrategyContext {
            base_prompt: "BASE",
            family: PromptFamily::Generic,
            threshold: 0.5,
        }
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!("self-refine".parse::<Strategy>().unwrap(), Strategy::SelfRefine);
        assert_eq!("HYBRID".parse::<Strategy>().unwrap(), Strategy::Hybrid);
        assert!(matches!(
            "tree_of_thought".parse::<Strategy>(),
            Err(EvalError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_baseline_correct() {
        let mut g = Scripted::new(&[("Thinking.\nAnswer: B", 50, 5)]);
        let r = execute(Strategy::Baseline, &mut g, &ctx(), &example());
        assert_eq!(r.answer_pred.as_deref(), Some("B"));
        assert_eq!(r.correct, 1);
        assert!(r.format_compliant);
        assert_eq!(r.usage.total_tokens, Some(55));
        assert_eq!(r.prompt_rendered, g.prompts[0]);
    }

    #[test]
    fn test_right_letter_wrong_format_is_incorrect() {
        let mut g = Scripted::new(&[("Answer: B\nHope that helps!", 50, 5)]);
        let r = execute(Strategy::Baseline, &mut g, &ctx(), &example());
        assert_eq!(r.answer_pred.as_deref(), Some("B"));
        assert!(!r.format_compliant);
        assert_eq!(r.correct, 0);
    }

    #[test]
    fn test_changed_answer_on_final_line_is_incorrect() {
        let mut g = Scripted::new(&[("Answer: B\nWait, on reflection.\nAnswer: C", 50, 5)]);
        let r = execute(Strategy::Baseline, &mut g, &ctx(), &example());
        assert!(r.format_compliant);
        assert_eq!(r.correct, 0);
        assert!(!r.is_correct());
    }

    #[test]
    fn test_self_refine_falls_back_to_initial() {
        let mut g = Scripted::new(&[("Answer: C", 40, 3), ("Hmm, not sure.", 60, 4)]);
        let r = execute(Strategy::SelfRefine, &mut g, &ctx(), &example());
        assert_eq!(r.answer_pred.as_deref(), Some("C"));
        assert_eq!(r.raw_text, "Answer: C");
        assert_eq!(r.usage.total_tokens, Some(107));
        assert_eq!(r.usage.calls.len(), 2);
        assert!((r.latency_sec - 0.2).abs() < 1e-9);
        // The critique prompt embeds the first answer
        assert!(g.prompts[1].contains("Answer: C"));
    }

    #[test]
    fn test_distill_uses_final_and_appends_rules() {
        let mut g = Scripted::new(&[
            ("Answer: A", 10, 1),
            ("Critique.\nAnswer: C", 20, 2),
            ("- read carefully", 30, 3),
            ("Answer: B", 40, 4),
        ]);
        let r = execute(Strategy::DistillFromSelfRefine, &mut g, &ctx(), &example());
        assert_eq!(r.answer_pred.as_deref(), Some("B"));
        assert_eq!(r.correct, 1);
        assert_eq!(r.usage.total_tokens, Some(110));
        assert!(g.prompts[3].contains("RULES TO APPLY:\n- read carefully"));
        let stages: Vec<_> = r.usage.calls.iter().map(|c| c.stage.as_str()).collect();
        assert_eq!(stages, vec!["initial", "revision", "distill", "final"]);
        assert_eq!(r.usage.calls.len(), Strategy::DistillFromSelfRefine.calls());
    }

    #[test]
    fn test_distill_falls_back_to_revision() {
        let mut g = Scripted::new(&[
            ("Answer: A", 1, 1),
            ("Answer: B", 1, 1),
            ("- rule", 1, 1),
            ("I decline.", 1, 1),
        ]);
        let r = execute(Strategy::DistillFromSelfRefine, &mut g, &ctx(), &example());
        assert_eq!(r.answer_pred.as_deref(), Some("B"));
        assert_eq!(r.raw_text, "Answer: B");
    }

    #[test]
    fn test_hybrid_override() {
        let mut g = Scripted::new(&[
            ("Answer: A", 100, 10),
            (
                "The reasoning was flawed; the correct choice is B because the premise fails.\nAnswer: B",
                150,
                20,
            ),
        ]);
        let r = execute(Strategy::Hybrid, &mut g, &ctx(), &example());
        assert_eq!(r.answer_pred.as_deref(), Some("B"));
        assert_eq!(r.correct, 1);
        assert_eq!(r.usage.total_tokens, Some(280));
        let arb = r.usage.arbitration.as_ref().unwrap();
        assert_eq!(arb.branch, Branch::Override);
        assert_eq!(arb.producer_pred.as_deref(), Some("A"));
        assert!(arb.confidence >= 0.5);
        assert!(g.prompts[1].contains("---\nAnswer: A\n---"));
    }

    #[test]
    fn test_hybrid_keeps_producer_on_invalid_letter() {
        let mut g = Scripted::new(&[("Answer: B", 1, 1), ("Wrong, clearly.\nAnswer: H", 1, 1)]);
        let r = execute(Strategy::Hybrid, &mut g, &ctx(), &example());
        assert_eq!(r.answer_pred.as_deref(), Some("B"));
        assert_eq!(r.branch(), Some(Branch::InvalidLetter));
        assert_eq!(r.raw_text, "Answer: B");
        assert_eq!(r.correct, 1);
    }
}
