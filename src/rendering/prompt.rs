//! Prompt templates for every stage of every strategy.
//!
//! All MCQ-bearing prompts share one body (passage, question, choices,
//! allowed letters) and one closing format instruction, so the extractor and
//! validator see the same contract regardless of the stage.

use super::family::{guidance, tutoring_preamble};
use crate::types::{Example, PromptFamily};

/// Closing instruction shared by every answer-bearing prompt.
pub const FORMAT_INSTRUCTION: &str = "Follow the format exactly. End with exactly one final line: \
'Answer: <LETTER>' where <LETTER> is one of the allowed letters.";

/// Question, choices and allowed letters in presentation order.
fn mcq_body(example: &Example) -> String {
    let mut out = String::new();
    if example.has_context() {
        out.push_str(&format!("PASSAGE: {}\n", example.context.trim()));
    }
    out.push_str(&format!("QUESTION: {}\n", example.question.trim()));
    out.push_str("CHOICES:\n");
    for choice in &example.choices {
        out.push_str(&format!("{}. {}\n", choice.label, choice.text));
    }
    out.push('\n');
    out.push_str(&format!("Allowed letters: {}", example.label_set().display_list()));
    out
}

fn approach(family: PromptFamily) -> String {
    format!("APPROACH ({}): {}", family, guidance(family))
}

/// The standard MCQ prompt.
pub fn render_mcq_prompt(base_prompt: &str, family: PromptFamily, example: &Example) -> String {
    format!(
        "{}\n\n{}\n\n{}\n{}",
        base_prompt.trim_end(),
        approach(family),
        mcq_body(example),
        FORMAT_INSTRUCTION
    )
}

/// The MCQ prompt with distilled rules placed before the format instruction.
pub fn render_final_prompt(base_prompt: &str, family: PromptFamily, example: &Example, rules: &str) -> String {
    format!(
        "{}\n\n{}\n\n{}\n\nRULES TO APPLY:\n{}\n\n{}",
        base_prompt.trim_end(),
        approach(family),
        mcq_body(example),
        rules.trim(),
        FORMAT_INSTRUCTION
    )
}

/// Self-refine second stage: critique the first answer and re-answer.
pub fn render_critique_prompt(mcq_prompt: &str, initial_response: &str) -> String {
    format!(
        "You earlier answered this multiple-choice question:\n\
---\n{}\n---\n\
Your answer was:\n\
---\n{}\n---\n\
Critique your reasoning briefly, then produce a corrected answer. Keep the total under 100 tokens.\n{}",
        mcq_prompt.trim_end(),
        initial_response.trim(),
        FORMAT_INSTRUCTION
    )
}

/// Distillation stage: turn a critique into reusable rules.
pub fn render_distill_prompt(revision_response: &str) -> String {
    format!(
        "Below is a critique and revision of an answer to a multiple-choice question:\n\
---\n{}\n---\n\
Distill at most 5 general, reusable rules that would have produced the right answer directly. \
Write them as a bulleted list, one short imperative line each. Do not answer the question.",
        revision_response.trim()
    )
}

/// Hybrid stage 1: base prompt plus the family tutoring script.
pub fn render_producer_prompt(base_prompt: &str, family: PromptFamily, example: &Example) -> String {
    format!(
        "{}\n\n{}\n\n{}\n{}",
        base_prompt.trim_end(),
        tutoring_preamble(family),
        mcq_body(example),
        FORMAT_INSTRUCTION
    )
}

/// Hybrid stage 2: review the producer's full response.
pub fn render_auditor_prompt(family: PromptFamily, example: &Example, producer_response: &str) -> String {
    format!(
        "You are auditing another tutor's answer to a multiple-choice question.\n\n\
{}\n\n{}\n\n\
TUTOR RESPONSE:\n---\n{}\n---\n\n\
If the tutor's answer is right, confirm it with the same letter. If it is wrong, name the specific \
flaw in one or two sentences and give the correct letter instead.\n{}",
        approach(family),
        mcq_body(example),
        producer_response.trim(),
        FORMAT_INSTRUCTION
    )
}
