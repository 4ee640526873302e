//! Per-family prompt text.
//!
//! Two pieces per family: a one-paragraph APPROACH hint used by every MCQ
//! prompt, and a longer step-by-step tutoring script used only by the hybrid
//! producer stage.

use crate::types::PromptFamily;

/// Short guidance line shown after `APPROACH (<family>):`.
pub fn guidance(family: PromptFamily) -> &'static str {
    match family {
        PromptFamily::FactCheck => {
            "Treat each choice as a claim. Prefer the one that is literally true as stated; \
             reject choices that rely on popular misconceptions or overgeneralize."
        }
        PromptFamily::LogicalReasoning => {
            "Identify the premises and the conclusion. Choose the option that follows necessarily \
             or most strengthens/weakens the argument as asked; ignore outside knowledge."
        }
        PromptFamily::PassageEvidence => {
            "Answer from the passage only. Locate the sentence that supports your choice and \
             reject options the passage does not state or imply."
        }
        PromptFamily::Generic => {
            "Eliminate clearly wrong options first, then compare the remaining ones against the \
             exact wording of the question."
        }
    }
}

/// Step-by-step tutoring script for the hybrid producer.
pub fn tutoring_preamble(family: PromptFamily) -> &'static str {
    match family {
        PromptFamily::FactCheck => {
            "TUTORING SCRIPT (fact checking):
1. Restate what the question is really asking in one line.
2. For each choice, decide whether it is true, false, or unsupported.
3. Watch for myths, absolutes (always/never), and confusions between similar facts.
4. Pick the single choice that is true as written."
        }
        PromptFamily::LogicalReasoning => {
            "TUTORING SCRIPT (logical reasoning):
1. List the premises and the conclusion in a few words each.
2. Name the question type (assumption, inference, strengthen, weaken, flaw).
3. Test each choice against the argument structure, not against real-world facts.
4. Pick the choice that survives the test; reject choices that are merely plausible."
        }
        PromptFamily::PassageEvidence => {
            "TUTORING SCRIPT (reading comprehension):
1. Find the part of the passage the question refers to.
2. Quote or paraphrase the key evidence in one line.
3. Reject choices that add details the passage does not give.
4. Pick the choice the evidence supports most directly."
        }
        PromptFamily::Generic => {
            "TUTORING SCRIPT:
1. Restate the question in your own words.
2. Eliminate choices that are clearly wrong and say why in a few words.
3. Compare what remains against the exact wording of the question.
4. Pick the single best choice."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_family_has_text() {
        for family in [
            PromptFamily::FactCheck,
            PromptFamily::LogicalReasoning,
            PromptFamily::PassageEvidence,
            PromptFamily::Generic,
        ] {
            assert!(!guidance(family).is_empty());
            assert!(tutoring_preamble(family).starts_with("TUTORING SCRIPT"));
        }
    }
}
