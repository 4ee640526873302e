//! Producer/auditor arbitration.
//!
//! The auditor's letter replaces the producer's only when the two disagree,
//! the auditor's letter is legal for the example, and the auditor's text
//! scores at least `threshold` on [`audit_confidence`].
//!
//! Vocabulary checks are plain substring tests on the lowercased text, so
//! "as" also fires inside "was" or "reason". The two flaw checks overlap
//! ("error", "mistake", "incorrect", "wrong" score in both). Both behaviors
//! are kept as the scoring contract.

use super::record::Branch;
use crate::types::LabelSet;

const CORRECTNESS_TERMS: &[&str] = &["correct", "incorrect", "right", "wrong"];
const CAUSAL_TERMS: &[&str] = &["because", "since", "as", "due to", "reason", "logic"];
const CERTAINTY_TERMS: &[&str] = &["clearly", "obviously", "definitely", "certainly", "must", "should"];
const FLAW_TERMS: &[&str] = &["flaw", "error", "mistake", "incorrect", "wrong"];
const DISAGREEMENT_TERMS: &[&str] = &["incorrect", "wrong", "mistake", "error"];
const CONSEQUENCE_TERMS: &[&str] = &["therefore", "thus", "hence", "consequently"];

// Signal weights in hundredths, summed as integers so equal inputs always
// give bit-identical scores.
const SHORT_BONUS: u32 = 20;
const MEDIUM_BONUS: u32 = 15;
const CORRECTNESS_BONUS: u32 = 25;
const CAUSAL_BONUS: u32 = 20;
const CERTAINTY_BONUS: u32 = 15;
const FLAW_BONUS: u32 = 25;
const ANSWER_PHRASE_BONUS: u32 = 10;
const DIFFERING_LETTER_BONUS: u32 = 10;
const DISAGREEMENT_BONUS: u32 = 15;
const CORRECTION_BONUS: u32 = 10;
const CONSEQUENCE_BONUS: u32 = 10;

fn mentions(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| text.contains(t))
}

/// Confidence in `[0, 1]` that the auditor's response is a real correction.
pub fn audit_confidence(auditor_text: &str, producer: Option<char>, auditor: Option<char>) -> f64 {
    let text = auditor_text.to_lowercase();
    let differs = auditor.is_some() && auditor != producer;
    let len = auditor_text.chars().count();

    let mut points = 0u32;
    if len <= 50 {
        points += SHORT_BONUS;
    } else if len <= 100 {
        points += MEDIUM_BONUS;
    }
    if mentions(&text, CORRECTNESS_TERMS) {
        points += CORRECTNESS_BONUS;
    }
    if mentions(&text, CAUSAL_TERMS) {
        points += CAUSAL_BONUS;
    }
    if mentions(&text, CERTAINTY_TERMS) {
        points += CERTAINTY_BONUS;
    }
    if mentions(&text, FLAW_TERMS) {
        points += FLAW_BONUS;
    }
    if differs && text.contains("the answer is") {
        points += ANSWER_PHRASE_BONUS;
    }
    if differs {
        points += DIFFERING_LETTER_BONUS;
    }
    if mentions(&text, DISAGREEMENT_TERMS) {
        points += DISAGREEMENT_BONUS;
    }
    if differs {
        points += CORRECTION_BONUS;
    }
    if mentions(&text, CONSEQUENCE_TERMS) {
        points += CONSEQUENCE_BONUS;
    }

    f64::from(points.min(100)) / 100.0
}

/// Result of arbitrating one producer/auditor pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub letter: Option<char>,
    pub branch: Branch,
    pub confidence: f64,
}

impl Decision {
    pub fn overridden(&self) -> bool {
        self.branch == Branch::Override
    }
}

/// Decide between producer and auditor letters.
///
/// `auditor` is the auditor's declared letter before label-set filtering, so
/// an out-of-range letter can be told apart from no letter at all.
pub fn arbitrate(
    producer: Option<char>,
    auditor: Option<char>,
    auditor_text: &str,
    allowed: &LabelSet,
    threshold: f64,
) -> Decision {
    let confidence = audit_confidence(auditor_text, producer, auditor);
    let keep = |branch| Decision {
        letter: producer,
        branch,
        confidence,
    };

    match auditor {
        None => keep(Branch::AuditorUnparseable),
        Some(a) if Some(a) == producer => keep(Branch::NoDisagreement),
        Some(a) if !allowed.contains(a) => keep(Branch::InvalidLetter),
        Some(_) if confidence < threshold => keep(Branch::LowConfidence),
        Some(a) => Decision {
            letter: Some(a),
            branch: Branch::Override,
            confidence,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAWED: &str =
        "The reasoning was flawed; the correct choice is B because the premise fails.\nAnswer: B";

    #[test]
    fn test_flaw_scenario_clears_default_threshold() {
        // medium 15 + correctness 25 + causal 20 + flaw 25 + differing 10 + correction 10, capped
        let c = audit_confidence(FLAWED, Some('A'), Some('B'));
        assert_eq!(c, 1.0, "got {}", c);

        let d = arbitrate(Some('A'), Some('B'), FLAWED, &LabelSet::positional(4), 0.5);
        assert_eq!(d.branch, Branch::Override);
        assert_eq!(d.letter, Some('B'));
    }

    #[test]
    fn test_brevity_tiers() {
        assert!((audit_confidence("ok", None, None) - 0.2).abs() < 1e-12);
        let medium = "x".repeat(80);
        assert!((audit_confidence(&medium, None, None) - 0.15).abs() < 1e-12);
        let long = "x".repeat(101);
        assert_eq!(audit_confidence(&long, None, None), 0.0);
    }

    #[test]
    fn test_substring_matching_is_literal() {
        // "was" contains "as"
        let text = format!("{} it was", "x".repeat(120));
        assert!((audit_confidence(&text, None, None) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_overlapping_flaw_terms_count_twice() {
        let text = format!("{} a mistake", "x".repeat(120));
        // flaw 25 + disagreement 15
        assert!((audit_confidence(&text, None, None) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_capped_at_one() {
        let text = "Clearly wrong because of an error; therefore the answer is C. Answer: C";
        assert_eq!(audit_confidence(text, Some('A'), Some('C')), 1.0);
    }

    #[test]
    fn test_branches() {
        let set = LabelSet::positional(4);
        let agree = arbitrate(Some('A'), Some('A'), "Answer: A", &set, 0.0);
        assert_eq!(agree.branch, Branch::NoDisagreement);
        assert_eq!(agree.letter, Some('A'));

        let invalid = arbitrate(Some('A'), Some('F'), "Answer: F", &set, 0.0);
        assert_eq!(invalid.branch, Branch::InvalidLetter);
        assert_eq!(invalid.letter, Some('A'));

        let unparseable = arbitrate(Some('A'), None, "no idea", &set, 0.0);
        assert_eq!(unparseable.branch, Branch::AuditorUnparseable);
        assert_eq!(unparseable.letter, Some('A'));

        let long = format!("{}\nAnswer: B", "x".repeat(120));
        let low = arbitrate(Some('A'), Some('B'), &long, &set, 0.5);
        assert_eq!(low.branch, Branch::LowConfidence);
        assert_eq!(low.letter, Some('A'));
    }

    #[test]
    fn test_threshold_monotonicity() {
        let set = LabelSet::positional(4);
        let pairs = [
            (Some('A'), Some('B'), FLAWED.to_string()),
            (Some('C'), Some('D'), "Answer: D".to_string()),
            (Some('A'), Some('C'), format!("{}\nAnswer: C", "x".repeat(200))),
            (None, Some('B'), "wrong. Answer: B".to_string()),
            (Some('B'), Some('B'), "Answer: B".to_string()),
        ];
        let mut previous = usize::MAX;
        for step in 0..=20 {
            let threshold = f64::from(step) / 20.0;
            let overrides = pairs
                .iter()
                .filter(|(p, a, t)| arbitrate(*p, *a, t, &set, threshold).overridden())
                .count();
            assert!(overrides <= previous);
            previous = overrides;
        }
    }
}
