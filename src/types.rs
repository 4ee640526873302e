//! Core types for tutorgram.
//!
//! Examples are read-only once loaded: the only transformation the core
//! applies is the per-example choice permutation in `dataset::shuffle`,
//! which produces a *new* presented `Example` rather than mutating the source.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical label alphabet. Ten choices is the ceiling.
pub const LABEL_ALPHABET: [char; 10] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J'];

/// Minimum and maximum number of choices an example may carry.
pub const MIN_CHOICES: usize = 2;
pub const MAX_CHOICES: usize = LABEL_ALPHABET.len();

/// One labeled answer option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub text: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// A multiple-choice question with exactly one gold label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub id: String,
    /// Optional passage the question is about
    #[serde(default)]
    pub context: String,
    pub question: String,
    pub choices: Vec<Choice>,
    /// Gold label, a member of `choices[*].label`
    pub answer: String,
}

impl Example {
    /// Index of the gold choice, if the gold label is present.
    pub fn gold_index(&self) -> Option<usize> {
        self.choices.iter().position(|c| c.label == self.answer)
    }

    /// The set of letters a response may legally declare.
    pub fn label_set(&self) -> LabelSet {
        LabelSet::from_labels(self.choices.iter().map(|c| c.label.as_str()))
    }

    pub fn has_context(&self) -> bool {
        !self.context.trim().is_empty()
    }
}

/// The letters valid for one example, in presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelSet {
    letters: Vec<char>,
}

impl LabelSet {
    /// Positional labels `A..` for `n` choices (capped at the alphabet size).
    pub fn positional(n: usize) -> Self {
        Self {
            letters: LABEL_ALPHABET.iter().take(n).copied().collect(),
        }
    }

    /// Collect single-letter labels; anything else is ignored.
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let letters = labels
            .into_iter()
            .filter_map(|l| {
                let mut chars = l.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(c.to_ascii_uppercase()),
                    _ => None,
                }
            })
            .collect();
        Self { letters }
    }

    pub fn contains(&self, letter: char) -> bool {
        self.letters.contains(&letter.to_ascii_uppercase())
    }

    /// "A, B, C, D"
    pub fn display_list(&self) -> String {
        self.letters
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Token counters reported by a backend. Every field may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

impl Usage {
    pub fn new(input_tokens: Option<u64>, output_tokens: Option<u64>) -> Self {
        let total_tokens = match (input_tokens, output_tokens) {
            (Some(i), Some(o)) => Some(i + o),
            _ => None,
        };
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }
}

/// One completed generator call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub usage: Usage,
    /// Wall-clock seconds, never negative
    pub latency_sec: f64,
}

impl Generation {
    pub fn new(text: impl Into<String>, usage: Usage, latency_sec: f64) -> Self {
        Self {
            text: text.into(),
            usage,
            latency_sec: latency_sec.max(0.0),
        }
    }
}

/// Template family, resolved once per dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptFamily {
    /// Claims to check against facts (FEVER, TruthfulQA)
    FactCheck,
    /// Argument-structure questions (LogiQA, ReClor)
    LogicalReasoning,
    /// Passage-grounded reading comprehension (RACE, BoolQ)
    PassageEvidence,
    #[default]
    Generic,
}

impl PromptFamily {
    /// Derive the family from a dataset name.
    pub fn from_dataset_name(name: &str) -> Self {
        let name = name.to_lowercase();
        let any = |needles: &[&str]| needles.iter().any(|n| name.contains(n));

        if any(&["fever", "truthful", "scifact", "fact"]) {
            PromptFamily::FactCheck
        } else if any(&["logiqa", "reclor", "folio", "logic"]) {
            PromptFamily::LogicalReasoning
        } else if any(&["race", "boolq", "quail", "mctest", "cosmos", "squad"]) {
            PromptFamily::PassageEvidence
        } else {
            PromptFamily::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptFamily::FactCheck => "fact_check",
            PromptFamily::LogicalReasoning => "logical_reasoning",
            PromptFamily::PassageEvidence => "passage_evidence",
            PromptFamily::Generic => "generic",
        }
    }
}

impl FromStr for PromptFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "fact_check" | "fact" => Ok(PromptFamily::FactCheck),
            "logical_reasoning" | "logic" => Ok(PromptFamily::LogicalReasoning),
            "passage_evidence" | "passage" => Ok(PromptFamily::PassageEvidence),
            "generic" => Ok(PromptFamily::Generic),
            _ => Err(format!(
                "Unknown prompt family: {}. Use 'fact_check', 'logical_reasoning', 'passage_evidence', or 'generic'",
                s
            )),
        }
    }
}

impl fmt::Display for PromptFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a dataset lives and which template family it uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDescriptor {
    pub name: String,
    pub family: PromptFamily,
    /// Directory holding `dev.jsonl` / `test.jsonl`
    pub dir: PathBuf,
}

impl DatasetDescriptor {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>, family: Option<PromptFamily>) -> Self {
        let name = name.into();
        let family = family.unwrap_or_else(|| PromptFamily::from_dataset_name(&name));
        let dir = root.into().join(&name);
        Self { name, family, dir }
    }

    pub fn split_path(&self, split: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", split))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_from_dataset_name() {
        assert_eq!(PromptFamily::from_dataset_name("truthfulqa"), PromptFamily::FactCheck);
        assert_eq!(PromptFamily::from_dataset_name("fever_v1"), PromptFamily::FactCheck);
        assert_eq!(PromptFamily::from_dataset_name("LogiQA"), PromptFamily::LogicalReasoning);
        assert_eq!(PromptFamily::from_dataset_name("race_high"), PromptFamily::PassageEvidence);
        assert_eq!(PromptFamily::from_dataset_name("arc_easy"), PromptFamily::Generic);
        assert_eq!(PromptFamily::from_dataset_name("synthetic"), PromptFamily::Generic);
    }

    #[test]
    fn test_family_override_wins() {
        let ds = DatasetDescriptor::new("arc_easy", "data", Some(PromptFamily::FactCheck));
        assert_eq!(ds.family, PromptFamily::FactCheck);
        assert_eq!(ds.split_path("dev"), PathBuf::from("data/arc_easy/dev.jsonl"));
    }

    #[test]
    fn test_label_set() {
        let set = LabelSet::positional(4);
        assert_eq!(set.display_list(), "A, B, C, D");
        assert!(set.contains('c'));
        assert!(!set.contains('E'));
        assert_eq!(LabelSet::from_labels(["a", "AB", "C"]).display_list(), "A, C");
    }

    #[test]
    fn test_usage_total() {
        assert_eq!(Usage::new(Some(3), Some(4)).total_tokens, Some(7));
        assert_eq!(Usage::new(None, Some(4)).total_tokens, None);
    }
}
