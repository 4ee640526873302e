//! Turning reflection edits into candidate prompts.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::reflection::Edit;
use crate::types::LABEL_ALPHABET;

/// A prompt to evaluate, before it has any scores.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub prompt: String,
}

/// An evaluated candidate, as listed in `variants.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    pub accuracy: f64,
    /// 0.0 when the backend reported no output counts
    pub avg_tokens_out: f64,
    pub avg_latency_sec: f64,
    pub prompt_path: PathBuf,
    #[serde(skip)]
    pub prompt: String,
}

/// Default name for the `index`-th edit: A, B, ..., then E11, E12, ...
fn default_name(index: usize) -> String {
    LABEL_ALPHABET
        .get(index)
        .map(|c| c.to_string())
        .unwrap_or_else(|| format!("E{}", index + 1))
}

/// Keep names usable as directory components.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "_".to_string() } else { cleaned }
}

fn truncate_lines(text: &str, max_lines: usize) -> String {
    text.lines().take(max_lines).collect::<Vec<_>>().join("\n")
}

/// `base + separator + edit` for every edit with non-empty text.
///
/// Edits are cut to `max_edit_lines`. Names default to their position and
/// are made unique so each variant gets its own directory.
pub fn materialize(base_prompt: &str, edits: &[Edit], separator: &str, max_edit_lines: usize) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for (i, edit) in edits.iter().enumerate() {
        let text = edit.text.trim();
        if text.is_empty() {
            warn!(index = i, "skipping edit with empty text");
            continue;
        }

        let base_name = sanitize(edit.name.as_deref().unwrap_or(&default_name(i)));
        let mut name = base_name.clone();
        let mut suffix = 2;
        while !seen.insert(name.clone()) {
            name = format!("{}_{}", base_name, suffix);
            suffix += 1;
        }

        let text = truncate_lines(text, max_edit_lines);
        candidates.push(Candidate {
            name,
            prompt: format!("{}{}{}", base_prompt, separator, text),
        });
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(name: Option<&str>, text: &str) -> Edit {
        Edit {
            name: name.map(String::from),
            text: text.to_string(),
            why: String::new(),
        }
    }

    #[test]
    fn test_materialize_joins_with_separator() {
        let c = materialize("BASE", &[edit(Some("A"), "Check units.")], "\n\n", 5);
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].prompt, "BASE\n\nCheck units.");
    }

    #[test]
    fn test_empty_edits_skipped_and_names_defaulted() {
        let edits = vec![edit(None, "  "), edit(None, "Second."), edit(None, "Third.")];
        let names: Vec<_> = materialize("B", &edits, "\n", 5).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[test]
    fn test_long_edits_truncated() {
        let text = "1\n2\n3\n4\n5\n6\n7";
        let c = materialize("BASE", &[edit(Some("long"), text)], "\n\n", 5);
        assert_eq!(c[0].prompt, "BASE\n\n1\n2\n3\n4\n5");
    }

    #[test]
    fn test_names_unique_and_path_safe() {
        let edits = vec![edit(Some("A"), "x"), edit(Some("A"), "y"), edit(Some("../evil"), "z")];
        let names: Vec<_> = materialize("B", &edits, "\n", 5).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["A", "A_2", "___evil"]);
    }
}
